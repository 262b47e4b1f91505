//! End-to-end harvest tests
//!
//! These tests use wiremock to serve a small gallery and drive the full
//! extract → select → archive cycle through the public API.

use image_harvest::archive::ArchiveOptions;
use image_harvest::config::{parse_config, Config, HttpConfig};
use image_harvest::fetch::{Fetcher, TtlCache};
use image_harvest::selection::{reset_for_set, selected_keys, toggle_all, toggle_one};
use image_harvest::{FetchError, FetchedResponse, Harvester, Headers, ImageFormat};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zip::ZipArchive;

/// Serves `/gallery` as an HTML page referencing the given sources
async fn mount_gallery(server: &MockServer, body: String) {
    Mock::given(method("HEAD"))
        .and(path("/gallery"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "text/html"))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/gallery"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

/// Serves an image for both HEAD and GET
async fn mount_image(server: &MockServer, image_path: &str, content_type: &str, body: &[u8]) {
    Mock::given(method("HEAD"))
        .and(path(image_path))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", content_type))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(image_path))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(body.to_vec())
                .insert_header("content-type", content_type),
        )
        .mount(server)
        .await;
}

fn test_harvester() -> Harvester {
    let config = parse_config("[cache]\nenabled = false\n").expect("Failed to parse config");
    Harvester::new(&config).expect("Failed to build harvester")
}

fn member_names(bytes: &[u8]) -> Vec<String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("Archive is not a valid zip");
    (0..archive.len())
        .map(|i| archive.by_index(i).expect("Missing member").name().to_string())
        .collect()
}

#[tokio::test]
async fn test_full_harvest_cycle() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_gallery(
        &server,
        r#"<html><head><title>Gallery</title></head><body>
            <img src="/img/one.jpg">
            <img src="img/two">
            <img src="/img/three.svg">
            <img src="/img/one.jpg">
        </body></html>"#
            .to_string(),
    )
    .await;
    mount_image(&server, "/img/one.jpg", "image/jpeg", b"one").await;
    mount_image(&server, "/img/two", "image/gif", b"two").await;
    mount_image(&server, "/img/three.svg", "image/svg+xml", b"<svg/>").await;

    let harvester = test_harvester();
    let extraction = harvester.extract(&format!("{}/gallery", base_url)).await;

    assert_eq!(extraction.notice, None);
    assert_eq!(
        extraction.images.as_slice(),
        [
            format!("{}/img/one.jpg", base_url),
            format!("{}/img/two", base_url),
            format!("{}/img/three.svg", base_url),
        ]
    );

    // Formats: extension first, header for the extension-less one
    let mut formats = Vec::new();
    for url in &extraction.images {
        formats.push(harvester.classify(url).await);
    }
    assert_eq!(
        formats,
        vec![ImageFormat::Jpg, ImageFormat::Gif, ImageFormat::Svg]
    );

    // Select all, then drop the first one
    let selection = reset_for_set(&extraction.images);
    let selection = toggle_all(&selection, true);
    let selection = toggle_one(&selection, &format!("{}/img/one.jpg", base_url));
    let selected = selected_keys(&selection);
    assert_eq!(selected.len(), 2);

    let outcome = harvester
        .build_archive(&selected)
        .await
        .expect("Archive build failed");

    assert!(outcome.notices.is_empty());
    let names = member_names(&outcome.bytes);
    assert_eq!(names.len(), 2);
    assert!(names[0].starts_with("two_") && names[0].ends_with("_1.gif"));
    assert!(names[1].starts_with("three_") && names[1].ends_with("_2.svg"));
}

#[tokio::test]
async fn test_direct_image_link() {
    let server = MockServer::start().await;
    mount_image(&server, "/cat.webp", "image/webp", b"RIFF").await;

    let harvester = test_harvester();
    let url = format!("{}/cat.webp", server.uri());
    let extraction = harvester.extract(&url).await;

    assert!(extraction.direct);
    assert_eq!(extraction.images.as_slice(), [url.clone()]);

    let selection = toggle_all(&reset_for_set(&extraction.images), true);
    let outcome = harvester
        .build_archive(&selected_keys(&selection))
        .await
        .expect("Archive build failed");

    let names = member_names(&outcome.bytes);
    assert_eq!(names.len(), 1);
    assert!(names[0].starts_with("cat_") && names[0].ends_with("_1.webp"));
}

#[tokio::test]
async fn test_partial_failure_reported() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_gallery(
        &server,
        r#"<img src="/ok.png"><img src="/gone.png"><img src="/ok2.png">"#.to_string(),
    )
    .await;
    mount_image(&server, "/ok.png", "image/png", b"a").await;
    mount_image(&server, "/ok2.png", "image/png", b"b").await;
    Mock::given(method("GET"))
        .and(path("/gone.png"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;

    let harvester = test_harvester();
    let extraction = harvester.extract(&format!("{}/gallery", base_url)).await;
    let selected = selected_keys(&toggle_all(&reset_for_set(&extraction.images), true));
    assert_eq!(selected.len(), 3);

    let outcome = harvester
        .build_archive(&selected)
        .await
        .expect("Archive build failed");

    assert_eq!(member_names(&outcome.bytes).len(), 2);
    assert_eq!(outcome.notices.len(), 1);
    assert_eq!(
        outcome.notices[0].error,
        FetchError::HttpStatus {
            url: format!("{}/gone.png", base_url),
            status: 410
        }
    );
}

#[tokio::test]
async fn test_page_without_images() {
    let server = MockServer::start().await;
    mount_gallery(&server, "<html><body><h1>Nothing here</h1></body></html>".to_string()).await;

    let extraction = test_harvester()
        .extract(&format!("{}/gallery", server.uri()))
        .await;

    assert!(extraction.images.is_empty());
    assert!(extraction.notice.is_none());
    assert!(reset_for_set(&extraction.images).is_empty());
}

#[tokio::test]
async fn test_missing_page_gives_notice() {
    let server = MockServer::start().await;

    let url = format!("{}/gallery", server.uri());
    let extraction = test_harvester().extract(&url).await;

    assert!(extraction.images.is_empty());
    let notice = extraction.notice.expect("Expected a notice");
    assert_eq!(notice.url, url);
    assert!(matches!(
        notice.error,
        FetchError::HttpStatus { status: 404, .. }
    ));
}

#[tokio::test]
async fn test_cached_extraction_fetches_page_once() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/gallery"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "text/html"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gallery"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"<img src="/a.png">"#))
        .expect(1)
        .mount(&server)
        .await;

    let ttl = Duration::from_secs(3600);
    let fetcher = Fetcher::new(&HttpConfig::default())
        .expect("Failed to build fetcher")
        .with_caches(
            Arc::new(TtlCache::<FetchedResponse>::new(ttl)),
            Arc::new(TtlCache::<Headers>::new(ttl)),
        );
    let harvester = Harvester::with_fetcher(fetcher, ArchiveOptions::default());

    let url = format!("{}/gallery", server.uri());
    let first = harvester.extract(&url).await;
    let second = harvester.extract(&url).await;

    assert_eq!(first, second);
    assert_eq!(first.images.len(), 1);
}

#[tokio::test]
async fn test_default_config_harvester_builds() {
    assert!(Harvester::new(&Config::default()).is_ok());
}
