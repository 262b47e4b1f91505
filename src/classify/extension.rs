use url::Url;

/// Extensions that a MIME type guess would map to `image/*`
const IMAGE_EXTENSIONS: &[&str] = &[
    "apng", "avif", "bmp", "gif", "ico", "jpe", "jpeg", "jpg", "png", "svg", "tif", "tiff", "webp",
];

/// Returns the last path segment of a URL
///
/// Query string and fragment are ignored. Input that does not parse as an
/// absolute URL is treated as a bare path.
///
/// # Examples
///
/// ```
/// use image_harvest::classify::last_segment;
///
/// assert_eq!(last_segment("https://example.com/a/cat.jpg?w=200"), "cat.jpg");
/// assert_eq!(last_segment("photo.GIF"), "photo.GIF");
/// assert_eq!(last_segment("https://example.com/"), "");
/// ```
pub fn last_segment(url: &str) -> String {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url
            .split(|c| c == '?' || c == '#')
            .next()
            .unwrap_or("")
            .to_string(),
    };

    path.rsplit('/').next().unwrap_or("").to_string()
}

/// Splits a file name into stem and extension
///
/// A leading dot does not start an extension, so `.png` has no extension.
///
/// # Examples
///
/// ```
/// use image_harvest::classify::split_extension;
///
/// assert_eq!(split_extension("cat.tar.gz"), ("cat.tar", Some("gz")));
/// assert_eq!(split_extension("README"), ("README", None));
/// assert_eq!(split_extension(".png"), (".png", None));
/// ```
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.trim_start_matches('.').is_empty() => (stem, Some(ext)),
        _ => (name, None),
    }
}

/// Returns the lowercased extension of a URL's path, if any
pub fn path_extension(url: &str) -> Option<String> {
    let segment = last_segment(url);
    split_extension(&segment).1.map(str::to_ascii_lowercase)
}

/// Guesses from the extension alone whether a URL names an image
pub fn guess_is_image(url: &str) -> bool {
    path_extension(url)
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}
