//! Image-Harvest main entry point
//!
//! This is the command-line interface for the Image-Harvest image extractor.

use anyhow::{bail, Context};
use clap::Parser;
use image_harvest::config::{load_config_with_hash, Config};
use image_harvest::extract::Extraction;
use image_harvest::selection::{self, SelectionMap};
use image_harvest::Harvester;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Image-Harvest: pull images off a web page into a zip
///
/// Lists every image referenced by a page (or a direct image link) with its
/// format, and optionally downloads a selection of them into one archive.
#[derive(Parser, Debug)]
#[command(name = "image-harvest")]
#[command(version)]
#[command(about = "Extract images from a web page into a zip archive", long_about = None)]
struct Cli {
    /// Web page URL or direct image URL
    #[arg(value_name = "URL")]
    url: String,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write the selected images to this zip archive
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Select every extracted image
    #[arg(long, conflicts_with = "select")]
    all: bool,

    /// Select an image by its listing number (repeatable)
    #[arg(short, long, value_name = "N")]
    select: Vec<usize>,

    /// Skip format classification when listing
    #[arg(long)]
    no_classify: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = load_settings(cli.config.as_deref())?;
    let harvester = Harvester::new(&config).context("Failed to set up HTTP clients")?;

    let extraction = harvester.extract(&cli.url).await;
    if let Some(notice) = &extraction.notice {
        eprintln!("warning [{}]: {}", notice.error.kind(), notice);
    }
    if extraction.images.is_empty() {
        bail!("No images found on this URL!");
    }

    let picked = apply_selection_flags(&extraction, &cli)?;
    print_listing(&harvester, &extraction, &picked, !cli.no_classify).await;

    if let Some(output) = &cli.output {
        handle_download(&harvester, &picked, output).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("image_harvest=info,warn"),
            1 => EnvFilter::new("image_harvest=debug,info"),
            2 => EnvFilter::new("image_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the configuration file if one was given, defaults otherwise
fn load_settings(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        tracing::debug!("No configuration file given, using defaults");
        return Ok(Config::default());
    };

    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    Ok(config)
}

/// Builds the selection from `--all` / `--select`
fn apply_selection_flags(extraction: &Extraction, cli: &Cli) -> anyhow::Result<SelectionMap> {
    let mut map = selection::reset_for_set(&extraction.images);

    if cli.all {
        return Ok(selection::toggle_all(&map, true));
    }

    for &index in &cli.select {
        let Some(url) = index
            .checked_sub(1)
            .and_then(|i| extraction.images.as_slice().get(i))
        else {
            bail!(
                "--select {} is out of range (found {} image(s))",
                index,
                extraction.images.len()
            );
        };

        // Repeating an index must not deselect it again
        if map.get(url) == Some(false) {
            map = selection::toggle_one(&map, url);
        }
    }

    Ok(map)
}

/// Prints the numbered image listing and the selection counter
async fn print_listing(
    harvester: &Harvester,
    extraction: &Extraction,
    picked: &SelectionMap,
    classify: bool,
) {
    let count = extraction.images.len();
    println!(
        "Found {} image{}!",
        count,
        if count > 1 { "s" } else { "" }
    );

    let formats = if classify {
        Some(harvester.classify_all(extraction.images.as_slice()).await)
    } else {
        None
    };

    for (index, (url, selected)) in picked.iter().enumerate() {
        let marker = if selected { "x" } else { " " };
        match formats.as_ref().and_then(|formats| formats.get(index)) {
            Some(format) => {
                println!("[{}] {:>3}  {:<6} {}", marker, index + 1, format.label(), url)
            }
            None => println!("[{}] {:>3}  {}", marker, index + 1, url),
        }
    }

    println!(
        "Selected: {} of {} images",
        picked.selected_count(),
        picked.len()
    );
}

/// Downloads the selected images and writes the archive
async fn handle_download(
    harvester: &Harvester,
    picked: &SelectionMap,
    output: &Path,
) -> anyhow::Result<()> {
    let selected = selection::selected_keys(picked);
    if selected.is_empty() {
        println!("No images selected");
        return Ok(());
    }

    let outcome = harvester
        .build_archive(&selected)
        .await
        .context("Failed to build archive")?;

    for notice in &outcome.notices {
        eprintln!(
            "Failed to download {} [{}]: {}",
            notice.url,
            notice.error.kind(),
            notice.error
        );
    }

    std::fs::write(output, &outcome.bytes)
        .with_context(|| format!("Failed to write archive to {}", output.display()))?;

    for entry in &outcome.entries {
        println!("  + {} ({} bytes)", entry.name, entry.size);
    }
    println!(
        "✓ {} of {} image(s) saved to: {}",
        outcome.entries.len(),
        selected.len(),
        output.display()
    );

    Ok(())
}
