use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayban_tag::sniff::{DetectorRegistry, Source};
use rayban_tag::{config, exif, pipeline};

#[derive(Parser, Debug)]
#[command(
    name = "rayban-tag",
    version,
    about = "Re-tag photos and videos so they read as Ray-Ban Meta smart glasses captures"
)]
struct Cli {
    /// Media files or directories to process
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Metadata tool executable (overrides the config file)
    #[arg(long, value_name = "PATH", env = "EXIFTOOL_PATH")]
    exiftool: Option<String>,

    /// Maximum number of files tagged at once
    #[arg(short, long, value_name = "N")]
    jobs: Option<usize>,

    /// Kill the tool after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Skip files whose format cannot be identified
    #[arg(long)]
    strict: bool,

    /// Only print the detected format of each file
    #[arg(long)]
    sniff: bool,

    /// Display the Make/Model/Software tags and exit
    #[arg(long = "show-tags")]
    show_tags: bool,

    /// Preview the commands without running the tool
    #[arg(long)]
    dry_run: bool,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over -v
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .format_target(false)
        .init();

    if cli.init {
        let written = config::Config::default().save(cli.config.as_deref())?;
        println!("Wrote default settings to {}", written.display());
        println!("Edit tagger.exiftool_path if exiftool is not on PATH.");
        return Ok(());
    }

    if cli.paths.is_empty() {
        anyhow::bail!("No input files or directories specified. Use --help for usage.");
    }

    let files = pipeline::collect_files(&cli.paths);
    if files.is_empty() {
        anyhow::bail!("No files found in the specified paths.");
    }

    let registry = DetectorRegistry::builtin();

    // Handle --sniff
    if cli.sniff {
        let labels: Vec<&str> = registry.detectors().iter().map(|d| d.label()).collect();
        log::debug!("Signatures checked in order: {}", labels.join(", "));
        for path in &files {
            match registry.identify(Source::Path(path)) {
                Ok(label) => println!("{}\t{}", label.unwrap_or("unknown"), path.display()),
                Err(e) => log::error!("Failed to read {}: {e}", path.display()),
            }
        }
        return Ok(());
    }

    // Handle --show-tags
    if cli.show_tags {
        for path in &files {
            if let Err(e) = print_device_tags(path) {
                log::error!("Failed to read tags from {}: {e:#}", path.display());
            }
        }
        return Ok(());
    }

    // Load config and apply CLI overrides
    let mut config = config::Config::load(cli.config.as_deref())?;
    if let Some(tool) = cli.exiftool {
        config.tagger.exiftool_path = tool;
    }
    if let Some(jobs) = cli.jobs {
        config.output.jobs = jobs;
    }
    if let Some(secs) = cli.timeout {
        config.tagger.timeout_secs = Some(secs);
    }
    if cli.strict {
        config.output.require_known_format = true;
    }
    if cli.dry_run {
        config.output.dry_run = true;
    }

    let total = files.len();
    log::info!("Found {total} file(s) to process");
    log::info!("Tool: {}", config.tagger.exiftool_path);
    if config.output.dry_run {
        log::info!("DRY RUN: no files will be modified");
    }

    let results = pipeline::process_batch(
        files,
        Arc::new(registry),
        Arc::new(config.tagger()),
        config.output.clone(),
        config.jobs(),
    )
    .await;

    // JSON output
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }

    // Summary
    let tagged = results.iter().filter(|r| r.tagged).count();
    let skipped = results.iter().filter(|r| r.skipped.is_some()).count();
    let failed = results.iter().filter(|r| !r.is_ok()).count();
    log::info!("Done: {tagged} tagged, {skipped} skipped, {failed} failed out of {total} files");

    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Print the device tags currently stored in a file.
fn print_device_tags(path: &Path) -> Result<()> {
    let tags = exif::read_device_tags(path)?;

    println!();
    println!("{BOLD}File:{RESET} {}", path.display());
    println!("{DIM}{}{RESET}", "═".repeat(72));
    print_row("Make", tags.make.as_deref());
    print_row("Model", tags.model.as_deref());
    print_row("Software", tags.software.as_deref());
    if tags.matches_tag_set() {
        println!("  {GREEN}✓ Ray-Ban Meta tags present{RESET}");
    }
    println!();

    Ok(())
}

/// Print a single row in the tag table.
fn print_row(tag: &str, val: Option<&str>) {
    let tag_col = format!("{:<22}", tag);
    match val {
        Some(v) => println!("  {tag_col} : {v}"),
        None => println!("  {DIM}{tag_col} : (not set){RESET}"),
    }
}
