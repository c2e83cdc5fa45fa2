//! Binary event map CLI application.
//!
//! Reads a batch of polarity events and writes the binary event map for it.

use anyhow::{Context, Result};
use bem_core::builder::scratch_bytes;
use bem_core::{
    alloc_map, input, output, BinaryEventMapBuilder, Geometry, MapFormat, ScratchArena,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Binary event map builder for event-based vision sensors.
///
/// Accumulates ON/OFF events per pixel and writes a map where every pixel with
/// unbalanced polarity is set.
#[derive(Parser, Debug)]
#[command(name = "bem")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input event file (.csv/.txt text rows or .bin packed records)
    ///
    /// Text files hold one event per line as `type,r1,r2,r3,y,x` and may
    /// declare their frame size with a `% geometry WxH` header line.
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output map file (.pgm, .csv, .bin)
    ///
    /// The output format is determined by the file extension:
    /// - .pgm: 8-bit grayscale image, active pixels white
    /// - .csv: one line of 0/1 cells per image row
    /// - .bin: BEMMAP header followed by raw cells
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Frame width in pixels (overrides the input header)
    #[arg(long, requires = "height")]
    width: Option<i32>,

    /// Frame height in pixels (overrides the input header)
    #[arg(long, requires = "width")]
    height: Option<i32>,

    /// Scratch arena capacity in bytes (default: exactly one count grid)
    #[arg(long, value_name = "BYTES")]
    arena_bytes: Option<usize>,

    /// Log build details (same as RUST_LOG=debug)
    #[arg(short, long)]
    verbose: bool,

    /// Suppress progress output
    #[arg(short, long)]
    quiet: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let format = MapFormat::from_path(&args.output).context("Unsupported output format")?;

    // Setup progress bar
    let progress = if args.quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .context("Invalid progress template")?,
        );
        pb
    };

    let start_time = Instant::now();

    progress.set_message(format!(
        "Reading {:?}...",
        args.input.file_name().unwrap_or_default()
    ));
    let batch = input::read_events(&args.input).context("Failed to read event file")?;

    // Geometry: command line, then file header, then the default frame size
    let geometry = match (args.width, args.height) {
        (Some(w), Some(h)) => Geometry::new(w, h).context("Invalid --width/--height")?,
        _ => batch.geometry.unwrap_or_default(),
    };
    debug!(%geometry, events = batch.records.len(), "resolved input");

    let arena_bytes = match args.arena_bytes {
        Some(bytes) => bytes,
        None => scratch_bytes(geometry).context("Frame too large for scratch arena")?,
    };
    let mut arena =
        ScratchArena::try_new(arena_bytes).context("Failed to allocate scratch arena")?;
    let mut map = alloc_map(geometry).context("Failed to allocate output map")?;

    progress.set_message(format!("Building {} map...", geometry));
    let stats = BinaryEventMapBuilder::new(&mut arena)
        .build_with_geometry(geometry, &batch.records, &mut map)
        .context("Failed to build binary event map")?;
    info!(
        active = stats.active_pixels,
        dropped = stats.out_of_range,
        "map built"
    );

    progress.set_message(format!(
        "Writing to {:?}...",
        args.output.file_name().unwrap_or_default()
    ));
    output::write_map(&args.output, &map, geometry, format)
        .context("Failed to write map output")?;

    let total_duration = start_time.elapsed();

    progress.finish_with_message(format!(
        "Done! {} active pixels from {} events in {:.3}s",
        stats.active_pixels,
        batch.records.len(),
        total_duration.as_secs_f64()
    ));

    if !args.quiet {
        // Print summary
        eprintln!();
        eprintln!("Summary:");
        eprintln!("  Input:        {:?}", args.input);
        eprintln!("  Output:       {:?}", args.output);
        eprintln!("  Frame:        {}", geometry);
        eprintln!("  Events:       {}", batch.records.len());
        eprintln!("  Accumulated:  {}", stats.accumulated);
        eprintln!("  Out of range: {}", stats.out_of_range);
        eprintln!("  Other types:  {}", stats.ignored_type);
        eprintln!("  Active:       {}", stats.active_pixels);
        eprintln!("  Duration:     {:.3}s", total_duration.as_secs_f64());
    }

    Ok(())
}
