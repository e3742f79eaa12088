//! Spin CLI - tooling for 360° product frame sets
//!
//! Keeps uploaded frame directories on the canonical naming convention the
//! storefront viewer reads, and replays recorded drags through the engine.

mod frames;
mod logging;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

use spin_core::{
    format_gaps, missing_count, plan_normalization, replay, DragTrace, FrameUrlScheme, ViewerConfig,
};

#[derive(Parser)]
#[command(name = "spin-cli")]
#[command(author, version, about = "MaisonMiaro 360° frame tooling", long_about = None)]
struct Cli {
    /// Viewer config JSON (sensitivity, decay, url scheme, ...)
    #[arg(long, global = true, env = "SPIN_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report naming styles, gaps and duplicates in a frame directory
    Inspect {
        /// Product frame directory
        dir: PathBuf,

        /// Print one CSV row per frame instead of a summary
        #[arg(long)]
        csv: bool,
    },

    /// Rename frames onto the canonical convention
    Normalize {
        /// Product frame directory
        dir: PathBuf,

        /// Only show what would be renamed
        #[arg(long)]
        dry_run: bool,

        /// Zero-padding width
        #[arg(long)]
        pad: Option<usize>,

        /// Number given to the first frame
        #[arg(long)]
        first: Option<u32>,
    },

    /// Write manifest.json for a product directory
    Manifest {
        /// Product frame directory
        dir: PathBuf,

        /// Product id the storefront uses
        #[arg(short, long)]
        product: String,
    },

    /// Print the frame URLs the viewer will request
    Urls {
        #[arg(short, long)]
        product: String,

        #[arg(short, long)]
        frames: usize,

        /// Image extension
        #[arg(long)]
        ext: Option<String>,
    },

    /// Replay a recorded drag trace and print where the rotation settles
    Replay {
        /// Trace JSON: {"events": [{"kind": "down", "x": 0, "t": 0}, ...]}
        trace: PathBuf,

        #[arg(short, long)]
        frames: usize,

        /// Frame shown before the first event
        #[arg(long, default_value = "0")]
        start: usize,
    },
}

fn load_config(path: Option<&Path>) -> Result<ViewerConfig> {
    match path {
        Some(path) => ViewerConfig::load(path).with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(ViewerConfig::default()),
    }
}

fn main() -> Result<()> {
    let _guard = logging::init_logging();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Inspect { dir, csv } => cmd_inspect(&dir, csv, &config.url_scheme)?,
        Commands::Normalize { dir, dry_run, pad, first } => {
            let mut scheme = config.url_scheme.clone();
            if let Some(pad) = pad {
                scheme.pad_width = pad;
            }
            if let Some(first) = first {
                scheme.first_number = first;
            }
            cmd_normalize(&dir, dry_run, &scheme)?;
        }
        Commands::Manifest { dir, product } => {
            let viewer = cli.config.is_some().then(|| config.clone());
            let manifest = frames::write_manifest(&dir, &product, viewer)?;
            println!("Wrote manifest for {} ({} frames)", manifest.product_id, manifest.frame_count);
        }
        Commands::Urls { product, frames, ext } => {
            let mut scheme = config.url_scheme.clone();
            if let Some(ext) = ext {
                scheme.extension = ext;
            }
            for frame in 0..frames {
                println!("{}", scheme.frame_url(&product, frame));
            }
        }
        Commands::Replay { trace, frames, start } => {
            let json = std::fs::read_to_string(&trace)
                .with_context(|| format!("Failed to read {}", trace.display()))?;
            let trace = DragTrace::from_json(&json).context("Failed to parse trace")?;
            let report = replay(config, frames, start, &trace);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn cmd_inspect(dir: &Path, csv: bool, scheme: &FrameUrlScheme) -> Result<()> {
    let report = frames::inspect(dir)?;

    if csv {
        let mut writer = csv::Writer::from_writer(std::io::stdout());
        for frame in &report.frames {
            writer.serialize(frame)?;
        }
        writer.flush()?;
        return Ok(());
    }

    println!("Directory: {}", dir.display());
    println!("Frames: {}", report.frames.len());
    for (style, count) in report.styles() {
        println!("  {:<10} {}", style.as_str(), count);
    }
    if !report.gaps.is_empty() {
        println!(
            "Missing numbers ({}): {}",
            missing_count(&report.gaps),
            format_gaps(&report.gaps)
        );
    }
    for (number, names) in &report.duplicates {
        println!("Duplicate frame {}: {}", number, names.join(", "));
    }
    if !report.unrecognized.is_empty() {
        println!("Ignored files: {}", report.unrecognized.join(", "));
    }
    println!(
        "Canonical: {}",
        if report.is_canonical(scheme) { "yes" } else { "no (run normalize)" }
    );
    Ok(())
}

fn cmd_normalize(dir: &Path, dry_run: bool, scheme: &FrameUrlScheme) -> Result<()> {
    if !(1..=8).contains(&scheme.pad_width) {
        bail!("--pad must be between 1 and 8");
    }

    let files = frames::list_files(dir)?;
    let plan = plan_normalization(&files, scheme)?;
    let changes: Vec<_> = plan.iter().filter(|r| !r.is_noop()).collect();

    if changes.is_empty() {
        println!("{} is already canonical ({} frames)", dir.display(), plan.len());
        return Ok(());
    }

    if dry_run {
        for rename in &changes {
            println!("{} -> {}", rename.from, rename.to);
        }
        println!("[DRY RUN] {} of {} frames would be renamed", changes.len(), plan.len());
        return Ok(());
    }

    let pb = ProgressBar::new(changes.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("Invalid progress template")?
            .progress_chars("#>-"),
    );
    pb.set_message("renaming");

    let renamed = frames::apply_renames(dir, &plan, Some(&pb))?;
    pb.finish_with_message("done");
    tracing::info!(dir = %dir.display(), renamed, "normalized frame set");
    println!("Renamed {} of {} frames", renamed, plan.len());
    Ok(())
}
