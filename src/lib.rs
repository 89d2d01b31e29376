//! Dataug: batch image augmentation for YOLO-style detection datasets.
//!
//! Dataug takes a directory of images — optionally paired with YOLO-format
//! label files — and produces an augmented copy of the dataset on disk,
//! applying a configurable chain of probabilistic transforms a fixed number
//! of times per image across a pool of worker threads.
//!
//! # Modules
//!
//! - [`dataset`]: dataset layout detection and image enumeration
//! - [`labels`]: YOLO label file codec
//! - [`transforms`]: the augmentation transform catalog
//! - [`pipeline`]: building and invoking the transform chain
//! - [`augment`]: bounded-retry wrapper around one pipeline invocation
//! - [`engine`]: the concurrent batch engine and its event stream
//! - [`preview`]: box overlays and the detection-model boundary
//! - [`config`]: run configuration and the augmentation spec
//! - [`error`]: error types for dataug operations

pub mod augment;
pub mod bbox;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod labels;
pub mod pipeline;
pub mod preview;
pub mod transforms;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use walkdir::WalkDir;

use crate::augment::{attempt_augmentation, AttemptOutcome, MAX_ATTEMPTS};
use crate::config::AugmentConfig;
use crate::dataset::{DatasetLayout, DatasetMode};
use crate::engine::{BatchJob, JobEvent};
use crate::pipeline::Pipeline;

pub use error::AugError;

/// The dataug CLI application.
#[derive(Parser)]
#[command(name = "dataug")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Run a batch augmentation job over a dataset directory.
    Run(RunArgs),
    /// Augment a single image once and write a before/after pair.
    Preview(PreviewArgs),
    /// Check every label file in a dataset for format problems.
    Check(CheckArgs),
}

/// Arguments for the run subcommand.
#[derive(clap::Args)]
struct RunArgs {
    /// Dataset directory (flat images, or images/ + labels/).
    directory: PathBuf,

    /// YAML configuration file; defaults are used when absent.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the number of augmented variants per image.
    #[arg(long)]
    augmentations: Option<usize>,

    /// Override the worker thread count.
    #[arg(long)]
    workers: Option<usize>,

    /// Override the RNG seed for a reproducible run.
    #[arg(long)]
    seed: Option<u64>,
}

/// Arguments for the preview subcommand.
#[derive(clap::Args)]
struct PreviewArgs {
    /// Dataset directory (flat images, or images/ + labels/).
    directory: PathBuf,

    /// YAML configuration file; defaults are used when absent.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Which image (by sorted position) to preview.
    #[arg(long, default_value_t = 0)]
    index: usize,

    /// Where to write the preview pair (defaults to the dataset directory).
    #[arg(long)]
    out: Option<PathBuf>,
}

/// Arguments for the check subcommand.
#[derive(clap::Args)]
struct CheckArgs {
    /// Dataset directory containing a labels/ subdirectory.
    directory: PathBuf,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Run the dataug CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), AugError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run(args)) => run_batch(args),
        Some(Commands::Preview(args)) => run_preview(args),
        Some(Commands::Check(args)) => run_check(args),
        None => {
            println!("dataug {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Batch image augmentation for YOLO-style datasets.");
            println!();
            println!("Run 'dataug --help' for usage information.");
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<AugmentConfig, AugError> {
    match path {
        Some(path) => AugmentConfig::load(path),
        None => Ok(AugmentConfig::default()),
    }
}

/// Execute the run subcommand.
fn run_batch(args: RunArgs) -> Result<(), AugError> {
    if !args.directory.is_dir() {
        return Err(AugError::Config(format!(
            "'{}' is not a directory",
            args.directory.display()
        )));
    }

    let mut config = load_config(args.config.as_deref())?;
    if let Some(augmentations) = args.augmentations {
        config.augmentations_per_image = augmentations;
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    config.validate()?;

    let layout = DatasetLayout::discover(&args.directory);
    let image_paths = layout.collect_images()?;
    if image_paths.is_empty() {
        return Err(AugError::Config(format!(
            "no images found under '{}'",
            layout.images_dir.display()
        )));
    }

    log::info!(
        "augmenting {} image(s) x{} with {} worker(s), mode {:?}",
        image_paths.len(),
        config.augmentations_per_image,
        config.effective_workers(),
        layout.mode
    );

    let pipeline = Arc::new(Pipeline::build(&config.augmentations, layout.mode)?);
    let handle = engine::run_job(BatchJob {
        image_paths,
        labels_dir: layout.labels_dir.clone(),
        output_images_dir: layout.output_images_dir.clone(),
        output_labels_dir: layout.output_labels_dir.clone(),
        pipeline,
        mode: layout.mode,
        augmentations_per_image: config.augmentations_per_image,
        worker_count: config.effective_workers(),
        // The terminal has no use for frame streams; the preview subcommand
        // covers visual inspection.
        preview: false,
        seed: config.seed,
    })?;

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% ({eta})",
        )
        .expect("static progress bar template is valid")
        .progress_chars("#>-"),
    );

    let mut summary = None;
    for event in handle.events().iter() {
        match event {
            JobEvent::Progress(percent) => bar.set_position(percent as u64),
            JobEvent::Error { path, message } => {
                log::error!("{}: {message}", path.display());
            }
            JobEvent::Preview(_) => {}
            JobEvent::Finished(job_summary) => summary = Some(job_summary),
        }
    }
    bar.finish_and_clear();

    let summary = match summary {
        Some(summary) => summary,
        None => handle.wait(),
    };
    println!(
        "Augmentation complete: {}/{} iteration(s) in {:.2}s, output in '{}'",
        summary.completed_iterations,
        summary.total_iterations,
        summary.elapsed_seconds,
        layout.output_images_dir.display()
    );

    Ok(())
}

/// Execute the preview subcommand.
fn run_preview(args: PreviewArgs) -> Result<(), AugError> {
    let config = load_config(args.config.as_deref())?;
    config.validate()?;

    let layout = DatasetLayout::discover(&args.directory);
    let image_paths = layout.collect_images()?;
    let image_path = image_paths.get(args.index).ok_or_else(|| {
        AugError::Config(format!(
            "image index {} out of range ({} image(s) found)",
            args.index,
            image_paths.len()
        ))
    })?;

    let original = image::open(image_path)
        .map_err(|source| AugError::ImageRead {
            path: image_path.clone(),
            source,
        })?
        .to_rgb8();

    let (bboxes, classes) = match layout.mode {
        DatasetMode::ImagesWithLabels => {
            let label_path = labels::label_path_for(&layout.labels_dir, image_path);
            if label_path.exists() {
                let (bboxes, classes) = labels::read_labels(&label_path)?;
                (Some(bboxes), Some(classes))
            } else {
                (None, None)
            }
        }
        DatasetMode::OnlyImages => (None, None),
    };

    let pipeline = Pipeline::build(&config.augmentations, layout.mode)?;
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let (augmented, augmented_bboxes) = match attempt_augmentation(
        &pipeline,
        &mut rng,
        &original,
        bboxes.as_deref(),
        classes.as_deref(),
        MAX_ATTEMPTS,
    ) {
        AttemptOutcome::Augmented { image, bboxes, .. } => (image, bboxes),
        AttemptOutcome::Exhausted => {
            log::warn!("augmentation failed after {MAX_ATTEMPTS} attempts; showing the original");
            (original.clone(), None)
        }
    };

    let out_dir = args.out.unwrap_or_else(|| args.directory.clone());
    std::fs::create_dir_all(&out_dir)?;

    let original_overlay = preview::draw_boxes(&original, bboxes.as_deref().unwrap_or(&[]));
    let augmented_overlay =
        preview::draw_boxes(&augmented, augmented_bboxes.as_deref().unwrap_or(&[]));

    for (name, frame) in [
        ("preview_original.png", &original_overlay),
        ("preview_augmented.png", &augmented_overlay),
    ] {
        let path = out_dir.join(name);
        frame.save(&path).map_err(|source| AugError::ImageWrite {
            path: path.clone(),
            source,
        })?;
        println!("wrote {}", path.display());
    }

    Ok(())
}

#[derive(Serialize)]
struct CheckIssue {
    path: String,
    message: String,
}

#[derive(Serialize)]
struct CheckReport {
    files_checked: usize,
    issues: Vec<CheckIssue>,
}

/// Execute the check subcommand.
fn run_check(args: CheckArgs) -> Result<(), AugError> {
    let layout = DatasetLayout::discover(&args.directory);
    if layout.mode != DatasetMode::ImagesWithLabels {
        return Err(AugError::Config(format!(
            "'{}' has no images/ + labels/ pair to check",
            args.directory.display()
        )));
    }

    let mut label_files: Vec<PathBuf> = WalkDir::new(&layout.labels_dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.path().to_path_buf())
        .filter(|path| path.extension().is_some_and(|ext| ext == "txt"))
        .collect();
    label_files.sort();

    let mut report = CheckReport {
        files_checked: label_files.len(),
        issues: Vec::new(),
    };

    for path in &label_files {
        match labels::read_labels(path) {
            Ok((bboxes, _)) => {
                for (index, bbox) in bboxes.iter().enumerate() {
                    if !bbox.is_normalized() {
                        report.issues.push(CheckIssue {
                            path: path.display().to_string(),
                            message: format!("box {index} is outside the unit frame: {bbox:?}"),
                        });
                    }
                }
            }
            Err(err) => report.issues.push(CheckIssue {
                path: path.display().to_string(),
                message: err.to_string(),
            }),
        }
    }

    match args.output.as_str() {
        "json" => {
            let rendered = serde_json::to_string_pretty(&report)
                .expect("check report serializes to JSON");
            println!("{rendered}");
        }
        _ => {
            for issue in &report.issues {
                println!("{}: {}", issue.path, issue.message);
            }
            println!(
                "Checked {} label file(s): {} issue(s)",
                report.files_checked,
                report.issues.len()
            );
        }
    }

    if report.issues.is_empty() {
        Ok(())
    } else {
        Err(AugError::CheckFailed(report.issues.len()))
    }
}
