//! The batch augmentation engine.
//!
//! One job augments a fixed list of images across a bounded pool of worker
//! threads. Starting a job returns immediately with a [`JobHandle`];
//! progress, per-image errors, preview frames and the terminal summary arrive
//! as [`JobEvent`]s on the handle's channel. A cooperative stop flag lets the
//! caller end a run early without interrupting work already in flight.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering::Relaxed};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;

use crossbeam_channel::{unbounded, Receiver, Sender};
use image::RgbImage;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::augment::{attempt_augmentation, AttemptOutcome, MAX_ATTEMPTS};
use crate::bbox::BBox;
use crate::config::{MAX_WORKERS, MIN_WORKERS};
use crate::dataset::DatasetMode;
use crate::error::AugError;
use crate::labels;
use crate::pipeline::Pipeline;

/// Everything one batch run needs, fixed at start.
pub struct BatchJob {
    pub image_paths: Vec<PathBuf>,
    pub labels_dir: PathBuf,
    pub output_images_dir: PathBuf,
    pub output_labels_dir: PathBuf,
    pub pipeline: Arc<Pipeline>,
    pub mode: DatasetMode,
    pub augmentations_per_image: usize,
    pub worker_count: usize,
    /// Emit a preview frame after every successful iteration.
    pub preview: bool,
    /// Seed for reproducible runs; tasks derive their RNG from it by index.
    pub seed: Option<u64>,
}

/// An original/augmented pair streamed to the caller for live preview.
#[derive(Debug)]
pub struct PreviewFrame {
    pub original: RgbImage,
    pub original_bboxes: Option<Vec<BBox>>,
    pub augmented: RgbImage,
    pub augmented_bboxes: Option<Vec<BBox>>,
}

/// Counters reported when a job reaches a terminal state.
#[derive(Clone, Copy, Debug)]
pub struct JobSummary {
    pub completed_iterations: usize,
    pub total_iterations: usize,
    pub elapsed_seconds: f64,
}

/// Asynchronous notifications from a running job.
#[derive(Debug)]
pub enum JobEvent {
    /// Whole-percent progress in `[0, 100]`, emitted after each finished
    /// image task.
    Progress(u8),
    /// One image failed; the batch continues.
    Error { path: PathBuf, message: String },
    /// A successful iteration's before/after pair.
    Preview(Box<PreviewFrame>),
    /// Terminal event; always the last one sent.
    Finished(JobSummary),
}

/// Observable lifecycle of a job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Completed,
    Stopped,
}

const STATUS_RUNNING: u8 = 0;
const STATUS_COMPLETED: u8 = 1;
const STATUS_STOPPED: u8 = 2;

/// Caller-side handle to a running job.
pub struct JobHandle {
    events: Receiver<JobEvent>,
    stop: Arc<AtomicBool>,
    status: Arc<AtomicU8>,
    coordinator: thread::JoinHandle<JobSummary>,
}

impl JobHandle {
    /// The event channel. Iterating it ends after [`JobEvent::Finished`].
    pub fn events(&self) -> &Receiver<JobEvent> {
        &self.events
    }

    /// Request a cooperative stop. Workers finish what they are doing and
    /// take no new iterations; the terminal summary is still emitted.
    pub fn request_stop(&self) {
        self.stop.store(true, Relaxed);
    }

    pub fn status(&self) -> JobStatus {
        match self.status.load(Relaxed) {
            STATUS_COMPLETED => JobStatus::Completed,
            STATUS_STOPPED => JobStatus::Stopped,
            _ => JobStatus::Running,
        }
    }

    /// Block until the job reaches a terminal state.
    pub fn wait(self) -> JobSummary {
        self.coordinator
            .join()
            .expect("augmentation coordinator thread panicked")
    }
}

/// Start a batch job. Returns as soon as the coordinator thread is spawned.
///
/// Output directories are created here; failure to do so is fatal to the
/// start action (no job is created). Everything after this point is reported
/// through the event channel instead.
pub fn run_job(job: BatchJob) -> Result<JobHandle, AugError> {
    std::fs::create_dir_all(&job.output_images_dir)?;
    if job.mode == DatasetMode::ImagesWithLabels {
        std::fs::create_dir_all(&job.output_labels_dir)?;
    }

    let worker_count = job.worker_count.clamp(MIN_WORKERS, MAX_WORKERS);
    let augmentations_per_image = job.augmentations_per_image.max(1);
    let total_iterations = job.image_paths.len() * augmentations_per_image;

    let stop = Arc::new(AtomicBool::new(false));
    let status = Arc::new(AtomicU8::new(STATUS_RUNNING));
    let (event_tx, event_rx) = unbounded();

    let coordinator = {
        let stop = Arc::clone(&stop);
        let status = Arc::clone(&status);
        thread::spawn(move || {
            run_coordinator(
                job,
                worker_count,
                augmentations_per_image,
                total_iterations,
                stop,
                status,
                event_tx,
            )
        })
    };

    Ok(JobHandle {
        events: event_rx,
        stop,
        status,
        coordinator,
    })
}

struct WorkerContext {
    pipeline: Arc<Pipeline>,
    mode: DatasetMode,
    labels_dir: PathBuf,
    output_images_dir: PathBuf,
    output_labels_dir: PathBuf,
    augmentations_per_image: usize,
    preview: bool,
    seed: Option<u64>,
    stop: Arc<AtomicBool>,
    completed: AtomicUsize,
    total_iterations: usize,
    // Guards percent computation + send as one step so the progress stream
    // never goes backwards under concurrent task completion.
    last_percent: Mutex<u8>,
    events: Sender<JobEvent>,
}

fn run_coordinator(
    job: BatchJob,
    worker_count: usize,
    augmentations_per_image: usize,
    total_iterations: usize,
    stop: Arc<AtomicBool>,
    status: Arc<AtomicU8>,
    event_tx: Sender<JobEvent>,
) -> JobSummary {
    let start = Instant::now();

    let (task_tx, task_rx) = unbounded::<(usize, PathBuf)>();
    for task in job.image_paths.iter().cloned().enumerate() {
        // The receiver outlives this loop; an unbounded send cannot fail here.
        let _ = task_tx.send(task);
    }
    drop(task_tx);

    let ctx = Arc::new(WorkerContext {
        pipeline: Arc::clone(&job.pipeline),
        mode: job.mode,
        labels_dir: job.labels_dir.clone(),
        output_images_dir: job.output_images_dir.clone(),
        output_labels_dir: job.output_labels_dir.clone(),
        augmentations_per_image,
        preview: job.preview,
        seed: job.seed,
        stop: Arc::clone(&stop),
        completed: AtomicUsize::new(0),
        total_iterations,
        last_percent: Mutex::new(0),
        events: event_tx.clone(),
    });

    let mut workers = Vec::with_capacity(worker_count);
    for _ in 0..worker_count {
        let ctx = Arc::clone(&ctx);
        let task_rx = task_rx.clone();
        workers.push(thread::spawn(move || worker_loop(&ctx, &task_rx)));
    }
    drop(task_rx);

    for worker in workers {
        // A panicking worker loses its in-flight task but must not sink the
        // whole batch.
        if worker.join().is_err() {
            warn!("augmentation worker panicked");
        }
    }

    let summary = JobSummary {
        completed_iterations: ctx.completed.load(Relaxed),
        total_iterations,
        elapsed_seconds: start.elapsed().as_secs_f64(),
    };

    let terminal = if stop.load(Relaxed) {
        STATUS_STOPPED
    } else {
        STATUS_COMPLETED
    };
    status.store(terminal, Relaxed);

    info!(
        "batch finished: {}/{} iterations in {:.2}s",
        summary.completed_iterations, summary.total_iterations, summary.elapsed_seconds
    );
    let _ = event_tx.send(JobEvent::Finished(summary));
    summary
}

fn worker_loop(ctx: &WorkerContext, task_rx: &Receiver<(usize, PathBuf)>) {
    while let Ok((task_index, path)) = task_rx.recv() {
        if ctx.stop.load(Relaxed) {
            break;
        }

        let mut rng = match ctx.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(task_index as u64)),
            None => StdRng::from_os_rng(),
        };

        if let Err(err) = process_image(ctx, &path, &mut rng) {
            let _ = ctx.events.send(JobEvent::Error {
                path: path.clone(),
                message: err.to_string(),
            });
        }

        emit_progress(ctx);
    }
}

fn emit_progress(ctx: &WorkerContext) {
    let mut last = ctx
        .last_percent
        .lock()
        .expect("progress mutex poisoned by a panicked worker");
    let percent =
        progress_percent(ctx.completed.load(Relaxed), ctx.total_iterations).max(*last);
    *last = percent;
    let _ = ctx.events.send(JobEvent::Progress(percent));
}

/// One image task: load once, then run the configured number of gated
/// augmentation iterations.
fn process_image(ctx: &WorkerContext, path: &Path, rng: &mut StdRng) -> Result<(), AugError> {
    let original = load_rgb_image(path)?;
    let (bboxes, classes) = read_task_labels(ctx, path);

    for iteration in 0..ctx.augmentations_per_image {
        if ctx.stop.load(Relaxed) {
            return Ok(());
        }

        match attempt_augmentation(
            &ctx.pipeline,
            rng,
            &original,
            bboxes.as_deref(),
            classes.as_deref(),
            MAX_ATTEMPTS,
        ) {
            AttemptOutcome::Augmented {
                image: augmented,
                bboxes: augmented_bboxes,
                classes: augmented_classes,
            } => {
                persist_iteration(
                    ctx,
                    path,
                    iteration,
                    &augmented,
                    augmented_bboxes.as_deref(),
                    augmented_classes.as_deref(),
                )?;
                ctx.completed.fetch_add(1, Relaxed);

                if ctx.preview {
                    let _ = ctx.events.send(JobEvent::Preview(Box::new(PreviewFrame {
                        original: original.clone(),
                        original_bboxes: bboxes.clone(),
                        augmented,
                        augmented_bboxes,
                    })));
                }
            }
            // The retry budget ran out for this iteration; nothing is
            // persisted and that is not an error.
            AttemptOutcome::Exhausted => {}
        }
    }

    Ok(())
}

fn load_rgb_image(path: &Path) -> Result<RgbImage, AugError> {
    let image = image::open(path).map_err(|source| AugError::ImageRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(image.to_rgb8())
}

/// Labels for one task. A missing or malformed label file degrades to "no
/// boxes" instead of failing the task.
fn read_task_labels(ctx: &WorkerContext, path: &Path) -> (Option<Vec<BBox>>, Option<Vec<usize>>) {
    if ctx.mode != DatasetMode::ImagesWithLabels {
        return (None, None);
    }

    let label_path = labels::label_path_for(&ctx.labels_dir, path);
    if !label_path.exists() {
        return (None, None);
    }

    match labels::read_labels(&label_path) {
        Ok((bboxes, classes)) => (Some(bboxes), Some(classes)),
        Err(err) => {
            warn!("skipping labels for {}: {err}", path.display());
            (None, None)
        }
    }
}

fn persist_iteration(
    ctx: &WorkerContext,
    path: &Path,
    iteration: usize,
    augmented: &RgbImage,
    bboxes: Option<&[BBox]>,
    classes: Option<&[usize]>,
) -> Result<(), AugError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let image_path = ctx
        .output_images_dir
        .join(format!("aug_{iteration}_{file_name}"));
    augmented
        .save(&image_path)
        .map_err(|source| AugError::ImageWrite {
            path: image_path.clone(),
            source,
        })?;

    if ctx.mode == DatasetMode::ImagesWithLabels {
        if let (Some(bboxes), Some(classes)) = (bboxes, classes) {
            if !bboxes.is_empty() {
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let label_path = ctx
                    .output_labels_dir
                    .join(format!("aug_{iteration}_{stem}.txt"));
                labels::write_labels(&label_path, bboxes, classes)?;
            }
        }
    }

    Ok(())
}

fn progress_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((completed * 100) / total).min(100) as u8
}
