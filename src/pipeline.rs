use crate::config::{Config, JobConfig, Source};
use crate::error::Result;
use crate::media::{chunk, fetch_remote_media, ChunkConfig, MediaFile};
use crate::output::{plan_outputs, write_outputs};
use crate::progress::{ProgressEvent, ProgressReporter, Stage};
use crate::stitch::stitch;
use crate::transcribe::{
    Transcriber, TranscriptionOrchestrator, TranscriptionStats, WhisperClient,
};
use console::style;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tracing::{debug, info};

/// What a successful job produced.
#[derive(Debug, Clone)]
pub struct JobResult {
    pub written: Vec<PathBuf>,
    pub parts: usize,
    pub segments: usize,
    pub words: usize,
    pub stats: TranscriptionStats,
    pub elapsed: Duration,
}

/// Run one job against the Whisper API described by `config`.
pub async fn run_job(
    job: &JobConfig,
    config: &Config,
    progress: &ProgressReporter,
) -> Result<JobResult> {
    let client = WhisperClient::from_config(config)?;
    run_job_with(job, config, Arc::new(client), progress).await
}

/// Run one job with any transcriber.
///
/// Stages: acquire, chunk, transcribe, stitch, render, write. Intermediate files
/// live in a per-run temp directory that is removed when this returns, whether
/// or not the job succeeded. Nothing is written to `job.output_dir` unless every
/// stage before the writer succeeded.
pub async fn run_job_with(
    job: &JobConfig,
    config: &Config,
    transcriber: Arc<dyn Transcriber>,
    progress: &ProgressReporter,
) -> Result<JobResult> {
    let start_time = Instant::now();
    job.validate()?;

    let workspace = create_workspace(config, &job.prefix)?;
    debug!("Using temp directory: {:?}", workspace.path());

    // Stage 1: acquisition
    let media_path = match &job.source {
        Source::Path(path) => path.clone(),
        Source::Url(url) => {
            progress.emit(ProgressEvent::StageStarted(Stage::Downloading));
            info!("Downloading {}", url);
            let path =
                fetch_remote_media(url, &workspace.path().join("download"), progress).await?;
            progress.emit(ProgressEvent::StageFinished(Stage::Downloading));
            path
        }
    };
    let media = MediaFile::open(&media_path).await?;
    info!("Source media: {} ({} bytes)", media.path.display(), media.size_bytes);

    // Stage 2: chunking
    progress.emit(ProgressEvent::StageStarted(Stage::Chunking));
    let chunk_config = ChunkConfig::from_config(config);
    let parts = chunk(
        &media,
        &chunk_config,
        &workspace.path().join("parts"),
        &job.prefix,
        progress,
    )
    .await?;
    progress.emit(ProgressEvent::StageFinished(Stage::Chunking));
    let part_count = parts.len();

    // Stage 3: transcription
    progress.emit(ProgressEvent::StageStarted(Stage::Transcribing));
    progress.emit(ProgressEvent::PartsPlanned { count: part_count });
    let orchestrator = TranscriptionOrchestrator::new(transcriber, config.concurrency)
        .with_progress(progress.clone());
    let (fragments, stats) = orchestrator.process_parts(parts, job.mode).await;
    progress.emit(ProgressEvent::StageFinished(Stage::Transcribing));

    // Stage 4: stitch, render and write
    progress.emit(ProgressEvent::StageStarted(Stage::Rendering));
    let timeline = stitch(fragments);
    info!(
        "Merged timeline: {} segments, {} words",
        timeline.segments.len(),
        timeline.words.len()
    );

    let files = plan_outputs(job, &timeline);
    let written = write_outputs(&job.output_dir, &files).await?;
    progress.emit(ProgressEvent::StageFinished(Stage::Rendering));

    for path in &written {
        info!("Wrote {}", path.display());
    }

    Ok(JobResult {
        written,
        parts: part_count,
        segments: timeline.segments.len(),
        words: timeline.words.len(),
        stats,
        elapsed: start_time.elapsed(),
    })
}

fn create_workspace(config: &Config, prefix: &str) -> Result<TempDir> {
    let name = format!("subgen-{}-", prefix);
    let mut builder = tempfile::Builder::new();
    builder.prefix(&name);

    let dir = match &config.temp_root {
        Some(root) => {
            std::fs::create_dir_all(root)?;
            builder.tempdir_in(root)?
        }
        None => builder.tempdir()?,
    };
    Ok(dir)
}

/// Wall time as `{m}m {s}s {ms}ms`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_ms = elapsed.as_millis();
    let minutes = total_ms / 60_000;
    let seconds = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{}m {}s {}ms", minutes, seconds, millis)
}

/// Print a summary of a finished job.
pub fn print_summary(job: &JobConfig, result: &JobResult) {
    println!();
    println!("{}", style("Subtitles generated").green().bold());
    println!("  Source:     {}", job.source);
    println!(
        "  Parts:      {} ({} transcribed, {} failed)",
        result.parts, result.stats.successful_parts, result.stats.failed_parts
    );
    println!("  Segments:   {}", result.segments);
    println!("  Words:      {}", result.words);
    println!("  Files:");
    for path in &result.written {
        println!("    {}", style(path.display()).cyan());
    }
    println!();
}
