//! Sequential processing of many jobs from a TOML or JSON file.
//!
//! TOML files hold `[[job]]` tables; JSON files hold a bare array. A failing job
//! is recorded in the error log and the batch moves on to the next one.

use crate::config::{Config, JobConfig, Mode, OutputFormat, Source};
use crate::error::{Result, SubgenError};
use crate::pipeline::{format_elapsed, JobResult};
use crate::progress::ProgressReporter;
use crate::transcribe::Transcriber;
use serde::Deserialize;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

/// One entry of a batch file. Unset fields fall back to [`Config`] defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BatchJob {
    pub url: Option<String>,
    pub video: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub format: Option<OutputFormat>,
    pub mode: Option<Mode>,
    pub prefix: Option<String>,
}

impl BatchJob {
    /// Resolve into a runnable job, applying defaults from `config`.
    pub fn into_job_config(self, config: &Config) -> Result<JobConfig> {
        let source = Source::from_options(self.url, self.video)?;
        let output_dir = self
            .output_dir
            .unwrap_or_else(|| config.default_output_dir.clone());

        let mut job = JobConfig::new(source, output_dir)
            .with_format(self.format.unwrap_or_default())
            .with_mode(self.mode.unwrap_or_default());
        if let Some(prefix) = self.prefix {
            job = job.with_prefix(prefix);
        }

        job.validate()?;
        Ok(job)
    }
}

#[derive(Debug, Deserialize)]
struct BatchFile {
    #[serde(default)]
    job: Vec<BatchJob>,
}

/// Read a batch file. `.json` is parsed as a JSON array, anything else as TOML.
pub fn load_batch(path: &Path) -> Result<Vec<BatchJob>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|_| SubgenError::FileNotFound(path.display().to_string()))?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let jobs = if is_json {
        serde_json::from_str::<Vec<BatchJob>>(&contents)?
    } else {
        toml::from_str::<BatchFile>(&contents)?.job
    };

    info!("Loaded {} jobs from {}", jobs.len(), path.display());
    Ok(jobs)
}

/// Outcome of a whole batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Append `{unix_seconds}\t{source}\t{error}` to `log_path`.
pub async fn append_error_log(log_path: &Path, source: &str, err: &str) -> Result<()> {
    if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let line = format!("{}\t{}\t{}\n", timestamp, source, err.replace('\n', " "));

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

/// Run `jobs` one after another through the Whisper API.
pub async fn run_batch(
    jobs: Vec<BatchJob>,
    config: &Config,
    progress: &ProgressReporter,
) -> BatchSummary {
    run_batch_with(jobs, config, move |job| async move {
        crate::pipeline::run_job(&job, config, progress).await
    })
    .await
}

/// Run `jobs` one after another with a specific transcriber.
pub async fn run_batch_with_transcriber(
    jobs: Vec<BatchJob>,
    config: &Config,
    transcriber: Arc<dyn Transcriber>,
    progress: &ProgressReporter,
) -> BatchSummary {
    run_batch_with(jobs, config, move |job| {
        let transcriber = transcriber.clone();
        async move { crate::pipeline::run_job_with(&job, config, transcriber, progress).await }
    })
    .await
}

async fn run_batch_with<F, Fut>(jobs: Vec<BatchJob>, config: &Config, run: F) -> BatchSummary
where
    F: Fn(JobConfig) -> Fut,
    Fut: Future<Output = Result<JobResult>>,
{
    let mut summary = BatchSummary::default();
    let total = jobs.len();

    for (position, batch_job) in jobs.into_iter().enumerate() {
        let label = batch_job
            .url
            .clone()
            .or_else(|| batch_job.video.as_ref().map(|p| p.display().to_string()))
            .unwrap_or_else(|| "<no source>".to_string());
        info!("Batch job {}/{}: {}", position + 1, total, label);

        let outcome = match batch_job.into_job_config(config) {
            Ok(job) => run(job).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(result) => {
                info!(
                    "Batch job {}/{} wrote {} files in {}",
                    position + 1,
                    total,
                    result.written.len(),
                    format_elapsed(result.elapsed)
                );
                summary.succeeded += 1;
            }
            Err(e) => {
                error!("Batch job {}/{} failed: {}", position + 1, total, e);
                if let Err(log_err) =
                    append_error_log(&config.error_log, &label, &e.to_string()).await
                {
                    error!(
                        "Could not write to error log {}: {}",
                        config.error_log.display(),
                        log_err
                    );
                }
                summary.failed += 1;
            }
        }
    }

    summary
}
