//! Progress events emitted by the pipeline.
//!
//! The core only sends [`ProgressEvent`]s down a channel. Rendering them
//! (terminal bars, logs, nothing at all) is up to whoever holds the receiver.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;

/// Coarse pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Downloading,
    Chunking,
    Transcribing,
    Rendering,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Downloading => write!(f, "Downloading video"),
            Stage::Chunking => write!(f, "Splitting video"),
            Stage::Transcribing => write!(f, "Transcribing parts"),
            Stage::Rendering => write!(f, "Writing subtitles"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    StageStarted(Stage),
    Download { downloaded: u64, total: Option<u64> },
    PartsPlanned { count: usize },
    PartEncoded { index: usize },
    PartTranscribed { index: usize, ok: bool },
    StageFinished(Stage),
}

/// Cheap, cloneable handle for emitting progress. A disabled reporter drops everything.
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    tx: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl ProgressReporter {
    pub fn new(tx: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    /// Create a reporter together with its receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn emit(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            // A closed receiver just means nobody is watching.
            let _ = tx.send(event);
        }
    }
}

/// Drain `rx` into indicatif bars until every sender is gone.
pub async fn render_progress(mut rx: mpsc::UnboundedReceiver<ProgressEvent>) {
    let multi = MultiProgress::new();
    let mut spinners: HashMap<Stage, ProgressBar> = HashMap::new();
    let mut download: Option<ProgressBar> = None;
    let mut parts: Option<ProgressBar> = None;

    while let Some(event) = rx.recv().await {
        match event {
            ProgressEvent::StageStarted(stage) => {
                let pb = multi.add(ProgressBar::new_spinner());
                pb.set_style(
                    ProgressStyle::default_spinner()
                        .template("{spinner:.green} {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                pb.set_message(format!("{}...", stage));
                pb.enable_steady_tick(Duration::from_millis(100));
                spinners.insert(stage, pb);
            }
            ProgressEvent::Download { downloaded, total } => {
                let pb = download.get_or_insert_with(|| {
                    let pb = multi.add(ProgressBar::new(total.unwrap_or(0)));
                    pb.set_style(
                        ProgressStyle::default_bar()
                            .template("  [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                            .unwrap_or_else(|_| ProgressStyle::default_bar())
                            .progress_chars("#>-"),
                    );
                    pb
                });
                if let Some(total) = total {
                    pb.set_length(total);
                }
                pb.set_position(downloaded);
            }
            ProgressEvent::PartsPlanned { count } => {
                let pb = multi.add(ProgressBar::new(count as u64));
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("  [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} parts ({eta})")
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("#>-"),
                );
                parts = Some(pb);
            }
            ProgressEvent::PartEncoded { .. } | ProgressEvent::PartTranscribed { .. } => {
                if let Some(pb) = &parts {
                    pb.inc(1);
                }
            }
            ProgressEvent::StageFinished(stage) => {
                if let Some(pb) = spinners.remove(&stage) {
                    pb.finish_with_message(format!("✓ {}", stage));
                }
                if stage == Stage::Downloading {
                    if let Some(pb) = download.take() {
                        pb.finish_and_clear();
                    }
                }
                if matches!(stage, Stage::Chunking | Stage::Transcribing) {
                    if let Some(pb) = parts.take() {
                        pb.finish_and_clear();
                    }
                }
            }
        }
    }

    for (_, pb) in spinners.drain() {
        pb.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reporter_forwards_events() {
        let (reporter, mut rx) = ProgressReporter::channel();
        reporter.emit(ProgressEvent::StageStarted(Stage::Chunking));
        reporter.emit(ProgressEvent::PartEncoded { index: 2 });
        drop(reporter);

        assert_eq!(
            rx.recv().await,
            Some(ProgressEvent::StageStarted(Stage::Chunking))
        );
        assert_eq!(rx.recv().await, Some(ProgressEvent::PartEncoded { index: 2 }));
        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn test_disabled_reporter_is_silent() {
        let reporter = ProgressReporter::disabled();
        reporter.emit(ProgressEvent::PartsPlanned { count: 3 });
    }

    #[tokio::test]
    async fn test_closed_receiver_does_not_panic() {
        let (reporter, rx) = ProgressReporter::channel();
        drop(rx);
        reporter.emit(ProgressEvent::StageFinished(Stage::Rendering));
    }
}
