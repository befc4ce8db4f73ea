use crate::config::Mode;
use crate::media::Part;
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::transcribe::{transcribe_part, TranscriptFragment, Transcriber};
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Statistics from the transcription process.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionStats {
    pub total_parts: usize,
    pub successful_parts: usize,
    pub failed_parts: usize,
    pub total_time: Duration,
    pub avg_part_time: Duration,
}

/// Fans part transcriptions out concurrently.
pub struct TranscriptionOrchestrator {
    transcriber: Arc<dyn Transcriber>,
    concurrency: usize,
    progress: ProgressReporter,
}

impl TranscriptionOrchestrator {
    /// Create a new orchestrator with the given transcriber.
    pub fn new(transcriber: Arc<dyn Transcriber>, concurrency: usize) -> Self {
        Self {
            transcriber,
            concurrency: concurrency.max(1),
            progress: ProgressReporter::disabled(),
        }
    }

    /// Report per-part completion through `progress`.
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Transcribe every part, returning one fragment per part in ascending index order.
    ///
    /// Failed parts yield empty fragments; this never fails as a whole.
    pub async fn process_parts(
        &self,
        parts: Vec<Part>,
        mode: Mode,
    ) -> (Vec<TranscriptFragment>, TranscriptionStats) {
        let total_parts = parts.len();
        let start_time = Instant::now();

        if parts.is_empty() {
            return (
                Vec::new(),
                TranscriptionStats {
                    total_parts: 0,
                    successful_parts: 0,
                    failed_parts: 0,
                    total_time: Duration::ZERO,
                    avg_part_time: Duration::ZERO,
                },
            );
        }

        info!(
            "Transcribing {} parts with {} concurrent requests using {}",
            total_parts,
            self.concurrency,
            self.transcriber.name()
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut futures = FuturesUnordered::new();

        for part in parts {
            let sem = semaphore.clone();
            let transcriber = self.transcriber.clone();
            let progress = self.progress.clone();

            futures.push(async move {
                // The semaphore lives as long as this call and is never closed.
                let _permit = sem.acquire().await.ok();

                let part_start = Instant::now();
                debug!("Starting transcription of part {}", part.index);

                let fragment = transcribe_part(transcriber.as_ref(), &part, mode).await;
                let elapsed = part_start.elapsed();

                let ok = !fragment.is_empty();
                progress.emit(ProgressEvent::PartTranscribed {
                    index: part.index,
                    ok,
                });
                debug!("Part {} finished in {}ms", part.index, elapsed.as_millis());

                (fragment, elapsed)
            });
        }

        let mut fragments = Vec::with_capacity(total_parts);
        let mut total_part_time = Duration::ZERO;
        while let Some((fragment, elapsed)) = futures.next().await {
            total_part_time += elapsed;
            fragments.push(fragment);
        }

        fragments.sort_by_key(|f| f.part_index);

        let successful_parts = fragments.iter().filter(|f| !f.is_empty()).count();
        let failed_parts = total_parts - successful_parts;
        let total_time = start_time.elapsed();
        let avg_part_time = total_part_time / total_parts as u32;

        if successful_parts == 0 {
            warn!("All {} parts came back empty; output will have no cues", total_parts);
        }

        info!(
            "Transcription complete: {}/{} parts successful in {:.2}s (avg {:.2}s/part)",
            successful_parts,
            total_parts,
            total_time.as_secs_f64(),
            avg_part_time.as_secs_f64()
        );

        (
            fragments,
            TranscriptionStats {
                total_parts,
                successful_parts,
                failed_parts,
                total_time,
                avg_part_time,
            },
        )
    }
}
