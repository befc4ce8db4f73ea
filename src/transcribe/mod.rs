pub mod orchestrator;
pub mod whisper;

pub use orchestrator::{TranscriptionOrchestrator, TranscriptionStats};
pub use whisper::WhisperClient;

use crate::config::Mode;
use crate::error::Result;
use crate::media::Part;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A phrase-level cue. Times are seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: usize,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// A single word with its own timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub id: usize,
    pub start: f64,
    pub end: f64,
    pub word: String,
}

/// Transcription of one part, timed relative to the start of that part.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TranscriptFragment {
    pub part_index: usize,
    #[serde(default)]
    pub segments: Vec<Segment>,
    #[serde(default)]
    pub words: Vec<Word>,
    #[serde(default)]
    pub text: String,
}

impl TranscriptFragment {
    /// The fragment a failed part contributes: silence, still tagged with its index.
    pub fn empty(part_index: usize) -> Self {
        Self {
            part_index,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty() && self.words.is_empty() && self.text.is_empty()
    }
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe one part. Errors are reported as-is; see [`transcribe_part`].
    async fn transcribe(&self, part: &Part, mode: Mode) -> Result<TranscriptFragment>;
    fn name(&self) -> &'static str;
    fn max_file_size(&self) -> u64;
}

/// Transcribe `part`, degrading any service failure to an empty fragment.
///
/// One bad part must not sink the run; it only leaves a gap in the timeline.
pub async fn transcribe_part(
    transcriber: &dyn Transcriber,
    part: &Part,
    mode: Mode,
) -> TranscriptFragment {
    match transcriber.transcribe(part, mode).await {
        Ok(mut fragment) => {
            fragment.part_index = part.index;
            fragment
        }
        Err(e) => {
            warn!(
                "Part {} ({}) failed with {}: {}",
                part.index,
                part.path.display(),
                transcriber.name(),
                e
            );
            TranscriptFragment::empty(part.index)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SubgenError;
    use std::path::PathBuf;

    struct FixedTranscriber {
        fail: bool,
    }

    #[async_trait]
    impl Transcriber for FixedTranscriber {
        async fn transcribe(&self, _part: &Part, _mode: Mode) -> Result<TranscriptFragment> {
            if self.fail {
                return Err(SubgenError::Api("quota exceeded".to_string()));
            }
            Ok(TranscriptFragment {
                part_index: 0,
                segments: vec![Segment {
                    id: 0,
                    start: 0.0,
                    end: 1.0,
                    text: "hola".to_string(),
                }],
                words: vec![],
                text: "hola".to_string(),
            })
        }

        fn name(&self) -> &'static str {
            "Fixed"
        }

        fn max_file_size(&self) -> u64 {
            u64::MAX
        }
    }

    fn part(index: usize) -> Part {
        Part {
            index,
            path: PathBuf::from(format!("/tmp/v-part-{}.mp4", index)),
            size_bytes: 1,
        }
    }

    #[tokio::test]
    async fn test_transcribe_part_tags_index() {
        let fragment =
            transcribe_part(&FixedTranscriber { fail: false }, &part(3), Mode::Both).await;
        assert_eq!(fragment.part_index, 3);
        assert_eq!(fragment.segments.len(), 1);
    }

    #[tokio::test]
    async fn test_transcribe_part_degrades_to_empty() {
        let fragment =
            transcribe_part(&FixedTranscriber { fail: true }, &part(2), Mode::Both).await;
        assert_eq!(fragment, TranscriptFragment::empty(2));
        assert!(fragment.is_empty());
    }

    #[test]
    fn test_fragment_missing_fields_default_to_empty() {
        let fragment: TranscriptFragment = serde_json::from_str(r#"{"part_index": 4}"#).unwrap();
        assert_eq!(fragment, TranscriptFragment::empty(4));
    }
}
