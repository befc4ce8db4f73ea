pub mod render;
pub mod srt;
pub mod time;
pub mod vtt;

pub use render::{render_segments, render_words, segment_cues, word_cues, SubtitlePair};
pub use time::{format_timestamp, parse_timestamp};

use crate::config::Granularity;

/// Serialization format of a rendered subtitle file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubtitleFormat {
    Srt,
    Vtt,
}

impl SubtitleFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SubtitleFormat::Srt => "srt",
            SubtitleFormat::Vtt => "vtt",
        }
    }
}

impl std::fmt::Display for SubtitleFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// One cue on the global timeline. `id` is 0-based; formats decide how to number it.
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    pub id: usize,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// A finished subtitle document, written once and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSubtitle {
    pub format: SubtitleFormat,
    pub granularity: Granularity,
    pub content: String,
}

pub trait SubtitleFormatter {
    fn format(&self, cues: &[Cue]) -> String;
    fn kind(&self) -> SubtitleFormat;

    fn extension(&self) -> &'static str {
        self.kind().extension()
    }
}

pub fn create_formatter(format: SubtitleFormat) -> Box<dyn SubtitleFormatter> {
    match format {
        SubtitleFormat::Srt => Box::new(srt::SrtFormatter),
        SubtitleFormat::Vtt => Box::new(vtt::VttFormatter),
    }
}
