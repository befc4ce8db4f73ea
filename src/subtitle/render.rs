//! Segment-mode and word-mode rendering of a merged timeline.

use super::{create_formatter, Cue, RenderedSubtitle, SubtitleFormat};
use crate::config::{Granularity, Mode};
use crate::transcribe::{Segment, Word};

/// The SRT and VTT renderings of one granularity.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitlePair {
    pub srt: RenderedSubtitle,
    pub vtt: RenderedSubtitle,
}

impl SubtitlePair {
    pub fn get(&self, format: SubtitleFormat) -> &RenderedSubtitle {
        match format {
            SubtitleFormat::Srt => &self.srt,
            SubtitleFormat::Vtt => &self.vtt,
        }
    }
}

/// Segment cues keep the segment's own id.
pub fn segment_cues(segments: &[Segment]) -> Vec<Cue> {
    segments
        .iter()
        .map(|s| Cue {
            id: s.id,
            start: s.start,
            end: s.end,
            text: s.text.clone(),
        })
        .collect()
}

/// Word cues are numbered by position, ignoring the stored word id.
pub fn word_cues(words: &[Word]) -> Vec<Cue> {
    words
        .iter()
        .enumerate()
        .map(|(position, w)| Cue {
            id: position,
            start: w.start,
            end: w.end,
            text: w.word.clone(),
        })
        .collect()
}

/// Render segments, or `None` when `mode` leaves segments out.
pub fn render_segments(segments: &[Segment], mode: Mode) -> Option<SubtitlePair> {
    mode.includes(Granularity::Segment)
        .then(|| render_pair(&segment_cues(segments), Granularity::Segment))
}

/// Render words, or `None` when `mode` leaves words out.
pub fn render_words(words: &[Word], mode: Mode) -> Option<SubtitlePair> {
    mode.includes(Granularity::Word)
        .then(|| render_pair(&word_cues(words), Granularity::Word))
}

fn render_pair(cues: &[Cue], granularity: Granularity) -> SubtitlePair {
    let render = |format: SubtitleFormat| RenderedSubtitle {
        format,
        granularity,
        content: create_formatter(format).format(cues),
    };

    SubtitlePair {
        srt: render(SubtitleFormat::Srt),
        vtt: render(SubtitleFormat::Vtt),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(id: usize, start: f64, end: f64, text: &str) -> Segment {
        Segment {
            id,
            start,
            end,
            text: text.to_string(),
        }
    }

    fn word(id: usize, start: f64, end: f64, text: &str) -> Word {
        Word {
            id,
            start,
            end,
            word: text.to_string(),
        }
    }

    #[test]
    fn test_segment_numbering() {
        let pair = render_segments(&[segment(7, 0.0, 1.0, "seven")], Mode::Both).unwrap();

        assert_eq!(pair.srt.content, "8\n00:00:00,000 --> 00:00:01,000\nseven\n\n");
        assert_eq!(
            pair.vtt.content,
            "WEBVTT\n\n7\n00:00:00.000 --> 00:00:01.000\nseven\n\n"
        );
        assert_eq!(pair.srt.granularity, Granularity::Segment);
        assert_eq!(pair.get(SubtitleFormat::Vtt).format, SubtitleFormat::Vtt);
    }

    #[test]
    fn test_word_numbering_uses_position() {
        let words = vec![word(40, 0.0, 0.25, "uno"), word(3, 0.25, 0.5, "dos")];
        let pair = render_words(&words, Mode::Words).unwrap();

        assert_eq!(
            pair.srt.content,
            "1\n00:00:00,000 --> 00:00:00,250\nuno\n\n2\n00:00:00,250 --> 00:00:00,500\ndos\n\n"
        );
        assert!(pair.vtt.content.starts_with("WEBVTT\n\n0\n"));
        assert!(pair.vtt.content.contains("\n1\n00:00:00.250 --> 00:00:00.500\ndos\n\n"));
    }

    #[test]
    fn test_single_word_vtt() {
        let pair = render_words(&[word(0, 0.0, 0.3, "hi")], Mode::Both).unwrap();
        assert_eq!(
            pair.vtt.content,
            "WEBVTT\n\n0\n00:00:00.000 --> 00:00:00.300\nhi\n\n"
        );
    }

    #[test]
    fn test_mode_skips_renderers() {
        let segments = vec![segment(0, 0.0, 1.0, "a")];
        let words = vec![word(0, 0.0, 1.0, "a")];

        assert!(render_segments(&segments, Mode::Words).is_none());
        assert!(render_words(&words, Mode::Segments).is_none());
        assert!(render_segments(&segments, Mode::Segments).is_some());
        assert!(render_words(&words, Mode::Words).is_some());
    }

    #[test]
    fn test_empty_timeline_renders_headers_only() {
        let pair = render_segments(&[], Mode::Both).unwrap();
        assert_eq!(pair.srt.content, "");
        assert_eq!(pair.vtt.content, "WEBVTT\n\n");
    }
}
