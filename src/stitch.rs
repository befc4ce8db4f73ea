//! Merging per-part transcripts into one timeline.
//!
//! Every fragment is timed from the start of its own part. Parts are laid end to
//! end, so fragment `i` is shifted by the end time of the last cue of fragment
//! `i - 1` (after that fragment was itself shifted). Ids are shifted the same way
//! so they keep counting up across parts.
//!
//! The offset is only as good as the service's last timestamp: if it trims
//! trailing silence, later parts land slightly early and the error accumulates.

use crate::transcribe::{Segment, TranscriptFragment, Word};
use serde::Serialize;

/// Segments, words and text on the timeline of the full source media.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MergedTimeline {
    pub segments: Vec<Segment>,
    pub words: Vec<Word>,
    pub text: String,
}

impl From<TranscriptFragment> for MergedTimeline {
    fn from(fragment: TranscriptFragment) -> Self {
        Self {
            segments: fragment.segments,
            words: fragment.words,
            text: fragment.text,
        }
    }
}

/// Where the previous fragment left off.
#[derive(Debug, Clone, Copy)]
struct Offset {
    time: f64,
    id: usize,
}

impl Offset {
    const NONE: Offset = Offset { time: 0.0, id: 0 };
}

/// Merge fragments, in any order, into one continuous timeline.
pub fn stitch(mut fragments: Vec<TranscriptFragment>) -> MergedTimeline {
    fragments.sort_by_key(|f| f.part_index);

    if fragments.len() == 1 {
        return fragments.remove(0).into();
    }

    let mut merged = MergedTimeline::default();
    let mut texts: Vec<String> = Vec::with_capacity(fragments.len());

    // Offsets derived from fragment i - 1; the first fragment is never shifted.
    let mut segment_offset = Offset::NONE;
    let mut word_offset = Offset::NONE;

    for fragment in fragments {
        let segments = shift_segments(fragment.segments, segment_offset);
        let words = shift_words(fragment.words, word_offset);

        segment_offset = segments
            .last()
            .map(|s| Offset {
                time: s.end,
                id: s.id + 1,
            })
            .unwrap_or(Offset::NONE);
        word_offset = words
            .last()
            .map(|w| Offset {
                time: w.end,
                id: w.id + 1,
            })
            .unwrap_or(Offset::NONE);

        merged.segments.extend(segments);
        merged.words.extend(words);

        let text = fragment.text.trim();
        if !text.is_empty() {
            texts.push(text.to_string());
        }
    }

    merged.text = texts.join(" ");
    merged
}

fn shift_segments(segments: Vec<Segment>, offset: Offset) -> Vec<Segment> {
    segments
        .into_iter()
        .map(|s| Segment {
            id: s.id + offset.id,
            start: s.start + offset.time,
            end: s.end + offset.time,
            text: s.text,
        })
        .collect()
}

fn shift_words(words: Vec<Word>, offset: Offset) -> Vec<Word> {
    words
        .into_iter()
        .map(|w| Word {
            id: w.id + offset.id,
            start: w.start + offset.time,
            end: w.end + offset.time,
            word: w.word,
        })
        .collect()
}
