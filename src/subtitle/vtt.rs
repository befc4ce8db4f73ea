// WebVTT subtitle format
use super::time::format_timestamp;
use super::{Cue, SubtitleFormat, SubtitleFormatter};

/// Writes the `WEBVTT` header and uses the cue id unchanged as the identifier.
pub struct VttFormatter;

impl SubtitleFormatter for VttFormatter {
    fn format(&self, cues: &[Cue]) -> String {
        let mut output = String::from("WEBVTT\n\n");

        for cue in cues {
            output.push_str(&format!(
                "{}\n{} --> {}\n{}\n\n",
                cue.id,
                format_timestamp(cue.start, '.'),
                format_timestamp(cue.end, '.'),
                cue.text
            ));
        }

        output
    }

    fn kind(&self) -> SubtitleFormat {
        SubtitleFormat::Vtt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vtt_format() {
        let cues = vec![Cue {
            id: 4,
            start: 1.5,
            end: 4.0,
            text: "Hello, world!".to_string(),
        }];

        let output = VttFormatter.format(&cues);

        assert_eq!(
            output,
            "WEBVTT\n\n4\n00:00:01.500 --> 00:00:04.000\nHello, world!\n\n"
        );
    }

    #[test]
    fn test_vtt_empty_has_header() {
        assert_eq!(VttFormatter.format(&[]), "WEBVTT\n\n");
        assert_eq!(VttFormatter.extension(), "vtt");
    }
}
