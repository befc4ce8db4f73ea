// SRT subtitle format
use super::time::format_timestamp;
use super::{Cue, SubtitleFormat, SubtitleFormatter};

/// Numbers cues from 1 (`id + 1`) and uses `,` before the milliseconds.
pub struct SrtFormatter;

impl SubtitleFormatter for SrtFormatter {
    fn format(&self, cues: &[Cue]) -> String {
        let mut output = String::new();

        for cue in cues {
            output.push_str(&format!(
                "{}\n{} --> {}\n{}\n\n",
                cue.id + 1,
                format_timestamp(cue.start, ','),
                format_timestamp(cue.end, ','),
                cue.text
            ));
        }

        output
    }

    fn kind(&self) -> SubtitleFormat {
        SubtitleFormat::Srt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_srt_format() {
        let cues = vec![
            Cue {
                id: 0,
                start: 1.5,
                end: 4.0,
                text: "Hello, world!".to_string(),
            },
            Cue {
                id: 1,
                start: 4.5,
                end: 7.0,
                text: "This is a test.".to_string(),
            },
        ];

        let output = SrtFormatter.format(&cues);

        assert_eq!(
            output,
            "1\n00:00:01,500 --> 00:00:04,000\nHello, world!\n\n\
             2\n00:00:04,500 --> 00:00:07,000\nThis is a test.\n\n"
        );
    }

    #[test]
    fn test_srt_empty() {
        assert_eq!(SrtFormatter.format(&[]), "");
        assert_eq!(SrtFormatter.extension(), "srt");
    }
}
