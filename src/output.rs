//! Naming and writing the files a job produces.

use crate::config::{Granularity, JobConfig};
use crate::error::Result;
use crate::stitch::MergedTimeline;
use crate::subtitle::{render_segments, render_words, SubtitleFormat, SubtitlePair};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A file to be written: where, and what goes in it.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputFile {
    pub path: PathBuf,
    pub content: String,
}

/// `{dir}/{prefix}-{label}.{ext}`
pub fn subtitle_path(
    dir: &Path,
    prefix: &str,
    granularity: Granularity,
    format: SubtitleFormat,
) -> PathBuf {
    dir.join(format!(
        "{}-{}.{}",
        prefix,
        granularity.label(),
        format.extension()
    ))
}

/// `{dir}/{prefix}.txt`
pub fn text_path(dir: &Path, prefix: &str) -> PathBuf {
    dir.join(format!("{}.txt", prefix))
}

/// Plain transcript: the source on its own line, a blank line, then the text.
pub fn render_text(source: &str, text: &str) -> String {
    format!("{}\n\n{}", source, text)
}

/// Render everything `job` asks for, without touching the disk.
pub fn plan_outputs(job: &JobConfig, timeline: &MergedTimeline) -> Vec<OutputFile> {
    let mut files = Vec::new();

    if job.format.wants_subtitles() {
        let pairs: Vec<SubtitlePair> = [
            render_segments(&timeline.segments, job.mode),
            render_words(&timeline.words, job.mode),
        ]
        .into_iter()
        .flatten()
        .collect();

        let formats = [
            (SubtitleFormat::Srt, job.format.wants_srt()),
            (SubtitleFormat::Vtt, job.format.wants_vtt()),
        ];

        for (format, wanted) in formats {
            if !wanted {
                continue;
            }
            for pair in &pairs {
                let rendered = pair.get(format);
                files.push(OutputFile {
                    path: subtitle_path(&job.output_dir, &job.prefix, rendered.granularity, format),
                    content: rendered.content.clone(),
                });
            }
        }
    }

    if job.format.wants_txt() {
        files.push(OutputFile {
            path: text_path(&job.output_dir, &job.prefix),
            content: render_text(&job.source.to_string(), &timeline.text),
        });
    }

    files
}

/// Create the output directory and write every file.
pub async fn write_outputs(output_dir: &Path, files: &[OutputFile]) -> Result<Vec<PathBuf>> {
    info!("Creating output directory '{}'", output_dir.display());
    tokio::fs::create_dir_all(output_dir).await?;

    let mut written = Vec::with_capacity(files.len());
    for file in files {
        debug!("Writing {} bytes to {}", file.content.len(), file.path.display());
        tokio::fs::write(&file.path, &file.content).await?;
        written.push(file.path.clone());
    }

    Ok(written)
}
