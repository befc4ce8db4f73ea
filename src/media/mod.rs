pub mod chunk;
pub mod fetch;
pub mod probe;

pub use chunk::{chunk, part_count, plan_parts, ChunkConfig, PartWindow};
pub use fetch::{fetch_remote_media, fetcher_for, HttpFetcher, MediaFetcher, YtDlpFetcher};
pub use probe::{check_ffmpeg, check_ffprobe, encode_audio_window, encode_window, probe_duration};

use crate::error::{Result, SubgenError};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// A media file on disk, read-only to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub path: PathBuf,
    pub size_bytes: u64,
}

impl MediaFile {
    /// Stat `path` and wrap it.
    pub async fn open(path: &Path) -> Result<Self> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|_| SubgenError::FileNotFound(path.display().to_string()))?;

        if !metadata.is_file() {
            return Err(SubgenError::FileNotFound(path.display().to_string()));
        }

        Ok(Self {
            path: path.to_path_buf(),
            size_bytes: metadata.len(),
        })
    }
}

/// One size-bounded piece of a media file, ready for transcription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// 1-based position in split order.
    pub index: usize,
    pub path: PathBuf,
    pub size_bytes: u64,
}

impl Part {
    /// Build a part from a bare path, recovering the index from its file name.
    pub fn from_path(path: impl Into<PathBuf>, size_bytes: u64) -> Self {
        let path = path.into();
        Self {
            index: part_index_from_path(&path),
            path,
            size_bytes,
        }
    }
}

/// File name for part `index` of a split, e.g. `talk-part-3.mp4`.
pub fn part_file_name(prefix: &str, index: usize, extension: &str) -> String {
    format!("{}-part-{}.{}", prefix, index, extension)
}

/// Recover the part index from the trailing `-N` token of the file stem.
///
/// Files without such a token are un-chunked originals and map to 1.
pub fn part_index_from_path(path: &Path) -> usize {
    static TRAILING_INDEX: OnceLock<Regex> = OnceLock::new();
    let re = TRAILING_INDEX.get_or_init(|| Regex::new(r"-(\d+)$").expect("valid regex"));

    path.file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(|stem| re.captures(stem))
        .and_then(|caps| caps[1].parse::<usize>().ok())
        .filter(|index| *index > 0)
        .unwrap_or(1)
}
