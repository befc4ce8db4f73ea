use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::{Config, DEFAULT_MAX_PART_BYTES, DEFAULT_TARGET_PART_BYTES};
use crate::error::{Result, SubgenError};
use crate::progress::{ProgressEvent, ProgressReporter};

use super::probe::{
    check_ffmpeg, check_ffprobe, encode_audio_window, encode_window, probe_duration,
};
use super::{part_file_name, MediaFile, Part};

/// Configuration for splitting media into service-sized parts.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Hard ceiling per part in bytes (Whisper API: 25 MiB).
    pub max_part_bytes: u64,

    /// Size each part is planned for, strictly below the ceiling to absorb encoder overshoot.
    pub target_part_bytes: u64,

    /// Bitrate for the audio-only re-encode of a part that came out too large.
    pub fallback_audio_bitrate: String,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self::whisper()
    }
}

impl ChunkConfig {
    /// Limits of the OpenAI transcription endpoint.
    pub fn whisper() -> Self {
        Self {
            max_part_bytes: DEFAULT_MAX_PART_BYTES,
            target_part_bytes: DEFAULT_TARGET_PART_BYTES,
            fallback_audio_bitrate: "48k".to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            max_part_bytes: config.max_part_bytes,
            target_part_bytes: config.target_part_bytes,
            ..Self::whisper()
        }
    }
}

/// A time window of the source that becomes one part.
#[derive(Debug, Clone, PartialEq)]
pub struct PartWindow {
    /// 1-based.
    pub index: usize,
    pub start: f64,
    pub duration: f64,
}

/// Number of parts needed for `size_bytes` at `target_part_bytes` each.
pub fn part_count(size_bytes: u64, target_part_bytes: u64) -> usize {
    if target_part_bytes == 0 {
        return 1;
    }
    size_bytes.div_ceil(target_part_bytes).max(1) as usize
}

/// Divide `total_duration` into equal windows, one per planned part.
pub fn plan_parts(size_bytes: u64, total_duration: f64, config: &ChunkConfig) -> Vec<PartWindow> {
    let count = part_count(size_bytes, config.target_part_bytes);
    let duration = total_duration / count as f64;

    (0..count)
        .map(|i| PartWindow {
            index: i + 1,
            start: i as f64 * duration,
            duration,
        })
        .collect()
}

/// Split `media` into parts no larger than `config.max_part_bytes`.
///
/// Media already within the ceiling comes back as a single part pointing at the
/// original file. Otherwise each window is re-encoded into `output_dir`, which is
/// created if needed and left for the caller to remove.
pub async fn chunk(
    media: &MediaFile,
    config: &ChunkConfig,
    output_dir: &Path,
    prefix: &str,
    progress: &ProgressReporter,
) -> Result<Vec<Part>> {
    if media.size_bytes <= config.max_part_bytes {
        debug!(
            "{} is {} bytes, within the {} byte ceiling; no split needed",
            media.path.display(),
            media.size_bytes,
            config.max_part_bytes
        );
        progress.emit(ProgressEvent::PartsPlanned { count: 1 });
        progress.emit(ProgressEvent::PartEncoded { index: 1 });
        return Ok(vec![Part {
            index: 1,
            path: media.path.clone(),
            size_bytes: media.size_bytes,
        }]);
    }

    check_ffmpeg().await?;
    check_ffprobe().await?;

    let total_duration = probe_duration(&media.path).await?;
    let windows = plan_parts(media.size_bytes, total_duration, config);

    tokio::fs::create_dir_all(output_dir).await.map_err(|e| {
        SubgenError::ChunkEncode(format!(
            "Failed to create output directory {}: {e}",
            output_dir.display()
        ))
    })?;

    info!(
        "Splitting {} ({} bytes, {:.1}s) into {} parts of {:.1}s",
        media.path.display(),
        media.size_bytes,
        total_duration,
        windows.len(),
        total_duration / windows.len() as f64
    );
    progress.emit(ProgressEvent::PartsPlanned {
        count: windows.len(),
    });

    let mut parts = Vec::with_capacity(windows.len());

    for window in &windows {
        if let Some(part) = encode_part(media, window, config, output_dir, prefix).await? {
            parts.push(part);
        }
        progress.emit(ProgressEvent::PartEncoded {
            index: window.index,
        });
    }

    info!("Created {} of {} planned parts", parts.len(), windows.len());
    Ok(parts)
}

/// Encode one window, falling back to audio-only when the video encode overshoots.
///
/// Returns `None` when even the fallback exceeds the ceiling.
async fn encode_part(
    media: &MediaFile,
    window: &PartWindow,
    config: &ChunkConfig,
    output_dir: &Path,
    prefix: &str,
) -> Result<Option<Part>> {
    let video_path = output_dir.join(part_file_name(prefix, window.index, "mp4"));

    debug!(
        "Encoding part {}: {:.3}s +{:.3}s",
        window.index, window.start, window.duration
    );
    encode_window(&media.path, &video_path, window.start, window.duration).await?;

    let size = tokio::fs::metadata(&video_path).await?.len();
    if size <= config.max_part_bytes {
        return Ok(Some(Part {
            index: window.index,
            path: video_path,
            size_bytes: size,
        }));
    }

    warn!(
        "Part {} is {} bytes, above the {} byte ceiling; re-encoding audio only",
        window.index, size, config.max_part_bytes
    );
    tokio::fs::remove_file(&video_path).await?;

    let audio_path = output_dir.join(part_file_name(prefix, window.index, "mp3"));
    encode_audio_window(
        &media.path,
        &audio_path,
        window.start,
        window.duration,
        &config.fallback_audio_bitrate,
    )
    .await?;

    let size = tokio::fs::metadata(&audio_path).await?.len();
    if size <= config.max_part_bytes {
        return Ok(Some(Part {
            index: window.index,
            path: audio_path,
            size_bytes: size,
        }));
    }

    warn!(
        "Dropping part {}: still {} bytes after audio-only re-encode",
        window.index, size
    );
    tokio::fs::remove_file(&audio_path).await?;
    Ok(None)
}
