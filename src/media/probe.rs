use std::path::Path;

use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, SubgenError};

/// Check if FFmpeg is installed and accessible.
pub async fn check_ffmpeg() -> Result<()> {
    let output = Command::new("ffmpeg")
        .arg("-version")
        .output()
        .await
        .map_err(|e| {
            SubgenError::ChunkEncode(format!(
                "FFmpeg not found. Please install FFmpeg and ensure it's in your PATH. Error: {e}"
            ))
        })?;

    if !output.status.success() {
        return Err(SubgenError::ChunkEncode("FFmpeg check failed".to_string()));
    }

    debug!("FFmpeg is available");
    Ok(())
}

/// Check if FFprobe is installed and accessible.
pub async fn check_ffprobe() -> Result<()> {
    let output = Command::new("ffprobe")
        .arg("-version")
        .output()
        .await
        .map_err(|e| {
            SubgenError::ChunkEncode(format!(
                "FFprobe not found. Please install FFmpeg (includes FFprobe). Error: {e}"
            ))
        })?;

    if !output.status.success() {
        return Err(SubgenError::ChunkEncode("FFprobe check failed".to_string()));
    }

    debug!("FFprobe is available");
    Ok(())
}

/// Get media duration in seconds using FFprobe.
pub async fn probe_duration(input: &Path) -> Result<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(input)
        .output()
        .await
        .map_err(|e| SubgenError::ChunkEncode(format!("Failed to run FFprobe: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SubgenError::ChunkEncode(format!("FFprobe failed: {stderr}")));
    }

    let duration_str = String::from_utf8_lossy(&output.stdout);
    let duration_secs: f64 = duration_str.trim().parse().map_err(|e| {
        SubgenError::ChunkEncode(format!(
            "Failed to parse duration '{}': {e}",
            duration_str.trim()
        ))
    })?;

    if !duration_secs.is_finite() || duration_secs <= 0.0 {
        return Err(SubgenError::ChunkEncode(format!(
            "Media reports no usable duration: {duration_secs}"
        )));
    }

    Ok(duration_secs)
}

/// Re-encode `[start, start + duration)` of `input` as a half-resolution H.264 video.
pub async fn encode_window(input: &Path, output: &Path, start: f64, duration: f64) -> Result<()> {
    let start_secs = format!("{:.3}", start);
    let duration_secs = format!("{:.3}", duration);

    debug!(
        "Encoding window: start={}, duration={} -> {}",
        start_secs,
        duration_secs,
        output.display()
    );

    let output_result = Command::new("ffmpeg")
        .args(["-y", "-v", "error", "-ss"])
        .arg(&start_secs)
        .arg("-t")
        .arg(&duration_secs)
        .arg("-i")
        .arg(input)
        .args([
            "-c:v",
            "libx264",
            "-preset",
            "veryfast",
            "-vf",
            "scale=trunc(iw/4)*2:trunc(ih/4)*2",
            "-c:a",
            "aac",
        ])
        .arg(output)
        .output()
        .await
        .map_err(|e| SubgenError::ChunkEncode(format!("Failed to run FFmpeg: {e}")))?;

    check_encode(output_result, output)
}

/// Re-encode a window as audio-only MP3, the smallest form the service still accepts.
pub async fn encode_audio_window(
    input: &Path,
    output: &Path,
    start: f64,
    duration: f64,
    bitrate: &str,
) -> Result<()> {
    let output_result = Command::new("ffmpeg")
        .args(["-y", "-v", "error", "-ss"])
        .arg(format!("{:.3}", start))
        .arg("-t")
        .arg(format!("{:.3}", duration))
        .arg("-i")
        .arg(input)
        .args(["-vn", "-ac", "1", "-c:a", "libmp3lame", "-b:a", bitrate])
        .arg(output)
        .output()
        .await
        .map_err(|e| SubgenError::ChunkEncode(format!("Failed to run FFmpeg: {e}")))?;

    check_encode(output_result, output)
}

fn check_encode(result: std::process::Output, output: &Path) -> Result<()> {
    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        return Err(SubgenError::ChunkEncode(format!(
            "FFmpeg failed for {}: {}",
            output.display(),
            stderr.trim()
        )));
    }

    if !output.exists() {
        return Err(SubgenError::ChunkEncode(format!(
            "Output file was not created: {}",
            output.display()
        )));
    }

    Ok(())
}
