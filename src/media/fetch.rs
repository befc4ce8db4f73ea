use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;

use async_trait::async_trait;
use futures::StreamExt;
use regex::Regex;
use reqwest::Url;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{Result, SubgenError};
use crate::progress::{ProgressEvent, ProgressReporter};

/// Downloads remote media into a local directory.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Fetch `url` into `output_dir`, returning the local file path.
    async fn fetch(&self, url: &str, output_dir: &Path, progress: &ProgressReporter)
        -> Result<PathBuf>;
    fn name(&self) -> &'static str;
}

/// Plain HTTP(S) download of a direct media link.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaFetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        output_dir: &Path,
        progress: &ProgressReporter,
    ) -> Result<PathBuf> {
        info!("Downloading {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SubgenError::Acquisition(format!("Request to {url} failed: {e}")))?;

        if !response.status().is_success() {
            return Err(SubgenError::Acquisition(format!(
                "HTTP {}: {}",
                response.status(),
                url
            )));
        }

        let total = response.content_length();
        tokio::fs::create_dir_all(output_dir).await?;
        let output_path = output_dir.join(file_name_from_url(url));

        let mut file = tokio::fs::File::create(&output_path).await?;
        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk
                .map_err(|e| SubgenError::Acquisition(format!("Download of {url} failed: {e}")))?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            progress.emit(ProgressEvent::Download { downloaded, total });
        }
        file.flush().await?;

        if downloaded == 0 {
            return Err(SubgenError::Acquisition(format!(
                "Download of {url} returned no data"
            )));
        }

        info!("Downloaded {} bytes to {}", downloaded, output_path.display());
        Ok(output_path)
    }

    fn name(&self) -> &'static str {
        "HTTP"
    }
}

/// Video-platform download through the `yt-dlp` executable.
pub struct YtDlpFetcher {
    binary: String,
}

impl YtDlpFetcher {
    pub fn new() -> Self {
        Self {
            binary: "yt-dlp".to_string(),
        }
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }
}

impl Default for YtDlpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn fetch(
        &self,
        url: &str,
        output_dir: &Path,
        progress: &ProgressReporter,
    ) -> Result<PathBuf> {
        info!("Downloading {} with {}", url, self.binary);
        tokio::fs::create_dir_all(output_dir).await?;

        let template = output_dir.join("video.%(ext)s");
        let mut child = Command::new(&self.binary)
            .args(["-f", "worst[ext=mp4]/worst", "--newline", "--no-playlist", "-o"])
            .arg(&template)
            .arg(url)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                SubgenError::Acquisition(format!("Failed to spawn {}: {e}", self.binary))
            })?;

        // stderr is read concurrently; a full pipe would stall the child.
        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let _ = stderr.read_to_end(&mut buf).await;
                String::from_utf8_lossy(&buf).into_owned()
            })
        });

        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines.next_line().await? {
                if let Some((downloaded, total)) = parse_ytdlp_progress(&line) {
                    progress.emit(ProgressEvent::Download {
                        downloaded,
                        total: Some(total),
                    });
                }
            }
        }

        let status = child.wait().await?;
        let stderr = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        if !status.success() {
            let reason = stderr
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .unwrap_or("no error output")
                .trim();
            return Err(SubgenError::Acquisition(format!(
                "{} failed for {} ({}): {}",
                self.binary, url, status, reason
            )));
        }
        if !stderr.is_empty() {
            debug!("{} wrote {} bytes to stderr", self.binary, stderr.len());
        }

        find_downloaded_file(output_dir).await
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}

/// Pick the fetcher for `url`: video platforms go through yt-dlp, everything else is plain HTTP.
pub fn fetcher_for(url: &str) -> Box<dyn MediaFetcher> {
    if is_video_platform_url(url) {
        Box::new(YtDlpFetcher::new())
    } else {
        Box::new(HttpFetcher::new())
    }
}

/// Download `url` into `output_dir` using the appropriate fetcher.
pub async fn fetch_remote_media(
    url: &str,
    output_dir: &Path,
    progress: &ProgressReporter,
) -> Result<PathBuf> {
    let fetcher = fetcher_for(url);
    debug!("Using {} fetcher for {}", fetcher.name(), url);
    fetcher.fetch(url, output_dir, progress).await
}

fn is_video_platform_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host
        .strip_prefix("www.")
        .or_else(|| host.strip_prefix("m."))
        .unwrap_or(host);
    matches!(
        host,
        "youtube.com" | "youtu.be" | "music.youtube.com" | "youtube-nocookie.com"
    )
}

fn file_name_from_url(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()?
                .next_back()
                .filter(|name| !name.is_empty() && name.contains('.'))
                .map(str::to_string)
        })
        .unwrap_or_else(|| "video.mp4".to_string())
}

/// Parse a `[download]  42.0% of ~ 10.00MiB ...` line into (downloaded, total) bytes.
fn parse_ytdlp_progress(line: &str) -> Option<(u64, u64)> {
    static PROGRESS: OnceLock<Regex> = OnceLock::new();
    let re = PROGRESS.get_or_init(|| {
        Regex::new(r"^\[download\]\s+([\d.]+)%\s+of\s+~?\s*([\d.]+)\s*([KMG]?i?B)")
            .expect("valid regex")
    });

    let caps = re.captures(line.trim())?;
    let percent: f64 = caps[1].parse().ok()?;
    let amount: f64 = caps[2].parse().ok()?;
    let multiplier = match &caps[3] {
        "B" => 1.0,
        "KiB" => 1024.0,
        "MiB" => 1024.0 * 1024.0,
        "GiB" => 1024.0 * 1024.0 * 1024.0,
        "KB" => 1_000.0,
        "MB" => 1_000_000.0,
        "GB" => 1_000_000_000.0,
        _ => return None,
    };

    let total = (amount * multiplier) as u64;
    let downloaded = ((percent / 100.0).clamp(0.0, 1.0) * total as f64) as u64;
    Some((downloaded, total))
}

async fn find_downloaded_file(output_dir: &Path) -> Result<PathBuf> {
    let mut entries = tokio::fs::read_dir(output_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_video = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("video.") && !n.ends_with(".part"));
        if is_video {
            return Ok(path);
        }
    }
    Err(SubgenError::Acquisition(format!(
        "yt-dlp finished but no video was found in {}",
        output_dir.display()
    )))
}
