use crate::config::{Config, Granularity, Mode, DEFAULT_API_BASE, DEFAULT_MAX_PART_BYTES};
use crate::error::{Result, SubgenError};
use crate::media::Part;
use crate::transcribe::{Segment, TranscriptFragment, Transcriber, Word};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part as FormPart};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, warn};

/// Maximum attempts per part.
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (milliseconds).
const BASE_DELAY_MS: u64 = 1000;

/// Model sent with every transcription request.
const WHISPER_MODEL: &str = "whisper-1";

/// OpenAI Whisper API client.
pub struct WhisperClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    language: Option<String>,
    max_retries: u32,
    base_delay: Duration,
    max_file_size: u64,
}

impl WhisperClient {
    /// Create a new Whisper client with the given API key.
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_API_BASE.to_string(),
            language: None,
            max_file_size: DEFAULT_MAX_PART_BYTES,
            max_retries: MAX_RETRIES,
            base_delay: Duration::from_millis(BASE_DELAY_MS),
        }
    }

    /// Build a client from loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.openai_api_key.clone().ok_or_else(|| {
            SubgenError::Config(
                "OpenAI API key not set. Set OPENAI_API_KEY environment variable.".to_string(),
            )
        })?;

        let mut client = Self::new(api_key)
            .with_base_url(config.api_base.clone())
            .with_max_file_size(config.max_part_bytes);
        if let Some(ref language) = config.language {
            client = client.with_language(language.clone());
        }
        Ok(client)
    }

    /// Point the client at a different API root (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Largest part this client will upload. Keep it in step with the chunker's ceiling.
    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    /// Set the source language (ISO 639-1 code).
    pub fn with_language(mut self, language: String) -> Self {
        self.language = Some(language);
        self
    }

    /// Override the retry policy.
    pub fn with_retries(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries.max(1);
        self.base_delay = base_delay;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/audio/transcriptions", self.base_url)
    }

    /// Build the multipart form for the API request.
    async fn build_form(&self, path: &Path) -> Result<Form> {
        let file_bytes = fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("video.mp4")
            .to_string();

        let mime_type = match path.extension().and_then(|e| e.to_str()) {
            Some("mp4") => "video/mp4",
            Some("webm") => "video/webm",
            Some("mp3") => "audio/mpeg",
            Some("m4a") => "audio/mp4",
            Some("wav") => "audio/wav",
            Some("ogg") => "audio/ogg",
            _ => "application/octet-stream",
        };

        let file_part = FormPart::bytes(file_bytes)
            .file_name(file_name)
            .mime_str(mime_type)?;

        let mut form = Form::new()
            .part("file", file_part)
            .text("model", WHISPER_MODEL)
            .text("response_format", "verbose_json");

        // The service returns both timings together, so every mode asks for both.
        for granularity in [Granularity::Segment, Granularity::Word] {
            form = form.text("timestamp_granularities[]", granularity.as_api_str());
        }

        if let Some(ref lang) = self.language {
            form = form.text("language", lang.clone());
        }

        Ok(form)
    }

    /// Make one API request. The flag says whether a retry might help.
    async fn call_api(
        &self,
        form: Form,
    ) -> std::result::Result<WhisperResponse, (SubgenError, bool)> {
        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| (SubgenError::Http(e), true))?;

        let status = response.status();
        debug!("Whisper API response status: {}", status);

        if status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| (SubgenError::Http(e), true))?;
            debug!("Whisper API response: {}", truncate(&body, 500));
            return serde_json::from_str::<WhisperResponse>(&body)
                .map_err(|e| (SubgenError::Json(e), false));
        }

        let error_body = response.text().await.unwrap_or_default();
        let retryable = status.is_server_error() || status.as_u16() == 429;

        if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(&error_body) {
            return Err((
                SubgenError::Api(format!(
                    "Whisper API error ({}): {} ({})",
                    status, api_error.error.message, api_error.error.r#type
                )),
                retryable,
            ));
        }

        Err((
            SubgenError::Api(format!("Whisper API error ({}): {}", status, error_body)),
            retryable,
        ))
    }

    /// Transcribe with retry logic - rebuilds form on each attempt.
    async fn transcribe_with_retry(&self, part: &Part) -> Result<WhisperResponse> {
        let mut last_error = None;

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                debug!("Retry attempt {} after {:?}", attempt, delay);
                tokio::time::sleep(delay).await;
            }

            let form = self.build_form(&part.path).await?;

            match self.call_api(form).await {
                Ok(response) => return Ok(response),
                Err((e, retryable)) => {
                    if !retryable {
                        return Err(e);
                    }
                    warn!("Part {} attempt {} failed: {}", part.index, attempt + 1, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| SubgenError::Api("Unknown error".to_string())))
    }
}

/// Convert a Whisper response into a fragment on the part's own timeline.
fn parse_response(response: WhisperResponse, part_index: usize) -> TranscriptFragment {
    let segments = response
        .segments
        .into_iter()
        .enumerate()
        .map(|(position, seg)| Segment {
            id: seg.id.unwrap_or(position),
            start: seg.start,
            end: seg.end.max(seg.start),
            text: seg.text.trim().to_string(),
        })
        .collect();

    let words = response
        .words
        .into_iter()
        .enumerate()
        .map(|(position, w)| Word {
            id: position,
            start: w.start,
            end: w.end.max(w.start),
            word: w.word.trim().to_string(),
        })
        .collect();

    TranscriptFragment {
        part_index,
        segments,
        words,
        text: response.text.trim().to_string(),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[async_trait]
impl Transcriber for WhisperClient {
    async fn transcribe(&self, part: &Part, mode: Mode) -> Result<TranscriptFragment> {
        debug!(
            "Transcribing part {} with Whisper ({} wanted): {:?}",
            part.index, mode, part.path
        );

        let metadata = fs::metadata(&part.path).await?;
        if metadata.len() > self.max_file_size() {
            return Err(SubgenError::Transcription(format!(
                "File too large for Whisper API: {} bytes (max {} bytes)",
                metadata.len(),
                self.max_file_size()
            )));
        }

        let response = self.transcribe_with_retry(part).await?;
        let fragment = parse_response(response, part.index);

        debug!(
            "Whisper returned {} segments and {} words for part {}",
            fragment.segments.len(),
            fragment.words.len(),
            part.index
        );

        Ok(fragment)
    }

    fn name(&self) -> &'static str {
        "OpenAI Whisper"
    }

    fn max_file_size(&self) -> u64 {
        self.max_file_size
    }
}

// API response types

#[derive(Debug, Deserialize)]
struct WhisperResponse {
    #[serde(default)]
    text: String,
    #[serde(default)]
    segments: Vec<WhisperSegment>,
    #[serde(default)]
    words: Vec<WhisperWord>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    #[serde(default)]
    id: Option<usize>,
    start: f64,
    end: f64,
    text: String,
}

#[derive(Debug, Deserialize)]
struct WhisperWord {
    word: String,
    start: f64,
    end: f64,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
    #[serde(default)]
    r#type: String,
}
