use crate::error::{Result, SubgenError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Default OpenAI API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Hard ceiling imposed by the Whisper API (25 MiB).
pub const DEFAULT_MAX_PART_BYTES: u64 = 25 * 1024 * 1024;

/// Encoding target per part, leaving headroom below the ceiling.
pub const DEFAULT_TARGET_PART_BYTES: u64 = 24 * 1024 * 1024;

/// Which files a job writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Srt,
    Vtt,
    Txt,
    #[default]
    All,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Srt => write!(f, "srt"),
            OutputFormat::Vtt => write!(f, "vtt"),
            OutputFormat::Txt => write!(f, "txt"),
            OutputFormat::All => write!(f, "all"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "srt" => Ok(OutputFormat::Srt),
            "vtt" => Ok(OutputFormat::Vtt),
            "txt" | "text" => Ok(OutputFormat::Txt),
            "all" => Ok(OutputFormat::All),
            _ => Err(format!(
                "Unknown format: {}. Use 'srt', 'vtt', 'txt' or 'all'",
                s
            )),
        }
    }
}

impl OutputFormat {
    pub fn wants_srt(&self) -> bool {
        matches!(self, OutputFormat::Srt | OutputFormat::All)
    }

    pub fn wants_vtt(&self) -> bool {
        matches!(self, OutputFormat::Vtt | OutputFormat::All)
    }

    pub fn wants_txt(&self) -> bool {
        matches!(self, OutputFormat::Txt | OutputFormat::All)
    }

    /// Whether any subtitle renderer has to run for this format.
    pub fn wants_subtitles(&self) -> bool {
        self.wants_srt() || self.wants_vtt()
    }
}

/// A single kind of timing returned by the transcription service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Segment,
    Word,
}

impl Granularity {
    /// Value sent as `timestamp_granularities[]`.
    pub fn as_api_str(&self) -> &'static str {
        match self {
            Granularity::Segment => "segment",
            Granularity::Word => "word",
        }
    }

    /// Label used in output file names.
    pub fn label(&self) -> &'static str {
        match self {
            Granularity::Segment => "segments",
            Granularity::Word => "words",
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_api_str())
    }
}

/// Which granularities a job wants rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Segments,
    Words,
    #[default]
    Both,
}

impl Mode {
    pub fn includes(&self, granularity: Granularity) -> bool {
        match self {
            Mode::Segments => granularity == Granularity::Segment,
            Mode::Words => granularity == Granularity::Word,
            Mode::Both => true,
        }
    }

    pub fn granularities(&self) -> Vec<Granularity> {
        [Granularity::Segment, Granularity::Word]
            .into_iter()
            .filter(|g| self.includes(*g))
            .collect()
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Segments => write!(f, "segments"),
            Mode::Words => write!(f, "words"),
            Mode::Both => write!(f, "both"),
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "segment" | "segments" | "phrases" => Ok(Mode::Segments),
            "word" | "words" => Ok(Mode::Words),
            "both" | "all" => Ok(Mode::Both),
            _ => Err(format!(
                "Unknown mode: {}. Use 'segments', 'words' or 'both'",
                s
            )),
        }
    }
}

/// Where the media for a job comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Url(String),
    Path(PathBuf),
}

impl Source {
    /// Build a source from the two mutually exclusive inputs.
    pub fn from_options(url: Option<String>, video: Option<PathBuf>) -> Result<Self> {
        match (url, video) {
            (Some(url), None) => Ok(Source::Url(url)),
            (None, Some(path)) => Ok(Source::Path(path)),
            (Some(_), Some(_)) => Err(SubgenError::Config(
                "Both a URL and a video path were given; only one source is supported".to_string(),
            )),
            (None, None) => Err(SubgenError::Config(
                "No video source given. Pass --url or --video".to_string(),
            )),
        }
    }

    /// File name prefix used when the caller does not supply one.
    pub fn default_prefix(&self) -> String {
        match self {
            Source::Path(path) => path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "subtitles".to_string()),
            Source::Url(_) => "subtitles".to_string(),
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Url(url) => write!(f, "{}", url),
            Source::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Immutable description of one pipeline run.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub source: Source,
    pub output_dir: PathBuf,
    pub format: OutputFormat,
    pub mode: Mode,
    pub prefix: String,
}

impl JobConfig {
    pub fn new(source: Source, output_dir: impl Into<PathBuf>) -> Self {
        let prefix = source.default_prefix();
        Self {
            source,
            output_dir: output_dir.into(),
            format: OutputFormat::default(),
            mode: Mode::default(),
            prefix,
        }
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Reject job settings that can never produce output.
    pub fn validate(&self) -> Result<()> {
        if self.prefix.trim().is_empty() {
            return Err(SubgenError::Config("Prefix must not be empty".to_string()));
        }
        if self.prefix.contains(['/', '\\']) {
            return Err(SubgenError::Config(format!(
                "Prefix must not contain path separators: {}",
                self.prefix
            )));
        }
        if let Source::Url(url) = &self.source {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(SubgenError::Config(format!(
                    "Unsupported URL scheme: {}",
                    url
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub api_base: String,
    pub language: Option<String>,
    pub concurrency: usize,
    pub max_part_bytes: u64,
    pub target_part_bytes: u64,
    pub temp_root: Option<PathBuf>,
    pub error_log: PathBuf,
    pub default_output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            language: None,
            concurrency: 4,
            max_part_bytes: DEFAULT_MAX_PART_BYTES,
            target_part_bytes: DEFAULT_TARGET_PART_BYTES,
            temp_root: None,
            error_log: PathBuf::from("errors.txt"),
            default_output_dir: PathBuf::from("subtitles"),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        // Load from config file if it exists
        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                config = Self::from_file(&config_path).unwrap_or_else(|e| {
                    warn!("Ignoring config file {}: {}", config_path.display(), e);
                    Self::default()
                });
            }
        }

        config.apply_env();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str::<Config>(&contents)?)
    }

    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.openai_api_key = Some(key);
        }
        if let Ok(base) = std::env::var("SUBGEN_API_BASE") {
            self.api_base = base;
        }
        if let Ok(concurrency) = std::env::var("SUBGEN_CONCURRENCY") {
            if let Ok(c) = concurrency.parse() {
                self.concurrency = c;
            }
        }
        if let Ok(max) = std::env::var("SUBGEN_MAX_PART_BYTES") {
            if let Ok(m) = max.parse() {
                self.max_part_bytes = m;
            }
        }
        if let Ok(target) = std::env::var("SUBGEN_TARGET_PART_BYTES") {
            if let Ok(t) = target.parse() {
                self.target_part_bytes = t;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.openai_api_key.as_deref().map_or(true, str::is_empty) {
            return Err(SubgenError::Config(
                "OPENAI_API_KEY not set. Pass --key or export OPENAI_API_KEY=sk-...".to_string(),
            ));
        }

        if self.concurrency == 0 {
            return Err(SubgenError::Config(
                "Concurrency must be greater than 0".to_string(),
            ));
        }

        if self.target_part_bytes == 0 || self.target_part_bytes >= self.max_part_bytes {
            return Err(SubgenError::Config(format!(
                "Target part size ({} bytes) must be positive and below the ceiling ({} bytes)",
                self.target_part_bytes, self.max_part_bytes
            )));
        }

        Ok(())
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("subgen").join("config.toml"))
    }
}
