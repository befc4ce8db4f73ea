use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use subgen::batch::{load_batch, run_batch};
use subgen::config::{Config, JobConfig, Mode, OutputFormat, Source};
use subgen::progress::{render_progress, ProgressReporter};
use subgen::{format_elapsed, print_summary, run_job};
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "subgen")]
#[command(version, about = "Subtitles for long videos via OpenAI Whisper")]
#[command(
    long_about = "Split a video into parts the Whisper API accepts, transcribe them \
                  concurrently and stitch the results into SRT, VTT and plain text files."
)]
struct Cli {
    /// OpenAI API key (overrides OPENAI_API_KEY)
    #[arg(short, long)]
    key: Option<String>,

    /// Local video file to subtitle
    #[arg(short, long, conflicts_with_all = ["url", "batch"])]
    video: Option<PathBuf>,

    /// Remote video URL (direct link or YouTube)
    #[arg(short, long, conflicts_with = "batch")]
    url: Option<String>,

    /// Output directory (defaults to the configured one, usually 'subtitles')
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format: srt, vtt, txt, all
    #[arg(short, long, default_value = "all")]
    format: String,

    /// Subtitle mode: segments, words, both
    #[arg(short, long, default_value = "both")]
    mode: String,

    /// File name prefix for the outputs
    #[arg(short, long)]
    prefix: Option<String>,

    /// TOML or JSON file listing jobs to run one after another
    #[arg(short, long)]
    batch: Option<PathBuf>,

    /// Number of concurrent API requests
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Source language code (e.g., en, es)
    #[arg(short, long)]
    language: Option<String>,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    if std::env::var_os("RUST_LOG").is_some() {
        FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .with_target(false)
            .compact()
            .init();
        return;
    }

    let level = if verbose { Level::DEBUG } else { Level::INFO };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load().context("Failed to load configuration")?;

    if let Some(ref key) = cli.key {
        config.openai_api_key = Some(key.clone());
    }
    if let Some(concurrency) = cli.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(ref language) = cli.language {
        config.language = Some(language.clone());
    }

    config
        .validate()
        .context("Configuration validation failed")?;
    Ok(config)
}

fn build_job(cli: &Cli, config: &Config) -> Result<JobConfig> {
    let format: OutputFormat = cli.format.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let mode: Mode = cli.mode.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let source = Source::from_options(cli.url.clone(), cli.video.clone())?;
    let output_dir = cli
        .output_dir
        .clone()
        .unwrap_or_else(|| config.default_output_dir.clone());

    let mut job = JobConfig::new(source, output_dir)
        .with_format(format)
        .with_mode(mode);
    if let Some(ref prefix) = cli.prefix {
        job = job.with_prefix(prefix.clone());
    }

    job.validate().context("Invalid job")?;
    Ok(job)
}

async fn run(cli: Cli, progress: &ProgressReporter) -> Result<()> {
    let config = load_config(&cli)?;

    if let Some(ref batch_path) = cli.batch {
        let jobs = load_batch(batch_path)
            .with_context(|| format!("Failed to read batch file {}", batch_path.display()))?;
        let summary = run_batch(jobs, &config, progress).await;

        println!(
            "{} {}/{} jobs succeeded",
            style("Batch complete:").green().bold(),
            summary.succeeded,
            summary.total()
        );
        if summary.failed > 0 {
            println!(
                "  {} failures logged to {}",
                style(summary.failed).red(),
                config.error_log.display()
            );
        }
        return Ok(());
    }

    let job = build_job(&cli, &config)?;
    info!("Source:  {}", job.source);
    info!("Output:  {}", job.output_dir.display());
    info!("Format:  {}", job.format);
    info!("Mode:    {}", job.mode);

    let result = run_job(&job, &config, progress)
        .await
        .context("Subtitle generation failed")?;
    print_summary(&job, &result);
    Ok(())
}

/// Wall time is reported only for runs that finished.
fn elapsed_line(outcome: &Result<()>, elapsed: Duration) -> Option<String> {
    outcome
        .as_ref()
        .ok()
        .map(|_| format!("Elapsed: {}", format_elapsed(elapsed)))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let start = Instant::now();
    let (progress, rx) = ProgressReporter::channel();
    let renderer = tokio::spawn(render_progress(rx));

    let outcome = run(cli, &progress).await;

    drop(progress);
    let _ = renderer.await;

    if let Some(line) = elapsed_line(&outcome, start.elapsed()) {
        println!("{}", line);
    }

    if let Err(e) = outcome {
        error!("{:#}", e);
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("subgen").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_build_job_from_flags() {
        let cli = parse(&["-v", "/videos/talk.mp4", "-f", "srt", "-m", "words", "-o", "out"]);
        let job = build_job(&cli, &Config::default()).unwrap();

        assert_eq!(job.source, Source::Path(PathBuf::from("/videos/talk.mp4")));
        assert_eq!(job.format, OutputFormat::Srt);
        assert_eq!(job.mode, Mode::Words);
        assert_eq!(job.output_dir, PathBuf::from("out"));
        assert_eq!(job.prefix, "talk");
    }

    #[test]
    fn test_build_job_requires_a_source() {
        let cli = parse(&["-f", "vtt"]);
        assert!(build_job(&cli, &Config::default()).is_err());
    }

    #[test]
    fn test_video_and_url_conflict() {
        let result = Cli::try_parse_from([
            "subgen",
            "-v",
            "a.mp4",
            "-u",
            "https://example.com/a.mp4",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let cli = parse(&["-u", "https://example.com/a.mp4", "-m", "letters"]);
        assert!(build_job(&cli, &Config::default()).is_err());
    }

    #[test]
    fn test_elapsed_reported_only_on_success() {
        let elapsed = Duration::from_millis(61_250);
        assert_eq!(
            elapsed_line(&Ok(()), elapsed).as_deref(),
            Some("Elapsed: 1m 1s 250ms")
        );
        assert!(elapsed_line(&Err(anyhow::anyhow!("boom")), elapsed).is_none());
    }
}
