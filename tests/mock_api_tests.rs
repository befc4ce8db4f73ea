//! Tests against a mock OpenAI endpoint and a mock media host.
//!
//! Nothing here needs an API key, network access or ffmpeg: every source file is
//! small enough to be sent as a single part.

use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use subgen::config::{Config, JobConfig, Mode, OutputFormat, Source};
use subgen::media::{HttpFetcher, MediaFetcher, Part};
use subgen::progress::{ProgressEvent, ProgressReporter};
use subgen::transcribe::{transcribe_part, Transcriber, TranscriptFragment, WhisperClient};
use subgen::{run_job, run_job_with};
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn whisper_body() -> serde_json::Value {
    json!({
        "task": "transcribe",
        "language": "english",
        "duration": 2.0,
        "text": " Hello world.",
        "segments": [
            {"id": 0, "seek": 0, "start": 0.0, "end": 2.0, "text": " Hello world."}
        ],
        "words": [
            {"word": "Hello", "start": 0.0, "end": 0.5},
            {"word": "world", "start": 0.75, "end": 1.5}
        ]
    })
}

fn write_part(dir: &std::path::Path, name: &str) -> Part {
    let path = dir.join(name);
    std::fs::write(&path, b"fake video bytes").unwrap();
    Part::from_path(path, 16)
}

fn client_for(server: &MockServer) -> WhisperClient {
    WhisperClient::new("sk-test".to_string())
        .with_base_url(format!("{}/v1", server.uri()))
        .with_retries(3, Duration::from_millis(1))
}

// ============================================================================
// Whisper client
// ============================================================================

mod whisper_tests {
    use super::*;

    #[tokio::test]
    async fn test_whisper_client_metadata() {
        let client = WhisperClient::new("sk-test".to_string());
        assert_eq!(client.name(), "OpenAI Whisper");
        assert_eq!(client.max_file_size(), 25 * 1024 * 1024);
    }

    #[tokio::test]
    async fn test_raised_ceiling_reaches_the_client() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/audio/transcriptions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(whisper_body()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("big.mp4");
        std::fs::write(&video, vec![0u8; 26 * 1024 * 1024]).unwrap();
        let config = Config {
            openai_api_key: Some("sk-test".to_string()),
            api_base: format!("{}/v1", server.uri()),
            max_part_bytes: 30 * 1024 * 1024,
            target_part_bytes: 28 * 1024 * 1024,
            temp_root: Some(dir.path().join("tmp")),
            ..Config::default()
        };
        let job = JobConfig::new(Source::Path(video), dir.path().join("subs"))
            .with_format(OutputFormat::Srt);

        let result = assert_ok!(run_job(&job, &config, &ProgressReporter::disabled()).await);

        assert_eq!(result.parts, 1);
        assert_eq!(result.stats.failed_parts, 0);
        assert_eq!(result.segments, 1);
        assert_eq!(result.words, 2);
    }

    #[tokio::test]
    async fn test_transcribe_parses_segments_and_words() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/audio/transcriptions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(whisper_body()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let part = write_part(dir.path(), "talk-part-2.mp4");

        let fragment = assert_ok!(client_for(&server).transcribe(&part, Mode::Both).await);

        assert_eq!(fragment.part_index, 2);
        assert_eq!(fragment.text, "Hello world.");
        assert_eq!(fragment.segments.len(), 1);
        assert_eq!(fragment.segments[0].text, "Hello world.");
        assert_eq!(fragment.words.len(), 2);
        assert_eq!(fragment.words[1].word, "world");
        assert_eq!(fragment.words[1].start, 0.75);
    }

    #[tokio::test]
    async fn test_request_asks_for_both_granularities() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/audio/transcriptions"))
            .and(body_string_contains("verbose_json"))
            .and(body_string_contains("whisper-1"))
            .and(body_string_contains("segment"))
            .and(body_string_contains("word"))
            .respond_with(ResponseTemplate::new(200).set_body_json(whisper_body()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let part = write_part(dir.path(), "clip.mp4");

        assert_ok!(client_for(&server).transcribe(&part, Mode::Segments).await);
    }

    #[tokio::test]
    async fn test_language_is_forwarded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("name=\"language\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(whisper_body()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let part = write_part(dir.path(), "clip.mp4");
        let client = client_for(&server).with_language("es".to_string());

        assert_ok!(client.transcribe(&part, Mode::Both).await);
    }

    #[tokio::test]
    async fn test_server_errors_are_retried_then_degrade_to_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/audio/transcriptions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .expect(3)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let part = write_part(dir.path(), "talk-part-4.mp4");
        let client = client_for(&server);

        let fragment = transcribe_part(&client, &part, Mode::Both).await;

        assert_eq!(fragment, TranscriptFragment::empty(4));
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/audio/transcriptions"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"message": "Invalid file format.", "type": "invalid_request_error"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let part = write_part(dir.path(), "clip.mp4");

        let err = assert_err!(client_for(&server).transcribe(&part, Mode::Both).await);
        assert!(err.to_string().contains("Invalid file format."));
    }

    #[tokio::test]
    async fn test_missing_part_file_is_an_error() {
        let client = WhisperClient::new("sk-test".to_string());
        let part = Part::from_path(PathBuf::from("/tmp/subgen-no-such-part-1.mp4"), 0);

        assert_err!(client.transcribe(&part, Mode::Both).await);
    }
}

// ============================================================================
// Media fetching
// ============================================================================

mod fetch_tests {
    use super::*;

    #[tokio::test]
    async fn test_http_fetch_streams_to_disk_with_progress() {
        let server = MockServer::start().await;
        let body = vec![7u8; 64 * 1024];
        Mock::given(method("GET"))
            .and(path("/media/lecture.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (reporter, mut rx) = ProgressReporter::channel();
        let url = format!("{}/media/lecture.mp4", server.uri());

        let path = assert_ok!(HttpFetcher::new().fetch(&url, dir.path(), &reporter).await);
        drop(reporter);

        assert_eq!(path, dir.path().join("lecture.mp4"));
        assert_eq!(std::fs::read(&path).unwrap(), body);

        let mut last = None;
        while let Some(event) = rx.recv().await {
            if let ProgressEvent::Download { downloaded, .. } = event {
                last = Some(downloaded);
            }
        }
        assert_eq!(last, Some(body.len() as u64));
    }

    #[tokio::test]
    async fn test_http_fetch_rejects_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let url = format!("{}/gone.mp4", server.uri());

        let err = assert_err!(
            HttpFetcher::new()
                .fetch(&url, dir.path(), &ProgressReporter::disabled())
                .await
        );
        assert!(matches!(err, subgen::SubgenError::Acquisition(_)));
    }
}

// ============================================================================
// Whole pipeline against mocks
// ============================================================================

mod pipeline_tests {
    use super::*;

    #[tokio::test]
    async fn test_url_job_end_to_end() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/videos/demo.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"small video".to_vec()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/audio/transcriptions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(whisper_body()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("subs");
        let config = Config {
            openai_api_key: Some("sk-test".to_string()),
            api_base: format!("{}/v1", server.uri()),
            temp_root: Some(dir.path().join("tmp")),
            ..Config::default()
        };
        let url = format!("{}/videos/demo.mp4", server.uri());
        let job = JobConfig::new(Source::Url(url.clone()), &out).with_prefix("demo");

        let result = assert_ok!(run_job(&job, &config, &ProgressReporter::disabled()).await);

        assert_eq!(result.parts, 1);
        assert_eq!(result.written.len(), 5);
        assert_eq!(
            std::fs::read_to_string(out.join("demo-words.vtt")).unwrap(),
            "WEBVTT\n\n0\n00:00:00.000 --> 00:00:00.500\nHello\n\n1\n00:00:00.750 --> 00:00:01.500\nworld\n\n"
        );
        assert_eq!(
            std::fs::read_to_string(out.join("demo-segments.srt")).unwrap(),
            "1\n00:00:00,000 --> 00:00:02,000\nHello world.\n\n"
        );
        assert_eq!(
            std::fs::read_to_string(out.join("demo.txt")).unwrap(),
            format!("{}\n\nHello world.", url)
        );
    }

    #[tokio::test]
    async fn test_failed_download_writes_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("subs");
        let config = Config {
            openai_api_key: Some("sk-test".to_string()),
            temp_root: Some(dir.path().join("tmp")),
            ..Config::default()
        };
        let job = JobConfig::new(
            Source::Url(format!("{}/videos/demo.mp4", server.uri())),
            &out,
        );

        assert_err!(run_job(&job, &config, &ProgressReporter::disabled()).await);
        assert!(!out.exists());
        assert_eq!(std::fs::read_dir(dir.path().join("tmp")).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_service_outage_still_produces_files() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.mp4");
        std::fs::write(&video, b"tiny").unwrap();
        let out = dir.path().join("subs");
        let config = Config {
            openai_api_key: Some("sk-test".to_string()),
            temp_root: Some(dir.path().join("tmp")),
            ..Config::default()
        };
        let job = JobConfig::new(Source::Path(video), &out).with_format(OutputFormat::Srt);

        let result = assert_ok!(
            run_job_with(
                &job,
                &config,
                Arc::new(client_for(&server)),
                &ProgressReporter::disabled()
            )
            .await
        );

        assert_eq!(result.stats.failed_parts, 1);
        assert_eq!(std::fs::read_to_string(out.join("clip-segments.srt")).unwrap(), "");
        assert_eq!(std::fs::read_to_string(out.join("clip-words.srt")).unwrap(), "");
    }
}
