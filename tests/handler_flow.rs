use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use youtube_subtitles_lib::config::AppConfig;
use youtube_subtitles_lib::handler::{handle_event, RequestContext};
use youtube_subtitles_lib::storage::LocalStore;
use youtube_subtitles_lib::subtitles::formats::parse_vtt;
use youtube_subtitles_lib::subtitles::normalizer::normalize_segments;
use youtube_subtitles_lib::subtitles::{
    normalize, CaptionSegment, Candidate, ExtractError, Extraction, FallbackRunner, Method, RawCaption,
    SubtitleFormat, SubtitleRequest, SubtitleSource,
};

/// Listed yt-dlp succeeds with a fixed VTT file; timed text never does
struct VttOnlyYtDlp {
    calls: Arc<AtomicUsize>,
}

const VTT: &str = "WEBVTT\nKind: captions\nLanguage: ko\n\n00:00:00.000 --> 00:00:02.000\n안녕하세요\n\n00:01:05.000 --> 00:01:07.000\n반갑습니다\n";

#[async_trait]
impl SubtitleSource for VttOnlyYtDlp {
    fn name(&self) -> &'static str {
        "vtt-only"
    }

    fn supports(&self, _method: &Method) -> bool {
        true
    }

    async fn fetch(&self, _request: &SubtitleRequest, candidate: &Candidate) -> Result<Extraction, ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match candidate.method {
            Method::YtDlpListed => {
                let segments = parse_vtt(VTT);
                Ok(Extraction {
                    text: normalize_segments(&segments),
                    language_code: "ko".to_string(),
                    language_name: "Korean".to_string(),
                    method: candidate.method.id().to_string(),
                    format: SubtitleFormat::Vtt,
                    segments_count: segments.len(),
                    is_generated: false,
                })
            }
            Method::TimedText => Err(ExtractError::RateLimited("HTTP Error 429".to_string())),
            _ => Err(ExtractError::NoCaptions {
                languages: candidate.languages.describe(),
            }),
        }
    }
}

#[tokio::test]
async fn lambda_event_falls_back_to_ytdlp_and_stores_result() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::default().with_store_root(dir.path().to_path_buf());
    let calls = Arc::new(AtomicUsize::new(0));

    let runner = FallbackRunner::new().with_source(Box::new(VttOnlyYtDlp { calls: calls.clone() }));
    let store = Box::new(LocalStore::from_config(&config));
    let bucket = config.bucket_dir();
    let ctx = RequestContext::new(config, runner, store);

    let event = json!({
        "httpMethod": "POST",
        "body": "{\"videoId\":\"dQw4w9WgXcQ\",\"title\":\"서울 여행\"}"
    });
    let response = handle_event(&event, &ctx).await;
    assert_eq!(response.status_code, 200);
    assert_eq!(response.headers["Content-Type"], "application/json");

    let body = response.body_json().unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["method"], "yt-dlp-listed");
    assert_eq!(body["subtitle"], "[0:00] 안녕하세요\n[1:05] 반갑습니다");
    assert_eq!(body["format"], "vtt");
    assert_eq!(body["metadata"]["title"], "서울 여행");

    // three timed-text attempts, then the listed yt-dlp one; cookie variants never run
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    let attempts = body["attempts"].as_array().unwrap();
    assert_eq!(attempts.len(), 4);
    assert_eq!(attempts[0]["error_code"], "RATE_LIMITED");

    let saved: Vec<_> = std::fs::read_dir(bucket.join("subtitles")).unwrap().collect();
    assert_eq!(saved.len(), 1);
    let metadata: Vec<_> = std::fs::read_dir(bucket.join("metadata")).unwrap().collect();
    assert_eq!(metadata.len(), 1);
}

#[tokio::test]
async fn same_request_twice_gives_same_text() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::default().with_store_root(dir.path().to_path_buf());
    let runner = FallbackRunner::new().with_source(Box::new(VttOnlyYtDlp {
        calls: Arc::new(AtomicUsize::new(0)),
    }));
    let store = Box::new(LocalStore::from_config(&config));
    let ctx = RequestContext::new(config, runner, store);

    let event = json!({"videoId": "dQw4w9WgXcQ"});
    let first = handle_event(&event, &ctx).await.body_json().unwrap();
    let second = handle_event(&event, &ctx).await.body_json().unwrap();
    assert_eq!(first["subtitle"], second["subtitle"]);
    assert_eq!(first["metadata"]["title"], "Video_dQw4w9WgXcQ");
}

#[test]
fn normalizer_mixed_shapes() {
    let entries = vec![
        RawCaption::from(CaptionSegment::new(0.0, "a")),
        RawCaption::from(json!({"start": 65, "text": "b"})),
        RawCaption::from(json!({"start": 70})),
        RawCaption::from(json!("00:02:00.000 --> 00:02:03.000\nc")),
    ];
    let text = normalize(&entries);
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], "[0:00] a");
    assert_eq!(lines[1], "[1:05] b");
    assert!(lines[2].starts_with("[ERROR] "));
    assert_eq!(lines[3], "[2:00] c");
}
