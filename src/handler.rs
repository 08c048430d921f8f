// Lambda-style request handler
//
// Event in, `{statusCode, headers, body}` out. The body is a JSON string.
// - OPTIONS          -> 200 CORS preflight
// - missing videoId  -> 400
// - extraction       -> 200 with success true/false
// - anything else    -> 500 with a generic message (details only in the log)

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::config::AppConfig;
use crate::storage::{LocalStore, SubtitleStore};
use crate::subtitles::candidate::lambda_chain;
use crate::subtitles::diagnostics::{analyze_error, Diagnosis};
use crate::subtitles::errors::ExtractError;
use crate::subtitles::models::{AttemptRecord, ExtractionResult, SubtitleFormat, SubtitleMetadata};
use crate::subtitles::runner::FallbackRunner;
use crate::subtitles::sources::{TimedTextSource, YtDlpSource};
use crate::subtitles::traits::SubtitleRequest;
use crate::youtube::video_id::extract_video_id;

const INTERNAL_ERROR_BODY: &str = r#"{"success":false,"error":"Internal server error"}"#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LambdaResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

fn cors_headers() -> BTreeMap<String, String> {
    [
        ("Content-Type", "application/json"),
        ("Access-Control-Allow-Origin", "*"),
        ("Access-Control-Allow-Methods", "POST, OPTIONS"),
        ("Access-Control-Allow-Headers", "Content-Type"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl LambdaResponse {
    pub fn json<T: Serialize>(status_code: u16, body: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            status_code,
            headers: cors_headers(),
            body: serde_json::to_string(body)?,
        })
    }

    pub fn internal_error() -> Self {
        Self {
            status_code: 500,
            headers: cors_headers(),
            body: INTERNAL_ERROR_BODY.to_string(),
        }
    }

    /// Parsed body (tests and the CLI pretty-printer)
    pub fn body_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// Everything a request needs; built once per process
pub struct RequestContext {
    pub config: AppConfig,
    pub runner: FallbackRunner,
    pub store: Box<dyn SubtitleStore>,
}

impl RequestContext {
    pub fn new(config: AppConfig, runner: FallbackRunner, store: Box<dyn SubtitleStore>) -> Self {
        Self { config, runner, store }
    }

    /// Production wiring: timed text, then yt-dlp; local bucket directory
    pub fn from_config(config: AppConfig) -> Result<Self, ExtractError> {
        let runner = FallbackRunner::new()
            .with_source(Box::new(TimedTextSource::new(&config)?))
            .with_source(Box::new(YtDlpSource::new(&config)));
        let store = Box::new(LocalStore::from_config(&config));
        Ok(Self::new(config, runner, store))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestBody {
    #[serde(default)]
    video_id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    cookies: Option<String>,
}

/// The body may be a JSON string (API gateway), an object, or the event itself
fn parse_request_body(event: &Value) -> Result<RequestBody, serde_json::Error> {
    let body = match event.get("body") {
        Some(Value::String(raw)) => serde_json::from_str::<Value>(raw)?,
        Some(Value::Null) | None => event.clone(),
        Some(other) => other.clone(),
    };
    serde_json::from_value(body)
}

#[derive(Serialize)]
struct SuccessBody<'a> {
    success: bool,
    video_id: &'a str,
    subtitle: &'a str,
    method: &'a str,
    language: &'a str,
    language_code: &'a str,
    format: SubtitleFormat,
    segments_count: usize,
    metadata: &'a SubtitleMetadata,
    timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    storage_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    storage_error: Option<String>,
    attempts: &'a [AttemptRecord],
}

#[derive(Serialize)]
struct FailureBody<'a> {
    success: bool,
    video_id: &'a str,
    error: String,
    error_code: &'static str,
    attempts: &'a [AttemptRecord],
    diagnosis: Diagnosis,
}

fn bad_request(error: &str, error_code: &str) -> Result<LambdaResponse, ExtractError> {
    Ok(LambdaResponse::json(
        400,
        &json!({ "success": false, "error": error, "error_code": error_code }),
    )?)
}

async fn process(event: &Value, ctx: &RequestContext) -> Result<LambdaResponse, ExtractError> {
    if event.get("httpMethod").and_then(Value::as_str) == Some("OPTIONS") {
        return Ok(LambdaResponse::json(200, &json!({ "message": "CORS preflight" }))?);
    }

    let body = match parse_request_body(event) {
        Ok(body) => body,
        Err(e) => {
            log::warn!("[Handler] Unreadable request body: {}", e);
            return bad_request("Invalid request body", "INVALID_REQUEST");
        }
    };

    let raw_id = body.video_id.as_deref().map(str::trim).unwrap_or("");
    if raw_id.is_empty() {
        return bad_request("videoId is required", "MISSING_VIDEO_ID");
    }
    let video_id = match extract_video_id(raw_id) {
        Some(id) => id,
        None => return bad_request(&format!("Invalid videoId: {}", raw_id), "INVALID_VIDEO_ID"),
    };

    let request = SubtitleRequest::new(&video_id).with_title(body.title);
    log::info!("[Handler] Extracting subtitles for {} ({})", request.video_id, request.title);

    let candidates = lambda_chain(body.cookies.as_deref(), ctx.config.env_cookies.is_some());
    let result = ctx.runner.run(&request, &candidates).await;

    match &result {
        ExtractionResult::Success { extraction, attempts } => {
            let metadata = SubtitleMetadata::from_extraction(&request.video_id, &request.title, extraction);

            let (storage_url, storage_error) =
                match ctx.store.save(&request.video_id, &extraction.text, &metadata).await {
                    Ok(stored) => (Some(stored.url), None),
                    Err(e) => {
                        log::warn!("[Handler] Storage failed for {}: {}", request.video_id, e);
                        (None, Some(e.to_string()))
                    }
                };

            let body = SuccessBody {
                success: true,
                video_id: &request.video_id,
                subtitle: &extraction.text,
                method: &extraction.method,
                language: &extraction.language_name,
                language_code: &extraction.language_code,
                format: extraction.format,
                segments_count: extraction.segments_count,
                metadata: &metadata,
                timestamp: crate::utc_now_rfc3339(),
                storage_url,
                storage_error,
                attempts,
            };
            Ok(LambdaResponse::json(200, &body)?)
        }
        ExtractionResult::Failure(failure) => {
            let error = failure.to_string();
            let body = FailureBody {
                success: false,
                video_id: &request.video_id,
                diagnosis: analyze_error(&error),
                error,
                error_code: failure.code(),
                attempts: &failure.attempts,
            };
            Ok(LambdaResponse::json(200, &body)?)
        }
    }
}

/// Handle one Lambda-style event
pub async fn handle_event(event: &Value, ctx: &RequestContext) -> LambdaResponse {
    match process(event, ctx).await {
        Ok(response) => response,
        Err(e) => {
            log::error!("[Handler] Unhandled error: {}", e);
            LambdaResponse::internal_error()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoredSubtitle;
    use crate::subtitles::candidate::{Candidate, Method};
    use crate::subtitles::models::Extraction;
    use crate::subtitles::traits::SubtitleSource;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Timed text succeeds for one language code, everything else fails
    struct OnlyLanguage(&'static str);

    #[async_trait]
    impl SubtitleSource for OnlyLanguage {
        fn name(&self) -> &'static str {
            "only-language"
        }

        fn supports(&self, _method: &Method) -> bool {
            true
        }

        async fn fetch(
            &self,
            _request: &SubtitleRequest,
            candidate: &Candidate,
        ) -> Result<Extraction, ExtractError> {
            if candidate.method == Method::TimedText && candidate.languages.codes.iter().any(|c| c == self.0) {
                Ok(Extraction {
                    text: "[0:00] a\n[1:05] b".to_string(),
                    language_code: self.0.to_string(),
                    language_name: "English".to_string(),
                    method: "timedtext".to_string(),
                    format: SubtitleFormat::TextWithTimestamps,
                    segments_count: 2,
                    is_generated: false,
                })
            } else {
                Err(ExtractError::NoCaptions {
                    languages: candidate.languages.describe(),
                })
            }
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        saved: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl SubtitleStore for MemoryStore {
        async fn save(
            &self,
            video_id: &str,
            text: &str,
            _metadata: &SubtitleMetadata,
        ) -> Result<StoredSubtitle, ExtractError> {
            if self.fail {
                return Err(ExtractError::Storage("disk full".to_string()));
            }
            self.saved.lock().unwrap().push((video_id.to_string(), text.to_string()));
            Ok(StoredSubtitle {
                url: format!("memory://{}", video_id),
                subtitle_key: format!("subtitles/{}.txt", video_id),
                metadata_key: format!("metadata/{}.json", video_id),
            })
        }
    }

    fn context(lang: &'static str, store: MemoryStore) -> RequestContext {
        let runner = FallbackRunner::new().with_source(Box::new(OnlyLanguage(lang)));
        RequestContext::new(AppConfig::default(), runner, Box::new(store))
    }

    #[tokio::test]
    async fn test_options_preflight() {
        let ctx = context("en", MemoryStore::default());
        let response = handle_event(&json!({"httpMethod": "OPTIONS"}), &ctx).await;
        assert_eq!(response.status_code, 200);
        assert_eq!(response.headers["Access-Control-Allow-Origin"], "*");
        assert_eq!(response.body_json().unwrap()["message"], "CORS preflight");
    }

    #[tokio::test]
    async fn test_missing_video_id() {
        let ctx = context("en", MemoryStore::default());
        for event in [
            json!({"body": "{}"}),
            json!({"body": {"videoId": "   "}}),
            json!({"title": "no id"}),
        ] {
            let response = handle_event(&event, &ctx).await;
            assert_eq!(response.status_code, 400);
            let body = response.body_json().unwrap();
            assert_eq!(body["success"], false);
            assert_eq!(body["error"], "videoId is required");
        }
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let ctx = context("en", MemoryStore::default());
        let response = handle_event(&json!({"body": "{not json"}), &ctx).await;
        assert_eq!(response.status_code, 400);
        assert_eq!(response.body_json().unwrap()["error_code"], "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn test_success_body() {
        let ctx = context("en", MemoryStore::default());
        let event = json!({"body": "{\"videoId\":\"dQw4w9WgXcQ\",\"title\":\"Song\"}"});
        let response = handle_event(&event, &ctx).await;

        assert_eq!(response.status_code, 200);
        let body = response.body_json().unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["video_id"], "dQw4w9WgXcQ");
        assert_eq!(body["subtitle"], "[0:00] a\n[1:05] b");
        assert_eq!(body["language_code"], "en");
        assert_eq!(body["format"], "text_with_timestamps");
        assert_eq!(body["segments_count"], 2);
        assert_eq!(body["metadata"]["title"], "Song");
        assert_eq!(body["storage_url"], "memory://dQw4w9WgXcQ");
        // ko failed first, en succeeded
        assert_eq!(body["attempts"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_storage_failure_keeps_success() {
        let store = MemoryStore {
            fail: true,
            ..Default::default()
        };
        let ctx = context("ko", store);
        let response = handle_event(&json!({"videoId": "dQw4w9WgXcQ"}), &ctx).await;
        let body = response.body_json().unwrap();
        assert_eq!(body["success"], true);
        assert!(body.get("storage_url").is_none());
        assert_eq!(body["storage_error"], "Storage error: disk full");
    }

    #[tokio::test]
    async fn test_all_methods_fail() {
        let ctx = context("xx", MemoryStore::default());
        let response = handle_event(&json!({"videoId": "https://youtu.be/dQw4w9WgXcQ"}), &ctx).await;

        assert_eq!(response.status_code, 200);
        let body = response.body_json().unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["video_id"], "dQw4w9WgXcQ");
        assert_eq!(body["error_code"], "NO_SUPPORTED_LANGUAGE");
        assert_eq!(body["diagnosis"]["reason"], "no_captions");
        let attempts = body["attempts"].as_array().unwrap();
        assert_eq!(attempts.len(), lambda_chain(None, false).len());
        assert!(attempts.iter().all(|a| a["success"] == false));
    }
}
