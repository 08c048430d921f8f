// YouTube Data API v3 client
//
// Every call takes the API key explicitly; rotation lives in `ApiKeyPool`.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::config::{AppConfig, MAX_PAGE_SIZE};
use crate::subtitles::errors::ExtractError;

pub const DATA_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// videos.list accepts at most 50 ids
const MAX_IDS_PER_CALL: usize = 50;

lazy_static! {
    static ref ISO_DURATION_RE: Regex =
        Regex::new(r"^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$").unwrap();
}

/// Parse an ISO 8601 duration (`PT1H2M3S`) into seconds. Unknown shapes are 0.
pub fn parse_iso_duration(raw: &str) -> u64 {
    let caps = match ISO_DURATION_RE.captures(raw.trim()) {
        Some(caps) => caps,
        None => return 0,
    };
    let part = |i: usize| -> u64 { caps.get(i).and_then(|m| m.as_str().parse().ok()).unwrap_or(0) };
    part(1) * 86_400 + part(2) * 3600 + part(3) * 60 + part(4)
}

/// One video as returned by videos.list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoDetails {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub duration_secs: u64,
    pub view_count: u64,
}

/// Parse the `items` array of a videos.list response
pub fn parse_video_items(body: &Value) -> Vec<VideoDetails> {
    let items = match body["items"].as_array() {
        Some(items) => items,
        None => return Vec::new(),
    };

    items
        .iter()
        .filter_map(|item| {
            let video_id = item["id"].as_str()?.to_string();
            let snippet = &item["snippet"];
            Some(VideoDetails {
                video_id,
                title: snippet["title"].as_str().unwrap_or("").to_string(),
                description: snippet["description"].as_str().unwrap_or("").to_string(),
                duration_secs: item["contentDetails"]["duration"]
                    .as_str()
                    .map(parse_iso_duration)
                    .unwrap_or(0),
                // statistics counts are strings
                view_count: match &item["statistics"]["viewCount"] {
                    Value::String(s) => s.parse().unwrap_or(0),
                    Value::Number(n) => n.as_u64().unwrap_or(0),
                    _ => 0,
                },
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ApiErrorReason>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorReason {
    #[serde(default)]
    reason: String,
}

/// Classify a non-2xx Data API response. `quotaExceeded` and 403 rotate keys.
pub fn classify_api_error(status: u16, body: &str) -> ExtractError {
    let (message, reason) = match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => {
            let reason = parsed
                .error
                .errors
                .first()
                .map(|r| r.reason.clone())
                .unwrap_or_default();
            (parsed.error.message, reason)
        }
        Err(_) => (body.chars().take(200).collect(), String::new()),
    };
    let text = format!("YouTube API error {}: {} {}", status, message, reason);

    match ExtractError::from(text.trim().to_string()) {
        ExtractError::Unknown(t) | ExtractError::Parse(t) | ExtractError::ToolNotFound(t) => match status {
            403 => ExtractError::Forbidden(t),
            429 => ExtractError::RateLimited(t),
            404 => ExtractError::VideoUnavailable(t),
            _ => ExtractError::Http(t),
        },
        classified => classified,
    }
}

/// One page of a playlist listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistPage {
    pub video_ids: Vec<String>,
    pub next_page_token: Option<String>,
}

pub fn parse_playlist_page(body: &Value) -> PlaylistPage {
    let video_ids = body["items"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    item["contentDetails"]["videoId"]
                        .as_str()
                        .or_else(|| item["snippet"]["resourceId"]["videoId"].as_str())
                        .map(str::to_string)
                })
                .collect()
        })
        .unwrap_or_default();

    PlaylistPage {
        video_ids,
        next_page_token: body["nextPageToken"].as_str().map(str::to_string),
    }
}

pub struct YouTubeApi {
    client: reqwest::Client,
    base_url: String,
}

impl YouTubeApi {
    pub fn new(config: &AppConfig) -> Result<Self, ExtractError> {
        let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(config.http_timeout_secs));
        if let Some(proxy_url) = config.proxy.as_deref() {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| ExtractError::Http(format!("Invalid proxy URL {}: {}", proxy_url, e)))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| ExtractError::Http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: DATA_API_BASE.to_string(),
        })
    }

    /// Point at another endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get(&self, endpoint: &str, key: &str, params: &[(&str, String)]) -> Result<Value, ExtractError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        log::debug!("[DataApi] GET {} {:?}", endpoint, params);

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("key", key)])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(classify_api_error(status.as_u16(), &body));
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// Details for up to 50 videos per call; more ids are batched
    pub async fn videos(&self, key: &str, ids: &[String]) -> Result<Vec<VideoDetails>, ExtractError> {
        let mut out = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(MAX_IDS_PER_CALL) {
            let body = self
                .get(
                    "videos",
                    key,
                    &[
                        ("part", "snippet,contentDetails,statistics".to_string()),
                        ("id", chunk.join(",")),
                    ],
                )
                .await?;
            out.extend(parse_video_items(&body));
        }
        Ok(out)
    }

    pub async fn video(&self, key: &str, video_id: &str) -> Result<Option<VideoDetails>, ExtractError> {
        Ok(self.videos(key, &[video_id.to_string()]).await?.into_iter().next())
    }

    /// First channel id matching a search query
    pub async fn search_channel(&self, key: &str, query: &str) -> Result<Option<String>, ExtractError> {
        let body = self
            .get(
                "search",
                key,
                &[
                    ("part", "snippet".to_string()),
                    ("q", query.to_string()),
                    ("type", "channel".to_string()),
                    ("maxResults", "1".to_string()),
                ],
            )
            .await?;

        Ok(body["items"].as_array().and_then(|items| items.first()).and_then(|item| {
            item["snippet"]["channelId"]
                .as_str()
                .or_else(|| item["id"]["channelId"].as_str())
                .map(str::to_string)
        }))
    }

    /// The channel's uploads playlist id
    pub async fn uploads_playlist(&self, key: &str, channel_id: &str) -> Result<Option<String>, ExtractError> {
        let body = self
            .get(
                "channels",
                key,
                &[("part", "contentDetails".to_string()), ("id", channel_id.to_string())],
            )
            .await?;

        Ok(body["items"][0]["contentDetails"]["relatedPlaylists"]["uploads"]
            .as_str()
            .map(str::to_string))
    }

    pub async fn playlist_page(
        &self,
        key: &str,
        playlist_id: &str,
        page_size: usize,
        page_token: Option<&str>,
    ) -> Result<PlaylistPage, ExtractError> {
        let mut params = vec![
            ("part", "contentDetails".to_string()),
            ("playlistId", playlist_id.to_string()),
            ("maxResults", page_size.clamp(1, MAX_PAGE_SIZE).to_string()),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }
        let body = self.get("playlistItems", key, &params).await?;
        Ok(parse_playlist_page(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_iso_duration() {
        assert_eq!(parse_iso_duration("PT1H2M3S"), 3723);
        assert_eq!(parse_iso_duration("PT45S"), 45);
        assert_eq!(parse_iso_duration("PT10M"), 600);
        assert_eq!(parse_iso_duration("P1DT1S"), 86_401);
        assert_eq!(parse_iso_duration("P0D"), 0);
        assert_eq!(parse_iso_duration("garbage"), 0);
    }

    #[test]
    fn test_parse_video_items() {
        let body = json!({
            "items": [{
                "id": "abc",
                "snippet": {"title": "오사카 여행 vlog", "description": "Trip"},
                "contentDetails": {"duration": "PT12M5S"},
                "statistics": {"viewCount": "12345"}
            }, {
                "snippet": {"title": "missing id"}
            }]
        });
        let videos = parse_video_items(&body);
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].video_id, "abc");
        assert_eq!(videos[0].duration_secs, 725);
        assert_eq!(videos[0].view_count, 12345);
        assert!(parse_video_items(&json!({})).is_empty());
    }

    #[test]
    fn test_parse_playlist_page() {
        let body = json!({
            "nextPageToken": "CAUQAA",
            "items": [
                {"contentDetails": {"videoId": "v1"}},
                {"snippet": {"resourceId": {"videoId": "v2"}}}
            ]
        });
        let page = parse_playlist_page(&body);
        assert_eq!(page.video_ids, vec!["v1", "v2"]);
        assert_eq!(page.next_page_token.as_deref(), Some("CAUQAA"));
    }

    #[test]
    fn test_classify_api_errors() {
        let quota = r#"{"error":{"code":403,"message":"The request cannot be completed because you have exceeded your <a href=\"/youtube/v3/getting-started#quota\">quota</a>.","errors":[{"reason":"quotaExceeded"}]}}"#;
        assert!(matches!(classify_api_error(403, quota), ExtractError::QuotaExceeded(_)));

        let key = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","errors":[{"reason":"badRequest"}]}}"#;
        assert!(matches!(classify_api_error(400, key), ExtractError::Http(_)));

        let denied = r#"{"error":{"code":403,"message":"Access Not Configured","errors":[{"reason":"accessNotConfigured"}]}}"#;
        let err = classify_api_error(403, denied);
        assert!(matches!(err, ExtractError::Forbidden(_)));
        assert!(err.is_quota());

        assert!(matches!(classify_api_error(500, "<html>oops</html>"), ExtractError::Http(_)));
    }
}
