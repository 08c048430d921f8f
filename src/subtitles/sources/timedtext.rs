// Timed-text source - reads the caption tracks YouTube embeds in the watch page
//
// Flow:
// 1. GET /watch?v=<id>, pull the `captionTracks` array out of the player response
// 2. Pick a track for the candidate's language preference
// 3. GET <baseUrl>&fmt=json3 and normalize the events
//
// No API key needed. Consent walls and bot checks surface as RateLimited.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::header::ACCEPT_LANGUAGE;
use serde::Deserialize;
use std::time::Duration;

use crate::config::AppConfig;
use crate::subtitles::candidate::{Candidate, LanguagePreference, Method};
use crate::subtitles::errors::ExtractError;
use crate::subtitles::formats::parse_json3;
use crate::subtitles::models::{language_name, Extraction, SubtitleFormat};
use crate::subtitles::normalizer::{normalize, RawCaption};
use crate::subtitles::traits::{SubtitleRequest, SubtitleSource};

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

lazy_static! {
    static ref PLAYABILITY_RE: Regex =
        Regex::new(r#""playabilityStatus":\{"status":"([A-Z_]+)"(?:,"reason":"([^"]*)")?"#).unwrap();
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TrackName {
    #[serde(rename = "simpleText")]
    simple_text: Option<String>,
    #[serde(default)]
    runs: Vec<TrackNameRun>,
}

#[derive(Debug, Clone, Deserialize)]
struct TrackNameRun {
    text: String,
}

/// One entry of `captionTracks`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub base_url: String,
    pub language_code: String,
    #[serde(default)]
    name: TrackName,
    /// "asr" for auto-generated tracks
    #[serde(default)]
    pub kind: Option<String>,
}

impl CaptionTrack {
    pub fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }

    pub fn display_name(&self) -> String {
        if let Some(text) = &self.name.simple_text {
            return text.clone();
        }
        let joined: String = self.name.runs.iter().map(|r| r.text.as_str()).collect();
        if joined.is_empty() {
            language_name(&self.language_code)
        } else {
            joined
        }
    }

    /// `baseUrl` with its `fmt` parameter forced to json3
    pub fn json3_url(&self) -> String {
        let (path, query) = self.base_url.split_once('?').unwrap_or((self.base_url.as_str(), ""));
        let mut params: Vec<&str> = query
            .split('&')
            .filter(|p| !p.is_empty() && !p.starts_with("fmt="))
            .collect();
        params.push("fmt=json3");
        format!("{}?{}", path, params.join("&"))
    }
}

/// Slice out the JSON array following `"<key>":`, honoring strings and nesting
pub fn extract_json_array<'a>(html: &'a str, key: &str) -> Option<&'a str> {
    let needle = format!("\"{}\":", key);
    let start = html.find(&needle)? + needle.len();
    let rest = &html[start..];
    let open = rest.find('[')?;
    if !rest[..open].trim().is_empty() {
        return None;
    }

    let bytes = rest.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'[' | b'{' => depth += 1,
            b']' | b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&rest[open..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse the caption track list out of a watch page
pub fn parse_caption_tracks(html: &str) -> Result<Vec<CaptionTrack>, ExtractError> {
    if let Some(array) = extract_json_array(html, "captionTracks") {
        let tracks: Vec<CaptionTrack> = serde_json::from_str(array)
            .map_err(|e| ExtractError::Parse(format!("Invalid captionTracks JSON: {}", e)))?;
        return Ok(tracks);
    }

    if let Some(caps) = PLAYABILITY_RE.captures(html) {
        let status = &caps[1];
        let reason = caps.get(2).map(|m| m.as_str()).unwrap_or(status).to_string();
        match status {
            "OK" => {}
            "LOGIN_REQUIRED" => {
                return Err(match ExtractError::from(reason.clone()) {
                    ExtractError::RateLimited(r) => ExtractError::RateLimited(r),
                    _ => ExtractError::Forbidden(reason),
                })
            }
            _ => return Err(ExtractError::VideoUnavailable(reason)),
        }
    }

    if html.contains("consent.youtube.com") || html.contains("g-recaptcha") {
        return Err(ExtractError::RateLimited(
            "consent or captcha page returned instead of the video".to_string(),
        ));
    }

    Ok(Vec::new())
}

/// Choose a track: exact code (manual before auto-generated), then regional
/// variants (`en` matches `en-US`), then any track if allowed
pub fn select_track<'a>(tracks: &'a [CaptionTrack], pref: &LanguagePreference) -> Option<&'a CaptionTrack> {
    for code in &pref.codes {
        let exact = |t: &&CaptionTrack| t.language_code.eq_ignore_ascii_case(code);
        let regional = |t: &&CaptionTrack| {
            t.language_code
                .to_ascii_lowercase()
                .starts_with(&format!("{}-", code.to_ascii_lowercase()))
        };

        let found = tracks
            .iter()
            .filter(exact)
            .find(|t| !t.is_generated())
            .or_else(|| tracks.iter().find(exact))
            .or_else(|| tracks.iter().filter(regional).find(|t| !t.is_generated()))
            .or_else(|| tracks.iter().find(regional));
        if found.is_some() {
            return found;
        }
    }

    if pref.allow_any {
        return tracks.iter().find(|t| !t.is_generated()).or_else(|| tracks.first());
    }
    None
}

pub struct TimedTextSource {
    client: reqwest::Client,
    base_url: String,
}

impl TimedTextSource {
    pub fn new(config: &AppConfig) -> Result<Self, ExtractError> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .user_agent(BROWSER_USER_AGENT);

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
            base_url: "https://www.youtube.com".to_string(),
        })
    }

    /// Fetch watch pages from another host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get_text(&self, url: &str) -> Result<String, ExtractError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT_LANGUAGE, "ko-KR,ko;q=0.9,en-US;q=0.8,en;q=0.7")
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }

    /// All caption tracks of a video (empty when it has none)
    pub async fn list_tracks(&self, video_id: &str) -> Result<Vec<CaptionTrack>, ExtractError> {
        let url = format!("{}/watch?v={}&hl=en", self.base_url, video_id);
        log::debug!("[TimedText] GET {}", url);
        let html = self.get_text(&url).await?;
        parse_caption_tracks(&html)
    }

    /// Whether any caption track exists
    pub async fn has_captions(&self, video_id: &str) -> bool {
        match self.list_tracks(video_id).await {
            Ok(tracks) => !tracks.is_empty(),
            Err(e) => {
                log::debug!("[TimedText] Caption check failed for {}: {}", video_id, e);
                false
            }
        }
    }
}

#[async_trait]
impl SubtitleSource for TimedTextSource {
    fn name(&self) -> &'static str {
        "timedtext"
    }

    fn supports(&self, method: &Method) -> bool {
        matches!(method, Method::TimedText)
    }

    async fn fetch(
        &self,
        request: &SubtitleRequest,
        candidate: &Candidate,
    ) -> Result<Extraction, ExtractError> {
        let no_captions = || ExtractError::NoCaptions {
            languages: candidate.languages.describe(),
        };

        let tracks = self.list_tracks(&request.video_id).await?;
        log::debug!(
            "[TimedText] {} tracks available: {}",
            tracks.len(),
            tracks
                .iter()
                .map(|t| t.language_code.as_str())
                .collect::<Vec<_>>()
                .join(",")
        );

        let track = select_track(&tracks, &candidate.languages).ok_or_else(no_captions)?;
        let body = self.get_text(&track.json3_url()).await?;
        let segments = parse_json3(&body)?;
        if segments.is_empty() {
            return Err(no_captions());
        }

        let segments_count = segments.len();
        let raw: Vec<RawCaption> = segments.into_iter().map(RawCaption::from).collect();

        Ok(Extraction {
            text: normalize(&raw),
            language_code: track.language_code.clone(),
            language_name: track.display_name(),
            method: candidate.method.id().to_string(),
            format: SubtitleFormat::TextWithTimestamps,
            segments_count,
            is_generated: track.is_generated(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<script>var ytInitialPlayerResponse = {"captions":{"playerCaptionsTracklistRenderer":{"captionTracks":[{"baseUrl":"https://www.youtube.com/api/timedtext?v=abc&lang=en","name":{"simpleText":"English (auto-generated)"},"languageCode":"en","kind":"asr","isTranslatable":true},{"baseUrl":"https://www.youtube.com/api/timedtext?v=abc&lang=ko","name":{"runs":[{"text":"Korean"}]},"languageCode":"ko"},{"baseUrl":"https://www.youtube.com/api/timedtext?v=abc&lang=en-GB","name":{"simpleText":"English (UK) [x]"},"languageCode":"en-GB"}],"audioTracks":[]}}};</script>"#;

    #[test]
    fn test_extract_json_array_handles_brackets_in_strings() {
        let html = r#"x = {"captionTracks":[{"name":"a]b[c","n":[1,2]}],"other":[]}"#;
        assert_eq!(
            extract_json_array(html, "captionTracks"),
            Some(r#"[{"name":"a]b[c","n":[1,2]}]"#)
        );
        assert_eq!(extract_json_array(html, "missing"), None);
    }

    #[test]
    fn test_parse_tracks() {
        let tracks = parse_caption_tracks(PAGE).unwrap();
        assert_eq!(tracks.len(), 3);
        assert!(tracks[0].is_generated());
        assert_eq!(tracks[0].base_url, "https://www.youtube.com/api/timedtext?v=abc&lang=en");
        assert_eq!(tracks[1].display_name(), "Korean");
        assert_eq!(
            tracks[1].json3_url(),
            "https://www.youtube.com/api/timedtext?v=abc&lang=ko&fmt=json3"
        );
    }

    #[test]
    fn test_json3_url_replaces_existing_format() {
        let track = |url: &str| CaptionTrack {
            base_url: url.to_string(),
            language_code: "ko".to_string(),
            name: TrackName::default(),
            kind: None,
        };

        assert_eq!(
            track("https://www.youtube.com/api/timedtext?v=abc&lang=ko&fmt=srv3").json3_url(),
            "https://www.youtube.com/api/timedtext?v=abc&lang=ko&fmt=json3"
        );
        assert_eq!(
            track("https://www.youtube.com/api/timedtext?fmt=vtt&v=abc&lang=ko").json3_url(),
            "https://www.youtube.com/api/timedtext?v=abc&lang=ko&fmt=json3"
        );
        assert_eq!(
            track("https://www.youtube.com/api/timedtext").json3_url(),
            "https://www.youtube.com/api/timedtext?fmt=json3"
        );
    }

    #[test]
    fn test_select_prefers_order_then_manual() {
        let tracks = parse_caption_tracks(PAGE).unwrap();

        let ko = select_track(&tracks, &LanguagePreference::codes(["ko"])).unwrap();
        assert_eq!(ko.language_code, "ko");

        // exact "en" only exists auto-generated; that still beats the regional manual track
        let en = select_track(&tracks, &LanguagePreference::codes(["en"])).unwrap();
        assert_eq!(en.language_code, "en");

        let gb = select_track(&tracks, &LanguagePreference::codes(["ja", "en-gb"])).unwrap();
        assert_eq!(gb.language_code, "en-GB");

        assert!(select_track(&tracks, &LanguagePreference::codes(["ja"])).is_none());
        let any = select_track(&tracks, &LanguagePreference::any()).unwrap();
        assert_eq!(any.language_code, "ko");
    }

    #[test]
    fn test_regional_match() {
        let tracks: Vec<CaptionTrack> = serde_json::from_str(
            r#"[{"baseUrl":"u1","languageCode":"en-US"},{"baseUrl":"u2","languageCode":"de"}]"#,
        )
        .unwrap();
        let en = select_track(&tracks, &LanguagePreference::codes(["en"])).unwrap();
        assert_eq!(en.base_url, "u1");
        assert_eq!(en.display_name(), "English");
    }

    #[test]
    fn test_unplayable_video() {
        let html = r#"{"playabilityStatus":{"status":"ERROR","reason":"Video unavailable"}}"#;
        assert_eq!(
            parse_caption_tracks(html).unwrap_err(),
            ExtractError::VideoUnavailable("Video unavailable".to_string())
        );

        let html = r#"{"playabilityStatus":{"status":"LOGIN_REQUIRED","reason":"Sign in to confirm you're not a bot"}}"#;
        assert!(matches!(
            parse_caption_tracks(html).unwrap_err(),
            ExtractError::RateLimited(_)
        ));
    }

    #[test]
    fn test_no_tracks() {
        let html = r#"{"playabilityStatus":{"status":"OK"},"videoDetails":{}}"#;
        assert!(parse_caption_tracks(html).unwrap().is_empty());
    }
}
