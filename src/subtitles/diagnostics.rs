// Failure diagnostics - explains why an extraction or API call failed
//
// Looks at error text (yt-dlp stderr, API error bodies) and works out:
// - What kind of failure it was (quota, 403, bot check, ...)
// - Whether cookies or a proxy might get past it
// - A one-line suggestion for the caller

use serde::Serialize;

/// Why YouTube refused or had nothing to give
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Data API daily quota used up
    QuotaExceeded,

    /// HTTP 403 without a more specific cause
    Forbidden,

    /// HTTP 429 or similar throttling
    RateLimited,

    /// "Sign in to confirm you're not a bot", captcha pages
    BotDetection,

    /// Age-gated video, needs a signed-in session
    AgeRestricted,

    /// Private video
    PrivateVideo,

    /// Members-only video
    MembersOnly,

    /// Deleted or never existed
    VideoUnavailable,

    /// Not available in the caller's region
    GeoBlocked,

    /// The video has no captions in any requested language
    NoCaptions,

    /// Network or subprocess timeout
    Timeout,

    /// yt-dlp / python not installed
    ToolMissing,

    Unknown,
}

impl FailureReason {
    /// Trying again later (or with another key) could work
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::QuotaExceeded | Self::Forbidden | Self::RateLimited | Self::BotDetection | Self::Timeout
        )
    }

    pub fn cookies_might_help(&self) -> bool {
        matches!(
            self,
            Self::Forbidden | Self::BotDetection | Self::AgeRestricted | Self::PrivateVideo | Self::MembersOnly
        )
    }

    pub fn proxy_might_help(&self) -> bool {
        matches!(
            self,
            Self::Forbidden | Self::RateLimited | Self::BotDetection | Self::GeoBlocked | Self::Timeout
        )
    }

    /// Nothing on our side changes the outcome
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::VideoUnavailable | Self::NoCaptions)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::QuotaExceeded => "YouTube Data API quota exceeded",
            Self::Forbidden => "Access denied (HTTP 403)",
            Self::RateLimited => "Rate limited by YouTube",
            Self::BotDetection => "Bot detection triggered",
            Self::AgeRestricted => "Age-restricted video",
            Self::PrivateVideo => "Private video",
            Self::MembersOnly => "Members-only video",
            Self::VideoUnavailable => "Video unavailable",
            Self::GeoBlocked => "Geographic restriction",
            Self::NoCaptions => "No captions in the requested languages",
            Self::Timeout => "Request timed out",
            Self::ToolMissing => "yt-dlp is not installed",
            Self::Unknown => "Unknown failure",
        }
    }

    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::QuotaExceeded => "Add another API key or wait for the daily quota reset (midnight Pacific time).",
            Self::Forbidden => "Send browser cookies with the request or set YOUTUBE_COOKIES.",
            Self::RateLimited => "Wait a few minutes before retrying, or route through YOUTUBE_PROXY.",
            Self::BotDetection => "Provide cookies from a signed-in browser session.",
            Self::AgeRestricted => "Provide cookies from an account that has confirmed its age.",
            Self::PrivateVideo => "Provide cookies from an account that has access to the video.",
            Self::MembersOnly => "Provide cookies from an account with a channel membership.",
            Self::VideoUnavailable => "Check the video id; the video may have been removed.",
            Self::GeoBlocked => "Set YOUTUBE_PROXY to a proxy in a region where the video is available.",
            Self::NoCaptions => "The video has no Korean or English captions.",
            Self::Timeout => "Retry; if it keeps happening, check network access to youtube.com.",
            Self::ToolMissing => "Install yt-dlp (pip install yt-dlp) or set YTDLP_PATH.",
            Self::Unknown => "See the attempts list for per-method errors.",
        }
    }
}

/// Map error text to a failure reason. `None` for empty text.
pub fn diagnose_error(error: &str) -> Option<FailureReason> {
    if error.trim().is_empty() {
        return None;
    }
    let lower = error.to_lowercase();

    if lower.contains("quota") {
        return Some(FailureReason::QuotaExceeded);
    }

    if lower.contains("members only")
        || lower.contains("members-only")
        || lower.contains("join this channel")
        || lower.contains("available to members")
    {
        return Some(FailureReason::MembersOnly);
    }

    if lower.contains("age-restricted")
        || lower.contains("sign in to confirm your age")
        || lower.contains("age_verification")
    {
        return Some(FailureReason::AgeRestricted);
    }

    if lower.contains("private video") || lower.contains("video is private") {
        return Some(FailureReason::PrivateVideo);
    }

    if lower.contains("video unavailable")
        || lower.contains("has been removed")
        || lower.contains("no longer available")
        || lower.contains("video is unavailable")
    {
        return Some(FailureReason::VideoUnavailable);
    }

    if lower.contains("not available in your country") || lower.contains("blocked in your country") {
        return Some(FailureReason::GeoBlocked);
    }

    if lower.contains("429") || lower.contains("rate limit") || lower.contains("too many requests") {
        return Some(FailureReason::RateLimited);
    }

    if lower.contains("not a bot")
        || lower.contains("captcha")
        || lower.contains("unusual traffic")
        || lower.contains("consent")
    {
        return Some(FailureReason::BotDetection);
    }

    if lower.contains("403") || lower.contains("forbidden") {
        return Some(FailureReason::Forbidden);
    }

    if lower.contains("timeout") || lower.contains("timed out") {
        return Some(FailureReason::Timeout);
    }

    if lower.contains("no subtitles")
        || lower.contains("no captions")
        || lower.contains("no caption")
        || lower.contains("no transcripts")
    {
        return Some(FailureReason::NoCaptions);
    }

    if lower.contains("command not found") || lower.contains("tool not found") || lower.contains("no module named") {
        return Some(FailureReason::ToolMissing);
    }

    Some(FailureReason::Unknown)
}

/// Serializable summary attached to failure responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnosis {
    pub reason: FailureReason,
    pub description: &'static str,
    pub suggestion: &'static str,
    pub retryable: bool,
    pub cookies_might_help: bool,
    pub proxy_might_help: bool,
}

impl From<FailureReason> for Diagnosis {
    fn from(reason: FailureReason) -> Self {
        Self {
            reason,
            description: reason.description(),
            suggestion: reason.suggestion(),
            retryable: reason.is_retryable(),
            cookies_might_help: reason.cookies_might_help(),
            proxy_might_help: reason.proxy_might_help(),
        }
    }
}

pub fn analyze_error(error: &str) -> Diagnosis {
    diagnose_error(error).unwrap_or(FailureReason::Unknown).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_detection() {
        let error = "The request cannot be completed because you have exceeded your quota.";
        assert_eq!(diagnose_error(error), Some(FailureReason::QuotaExceeded));
        assert!(FailureReason::QuotaExceeded.is_retryable());
    }

    #[test]
    fn test_403_detection() {
        let error = "ERROR: unable to download video data: HTTP Error 403: Forbidden";
        assert_eq!(diagnose_error(error), Some(FailureReason::Forbidden));
        assert!(FailureReason::Forbidden.cookies_might_help());
    }

    #[test]
    fn test_bot_check_detection() {
        let error = "ERROR: [youtube] abc: Sign in to confirm you're not a bot";
        assert_eq!(diagnose_error(error), Some(FailureReason::BotDetection));
    }

    #[test]
    fn test_age_restricted_detection() {
        let error = "Sign in to confirm your age. This video may be inappropriate for some users.";
        assert_eq!(diagnose_error(error), Some(FailureReason::AgeRestricted));
    }

    #[test]
    fn test_unavailable_is_permanent() {
        let error = "ERROR: [youtube] xyz: Video unavailable";
        let reason = diagnose_error(error).unwrap();
        assert_eq!(reason, FailureReason::VideoUnavailable);
        assert!(reason.is_permanent());
        assert!(!reason.is_retryable());
    }

    #[test]
    fn test_rate_limit_and_timeout() {
        assert_eq!(
            diagnose_error("HTTP Error 429: Too Many Requests"),
            Some(FailureReason::RateLimited)
        );
        assert_eq!(diagnose_error("yt-dlp timed out after 30s"), Some(FailureReason::Timeout));
    }

    #[test]
    fn test_no_captions() {
        assert_eq!(
            diagnose_error("No captions available in ko, en"),
            Some(FailureReason::NoCaptions)
        );
    }

    #[test]
    fn test_empty_and_unknown() {
        assert_eq!(diagnose_error("   "), None);
        assert_eq!(diagnose_error("something odd"), Some(FailureReason::Unknown));
        assert_eq!(analyze_error("").reason, FailureReason::Unknown);
    }

    #[test]
    fn test_diagnosis_flags_follow_reason() {
        let d = analyze_error("Video not available in your country");
        assert_eq!(d.reason, FailureReason::GeoBlocked);
        assert!(d.proxy_might_help);
        assert!(!d.cookies_might_help);
    }
}
