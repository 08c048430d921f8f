// Error types for subtitle sources

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractError {
    /// Input is neither a video id nor a recognizable YouTube URL
    #[error("Invalid video id or URL: {0}")]
    InvalidVideoId(String),

    /// None of the attempted languages has a caption track
    #[error("No captions available (tried: {})", .languages.join(", "))]
    NoCaptions { languages: Vec<String> },

    /// yt-dlp or python not found in system
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// External tool exited with a non-zero status
    #[error("{tool} exited with {}: {stderr}", .code.map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string()))]
    ToolFailed {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    /// External tool or request did not finish in time
    #[error("{tool} timed out after {seconds}s")]
    Timeout { tool: String, seconds: u64 },

    /// Network-level timeout reported by a tool or HTTP client
    #[error("Network timeout: {0}")]
    NetworkTimeout(String),

    /// API key quota used up
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// HTTP 403 or an authorization failure
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// YouTube throttled the request (429, bot check)
    #[error("Rate limited by YouTube: {0}")]
    RateLimited(String),

    /// Video is private, removed or otherwise unplayable
    #[error("Video unavailable: {0}")]
    VideoUnavailable(String),

    #[error("HTTP error: {0}")]
    Http(String),

    /// Failed to parse tool or API output
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(String),

    /// Writing the extracted subtitle to storage failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Every API key in the pool hit its quota
    #[error("All API credentials exhausted; try again later")]
    CredentialsExhausted,

    /// The runner was given an empty candidate list
    #[error("No extraction candidates configured")]
    NoCandidates,

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl ExtractError {
    /// Stable classification string used in JSON responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidVideoId(_) => "INVALID_VIDEO_ID",
            Self::NoCaptions { .. } => "NO_SUPPORTED_LANGUAGE",
            Self::ToolNotFound(_) => "TOOL_NOT_FOUND",
            Self::ToolFailed { .. } => "TOOL_FAILED",
            Self::Timeout { .. } => "TOOL_TIMEOUT",
            Self::NetworkTimeout(_) => "NETWORK_TIMEOUT",
            Self::QuotaExceeded(_) => "QUOTA_EXCEEDED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::RateLimited(_) => "RATE_LIMITED",
            Self::VideoUnavailable(_) => "VIDEO_UNAVAILABLE",
            Self::Http(_) => "HTTP_ERROR",
            Self::Parse(_) => "PARSE_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::CredentialsExhausted => "CREDENTIALS_EXHAUSTED",
            Self::NoCandidates => "NO_CANDIDATES",
            Self::Unknown(_) => "EXTRACTION_FAILED",
        }
    }

    /// Whether advancing to the next API key could help
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::QuotaExceeded(_) | Self::Forbidden(_))
    }
}

impl From<std::io::Error> for ExtractError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<reqwest::Error> for ExtractError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return Self::NetworkTimeout(e.to_string());
        }
        match e.status().map(|s| s.as_u16()) {
            Some(403) => Self::Forbidden(e.to_string()),
            Some(429) => Self::RateLimited(e.to_string()),
            _ => Self::Http(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for ExtractError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

// Classify free-form error text (tool stderr, API error bodies)
impl From<String> for ExtractError {
    fn from(s: String) -> Self {
        let lower = s.to_lowercase();

        // Quota goes first: Data API quota errors also carry "403"
        if lower.contains("quota") || lower.contains("exceeded") {
            return Self::QuotaExceeded(s);
        }

        if lower.contains("429") || lower.contains("too many requests") || lower.contains("bot") {
            return Self::RateLimited(s);
        }

        if lower.contains("403") || lower.contains("forbidden") || lower.contains("unauthorized") {
            return Self::Forbidden(s);
        }

        if lower.contains("timeout") || lower.contains("timed out") {
            return Self::NetworkTimeout(s);
        }

        if lower.contains("video unavailable")
            || lower.contains("private video")
            || lower.contains("has been removed")
        {
            return Self::VideoUnavailable(s);
        }

        if lower.contains("no subtitles") || lower.contains("no captions") || lower.contains("no transcripts") {
            return Self::NoCaptions { languages: Vec::new() };
        }

        if lower.contains("not found") || lower.contains("no such file") || lower.contains("command not found") {
            return Self::ToolNotFound(s);
        }

        if lower.contains("parse") || lower.contains("json") {
            return Self::Parse(s);
        }

        if lower.contains("invalid url") || lower.contains("unsupported url") {
            return Self::InvalidVideoId(s);
        }

        Self::Unknown(s)
    }
}

impl From<&str> for ExtractError {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}
