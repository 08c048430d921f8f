// Runtime configuration - read once from the environment at startup

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error(
        "No YouTube API keys found. Set YOUTUBE_API_KEY_PRIMARY, YOUTUBE_API_KEY_BACKUP, \
         YOUTUBE_API_KEY_ADDITIONAL, or YOUTUBE_API_KEYS (comma-separated)"
    )]
    MissingApiKeys,

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Could not determine a storage directory; set SUBTITLE_STORE_DIR")]
    NoStorageDir,
}

/// How yt-dlp is launched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum YtDlpMode {
    /// Native `yt-dlp` binary
    #[default]
    Binary,
    /// `python3 -m yt_dlp`
    Python,
}

impl FromStr for YtDlpMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "binary" | "cli" => Ok(Self::Binary),
            "python" => Ok(Self::Python),
            _ => Err(()),
        }
    }
}

/// yt-dlp invocation settings.
///
/// The per-method timeouts differ on purpose: listing is quick, downloads
/// and cookie-authenticated runs sleep between requests.
#[derive(Debug, Clone)]
pub struct YtDlpConfig {
    pub mode: YtDlpMode,
    /// Explicit binary path (`YTDLP_PATH`)
    pub path: Option<String>,
    /// Explicit interpreter (`YTDLP_PYTHON`)
    pub python: Option<String>,
    pub list_timeout_secs: u64,
    pub download_timeout_secs: u64,
    pub auto_subs_timeout_secs: u64,
    pub cookie_timeout_secs: u64,
    pub anonymous_timeout_secs: u64,
    /// Fixed sleep before cookie/header variants
    pub pre_delay: Duration,
    /// Parent of the per-attempt work dirs (`YTDLP_TEMP_DIR`), system temp dir if unset
    pub temp_root: Option<PathBuf>,
}

impl Default for YtDlpConfig {
    fn default() -> Self {
        Self {
            mode: YtDlpMode::Binary,
            path: None,
            python: None,
            list_timeout_secs: 30,
            download_timeout_secs: 60,
            auto_subs_timeout_secs: 30,
            cookie_timeout_secs: 45,
            anonymous_timeout_secs: 60,
            pre_delay: Duration::from_secs(2),
            temp_root: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Data API keys in rotation order
    pub api_keys: Vec<String>,
    /// Netscape-format cookie text (`YOUTUBE_COOKIES`)
    pub env_cookies: Option<String>,
    /// Bucket name; also the storage subdirectory
    pub bucket: String,
    /// Root directory for stored subtitles
    pub store_root: PathBuf,
    /// SOCKS5/HTTP proxy URL for HTTP requests and yt-dlp
    pub proxy: Option<String>,
    pub http_timeout_secs: u64,
    /// Videos per page for channel analysis
    pub page_size: usize,
    pub log_level: log::LevelFilter,
    pub ytdlp: YtDlpConfig,
}

pub const DEFAULT_BUCKET: &str = "rubberdog-subtitles";

/// playlistItems.list returns at most this many items per page
pub const MAX_PAGE_SIZE: usize = 50;

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            env_cookies: None,
            bucket: DEFAULT_BUCKET.to_string(),
            store_root: default_store_root().unwrap_or_else(|| PathBuf::from(".")),
            proxy: None,
            http_timeout_secs: 20,
            page_size: MAX_PAGE_SIZE,
            log_level: log::LevelFilter::Info,
            ytdlp: YtDlpConfig::default(),
        }
    }
}

fn default_store_root() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("youtube-subtitles"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_value<T: FromStr>(key: &str, value: Option<String>) -> Result<Option<T>, ConfigError> {
    match non_empty(value) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            }),
    }
}

/// API keys: the three named variables first, `YOUTUBE_API_KEYS` as fallback
pub fn api_keys_from<F>(lookup: &F) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut keys: Vec<String> = [
        "YOUTUBE_API_KEY_PRIMARY",
        "YOUTUBE_API_KEY_BACKUP",
        "YOUTUBE_API_KEY_ADDITIONAL",
    ]
    .iter()
    .filter_map(|name| non_empty(lookup(name)))
    .collect();

    if keys.is_empty() {
        if let Some(joined) = non_empty(lookup("YOUTUBE_API_KEYS")) {
            keys = joined
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect();
        }
    }

    keys
}

impl AppConfig {
    /// Read the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (tests pass a map)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        config.api_keys = api_keys_from(&lookup);
        config.env_cookies = non_empty(lookup("YOUTUBE_COOKIES"));
        config.proxy = non_empty(lookup("YOUTUBE_PROXY"));

        if let Some(bucket) = non_empty(lookup("S3_BUCKET_NAME")) {
            config.bucket = bucket;
        }
        config.store_root = match non_empty(lookup("SUBTITLE_STORE_DIR")) {
            Some(dir) => PathBuf::from(dir),
            None => default_store_root().ok_or(ConfigError::NoStorageDir)?,
        };

        if let Some(level) = parse_value::<log::LevelFilter>("YOUTUBE_SUBTITLES_LOG", lookup("YOUTUBE_SUBTITLES_LOG"))? {
            config.log_level = level;
        }
        if let Some(size) = parse_value::<usize>("YOUTUBE_PAGE_SIZE", lookup("YOUTUBE_PAGE_SIZE"))? {
            config.page_size = size.clamp(1, MAX_PAGE_SIZE);
        }

        config.ytdlp.path = non_empty(lookup("YTDLP_PATH"));
        config.ytdlp.python = non_empty(lookup("YTDLP_PYTHON"));
        config.ytdlp.temp_root = non_empty(lookup("YTDLP_TEMP_DIR")).map(PathBuf::from);
        if let Some(raw) = non_empty(lookup("YTDLP_MODE")) {
            config.ytdlp.mode = raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "YTDLP_MODE".to_string(),
                value: raw.clone(),
            })?;
        }
        if let Some(secs) = parse_value::<u64>("YTDLP_PRE_DELAY_SECS", lookup("YTDLP_PRE_DELAY_SECS"))? {
            config.ytdlp.pre_delay = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Fail unless at least one API key is configured
    pub fn require_api_keys(&self) -> Result<&[String], ConfigError> {
        if self.api_keys.is_empty() {
            Err(ConfigError::MissingApiKeys)
        } else {
            Ok(&self.api_keys)
        }
    }

    pub fn with_api_keys(mut self, keys: Vec<String>) -> Self {
        self.api_keys = keys;
        self
    }

    pub fn with_env_cookies(mut self, cookies: Option<String>) -> Self {
        self.env_cookies = non_empty(cookies);
        self
    }

    pub fn with_store_root(mut self, root: PathBuf) -> Self {
        self.store_root = root;
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_ytdlp(mut self, ytdlp: YtDlpConfig) -> Self {
        self.ytdlp = ytdlp;
        self
    }

    /// Directory that plays the role of the bucket
    pub fn bucket_dir(&self) -> PathBuf {
        self.store_root.join(&self.bucket)
    }
}
