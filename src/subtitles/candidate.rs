// Candidate list - ordered (method, language preference) pairs
//
// The runner walks a `Vec<Candidate>` front to back. Presets mirror the
// deployments this crate serves: the Lambda handler, the CLI and the
// cookie-authenticated handler.

use std::fmt;

/// Where yt-dlp gets its cookies from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieSource {
    /// Cookie text sent with the request
    Provided(String),
    /// Cookie text from `YOUTUBE_COOKIES`, read at startup
    Environment,
    /// No cookies; browser-like headers only
    Anonymous,
}

impl CookieSource {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Provided(_) => "provided_cookies",
            Self::Environment => "env_cookies",
            Self::Anonymous => "enhanced_headers",
        }
    }
}

/// Extraction strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// Direct fetch of the video's caption tracks (timed-text endpoint)
    TimedText,
    /// yt-dlp `--list-subs`, then download the chosen track as VTT
    YtDlpListed,
    /// yt-dlp `--write-auto-subs` as SRT, one language at a time
    YtDlpAutoSubs,
    /// yt-dlp with cookies or browser-like headers
    YtDlpCookies(CookieSource),
}

impl Method {
    /// Identifier reported in results
    pub fn id(&self) -> &'static str {
        match self {
            Self::TimedText => "timedtext",
            Self::YtDlpListed => "yt-dlp-listed",
            Self::YtDlpAutoSubs => "yt-dlp-auto-subs",
            Self::YtDlpCookies(src) => match src {
                CookieSource::Provided(_) => "yt-dlp-provided-cookies",
                CookieSource::Environment => "yt-dlp-env-cookies",
                CookieSource::Anonymous => "yt-dlp-enhanced-headers",
            },
        }
    }

    pub fn is_ytdlp(&self) -> bool {
        !matches!(self, Self::TimedText)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Language codes to try, in order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LanguagePreference {
    pub codes: Vec<String>,
    /// Accept whatever track exists when none of `codes` matches
    pub allow_any: bool,
}

impl LanguagePreference {
    pub fn codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            codes: codes.into_iter().map(Into::into).collect(),
            allow_any: false,
        }
    }

    pub fn any() -> Self {
        Self {
            codes: Vec::new(),
            allow_any: true,
        }
    }

    pub fn or_any(mut self) -> Self {
        self.allow_any = true;
        self
    }

    /// Codes as reported in attempt logs
    pub fn describe(&self) -> Vec<String> {
        let mut out = self.codes.clone();
        if self.allow_any {
            out.push("auto".to_string());
        }
        out
    }
}

/// One entry in the fallback chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub method: Method,
    pub languages: LanguagePreference,
}

impl Candidate {
    pub fn new(method: Method, languages: LanguagePreference) -> Self {
        Self { method, languages }
    }
}

const KOREAN_VARIANTS: [&str; 4] = ["ko", "ko-orig", "ko-en", "ko-ja"];

/// Lambda handler: timed text (ko, en, any), then yt-dlp listed VTT,
/// then the cookie variants
pub fn lambda_chain(provided_cookies: Option<&str>, has_env_cookies: bool) -> Vec<Candidate> {
    let mut chain = vec![
        Candidate::new(Method::TimedText, LanguagePreference::codes(["ko"])),
        Candidate::new(Method::TimedText, LanguagePreference::codes(["en"])),
        Candidate::new(Method::TimedText, LanguagePreference::any()),
        Candidate::new(
            Method::YtDlpListed,
            LanguagePreference::codes(KOREAN_VARIANTS.iter().copied().chain(["en"])),
        ),
    ];
    chain.extend(cookie_chain(provided_cookies, has_env_cookies));
    chain
}

/// Cookie-authenticated handler: provided cookies, env cookies, bare headers
pub fn cookie_chain(provided_cookies: Option<&str>, has_env_cookies: bool) -> Vec<Candidate> {
    let mut chain = Vec::new();
    if let Some(cookies) = provided_cookies.map(str::trim).filter(|c| !c.is_empty()) {
        chain.push(Candidate::new(
            Method::YtDlpCookies(CookieSource::Provided(cookies.to_string())),
            LanguagePreference::codes(["ko", "en"]),
        ));
    }
    if has_env_cookies {
        chain.push(Candidate::new(
            Method::YtDlpCookies(CookieSource::Environment),
            LanguagePreference::codes(["ko", "en"]),
        ));
    }
    chain.push(Candidate::new(
        Method::YtDlpCookies(CookieSource::Anonymous),
        LanguagePreference::codes(["ko", "en"]).or_any(),
    ));
    chain
}

/// CLI `subtitle` action: timed text first, then file-based and auto-sub yt-dlp
pub fn cli_chain() -> Vec<Candidate> {
    vec![
        Candidate::new(Method::TimedText, LanguagePreference::codes(["ko"])),
        Candidate::new(Method::TimedText, LanguagePreference::codes(["en"])),
        Candidate::new(Method::TimedText, LanguagePreference::any()),
        Candidate::new(
            Method::YtDlpAutoSubs,
            LanguagePreference::codes(["ko", "en", "en-orig"]),
        ),
    ]
}
