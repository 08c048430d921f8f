// yt-dlp source - runs yt-dlp as a subprocess and reads the subtitle files it writes
//
// Three ways in:
// - Listed:    --list-subs, pick a track, download it as VTT
// - Auto subs: --write-auto-subs per language as SRT
// - Cookies:   provided/env cookie file or browser-like headers, both manual and auto subs
//
// Every run writes into its own temp dir, removed when the attempt ends.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Output;

use crate::config::{AppConfig, YtDlpConfig, YtDlpMode};
use crate::subtitles::candidate::{Candidate, CookieSource, LanguagePreference, Method};
use crate::subtitles::errors::ExtractError;
use crate::subtitles::formats;
use crate::subtitles::models::{language_name, Extraction, SubtitleFormat};
use crate::subtitles::normalizer::normalize_segments;
use crate::subtitles::process::{check_status, find_python, find_ytdlp, run_output_with_timeout};
use crate::subtitles::traits::{SubtitleRequest, SubtitleSource};

use super::timedtext::BROWSER_USER_AGENT;

const ACCEPT_LANGUAGE_HEADER: &str = "Accept-Language:ko-KR,ko;q=0.9,en;q=0.8";

/// Tracks reported by `--list-subs`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtitleListing {
    pub manual: Vec<String>,
    pub automatic: Vec<String>,
}

impl SubtitleListing {
    pub fn is_empty(&self) -> bool {
        self.manual.is_empty() && self.automatic.is_empty()
    }

    /// First preferred code with a track, manual before automatic.
    /// Returns `(code, is_automatic)`.
    pub fn choose(&self, pref: &LanguagePreference) -> Option<(String, bool)> {
        for code in &pref.codes {
            if self.manual.iter().any(|c| c == code) {
                return Some((code.clone(), false));
            }
            if self.automatic.iter().any(|c| c == code) {
                return Some((code.clone(), true));
            }
        }

        if pref.allow_any {
            if let Some(code) = self.manual.first() {
                return Some((code.clone(), false));
            }
            // Auto captions list every translation; the original track is tagged -orig
            if let Some(code) = self.automatic.iter().find(|c| c.ends_with("-orig")) {
                return Some((code.clone(), true));
            }
            if let Some(code) = self.automatic.first() {
                return Some((code.clone(), true));
            }
        }
        None
    }
}

#[derive(PartialEq)]
enum ListSection {
    None,
    Manual,
    Automatic,
}

/// Parse the tables printed by `yt-dlp --list-subs`
pub fn parse_list_subs(stdout: &str) -> SubtitleListing {
    let mut listing = SubtitleListing::default();
    let mut section = ListSection::None;

    for line in stdout.lines() {
        let trimmed = line.trim();
        if trimmed.contains("Available automatic captions") {
            section = ListSection::Automatic;
            continue;
        }
        if trimmed.contains("Available subtitles") {
            section = ListSection::Manual;
            continue;
        }
        if trimmed.starts_with('[') || trimmed.contains("has no ") {
            section = ListSection::None;
            continue;
        }
        if trimmed.is_empty() || trimmed.starts_with("Language") {
            continue;
        }

        let code = match trimmed.split_whitespace().next() {
            Some(code) => code.to_string(),
            None => continue,
        };
        match section {
            ListSection::Manual => listing.manual.push(code),
            ListSection::Automatic => listing.automatic.push(code),
            ListSection::None => {}
        }
    }

    listing
}

/// Language code from a yt-dlp subtitle file name (`<stem>.<lang>.<ext>`)
pub fn language_from_filename(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let (_, lang) = stem.rsplit_once('.')?;
    if lang.is_empty() {
        None
    } else {
        Some(lang.to_string())
    }
}

/// Subtitle files (`.vtt` / `.srt`) in `dir`, sorted by name
fn subtitle_files(dir: &Path) -> Result<Vec<PathBuf>, ExtractError> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .and_then(SubtitleFormat::from_extension)
                .is_some()
        })
        .collect();
    files.sort();
    Ok(files)
}

/// The written file for the first preferred language; any file if `allow_any`
pub fn pick_subtitle_file(dir: &Path, pref: &LanguagePreference) -> Result<Option<PathBuf>, ExtractError> {
    let files = subtitle_files(dir)?;

    for code in &pref.codes {
        if let Some(path) = files
            .iter()
            .find(|p| language_from_filename(p).as_deref() == Some(code.as_str()))
        {
            return Ok(Some(path.clone()));
        }
    }

    if pref.allow_any || pref.codes.is_empty() {
        return Ok(files.into_iter().next());
    }
    Ok(None)
}

/// Read, parse and normalize one written subtitle file
fn extraction_from_file(
    path: &Path,
    fallback_lang: &str,
    method: &Method,
    is_generated: bool,
) -> Result<Extraction, ExtractError> {
    let format = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(SubtitleFormat::from_extension)
        .ok_or_else(|| ExtractError::Parse(format!("Unsupported subtitle file: {}", path.display())))?;

    let content = std::fs::read_to_string(path)?;
    let segments = formats::parse(&content, format);
    let language_code = language_from_filename(path).unwrap_or_else(|| fallback_lang.to_string());
    if segments.is_empty() {
        return Err(ExtractError::NoCaptions {
            languages: vec![language_code],
        });
    }

    Ok(Extraction {
        text: normalize_segments(&segments),
        language_name: language_name(&language_code),
        language_code,
        method: method.id().to_string(),
        format,
        segments_count: segments.len(),
        is_generated,
    })
}

fn temp_workdir(root: Option<&Path>) -> Result<tempfile::TempDir, ExtractError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("youtube-subtitles-");
    match root {
        Some(root) => builder.tempdir_in(root),
        None => builder.tempdir(),
    }
    .map_err(|e| ExtractError::Io(format!("Failed to create temp dir: {}", e)))
}

fn output_template(dir: &Path, stem: &str) -> String {
    dir.join(format!("{}.%(ext)s", stem)).to_string_lossy().to_string()
}

/// Arguments for the cookie / header variants
pub fn cookie_args(
    source: &CookieSource,
    cookie_file: Option<&Path>,
    languages: &LanguagePreference,
    output: &str,
    url: &str,
) -> Vec<String> {
    let mut args = Vec::new();

    if let Some(path) = cookie_file {
        args.push("--cookies".to_string());
        args.push(path.to_string_lossy().to_string());
    }

    let (referer, sleep, max_sleep) = match source {
        CookieSource::Provided(_) => ("https://www.youtube.com/", "2", "4"),
        CookieSource::Environment => ("https://www.google.com/", "2", "6"),
        CookieSource::Anonymous => ("https://www.google.com/", "3", "8"),
    };

    args.extend(
        [
            "--user-agent",
            BROWSER_USER_AGENT,
            "--referer",
            referer,
            "--add-header",
            ACCEPT_LANGUAGE_HEADER,
            "--sleep-interval",
            sleep,
            "--max-sleep-interval",
            max_sleep,
            "--write-sub",
            "--write-auto-sub",
        ]
        .iter()
        .map(|s| s.to_string()),
    );

    args.push("--sub-lang".to_string());
    args.push(languages.codes.join(","));

    if matches!(source, CookieSource::Anonymous) {
        args.push("--retries".to_string());
        args.push("3".to_string());
    }

    args.push("--skip-download".to_string());
    args.push("--output".to_string());
    args.push(output.to_string());
    args.push(url.to_string());
    args
}

pub struct YtDlpSource {
    program: String,
    /// Leading arguments (`-m yt_dlp` in python mode)
    base_args: Vec<String>,
    proxy: Option<String>,
    env_cookies: Option<String>,
    config: YtDlpConfig,
}

impl YtDlpSource {
    pub fn new(config: &AppConfig) -> Self {
        let (program, base_args) = match config.ytdlp.mode {
            YtDlpMode::Binary => (find_ytdlp(config.ytdlp.path.as_deref()), Vec::new()),
            YtDlpMode::Python => (
                find_python(config.ytdlp.python.as_deref()),
                vec!["-m".to_string(), "yt_dlp".to_string()],
            ),
        };
        log::debug!("[YtDlp] Using {} {}", program, base_args.join(" "));

        Self {
            program,
            base_args,
            proxy: config.proxy.clone(),
            env_cookies: config.env_cookies.clone(),
            config: config.ytdlp.clone(),
        }
    }

    /// Explicit launcher, e.g. `sh /path/to/script`
    pub fn with_command(program: impl Into<String>, base_args: Vec<String>, config: &AppConfig) -> Self {
        Self {
            program: program.into(),
            base_args,
            proxy: config.proxy.clone(),
            env_cookies: config.env_cookies.clone(),
            config: config.ytdlp.clone(),
        }
    }

    async fn run(&self, args: Vec<String>, timeout_secs: u64) -> Result<Output, ExtractError> {
        let mut full = self.base_args.clone();
        full.push("--no-warnings".to_string());
        if let Some(proxy) = &self.proxy {
            full.push("--proxy".to_string());
            full.push(proxy.clone());
        }
        full.extend(args);

        log::debug!("[YtDlp] {} {}", self.program, full.join(" "));
        let output = run_output_with_timeout(&self.program, &full, None, timeout_secs).await?;
        check_status("yt-dlp", &output)?;
        Ok(output)
    }

    async fn fetch_listed(
        &self,
        request: &SubtitleRequest,
        candidate: &Candidate,
    ) -> Result<Extraction, ExtractError> {
        let url = request.watch_url();
        let output = self
            .run(
                vec!["--list-subs".to_string(), "--skip-download".to_string(), url.clone()],
                self.config.list_timeout_secs,
            )
            .await?;

        let listing = parse_list_subs(&String::from_utf8_lossy(&output.stdout));
        log::debug!(
            "[YtDlp] {} manual, {} automatic tracks",
            listing.manual.len(),
            listing.automatic.len()
        );

        let (code, automatic) = listing.choose(&candidate.languages).ok_or_else(|| ExtractError::NoCaptions {
            languages: candidate.languages.describe(),
        })?;
        log::info!(
            "[YtDlp] Selected {} ({})",
            code,
            if automatic { "automatic" } else { "manual" }
        );

        let workdir = temp_workdir(self.config.temp_root.as_deref())?;
        let mut args = vec!["--write-subs".to_string()];
        if automatic {
            args.push("--write-auto-subs".to_string());
        }
        args.extend([
            "--sub-lang".to_string(),
            code.clone(),
            "--sub-format".to_string(),
            "vtt".to_string(),
            "--skip-download".to_string(),
            "--output".to_string(),
            output_template(workdir.path(), &format!("subtitle_{}", request.video_id)),
            url,
        ]);
        self.run(args, self.config.download_timeout_secs).await?;

        let pref = LanguagePreference::codes([code.clone()]).or_any();
        let file = pick_subtitle_file(workdir.path(), &pref)?.ok_or_else(|| ExtractError::NoCaptions {
            languages: vec![code.clone()],
        })?;
        extraction_from_file(&file, &code, &candidate.method, automatic)
    }

    async fn fetch_auto_subs(
        &self,
        request: &SubtitleRequest,
        candidate: &Candidate,
    ) -> Result<Extraction, ExtractError> {
        let url = request.watch_url();
        let mut last_error = ExtractError::NoCaptions {
            languages: candidate.languages.describe(),
        };

        for code in &candidate.languages.codes {
            let workdir = temp_workdir(self.config.temp_root.as_deref())?;
            let args = vec![
                "--write-auto-subs".to_string(),
                "--sub-langs".to_string(),
                code.clone(),
                "--sub-format".to_string(),
                "srt".to_string(),
                "--skip-download".to_string(),
                "--output".to_string(),
                output_template(workdir.path(), &request.video_id),
                url.clone(),
            ];

            let attempt = match self.run(args, self.config.auto_subs_timeout_secs).await {
                Ok(_) => {
                    let pref = LanguagePreference::codes([code.clone()]);
                    match pick_subtitle_file(workdir.path(), &pref) {
                        Ok(Some(file)) => extraction_from_file(&file, code, &candidate.method, true),
                        Ok(None) => Err(ExtractError::NoCaptions {
                            languages: vec![code.clone()],
                        }),
                        Err(e) => Err(e),
                    }
                }
                Err(e) => Err(e),
            };

            match attempt {
                Ok(extraction) => return Ok(extraction),
                Err(e) => {
                    log::debug!("[YtDlp] Auto subs for {} failed: {}", code, e);
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    async fn fetch_with_cookies(
        &self,
        request: &SubtitleRequest,
        candidate: &Candidate,
        source: &CookieSource,
    ) -> Result<Extraction, ExtractError> {
        let cookie_text = match source {
            CookieSource::Provided(text) => Some(text.as_str()),
            CookieSource::Environment => Some(
                self.env_cookies
                    .as_deref()
                    .ok_or_else(|| ExtractError::Unknown("YOUTUBE_COOKIES is not set".to_string()))?,
            ),
            CookieSource::Anonymous => None,
        };

        let workdir = temp_workdir(self.config.temp_root.as_deref())?;
        let cookie_file = match cookie_text {
            Some(text) => {
                let path = workdir.path().join("cookies.txt");
                std::fs::write(&path, text)?;
                Some(path)
            }
            None => None,
        };

        if !self.config.pre_delay.is_zero() {
            tokio::time::sleep(self.config.pre_delay).await;
        }

        let timeout_secs = match source {
            CookieSource::Anonymous => self.config.anonymous_timeout_secs,
            _ => self.config.cookie_timeout_secs,
        };
        let output = output_template(workdir.path(), &format!("{}_{}", request.video_id, source.label()));
        let args = cookie_args(
            source,
            cookie_file.as_deref(),
            &candidate.languages,
            &output,
            &request.watch_url(),
        );
        self.run(args, timeout_secs).await?;

        // yt-dlp writes whatever it found; requested codes came first in --sub-lang
        let pref = candidate.languages.clone().or_any();
        let file = pick_subtitle_file(workdir.path(), &pref)?.ok_or_else(|| ExtractError::NoCaptions {
            languages: candidate.languages.describe(),
        })?;
        let fallback = candidate.languages.codes.first().map(String::as_str).unwrap_or("auto");
        extraction_from_file(&file, fallback, &candidate.method, false)
    }
}

#[async_trait]
impl SubtitleSource for YtDlpSource {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    fn supports(&self, method: &Method) -> bool {
        method.is_ytdlp()
    }

    async fn fetch(
        &self,
        request: &SubtitleRequest,
        candidate: &Candidate,
    ) -> Result<Extraction, ExtractError> {
        match &candidate.method {
            Method::YtDlpListed => self.fetch_listed(request, candidate).await,
            Method::YtDlpAutoSubs => self.fetch_auto_subs(request, candidate).await,
            Method::YtDlpCookies(source) => self.fetch_with_cookies(request, candidate, source).await,
            Method::TimedText => Err(ExtractError::ToolNotFound(format!(
                "yt-dlp cannot run {}",
                candidate.method
            ))),
        }
    }
}
