// Common data models for subtitle extraction

use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::ExtractError;

/// One caption line from a subtitle track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionSegment {
    /// Start time in seconds
    pub start: f64,
    pub text: String,
}

impl CaptionSegment {
    pub fn new(start: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            text: text.into(),
        }
    }
}

/// Shape of the subtitle data a source handed back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtitleFormat {
    /// Timed-text objects already carrying start/text
    TextWithTimestamps,
    Vtt,
    Srt,
}

impl SubtitleFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "vtt" => Some(Self::Vtt),
            "srt" => Some(Self::Srt),
            _ => None,
        }
    }
}

impl fmt::Display for SubtitleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TextWithTimestamps => write!(f, "text_with_timestamps"),
            Self::Vtt => write!(f, "vtt"),
            Self::Srt => write!(f, "srt"),
        }
    }
}

/// Successful extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    /// Normalized `[M:SS] text` lines
    pub text: String,
    pub language_code: String,
    pub language_name: String,
    /// Identifier of the method that produced it (e.g. "yt-dlp-listed")
    pub method: String,
    pub format: SubtitleFormat,
    pub segments_count: usize,
    pub is_generated: bool,
}

/// Outcome of a single candidate attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptRecord {
    pub method: String,
    pub languages: Vec<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
}

/// Terminal failure after every candidate was tried
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionFailure {
    pub last_error: ExtractError,
    pub attempts: Vec<AttemptRecord>,
}

impl ExtractionFailure {
    pub fn code(&self) -> &'static str {
        self.last_error.code()
    }
}

impl fmt::Display for ExtractionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.last_error)?;
        if self.attempts.len() > 1 {
            write!(f, " (after {} attempts)", self.attempts.len())?;
        }
        Ok(())
    }
}

/// Result of running a candidate chain
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionResult {
    Success {
        extraction: Extraction,
        attempts: Vec<AttemptRecord>,
    },
    Failure(ExtractionFailure),
}

impl ExtractionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn extraction(&self) -> Option<&Extraction> {
        match self {
            Self::Success { extraction, .. } => Some(extraction),
            Self::Failure(_) => None,
        }
    }

    pub fn attempts(&self) -> &[AttemptRecord] {
        match self {
            Self::Success { attempts, .. } => attempts,
            Self::Failure(failure) => &failure.attempts,
        }
    }
}

/// Metadata stored next to a saved subtitle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleMetadata {
    pub video_id: String,
    pub title: String,
    pub language: String,
    pub language_code: String,
    pub format: SubtitleFormat,
    pub method: String,
    pub success: bool,
    /// RFC 3339 UTC timestamp
    pub saved_at: String,
}

impl SubtitleMetadata {
    pub fn from_extraction(video_id: &str, title: &str, extraction: &Extraction) -> Self {
        Self {
            video_id: video_id.to_string(),
            title: title.to_string(),
            language: extraction.language_name.clone(),
            language_code: extraction.language_code.clone(),
            format: extraction.format,
            method: extraction.method.clone(),
            success: true,
            saved_at: crate::utc_now_rfc3339(),
        }
    }
}

/// Human-readable language name for the codes the chains ask for
pub fn language_name(code: &str) -> String {
    let base = code.split(['-', '_']).next().unwrap_or(code);
    match base {
        "ko" => "Korean".to_string(),
        "en" => "English".to_string(),
        "ja" => "Japanese".to_string(),
        "zh" => "Chinese".to_string(),
        "auto" => "Auto-detected".to_string(),
        _ => code.to_string(),
    }
}
