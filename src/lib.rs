// youtube-subtitles - subtitle extraction with an ordered multi-source fallback chain

pub mod config;
pub mod handler;
pub mod logging;
pub mod storage;
pub mod subtitles;
pub mod youtube;

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;

pub use config::{AppConfig, ConfigError};
pub use handler::{handle_event, LambdaResponse, RequestContext};
pub use subtitles::{
    Candidate, ExtractError, Extraction, ExtractionResult, FallbackRunner, SubtitleRequest, SubtitleSource,
};

/// Current UTC time as RFC 3339 (`2024-05-01T12:30:00Z`)
pub fn utc_now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .replace_nanosecond(0)
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .format(&Rfc3339)
        .unwrap_or_default()
}

/// Current UTC time as `YYYYMMDD_HHMMSS`, used in storage keys
pub fn utc_stamp() -> String {
    OffsetDateTime::now_utc()
        .format(format_description!("[year][month][day]_[hour][minute][second]"))
        .unwrap_or_default()
}
