// Subtitle formats - WebVTT, SRT and YouTube json3 parsers
//
// Every parser yields CaptionSegments; the normalizer renders them.

mod json3;
mod srt;
mod vtt;

pub use json3::parse_json3;
pub use srt::parse_srt;
pub use vtt::parse_vtt;

use lazy_static::lazy_static;
use regex::Regex;

use super::models::{CaptionSegment, SubtitleFormat};

lazy_static! {
    static ref TIMESTAMP_RE: Regex =
        Regex::new(r"^(?:(\d+):)?(\d{1,2}):(\d{2})(?:[.,](\d{1,3}))?$").unwrap();
    static ref TAG_RE: Regex = Regex::new(r"<[^>]+>").unwrap();
}

/// Parse `HH:MM:SS.mmm`, `MM:SS.mmm` or `HH:MM:SS,mmm` into seconds
pub fn parse_timestamp(raw: &str) -> Option<f64> {
    let caps = TIMESTAMP_RE.captures(raw.trim())?;
    let hours: f64 = caps.get(1).map_or(Some(0.0), |m| m.as_str().parse().ok())?;
    let minutes: f64 = caps[2].parse().ok()?;
    let seconds: f64 = caps[3].parse().ok()?;
    let millis: f64 = match caps.get(4) {
        Some(m) => {
            // ".5" means 500 ms
            let digits = m.as_str();
            let value: f64 = digits.parse().ok()?;
            value * 10f64.powi(3 - digits.len() as i32)
        }
        None => 0.0,
    };
    Some(hours * 3600.0 + minutes * 60.0 + seconds + millis / 1000.0)
}

/// Start time of a `start --> end [settings]` line
pub fn parse_cue_start(line: &str) -> Option<f64> {
    let (start, _) = line.split_once("-->")?;
    parse_timestamp(start)
}

/// Remove inline markup (`<c>`, `<i>`, `<00:00:01.000>`)
pub fn strip_tags(text: &str) -> String {
    TAG_RE.replace_all(text, "").trim().to_string()
}

/// Parse subtitle file content by format
pub fn parse(content: &str, format: SubtitleFormat) -> Vec<CaptionSegment> {
    match format {
        SubtitleFormat::Vtt => parse_vtt(content),
        SubtitleFormat::Srt => parse_srt(content),
        SubtitleFormat::TextWithTimestamps => Vec::new(),
    }
}

/// Split cue text on blank lines, tolerating CRLF input
pub(crate) fn blocks(content: &str) -> Vec<Vec<&str>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for line in content.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}
