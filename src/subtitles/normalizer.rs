// Caption normalizer - turns any supported caption shape into `[M:SS] text` lines
//
// Accepted shapes:
// - Segment: timed-text object with start/text
// - Mapping: JSON object with "start" and "text" keys
// - Block:   raw timed-text cue ("00:01:05.000 --> 00:01:07.000\ntext")
//
// A malformed entry becomes an `[ERROR] ...` line; the rest is still normalized.

use serde_json::{Map, Value};

use super::formats::parse_cue_start;
use super::models::CaptionSegment;

/// One caption entry as handed back by a source
#[derive(Debug, Clone, PartialEq)]
pub enum RawCaption {
    Segment(CaptionSegment),
    Mapping(Map<String, Value>),
    Block(String),
}

impl From<CaptionSegment> for RawCaption {
    fn from(segment: CaptionSegment) -> Self {
        Self::Segment(segment)
    }
}

impl From<Value> for RawCaption {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::Mapping(map),
            Value::String(block) => Self::Block(block),
            other => Self::Block(other.to_string()),
        }
    }
}

/// Format a start time in seconds as `M:SS`
pub fn format_timestamp(start: f64) -> String {
    let total = start.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

fn clean_text(text: &str) -> String {
    text.trim().replace("\r\n", " ").replace(|c: char| c == '\n' || c == '\r', " ")
}

fn render_line(start: f64, text: &str) -> Result<String, String> {
    if !start.is_finite() || start < 0.0 {
        return Err(format!("invalid start time {}", start));
    }
    Ok(format!("[{}] {}", format_timestamp(start), clean_text(text)))
}

fn start_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn normalize_mapping(map: &Map<String, Value>) -> Result<String, String> {
    let start = map
        .get("start")
        .and_then(start_from_value)
        .ok_or_else(|| "missing start".to_string())?;
    let text = map
        .get("text")
        .and_then(Value::as_str)
        .ok_or_else(|| "missing text".to_string())?;
    render_line(start, text)
}

fn normalize_block(block: &str) -> Result<String, String> {
    let mut lines = block.lines().map(str::trim).filter(|l| !l.is_empty());

    let mut timing = lines.next().ok_or_else(|| "empty block".to_string())?;
    // SRT-style numeric index before the timing line
    if !timing.contains("-->") && timing.chars().all(|c| c.is_ascii_digit()) {
        timing = lines.next().ok_or_else(|| "missing timing line".to_string())?;
    }
    if !timing.contains("-->") {
        return Err("missing timing line".to_string());
    }

    let start = parse_cue_start(timing).ok_or_else(|| format!("bad timing line: {}", timing))?;
    let text: Vec<&str> = lines.collect();
    if text.is_empty() {
        return Err("missing text".to_string());
    }
    render_line(start, &text.join("\n"))
}

fn render_error(entry: &RawCaption) -> String {
    let shown = match entry {
        RawCaption::Segment(seg) => format!("{{start: {}, text: {:?}}}", seg.start, seg.text),
        RawCaption::Mapping(map) => Value::Object(map.clone()).to_string(),
        RawCaption::Block(block) => block.replace(|c: char| c == '\n' || c == '\r', " "),
    };
    format!("[ERROR] {}", shown)
}

/// Normalize one entry, never failing
pub fn normalize_entry(entry: &RawCaption) -> String {
    let line = match entry {
        RawCaption::Segment(seg) => render_line(seg.start, &seg.text),
        RawCaption::Mapping(map) => normalize_mapping(map),
        RawCaption::Block(block) => normalize_block(block),
    };

    match line {
        Ok(line) => line,
        Err(reason) => {
            log::debug!("[Normalizer] Malformed caption entry: {}", reason);
            render_error(entry)
        }
    }
}

/// Normalize a caption list into one line per entry
pub fn normalize(entries: &[RawCaption]) -> String {
    entries
        .iter()
        .map(normalize_entry)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Shortcut for already-parsed segments
pub fn normalize_segments(segments: &[CaptionSegment]) -> String {
    segments
        .iter()
        .map(|seg| normalize_entry(&RawCaption::Segment(seg.clone())))
        .collect::<Vec<_>>()
        .join("\n")
}
