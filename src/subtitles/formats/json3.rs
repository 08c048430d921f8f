// json3 reader - YouTube timed text in `fmt=json3`

use serde::Deserialize;

use crate::subtitles::errors::ExtractError;
use crate::subtitles::models::CaptionSegment;

#[derive(Debug, Deserialize)]
struct Json3Document {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Json3Event {
    #[serde(default)]
    t_start_ms: u64,
    #[serde(default)]
    segs: Option<Vec<Json3Seg>>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    #[serde(default)]
    utf8: String,
}

/// Parse a json3 document. Events without text (window/style events) are skipped.
pub fn parse_json3(body: &str) -> Result<Vec<CaptionSegment>, ExtractError> {
    let doc: Json3Document = serde_json::from_str(body)
        .map_err(|e| ExtractError::Parse(format!("Invalid json3 timed text: {}", e)))?;

    let segments = doc
        .events
        .into_iter()
        .filter_map(|event| {
            let text: String = event.segs?.into_iter().map(|s| s.utf8).collect();
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            Some(CaptionSegment::new(event.t_start_ms as f64 / 1000.0, text))
        })
        .collect();

    Ok(segments)
}
