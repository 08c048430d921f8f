// SRT reader - SubRip cues to caption segments

use super::{blocks, parse_cue_start, strip_tags};
use crate::subtitles::models::CaptionSegment;

pub fn parse_srt(content: &str) -> Vec<CaptionSegment> {
    let content = content.trim_start_matches('\u{feff}');
    let mut segments = Vec::new();

    for block in blocks(content) {
        let timing_idx = match block.iter().position(|l| l.contains("-->")) {
            Some(idx) => idx,
            None => continue,
        };
        let start = match parse_cue_start(block[timing_idx]) {
            Some(start) => start,
            None => continue,
        };

        let text = block[timing_idx + 1..]
            .iter()
            .map(|l| strip_tags(l))
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !text.is_empty() {
            segments.push(CaptionSegment::new(start, text));
        }
    }

    segments
}
