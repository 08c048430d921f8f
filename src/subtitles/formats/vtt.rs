// VTT reader - WebVTT cues to caption segments

use super::{blocks, parse_cue_start, strip_tags};
use crate::subtitles::models::CaptionSegment;

/// Parse WebVTT content into caption segments.
///
/// Header, NOTE, STYLE and REGION blocks are skipped. Auto-generated tracks
/// repeat the previous line in a rolling window; a cue whose text equals the
/// previous cue's text is dropped.
pub fn parse_vtt(content: &str) -> Vec<CaptionSegment> {
    let content = content.trim_start_matches('\u{feff}');
    let mut segments: Vec<CaptionSegment> = Vec::new();

    for block in blocks(content) {
        let first = block[0].trim();
        if first.starts_with("WEBVTT")
            || first.starts_with("NOTE")
            || first.starts_with("STYLE")
            || first.starts_with("REGION")
        {
            continue;
        }

        // Optional cue identifier line
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
        if text.is_empty() {
            continue;
        }

        if segments.last().map_or(false, |prev| prev.text == text) {
            continue;
        }
        segments.push(CaptionSegment::new(start, text));
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "WEBVTT\nKind: captions\nLanguage: ko\n\nNOTE generated\n\n1\n00:00:01.000 --> 00:00:03.000\n<c>안녕하세요</c>\n\n00:01:05.500 --> 00:01:07.000 align:start\nsecond <i>line</i>\ncontinues\n";

    #[test]
    fn test_parse_basic_cues() {
        let segments = parse_vtt(SAMPLE);
        assert_eq!(
            segments,
            vec![
                CaptionSegment::new(1.0, "안녕하세요"),
                CaptionSegment::new(65.5, "second line continues"),
            ]
        );
    }

    #[test]
    fn test_rolling_duplicates_dropped() {
        let vtt = "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nhello\n\n00:00:02.000 --> 00:00:02.010\nhello\n\n00:00:02.010 --> 00:00:04.000\nworld\n";
        let segments = parse_vtt(vtt);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].text, "world");
    }

    #[test]
    fn test_crlf_and_bom() {
        let vtt = "\u{feff}WEBVTT\r\n\r\n00:00.000 --> 00:02.000\r\nshort form\r\n";
        let segments = parse_vtt(vtt);
        assert_eq!(segments, vec![CaptionSegment::new(0.0, "short form")]);
    }

    #[test]
    fn test_empty_cues_skipped() {
        let vtt = "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\n<c> </c>\n";
        assert!(parse_vtt(vtt).is_empty());
    }
}
