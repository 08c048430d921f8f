// Video id and channel URL parsing

use lazy_static::lazy_static;
use regex::Regex;

use crate::subtitles::errors::ExtractError;

lazy_static! {
    static ref BARE_ID_RE: Regex = Regex::new(r"^[a-zA-Z0-9_-]{11}$").unwrap();
    static ref VIDEO_URL_RES: Vec<Regex> = vec![
        Regex::new(r"(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/|youtube\.com/shorts/)([a-zA-Z0-9_-]{11})").unwrap(),
        Regex::new(r"youtube\.com/.*[?&]v=([a-zA-Z0-9_-]{11})").unwrap(),
    ];
    static ref CHANNEL_RE: Regex =
        Regex::new(r"youtube\.com/(@|c/|channel/|user/)([^/?#]+)").unwrap();
}

/// How a channel URL names its channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelRef {
    /// `/@handle`
    Handle(String),
    /// `/c/name`
    Custom(String),
    /// `/channel/UC...`, usable without a search
    Id(String),
    /// `/user/name`
    User(String),
}

impl ChannelRef {
    /// Text to search for when the id is not known
    pub fn query(&self) -> &str {
        match self {
            Self::Handle(s) | Self::Custom(s) | Self::Id(s) | Self::User(s) => s,
        }
    }
}

/// Video id from a bare 11-char id or any common YouTube URL shape
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();
    if BARE_ID_RE.is_match(input) {
        return Some(input.to_string());
    }
    VIDEO_URL_RES
        .iter()
        .find_map(|re| re.captures(input))
        .map(|caps| caps[1].to_string())
}

pub fn parse_video_id(input: &str) -> Result<String, ExtractError> {
    extract_video_id(input).ok_or_else(|| ExtractError::InvalidVideoId(input.trim().to_string()))
}

pub fn is_channel_url(url: &str) -> bool {
    CHANNEL_RE.is_match(url)
}

pub fn extract_channel(url: &str) -> Option<ChannelRef> {
    let caps = CHANNEL_RE.captures(url)?;
    let name = caps[2].to_string();
    Some(match &caps[1] {
        "@" => ChannelRef::Handle(name),
        "c/" => ChannelRef::Custom(name),
        "channel/" => ChannelRef::Id(name),
        _ => ChannelRef::User(name),
    })
}
