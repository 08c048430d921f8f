// `analyze` action - video summary or filtered channel listing

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::credentials::ApiKeyPool;
use super::data_api::{PlaylistPage, VideoDetails, YouTubeApi};
use super::video_id::{extract_channel, extract_video_id, is_channel_url, ChannelRef};
use crate::config::MAX_PAGE_SIZE;
use crate::subtitles::errors::ExtractError;
use crate::subtitles::sources::TimedTextSource;

/// Videos shorter than this are dropped by `longVideoOnly`
pub const LONG_VIDEO_MIN_SECS: u64 = 120;

/// Keyword hits needed before a video counts as travel content
const TRAVEL_MIN_HITS: usize = 2;

const TRAVEL_KEYWORDS: &[&str] = &[
    "여행", "해외여행", "여행기", "여행브이로그", "여행 vlog", "자유여행", "배낭여행", "신혼여행", "가족여행",
    "일본", "도쿄", "오사카", "교토", "후쿠오카", "삿포로", "오키나와",
    "태국", "방콕", "푸켓", "베트남", "하노이", "다낭", "나트랑", "필리핀", "세부", "보라카이",
    "대만", "타이베이", "홍콩", "마카오", "싱가포르", "발리", "미국", "뉴욕", "하와이",
    "유럽", "이탈리아", "로마", "프랑스", "파리", "스페인", "바르셀로나", "영국", "런던",
    "독일", "스위스", "터키", "이스탄불", "호주", "시드니", "뉴질랜드", "캐나다", "두바이",
    "맛집", "현지음식", "관광", "명소", "호텔", "숙소", "리조트", "투어",
    "travel", "trip", "vacation", "holiday", "tour", "vlog",
    "japan", "tokyo", "osaka", "kyoto", "thailand", "bangkok", "vietnam", "philippines",
    "singapore", "europe", "italy", "france", "spain", "paris", "london", "hawaii",
    "australia", "canada", "dubai",
];

/// Keyword heuristic over title and description
pub fn is_travel_video(title: &str, description: &str) -> bool {
    let text = format!("{} {}", title, description).to_lowercase();
    TRAVEL_KEYWORDS.iter().filter(|k| text.contains(*k)).count() >= TRAVEL_MIN_HITS
}

/// `M:SS`, minutes not wrapped into hours
pub fn format_duration(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// `1234567` -> `1,234,567`
pub fn format_views(views: u64) -> String {
    let digits = views.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyzeFilters {
    pub travel_only: bool,
    pub subtitle_only: bool,
    pub long_video_only: bool,
}

impl AnalyzeFilters {
    pub fn from_json(raw: &str) -> Result<Self, ExtractError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(raw).map_err(|e| ExtractError::Parse(format!("Invalid filters JSON: {}", e)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FiltersApplied {
    pub travel_only: bool,
    pub subtitle_only: bool,
    pub long_video_only: bool,
}

impl From<AnalyzeFilters> for FiltersApplied {
    fn from(f: AnalyzeFilters) -> Self {
        Self {
            travel_only: f.travel_only,
            subtitle_only: f.subtitle_only,
            long_video_only: f.long_video_only,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoSummary {
    pub id: String,
    pub title: String,
    pub duration: String,
    pub views: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelVideo {
    pub id: String,
    pub title: String,
    pub duration: String,
    pub views: String,
    pub has_subtitle: bool,
    pub is_travel_video: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalyzeResponse {
    Video {
        video: VideoSummary,
    },
    Channel {
        videos: Vec<ChannelVideo>,
        total_videos: usize,
        page: usize,
        page_size: usize,
        has_more: bool,
        filters_applied: FiltersApplied,
    },
}

/// Answers whether a video has any caption track
#[async_trait]
pub trait CaptionCheck: Send + Sync {
    async fn has_captions(&self, video_id: &str) -> bool;
}

#[async_trait]
impl CaptionCheck for TimedTextSource {
    async fn has_captions(&self, video_id: &str) -> bool {
        TimedTextSource::has_captions(self, video_id).await
    }
}

/// Apply the channel filters in order: length, travel, subtitles.
/// Caption availability is checked for every survivor (it is displayed).
pub async fn filter_videos(
    videos: Vec<VideoDetails>,
    filters: &AnalyzeFilters,
    captions: &dyn CaptionCheck,
) -> Vec<ChannelVideo> {
    let mut out = Vec::new();

    for video in videos {
        if filters.long_video_only && video.duration_secs < LONG_VIDEO_MIN_SECS {
            log::debug!("[Analyze] Filtered out {} ({}s)", video.video_id, video.duration_secs);
            continue;
        }

        let is_travel = is_travel_video(&video.title, &video.description);
        if filters.travel_only && !is_travel {
            continue;
        }

        let has_subtitle = captions.has_captions(&video.video_id).await;
        if filters.subtitle_only && !has_subtitle {
            log::debug!("[Analyze] Filtered out {} (no captions)", video.video_id);
            continue;
        }

        out.push(ChannelVideo {
            id: video.video_id,
            title: video.title,
            duration: format_duration(video.duration_secs),
            views: format_views(video.view_count),
            has_subtitle,
            is_travel_video: is_travel,
        });
    }

    out
}

pub struct Analyzer<'a> {
    pub api: &'a YouTubeApi,
    pub pool: &'a ApiKeyPool,
    pub captions: &'a dyn CaptionCheck,
    pub page_size: usize,
}

impl<'a> Analyzer<'a> {
    pub async fn analyze(
        &self,
        target: &str,
        page: usize,
        filters: &AnalyzeFilters,
    ) -> Result<AnalyzeResponse, ExtractError> {
        if is_channel_url(target) {
            let channel = extract_channel(target)
                .ok_or_else(|| ExtractError::InvalidVideoId(format!("Invalid channel URL: {}", target)))?;
            self.analyze_channel(&channel, page.max(1), filters).await
        } else {
            let video_id = extract_video_id(target)
                .ok_or_else(|| ExtractError::InvalidVideoId(format!("Invalid video URL: {}", target)))?;
            self.analyze_video(&video_id).await
        }
    }

    async fn analyze_video(&self, video_id: &str) -> Result<AnalyzeResponse, ExtractError> {
        let details = self
            .pool
            .run(|key| async move { self.api.video(&key, video_id).await })
            .await?
            .ok_or_else(|| ExtractError::VideoUnavailable(format!("Video not found: {}", video_id)))?;

        Ok(AnalyzeResponse::Video {
            video: VideoSummary {
                id: details.video_id,
                title: details.title,
                duration: format_duration(details.duration_secs),
                views: format_views(details.view_count),
            },
        })
    }

    async fn analyze_channel(
        &self,
        channel: &ChannelRef,
        page: usize,
        filters: &AnalyzeFilters,
    ) -> Result<AnalyzeResponse, ExtractError> {
        let channel_id = match channel {
            ChannelRef::Id(id) => id.clone(),
            other => {
                let query = other.query();
                self.pool
                    .run(|key| async move { self.api.search_channel(&key, query).await })
                    .await?
                    .ok_or_else(|| ExtractError::VideoUnavailable(format!("Channel not found: {}", query)))?
            }
        };
        log::info!("[Analyze] Channel {} page {}", channel_id, page);

        let channel_id = channel_id.as_str();
        let uploads = self
            .pool
            .run(|key| async move { self.api.uploads_playlist(&key, channel_id).await })
            .await?
            .ok_or_else(|| ExtractError::VideoUnavailable(format!("No uploads for channel {}", channel_id)))?;

        // Walk the playlist up to the requested page
        let uploads = uploads.as_str();
        // Reported page_size must match what one playlistItems call returns
        let page_size = self.page_size.clamp(1, MAX_PAGE_SIZE);
        let mut token: Option<String> = None;
        let mut ids: Vec<String> = Vec::new();
        let mut has_more = false;
        for n in 1..=page {
            let page_token = token.take();
            let fetched: PlaylistPage = self
                .pool
                .run(|key| {
                    let page_token = page_token.clone();
                    async move {
                        self.api
                            .playlist_page(&key, uploads, page_size, page_token.as_deref())
                            .await
                    }
                })
                .await?;
            has_more = fetched.next_page_token.is_some();
            if n == page {
                ids = fetched.video_ids;
                break;
            }
            token = fetched.next_page_token;
            if token.is_none() {
                // Requested page is past the end
                break;
            }
        }

        let ids = ids.as_slice();
        let details = self
            .pool
            .run(|key| async move { self.api.videos(&key, ids).await })
            .await?;
        log::info!("[Analyze] Fetched {} videos, applying {:?}", details.len(), filters);

        let videos = filter_videos(details, filters, self.captions).await;
        Ok(AnalyzeResponse::Channel {
            total_videos: videos.len(),
            videos,
            page,
            page_size,
            has_more,
            filters_applied: (*filters).into(),
        })
    }
}
