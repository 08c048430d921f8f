// Subtitle source trait definition

use async_trait::async_trait;

use super::candidate::{Candidate, Method};
use super::errors::ExtractError;
use super::models::Extraction;

/// What the runner is asked to extract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleRequest {
    pub video_id: String,
    pub title: String,
}

impl SubtitleRequest {
    pub fn new(video_id: impl Into<String>) -> Self {
        let video_id = video_id.into();
        let title = format!("Video_{}", video_id);
        Self { video_id, title }
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        if let Some(title) = title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
            self.title = title;
        }
        self
    }

    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.video_id)
    }
}

/// Trait for subtitle source implementations
#[async_trait]
pub trait SubtitleSource: Send + Sync {
    /// Name of the source (for logging)
    fn name(&self) -> &'static str;

    /// Whether this source knows how to run `method`
    fn supports(&self, method: &Method) -> bool;

    /// Run one candidate. Failures are returned, never panicked.
    async fn fetch(
        &self,
        request: &SubtitleRequest,
        candidate: &Candidate,
    ) -> Result<Extraction, ExtractError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_title() {
        let req = SubtitleRequest::new("dQw4w9WgXcQ");
        assert_eq!(req.title, "Video_dQw4w9WgXcQ");
        assert_eq!(req.watch_url(), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    }

    #[test]
    fn test_blank_title_keeps_default() {
        let req = SubtitleRequest::new("abc").with_title(Some("  ".to_string()));
        assert_eq!(req.title, "Video_abc");
        let req = req.with_title(Some("Trip to Osaka".to_string()));
        assert_eq!(req.title, "Trip to Osaka");
    }
}
