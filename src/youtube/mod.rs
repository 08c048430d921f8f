// YouTube module - video ids, Data API client, key rotation, `analyze`

pub mod analyze;
pub mod credentials;
pub mod data_api;
pub mod video_id;

pub use analyze::{AnalyzeFilters, AnalyzeResponse, Analyzer, CaptionCheck};
pub use credentials::ApiKeyPool;
pub use data_api::YouTubeApi;
pub use video_id::{extract_video_id, parse_video_id, ChannelRef};
