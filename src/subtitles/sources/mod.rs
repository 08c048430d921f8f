// Concrete subtitle sources

pub mod timedtext;
pub mod ytdlp;

pub use timedtext::{CaptionTrack, TimedTextSource};
pub use ytdlp::YtDlpSource;
