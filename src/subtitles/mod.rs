// Subtitles module - fallback extraction chain and caption normalization

pub mod candidate;
pub mod diagnostics;
pub mod errors;
pub mod formats;
pub mod models;
pub mod normalizer;
pub mod process;
pub mod runner;
pub mod sources;
pub mod traits;

pub use candidate::{Candidate, CookieSource, LanguagePreference, Method};
pub use errors::ExtractError;
pub use models::{AttemptRecord, CaptionSegment, Extraction, ExtractionFailure, ExtractionResult, SubtitleFormat, SubtitleMetadata};
pub use normalizer::{normalize, RawCaption};
pub use runner::FallbackRunner;
pub use sources::{TimedTextSource, YtDlpSource};
pub use traits::{SubtitleRequest, SubtitleSource};
