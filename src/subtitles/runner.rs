// Fallback runner - walks the candidate list until one source succeeds

use super::candidate::Candidate;
use super::errors::ExtractError;
use super::models::{AttemptRecord, ExtractionFailure, ExtractionResult};
use super::traits::{SubtitleRequest, SubtitleSource};

pub struct FallbackRunner {
    sources: Vec<Box<dyn SubtitleSource>>,
}

impl FallbackRunner {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    pub fn add_source(&mut self, source: Box<dyn SubtitleSource>) {
        self.sources.push(source);
    }

    pub fn with_source(mut self, source: Box<dyn SubtitleSource>) -> Self {
        self.add_source(source);
        self
    }

    fn source_for(&self, candidate: &Candidate) -> Option<&dyn SubtitleSource> {
        self.sources
            .iter()
            .find(|s| s.supports(&candidate.method))
            .map(|s| s.as_ref())
    }

    /// Try each candidate in order. The first success wins; otherwise the
    /// failure carries the last attempted error.
    pub async fn run(&self, request: &SubtitleRequest, candidates: &[Candidate]) -> ExtractionResult {
        let mut attempts = Vec::with_capacity(candidates.len());
        let mut last_error = ExtractError::NoCandidates;

        for candidate in candidates {
            let languages = candidate.languages.describe();

            let outcome = match self.source_for(candidate) {
                Some(source) => {
                    log::info!(
                        "[Runner] Trying {} via {} for {} (languages: {})",
                        candidate.method,
                        source.name(),
                        request.video_id,
                        languages.join(",")
                    );
                    source.fetch(request, candidate).await
                }
                None => Err(ExtractError::ToolNotFound(format!(
                    "no source registered for {}",
                    candidate.method
                ))),
            };

            match outcome {
                Ok(extraction) => {
                    log::info!(
                        "[Runner] ✓ {} succeeded ({}, {} segments)",
                        candidate.method,
                        extraction.language_code,
                        extraction.segments_count
                    );
                    attempts.push(AttemptRecord {
                        method: candidate.method.id().to_string(),
                        languages,
                        success: true,
                        error: None,
                        error_code: None,
                    });
                    return ExtractionResult::Success {
                        extraction,
                        attempts,
                    };
                }
                Err(e) => {
                    log::warn!("[Runner] ✗ {} failed: {}", candidate.method, e);
                    attempts.push(AttemptRecord {
                        method: candidate.method.id().to_string(),
                        languages,
                        success: false,
                        error: Some(e.to_string()),
                        error_code: Some(e.code()),
                    });
                    last_error = e;
                }
            }
        }

        log::warn!(
            "[Runner] All {} candidates failed for {}",
            attempts.len(),
            request.video_id
        );
        ExtractionResult::Failure(ExtractionFailure {
            last_error,
            attempts,
        })
    }
}

impl Default for FallbackRunner {
    fn default() -> Self {
        Self::new()
    }
}
