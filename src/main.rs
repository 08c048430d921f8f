use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use youtube_subtitles_lib::config::AppConfig;
use youtube_subtitles_lib::handler::{handle_event, RequestContext};
use youtube_subtitles_lib::logging::init_logger;
use youtube_subtitles_lib::subtitles::candidate::cli_chain;
use youtube_subtitles_lib::subtitles::diagnostics::analyze_error;
use youtube_subtitles_lib::subtitles::{ExtractionResult, FallbackRunner, SubtitleRequest, TimedTextSource, YtDlpSource};
use youtube_subtitles_lib::youtube::{extract_video_id, AnalyzeFilters, Analyzer, ApiKeyPool, YouTubeApi};

#[derive(Parser)]
#[command(name = "youtube-subtitles")]
#[command(about = "YouTube subtitle extraction with ordered fallbacks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Video details or a filtered channel listing (needs API keys)
    Analyze {
        /// Video URL/id or channel URL
        target: String,

        /// Page of the channel listing, 1-based
        #[arg(default_value_t = 1)]
        page: usize,

        /// Filters as JSON, e.g. '{"travelOnly":true,"longVideoOnly":true}'
        filters: Option<String>,
    },

    /// Extract subtitles for one video
    Subtitle {
        /// Video id or URL
        target: String,

        /// `[page] [filters_json]` shared with `analyze`; ignored here
        #[arg(hide = true)]
        ignored: Vec<String>,
    },

    /// Run a Lambda-style JSON event through the request handler
    Lambda {
        /// Event file (stdin when omitted)
        event_file: Option<PathBuf>,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("Failed to encode output")?);
    Ok(())
}

fn failure(error: impl std::fmt::Display) -> anyhow::Result<ExitCode> {
    print_json(&json!({ "error": error.to_string() }))?;
    Ok(ExitCode::FAILURE)
}

async fn analyze(config: &AppConfig, target: &str, page: usize, filters: Option<&str>) -> anyhow::Result<ExitCode> {
    let pool = ApiKeyPool::from_config(config)?;
    let api = YouTubeApi::new(config)?;
    let captions = TimedTextSource::new(config)?;

    let filters = match AnalyzeFilters::from_json(filters.unwrap_or("")) {
        Ok(filters) => filters,
        Err(e) => return failure(e),
    };

    let analyzer = Analyzer {
        api: &api,
        pool: &pool,
        captions: &captions,
        page_size: config.page_size,
    };
    match analyzer.analyze(target, page, &filters).await {
        Ok(response) => {
            print_json(&response)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            log::error!("[Main] analyze failed: {}", e);
            failure(e)
        }
    }
}

async fn subtitle(config: &AppConfig, target: &str) -> anyhow::Result<ExitCode> {
    let video_id = match extract_video_id(target) {
        Some(id) => id,
        None => return failure(format!("Invalid video ID: {}", target)),
    };

    let runner = FallbackRunner::new()
        .with_source(Box::new(TimedTextSource::new(config)?))
        .with_source(Box::new(YtDlpSource::new(config)));
    let result = runner.run(&SubtitleRequest::new(video_id.as_str()), &cli_chain()).await;

    match result {
        ExtractionResult::Success { extraction, .. } => {
            print_json(&json!({
                "video_id": video_id,
                "subtitle": extraction.text,
                "method": extraction.method,
                "language": extraction.language_name,
                "language_code": extraction.language_code,
                "format": extraction.format,
                "segments_count": extraction.segments_count,
            }))?;
            Ok(ExitCode::SUCCESS)
        }
        ExtractionResult::Failure(failed) => {
            let error = failed.to_string();
            print_json(&json!({
                "error": error,
                "error_code": failed.code(),
                "attempts": failed.attempts,
                "diagnosis": analyze_error(&error),
            }))?;
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn lambda(config: AppConfig, event_file: Option<PathBuf>) -> anyhow::Result<ExitCode> {
    let raw = match &event_file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read event file {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read event from stdin")?;
            buf
        }
    };
    let event: serde_json::Value = serde_json::from_str(&raw).context("Event is not valid JSON")?;

    let ctx = RequestContext::from_config(config)?;
    let response = handle_event(&event, &ctx).await;
    print_json(&response)?;

    let succeeded = response.status_code == 200
        && response
            .body_json()
            .map(|body| body["success"] != json!(false))
            .unwrap_or(false);
    Ok(if succeeded { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    init_logger(config.log_level).context("Failed to initialize logger")?;

    match cli.command {
        Commands::Analyze { target, page, filters } => {
            // Without keys nothing can be analyzed; fail before any request
            config.require_api_keys()?;
            analyze(&config, &target, page, filters.as_deref()).await
        }
        Commands::Subtitle { target, .. } => subtitle(&config, &target).await,
        Commands::Lambda { event_file } => lambda(config, event_file).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtitle_ignores_trailing_arguments() {
        let cli = Cli::try_parse_from(["youtube-subtitles", "subtitle", "dQw4w9WgXcQ", "2", r#"{"travelOnly":true}"#])
            .unwrap();
        match cli.command {
            Commands::Subtitle { target, ignored } => {
                assert_eq!(target, "dQw4w9WgXcQ");
                assert_eq!(ignored, vec!["2", r#"{"travelOnly":true}"#]);
            }
            _ => panic!("expected subtitle command"),
        }

        let cli = Cli::try_parse_from(["youtube-subtitles", "subtitle", "dQw4w9WgXcQ"]).unwrap();
        assert!(matches!(cli.command, Commands::Subtitle { ref ignored, .. } if ignored.is_empty()));
    }

    #[test]
    fn test_analyze_positionals() {
        let cli = Cli::try_parse_from(["youtube-subtitles", "analyze", "https://www.youtube.com/@travel", "3"]).unwrap();
        match cli.command {
            Commands::Analyze { target, page, filters } => {
                assert_eq!(target, "https://www.youtube.com/@travel");
                assert_eq!(page, 3);
                assert_eq!(filters, None);
            }
            _ => panic!("expected analyze command"),
        }
    }
}
