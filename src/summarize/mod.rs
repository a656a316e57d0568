// Summaries of hand-selected candidates via a Gemini model.

pub mod batch;
pub mod gemini;
pub mod rate_limiter;
pub mod traits;

use anyhow::Result;

use crate::config::{Config, SummaryBackend};
use gemini::GeminiSummarizer;
use traits::Summarizer;

/// Build the summarizer for the configured backend.
pub fn create_summarizer(config: &Config) -> Result<Box<dyn Summarizer>> {
    config.require_summarizer()?;
    let summarizer = match config.summary_backend {
        SummaryBackend::Gemini => GeminiSummarizer::public(
            &config.google_api_key,
            &config.summary_model,
            config.summary_qps,
        ),
        SummaryBackend::Vertex => GeminiSummarizer::vertex(
            &config.google_cloud_project,
            &config.google_cloud_location,
            &config.google_cloud_access_token,
            &config.summary_model,
            config.summary_qps,
        ),
    };
    Ok(Box::new(summarizer))
}
