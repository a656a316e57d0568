// Summarizer trait: the seam between the summarize batch and whichever
// generative backend is configured.

use anyhow::Result;
use async_trait::async_trait;

/// Build the prompt sent to the generator.
pub fn summary_prompt(content: &str, char_limit: usize) -> String {
    format!("Summarize this in {char_limit} characters or less:\n{content}")
}

/// Produces a short summary of a candidate's content. Implementations are
/// async because every real backend is an HTTP API.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize `content` in at most `char_limit` characters.
    async fn summarize(&self, content: &str, char_limit: usize) -> Result<String>;
}
