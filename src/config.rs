use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};

use crate::matching::snippet::DEFAULT_CHAR_LIMIT;

/// Default location of the env file that gates most commands.
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Which generative backend the summarizer talks to.
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryBackend {
    /// Public Gemini API: requires GOOGLE_API_KEY
    Gemini,
    /// Vertex AI: requires GOOGLE_CLOUD_PROJECT and GOOGLE_CLOUD_ACCESS_TOKEN
    Vertex,
}

/// Central configuration loaded from environment variables.
///
/// The env file is loaded by `main` via dotenvy before this runs, so values
/// from it and from the real environment look the same here.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the env file the gated commands require
    pub env_file: PathBuf,
    pub db_path: String,
    /// Expected length of every stored embedding
    pub embedding_dim: usize,
    /// Maximum cosine distance for a single-centroid match
    pub similarity_threshold: f64,
    /// Matches kept per candidate (single-centroid)
    pub top_k_matches: usize,
    /// Matches kept per section (clustered)
    pub top_k_cluster_matches: usize,
    /// Centroids per section when clustering
    pub section_cluster_k: usize,
    pub summary_char_limit: usize,
    /// Where `annotate` dumps land and where the dashboard reads single-centroid matches
    pub section_json_dir: PathBuf,
    /// Where the dashboard reads clustered matches
    pub cluster_json_dir: PathBuf,
    /// When set, `cluster-annotate` dumps JSON here even without the flag
    pub cluster_match_output_dir: Option<PathBuf>,
    pub selected_single_dir: PathBuf,
    pub selected_clustered_dir: PathBuf,
    pub summaries_dir: PathBuf,
    pub summary_backend: SummaryBackend,
    pub summary_model: String,
    pub summary_qps: f64,
    pub google_api_key: String,
    pub google_cloud_project: String,
    pub google_cloud_location: String,
    pub google_cloud_access_token: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Everything has a default except the Google credentials, which are
    /// only checked by `require_summarizer`.
    pub fn load(env_file: &Path) -> Result<Self> {
        let summary_backend = match env::var("GOOGLE_GENAI_USE_VERTEXAI") {
            Ok(v) if v.eq_ignore_ascii_case("true") => SummaryBackend::Vertex,
            _ => SummaryBackend::Gemini,
        };

        Ok(Self {
            env_file: env_file.to_path_buf(),
            db_path: env::var("SECTIONMATCH_DB_PATH")
                .unwrap_or_else(|_| "data/newsletter_embeddings.db".to_string()),
            embedding_dim: parse_var("EMBEDDING_DIM", 768)?,
            similarity_threshold: parse_var("SIMILARITY_THRESHOLD", 0.40)?,
            top_k_matches: parse_var("TOP_K_MATCHES", 3)?,
            top_k_cluster_matches: parse_var("TOP_K_CLUSTER_MATCHES", 5)?,
            section_cluster_k: parse_var("SECTION_CLUSTER_K", 3)?,
            summary_char_limit: parse_var("SUMMARY_CHAR_LIMIT", DEFAULT_CHAR_LIMIT)?,
            section_json_dir: path_var("SECTION_JSON_OUTPUT_DIR", "section_matches"),
            cluster_json_dir: path_var("CLUSTER_JSON_OUTPUT_DIR", "section_cluster_matches"),
            cluster_match_output_dir: env::var("CLUSTER_MATCH_OUTPUT_DIR")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            selected_single_dir: path_var("SELECTED_IDS_SINGLE_DIR", "selected_ids/single"),
            selected_clustered_dir: path_var(
                "SELECTED_IDS_CLUSTERED_DIR",
                "selected_ids/clustered",
            ),
            summaries_dir: path_var("SUMMARIES_DIR", "summaries"),
            summary_backend,
            summary_model: env::var("SUMMARY_MODEL")
                .unwrap_or_else(|_| "gemini-2.0-flash".to_string()),
            summary_qps: parse_var("SUMMARY_QPS", 1.0)?,
            google_api_key: env::var("GOOGLE_API_KEY").unwrap_or_default(),
            google_cloud_project: env::var("GOOGLE_CLOUD_PROJECT").unwrap_or_default(),
            google_cloud_location: env::var("GOOGLE_CLOUD_LOCATION")
                .unwrap_or_else(|_| "us-central1".to_string()),
            google_cloud_access_token: env::var("GOOGLE_CLOUD_ACCESS_TOKEN").unwrap_or_default(),
        })
    }

    /// Check that the env file exists.
    /// Every pipeline command except `cluster-fingerprints`, `init`, `import`
    /// and `status` calls this before doing any work.
    pub fn require_env_file(&self) -> Result<()> {
        check_env_file(&self.env_file)
    }

    /// Check that the configured summary backend has its credentials.
    pub fn require_summarizer(&self) -> Result<()> {
        match self.summary_backend {
            SummaryBackend::Gemini => {
                if self.google_api_key.is_empty() {
                    anyhow::bail!(
                        "GOOGLE_API_KEY not set. Add it to your .env file,\n\
                         or set GOOGLE_GENAI_USE_VERTEXAI=TRUE to use Vertex AI."
                    );
                }
            }
            SummaryBackend::Vertex => {
                if self.google_cloud_project.is_empty() {
                    anyhow::bail!("GOOGLE_CLOUD_PROJECT not set. Vertex AI needs a project id.");
                }
                if self.google_cloud_access_token.is_empty() {
                    anyhow::bail!(
                        "GOOGLE_CLOUD_ACCESS_TOKEN not set.\n\
                         Generate one with `gcloud auth print-access-token`."
                    );
                }
            }
        }
        Ok(())
    }

    /// Directory for clustered JSON dumps: the CLI flag wins over
    /// CLUSTER_MATCH_OUTPUT_DIR. `None` means no dump was requested.
    pub fn cluster_dump_dir(&self, flag: Option<&Path>) -> Option<PathBuf> {
        flag.map(Path::to_path_buf)
            .or_else(|| self.cluster_match_output_dir.clone())
    }
}

/// Fail with a descriptive message if the env file is missing.
pub fn check_env_file(path: &Path) -> Result<()> {
    if !path.is_file() {
        anyhow::bail!(
            "{} not found. Copy .env.example to {} and fill it in.",
            path.display(),
            path.display()
        );
    }
    Ok(())
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {name}: {raw:?}")),
        _ => Ok(default),
    }
}

fn path_var(name: &str, default: &str) -> PathBuf {
    env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_env_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = check_env_file(&dir.path().join(".env")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_check_env_file_present() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "SIMILARITY_THRESHOLD=0.3\n").unwrap();
        assert!(check_env_file(&path).is_ok());
    }

    #[test]
    fn test_check_env_file_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_env_file(dir.path()).is_err());
    }

    #[test]
    fn test_cluster_dump_dir_flag_wins() {
        let mut config = Config::load(Path::new(".env")).unwrap();
        config.cluster_match_output_dir = Some(PathBuf::from("from_env"));
        assert_eq!(
            config.cluster_dump_dir(Some(Path::new("from_flag"))),
            Some(PathBuf::from("from_flag"))
        );
        assert_eq!(
            config.cluster_dump_dir(None),
            Some(PathBuf::from("from_env"))
        );
        config.cluster_match_output_dir = None;
        assert_eq!(config.cluster_dump_dir(None), None);
    }

    #[test]
    fn test_char_limit_defaults_to_snippet_limit() {
        if env::var("SUMMARY_CHAR_LIMIT").is_err() {
            let config = Config::load(Path::new(".env")).unwrap();
            assert_eq!(config.summary_char_limit, DEFAULT_CHAR_LIMIT);
        }
    }
}
