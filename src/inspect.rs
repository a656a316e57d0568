// Inspect stored matches from the terminal, filtered by section or candidate.

use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;

use crate::db::models::{ClusterMatch, SectionMatch};
use crate::db::Database;
use crate::matching::snippet::summary_snippet;
use crate::output::terminal;

#[derive(Debug, Clone, Default)]
pub struct InspectOptions {
    pub section: Option<String>,
    pub candidate: Option<String>,
    pub clustered: bool,
    /// Rows shown per section (clustered) or in total (single)
    pub limit: usize,
}

pub fn filter_section_matches(matches: Vec<SectionMatch>, opts: &InspectOptions) -> Vec<SectionMatch> {
    matches
        .into_iter()
        .filter(|m| section_ok(&m.section, opts) && candidate_ok(&m.candidate_id, opts))
        .collect()
}

pub fn filter_cluster_matches(matches: Vec<ClusterMatch>, opts: &InspectOptions) -> Vec<ClusterMatch> {
    matches
        .into_iter()
        .filter(|m| section_ok(&m.section, opts) && candidate_ok(&m.candidate_id, opts))
        .collect()
}

fn section_ok(section: &str, opts: &InspectOptions) -> bool {
    opts.section
        .as_deref()
        .is_none_or(|s| s.eq_ignore_ascii_case(section))
}

fn candidate_ok(id: &str, opts: &InspectOptions) -> bool {
    opts.candidate.as_deref().is_none_or(|c| c == id)
}

/// Print the stored matches selected by `opts`.
pub async fn run(db: &Arc<dyn Database>, opts: &InspectOptions) -> Result<()> {
    if opts.clustered {
        let matches = filter_cluster_matches(db.get_cluster_matches().await?, opts);
        println!(
            "\n{}",
            format!("=== Clustered matches ({} stored rows) ===", matches.len()).bold()
        );
        terminal::display_cluster_matches(&matches, opts.limit);
        return Ok(());
    }

    let matches = filter_section_matches(db.get_section_matches().await?, opts);
    println!(
        "\n{}",
        format!("=== Single-centroid matches ({} stored rows) ===", matches.len()).bold()
    );
    if matches.is_empty() {
        println!("  {}", "Nothing matched the filters.".dimmed());
        return Ok(());
    }

    for m in matches.iter().take(opts.limit) {
        let link = db.get_link(&m.candidate_id).await?;
        println!(
            "  {} {:<24} #{} {:<16} {}",
            terminal::colorize_distance(m.cosine_distance),
            m.candidate_id,
            m.rank,
            m.section,
            link.as_ref()
                .and_then(|l| l.url.as_deref())
                .unwrap_or("")
                .dimmed(),
        );
        let snippet = summary_snippet(link.as_ref().and_then(|l| l.content.as_deref()), 100);
        if !snippet.is_empty() {
            println!("      {}", snippet.dimmed());
        }
    }
    if matches.len() > opts.limit {
        println!("  … {} more (raise --limit)", matches.len() - opts.limit);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sm(id: &str, section: &str) -> SectionMatch {
        SectionMatch {
            candidate_id: id.into(),
            section: section.into(),
            rank: 1,
            cosine_distance: 0.2,
        }
    }

    #[test]
    fn test_filters_combine() {
        let all = vec![sm("a", "AI"), sm("a", "TOOLS"), sm("b", "AI")];
        let opts = InspectOptions {
            section: Some("ai".into()),
            candidate: Some("a".into()),
            clustered: false,
            limit: 10,
        };
        let kept = filter_section_matches(all.clone(), &opts);
        assert_eq!(kept, vec![sm("a", "AI")]);

        let no_filter = InspectOptions {
            limit: 10,
            ..Default::default()
        };
        assert_eq!(filter_section_matches(all, &no_filter).len(), 3);
    }

    #[tokio::test]
    async fn test_run_on_empty_store() {
        let db = crate::db::in_memory().unwrap();
        let opts = InspectOptions {
            limit: 5,
            ..Default::default()
        };
        assert!(run(&db, &opts).await.is_ok());
        let clustered = InspectOptions {
            clustered: true,
            ..opts
        };
        assert!(run(&db, &clustered).await.is_ok());
    }
}
