use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::info;

use sectionmatch::config::{self, Config};
use sectionmatch::db;
use sectionmatch::fingerprint::kmeans::DEFAULT_SEED;
use sectionmatch::matching::sections::SectionMatchParams;
use sectionmatch::output::terminal;
use sectionmatch::pipeline::{annotate, cluster_annotate};

/// sectionmatch: place candidate links into newsletter sections.
///
/// Builds per-section embedding fingerprints from past issues, matches
/// new candidate links against them, and serves the results.
#[derive(Parser, Debug)]
#[command(name = "sectionmatch", version, about)]
struct Cli {
    /// Env file that gated commands require
    #[arg(
        long,
        global = true,
        env = "SECTIONMATCH_ENV_FILE",
        default_value = config::DEFAULT_ENV_FILE
    )]
    env_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Verify that the env file exists
    CheckEnv,

    /// Initialize the database
    Init,

    /// Import links with embeddings from a JSON Lines file
    Import {
        /// Path of the .jsonl file
        #[arg(long)]
        file: PathBuf,
    },

    /// Build one fingerprint per section from historical links
    Fingerprint,

    /// Build k-means cluster fingerprints per section
    ClusterFingerprints {
        /// Clusters per section (default: SECTION_CLUSTER_K)
        #[arg(long)]
        k: Option<usize>,
    },

    /// Match candidates against section fingerprints
    Annotate {
        /// Maximum cosine distance for a match (default: SIMILARITY_THRESHOLD)
        #[arg(long)]
        similarity_threshold: Option<f64>,

        /// Matches kept per candidate (default: TOP_K_MATCHES)
        #[arg(long)]
        top_k: Option<usize>,

        /// Write one JSON file per section into this directory
        #[arg(long)]
        per_section_json_dir: Option<PathBuf>,
    },

    /// Match candidates against cluster fingerprints
    ClusterAnnotate {
        /// Candidates kept per section (default: TOP_K_CLUSTER_MATCHES)
        #[arg(long)]
        top_k: Option<usize>,

        /// Write one JSON file per section into this directory
        #[arg(long)]
        per_section_json_dir: Option<PathBuf>,
    },

    /// Print stored matches
    Inspect {
        /// Only this section
        #[arg(long)]
        section: Option<String>,

        /// Only this candidate id
        #[arg(long)]
        candidate: Option<String>,

        /// Show clustered matches instead of single-centroid ones
        #[arg(long)]
        clustered: bool,

        /// Rows to show (default: 20)
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Serve the match browser
    #[cfg(feature = "web")]
    Dashboard {
        /// Port to listen on (default: 8501)
        #[arg(long, default_value = "8501")]
        port: u16,

        /// Address to bind (default: 127.0.0.1)
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
    },

    /// Summarize hand-selected candidates with Gemini
    Summarize,

    /// Show database status
    Status,
}

impl Commands {
    /// Whether the command refuses to run without the env file.
    fn requires_env_file(&self) -> bool {
        !matches!(
            self,
            Commands::CheckEnv
                | Commands::Init
                | Commands::Import { .. }
                | Commands::ClusterFingerprints { .. }
                | Commands::Status
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load the env file if present; gated commands check for it below
    if cli.env_file.is_file() {
        dotenvy::from_path(&cli.env_file)
            .with_context(|| format!("Failed to parse {}", cli.env_file.display()))?;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("sectionmatch=info")),
        )
        .init();

    let config = Config::load(&cli.env_file)?;
    if cli.command.requires_env_file() {
        config.require_env_file()?;
    }

    match cli.command {
        Commands::CheckEnv => {
            config.require_env_file()?;
            println!("{} {} found", "✓".green(), config.env_file.display());
        }

        Commands::Init => {
            info!("Initializing sectionmatch database...");
            let db = db::initialize_sqlite(&config.db_path)?;
            let table_count = db.table_count().await?;
            println!("Database initialized at: {}", config.db_path);
            println!("Tables created: {table_count}");
            println!("\nNext step: cargo run -- import --file links.jsonl");
        }

        Commands::Import { file } => {
            let db = db::initialize_sqlite(&config.db_path)?;
            println!("Importing {}...", file.display());
            let report =
                sectionmatch::ingest::import_file(&db, &file, config.embedding_dim).await?;
            println!("  {} {} links imported", "✓".green(), report.imported);
            if report.without_embedding > 0 {
                println!(
                    "  {} {} without an embedding (stored, skipped by matching)",
                    "-".dimmed(),
                    report.without_embedding
                );
            }
            if report.skipped() > 0 {
                println!(
                    "  {} {} skipped ({} malformed, {} wrong dimension)",
                    "Warning:".yellow(),
                    report.skipped(),
                    report.malformed,
                    report.wrong_dimension
                );
            }
        }

        Commands::Fingerprint => {
            let db = db::open_sqlite(&config.db_path)?;
            println!("Building section fingerprints...");
            let fingerprints = sectionmatch::pipeline::fingerprint::build_sections(&db).await?;
            terminal::display_fingerprints(&fingerprints);
            println!("\n{}", "Section fingerprints saved.".bold());
        }

        Commands::ClusterFingerprints { k } => {
            let db = db::open_sqlite(&config.db_path)?;
            let k = k.unwrap_or(config.section_cluster_k);
            println!("Clustering each section into {k} centroids...");
            let clusters =
                sectionmatch::pipeline::fingerprint::build_clusters(&db, k, DEFAULT_SEED).await?;
            terminal::display_clusters(&clusters);
            println!("\n{}", "Cluster fingerprints saved.".bold());
        }

        Commands::Annotate {
            similarity_threshold,
            top_k,
            per_section_json_dir,
        } => {
            let db = db::open_sqlite(&config.db_path)?;
            let params = SectionMatchParams {
                similarity_threshold: similarity_threshold.unwrap_or(config.similarity_threshold),
                top_k: top_k.unwrap_or(config.top_k_matches),
            };
            let opts = annotate::AnnotateOptions {
                params,
                per_section_json_dir,
                summary_char_limit: config.summary_char_limit,
            };
            let report = annotate::run(&db, &opts).await?;

            println!(
                "Matched {} candidates, {} matches stored",
                report.candidates.len(),
                report.matches.len()
            );
            if opts.per_section_json_dir.is_some() {
                terminal::display_dump_summary(&report.dumped, "matches");
            } else {
                terminal::display_section_matches(
                    &report.matches,
                    &report.candidates,
                    params.similarity_threshold,
                    params.top_k,
                );
            }
        }

        Commands::ClusterAnnotate {
            top_k,
            per_section_json_dir,
        } => {
            let db = db::open_sqlite(&config.db_path)?;
            let opts = cluster_annotate::ClusterAnnotateOptions {
                top_k: top_k.unwrap_or(config.top_k_cluster_matches),
                per_section_json_dir: config.cluster_dump_dir(per_section_json_dir.as_deref()),
                summary_char_limit: config.summary_char_limit,
            };
            let report = cluster_annotate::run(&db, &opts).await?;

            println!(
                "Matched {} candidates, {} clustered matches stored",
                report.candidate_count,
                report.matches.len()
            );
            if opts.per_section_json_dir.is_some() {
                terminal::display_dump_summary(&report.dumped, "matches");
            } else {
                terminal::display_cluster_matches(&report.matches, opts.top_k);
            }
        }

        Commands::Inspect {
            section,
            candidate,
            clustered,
            limit,
        } => {
            let db = db::open_sqlite(&config.db_path)?;
            let opts = sectionmatch::inspect::InspectOptions {
                section,
                candidate,
                clustered,
                limit,
            };
            sectionmatch::inspect::run(&db, &opts).await?;
        }

        #[cfg(feature = "web")]
        Commands::Dashboard { port, bind } => {
            let db = db::open_sqlite(&config.db_path)?;
            println!("Dashboard at http://{bind}:{port}");
            sectionmatch::web::run_server(config, db, port, &bind).await?;
        }

        Commands::Summarize => {
            let db = db::open_sqlite(&config.db_path)?;
            let summarizer = sectionmatch::summarize::create_summarizer(&config)?;
            println!("Summarizing selected candidates with {}...", config.summary_model);
            let report = sectionmatch::summarize::batch::run(
                &db,
                summarizer.as_ref(),
                &config.selected_single_dir,
                &config.selected_clustered_dir,
                &config.summaries_dir,
                config.summary_char_limit,
            )
            .await?;
            for (path, count) in [&report.single, &report.clustered] {
                println!(
                    "  {} Wrote {} summaries to {}",
                    "✓".green(),
                    count,
                    path.display()
                );
            }
        }

        Commands::Status => {
            sectionmatch::status::show(&config.db_path).await?;
        }
    }

    Ok(())
}
