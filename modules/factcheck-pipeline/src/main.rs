use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ai_client::Gemini;
use factcheck_common::{Config, InboundData, InboundEvent};
use factcheck_pipeline::evidence::MatcherConfig;
use factcheck_pipeline::pipeline::{Collaborators, Dispatch, Orchestrator, PipelineConfig, RunOutcome};
use factcheck_pipeline::stages::{HttpManipulationScorer, HttpMediaDownloader};
use factcheck_pipeline::store::{MemoryRecordStore, PgRecordStore};
use factcheck_pipeline::traits::{EvidenceSource, RecordStore};
use factcheck_pipeline::verification::VerifierConfig;
use instagram::{InstagramOptions, InstagramService};
use news_client::{GoogleNewsClient, NewsApiClient, SearchOptions};

#[derive(Parser)]
#[command(name = "factcheck", about = "Fact-check a shared video and reply to the sender")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the pipeline for one video.
    Run {
        #[arg(long)]
        video_url: String,
        #[arg(long)]
        user_id: String,
        /// Upstream message id, used as the request id.
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        video_id: Option<String>,
        /// Caption that accompanied the video.
        #[arg(long)]
        caption: Option<String>,
    },
    /// Run the pipeline for an inbound event stored as JSON.
    Replay {
        #[arg(long)]
        file: PathBuf,
    },
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("factcheck=info".parse()?);
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f == "json") {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

async fn record_store(config: &Config) -> Result<Arc<dyn RecordStore>> {
    match &config.database_url {
        Some(url) => {
            let store = PgRecordStore::connect(url).await?;
            store.migrate().await?;
            info!("Using Postgres record store");
            Ok(Arc::new(store))
        }
        None => {
            info!("DATABASE_URL not set, records are kept in memory");
            Ok(Arc::new(MemoryRecordStore::new()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;
    let cli = Cli::parse();

    let config = Config::from_env()?;
    config.log_redacted();

    let event = match cli.command {
        Command::Run {
            video_url,
            user_id,
            id,
            video_id,
            caption,
        } => InboundEvent {
            id,
            data: InboundData {
                video_url,
                user_id,
                video_text: caption,
                video_id,
            },
        },
        Command::Replay { file } => {
            let raw = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing {}", file.display()))?
        }
    };

    let search = SearchOptions {
        language: config.news_language.clone(),
        country: config.news_country.clone(),
        max_results: config.news_max_results,
        recency_days: config.news_recency_days,
    };
    let sources: Vec<Arc<dyn EvidenceSource>> = vec![
        Arc::new(GoogleNewsClient::new(search.clone())),
        Arc::new(NewsApiClient::new(config.newsapi_key.clone(), search)),
    ];
    let gemini = Arc::new(Gemini::new(config.gemini_api_key.clone(), config.gemini_model.clone()));

    let collaborators = Collaborators {
        downloader: Arc::new(HttpMediaDownloader::new(&config.media_dir)),
        prompter: gemini.clone(),
        scorer: Arc::new(HttpManipulationScorer::new(config.scorer_url.clone())),
        generator: gemini,
        sources,
        store: record_store(&config).await?,
        sender: Arc::new(InstagramService::new(InstagramOptions::new(
            config.instagram_access_token.clone(),
        ))),
    };
    let pipeline = PipelineConfig {
        matcher: MatcherConfig {
            top_n: config.evidence_top_n,
            similarity_threshold: config.similarity_threshold,
        },
        verifier: VerifierConfig {
            subclaim_count: config.subclaim_count,
            response_language: config.response_language.clone(),
        },
        related_news: config.related_news,
        dispatch: Dispatch::Inline,
    };

    let orchestrator = Orchestrator::new(collaborators, pipeline);
    match orchestrator.run(event).await? {
        RunOutcome::Duplicate => info!("Request was already processed"),
        RunOutcome::Completed | RunOutcome::Dispatched => info!("Done"),
    }
    Ok(())
}
