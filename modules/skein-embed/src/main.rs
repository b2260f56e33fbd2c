use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use llm_client::OpenAi;
use skein_common::{Config, StoreBackend};
use skein_embed::{ArticleSource, EmbedJob, EmbedJobConfig};
use skein_store::{MemoryStore, PageStore, PostgresStore};

#[derive(Parser)]
#[command(
    name = "skein-embed",
    about = "Embed summarized pages into a JSON Lines vector dataset"
)]
struct Cli {
    /// Path to a file of article ids (one per line), or 'all' to scan the store
    articles_source: String,

    /// Output dataset path (JSON Lines)
    output_path: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Usage errors exit 1, matching the other batch jobs.
    let cli = Cli::try_parse().unwrap_or_else(|e| {
        eprintln!("{e}");
        std::process::exit(1);
    });

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("skein_embed=info".parse()?)
                .add_directive("skein_store=info".parse()?),
        )
        .init();

    let config = Config::embed_from_env()?;

    let store: Arc<dyn PageStore> = match config.store_backend {
        StoreBackend::Postgres => Arc::new(PostgresStore::connect(&config.database_url).await?),
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };

    let mut embedder = OpenAi::new(&config.openai_api_key, &config.llm_model)
        .with_embedding_model(&config.embedding_model);
    if let Some(ref base_url) = config.llm_base_url {
        embedder = embedder.with_base_url(base_url);
    }

    let job = EmbedJob::new(
        store,
        embedder,
        EmbedJobConfig {
            token_budget: config.token_budget,
            embed_attempts: config.embed_attempts,
        },
    );

    let source = ArticleSource::parse(&cli.articles_source);
    let records = job.run(&source, &cli.output_path).await?;
    info!(records = records.len(), "embed job done");
    Ok(())
}
