use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use llm_client::{Gateway, OpenAi, RetryPolicy};
use skein_common::{Config, Shutdown, SkeinError, StoreBackend};
use skein_store::{PgListenFeed, PostgresStore};
use skein_summarizer::{Worker, WorkerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("skein_summarizer=info".parse()?)
                .add_directive("skein_store=info".parse()?)
                .add_directive("llm_client=info".parse()?),
        )
        .init();

    info!("Skein summarization worker starting...");

    let config = Config::summarizer_from_env()?;
    if config.store_backend != StoreBackend::Postgres {
        return Err(SkeinError::Config(
            "the summarization worker requires STORE_BACKEND=postgres".to_string(),
        )
        .into());
    }

    let store = PostgresStore::connect(&config.database_url).await?;
    let feed = PgListenFeed::connect(&config.database_url).await?;

    let mut llm = OpenAi::new(&config.openai_api_key, &config.llm_model);
    if let Some(ref base_url) = config.llm_base_url {
        llm = llm.with_base_url(base_url);
    }
    let gateway = Gateway::new(
        llm,
        RetryPolicy {
            max_attempts: config.gateway_max_attempts,
            base_delay: config.gateway_base_delay,
            growth_factor: config.gateway_growth_factor,
        },
    );

    let shutdown = Shutdown::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received");
            signal.trigger();
        }
    });

    let worker = Worker::new(
        gateway,
        store,
        feed,
        WorkerConfig {
            fail_fast: config.fail_fast,
            content_char_budget: config.content_char_budget,
        },
        shutdown.subscribe(),
    );

    let report = worker.run().await?;
    info!(
        processed = report.processed,
        skipped = report.skipped,
        failed = report.failed,
        "worker exited"
    );
    Ok(())
}
