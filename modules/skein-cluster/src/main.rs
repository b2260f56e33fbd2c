use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use llm_client::{Gateway, OpenAi, RetryPolicy};
use skein_cluster::{
    cluster_count, group_records, label_clusters, load_dataset, ClusterStrategy, GaussianMixture,
    KMeans,
};
use skein_common::{dataset, Config, SkeinError};

#[derive(Parser)]
#[command(
    name = "skein-cluster",
    about = "Cluster an embedding dataset and label each cluster with a theme"
)]
struct Cli {
    /// Embedding dataset path (JSON Lines, as written by skein-embed)
    dataset_path: PathBuf,

    /// Output path for the cluster artifact (JSON)
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
                .add_directive("skein_cluster=info".parse()?)
                .add_directive("llm_client=info".parse()?),
        )
        .init();

    let config = Config::cluster_from_env()?;

    let records = load_dataset(&cli.dataset_path)?;
    if records.is_empty() {
        return Err(SkeinError::DataFormat("dataset has no records".to_string()).into());
    }

    let k = cluster_count(records.len());
    info!(records = records.len(), k, strategy = config.cluster_strategy.as_str(), "clustering");

    let strategy: Box<dyn ClusterStrategy> = match config.cluster_strategy.as_str() {
        "kmeans" => Box::new(KMeans::default()),
        "gmm" => Box::new(GaussianMixture::default()),
        other => {
            return Err(SkeinError::Config(format!(
                "CLUSTER_STRATEGY must be 'gmm' or 'kmeans', got '{other}'"
            ))
            .into())
        }
    };

    let vectors: Vec<Vec<f32>> = records.iter().map(|r| r.embedding.clone()).collect();
    let assignments = strategy.fit(&vectors, k)?;
    let groups = group_records(&records, &assignments, k);

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

    let artifact = label_clusters(&gateway, &groups).await?;
    dataset::write_json(&cli.output_path, &artifact)?;

    info!(
        clusters = artifact.len(),
        output = %cli.output_path.display(),
        "cluster artifact written"
    );
    Ok(())
}
