use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{info, warn};

use llm_client::EmbedClient;
use skein_common::{dataset, EmbeddingRecord, SkeinError};
use skein_store::PageStore;

use crate::combined::build_combined;
use crate::tokens::estimate_tokens;

/// Where the article ids come from: an explicit list file (one id per line)
/// or a full keyspace scan of the page store.
#[derive(Debug, Clone)]
pub enum ArticleSource {
    All,
    File(PathBuf),
}

impl ArticleSource {
    /// CLI form: the literal `all`, or a path to an id file.
    pub fn parse(raw: &str) -> Self {
        if raw == "all" {
            ArticleSource::All
        } else {
            ArticleSource::File(PathBuf::from(raw))
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmbedJobConfig {
    /// Records whose combined text exceeds this are dropped, logged.
    pub token_budget: usize,
    /// Embedding call attempts per record. 1 means a failure propagates
    /// immediately — unlike the LLM gateway, embeddings are not retried
    /// unless asked for.
    pub embed_attempts: u32,
}

impl Default for EmbedJobConfig {
    fn default() -> Self {
        Self {
            token_budget: 8000,
            embed_attempts: 1,
        }
    }
}

/// Single-pass batch job: page + summary pairs in, embedding dataset out.
pub struct EmbedJob<S, E> {
    store: S,
    embedder: E,
    config: EmbedJobConfig,
}

impl<S, E> EmbedJob<S, E>
where
    S: PageStore,
    E: EmbedClient,
{
    pub fn new(store: S, embedder: E, config: EmbedJobConfig) -> Self {
        Self {
            store,
            embedder,
            config,
        }
    }

    /// Run the job and write the dataset to `output_path`. Returns the
    /// retained records in output order.
    pub async fn run(
        &self,
        source: &ArticleSource,
        output_path: &Path,
    ) -> Result<Vec<EmbeddingRecord>> {
        let ids = self.article_ids(source).await?;
        info!(count = ids.len(), "embedding run over article ids");

        let mut records = Vec::new();
        for id in &ids {
            if let Some(record) = self.build_record(id).await? {
                records.push(record);
            }
        }

        dataset::write_records(output_path, &records)?;
        info!(
            retained = records.len(),
            output = %output_path.display(),
            "embedding dataset written"
        );
        Ok(records)
    }

    async fn article_ids(&self, source: &ArticleSource) -> Result<Vec<String>> {
        match source {
            ArticleSource::All => Ok(self.store.article_keys().await?),
            ArticleSource::File(path) => {
                let raw = std::fs::read_to_string(path)
                    .map_err(|e| SkeinError::Io(format!("{}: {e}", path.display())))?;
                Ok(raw
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .collect())
            }
        }
    }

    async fn build_record(&self, id: &str) -> Result<Option<EmbeddingRecord>> {
        let Some(article) = self.store.get_article(id).await? else {
            info!(id, "article missing, skipping");
            return Ok(None);
        };
        let Some(summary) = self.store.get_summary(&article.link).await? else {
            info!(link = article.link.as_str(), "no summary yet, skipping");
            return Ok(None);
        };

        let tags: Vec<String> = summary.tags.iter().map(|t| t.tag.clone()).collect();
        let combined = build_combined(&article.title, &tags, &summary.summary);
        let n_tokens = estimate_tokens(&combined);

        if n_tokens > self.config.token_budget {
            warn!(
                link = article.link.as_str(),
                n_tokens,
                budget = self.config.token_budget,
                "combined text over token budget, dropping"
            );
            return Ok(None);
        }

        let embedding = self.embed_with_attempts(&combined).await?;

        Ok(Some(EmbeddingRecord {
            link: article.link,
            title: article.title,
            summary: summary.summary,
            tags,
            combined,
            n_tokens,
            embedding,
        }))
    }

    async fn embed_with_attempts(&self, text: &str) -> Result<Vec<f32>> {
        let attempts = self.config.embed_attempts.max(1);
        let mut last_err = None;
        for attempt in 0..attempts {
            match self.embedder.embed(text).await {
                Ok(vector) => return Ok(vector),
                Err(e) => {
                    if attempt + 1 < attempts {
                        warn!(attempt = attempt + 1, error = %e, "embedding call failed, retrying");
                    }
                    last_err = Some(e);
                }
            }
        }
        // attempts >= 1, so last_err is set on this path
        let err = last_err.map(|e| e.to_string()).unwrap_or_default();
        Err(SkeinError::Embedding(err).into())
    }
}
