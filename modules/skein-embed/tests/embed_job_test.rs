//! Batch embedding job behavior against an in-memory store and a fake
//! embedding service.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use llm_client::{CompletionError, EmbedClient};
use skein_common::{dataset, Article, Summary, Tag};
use skein_embed::{build_combined, estimate_tokens, ArticleSource, EmbedJob, EmbedJobConfig};
use skein_store::{MemoryStore, PageStore};

/// Embedder returning a fixed 3-dim vector; counts calls and can be told to
/// fail the first N calls.
#[derive(Clone)]
struct FakeEmbedder {
    calls: Arc<AtomicU32>,
    fail_first: Arc<AtomicU32>,
}

impl FakeEmbedder {
    fn new() -> Self {
        Self {
            calls: Arc::new(AtomicU32::new(0)),
            fail_first: Arc::new(AtomicU32::new(0)),
        }
    }

    fn failing_first(n: u32) -> Self {
        let embedder = Self::new();
        embedder.fail_first.store(n, Ordering::SeqCst);
        embedder
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbedClient for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self
            .fail_first
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(CompletionError::Malformed("embedding service down".into()));
        }
        Ok(vec![text.len() as f32, 1.0, 2.0])
    }
}

async fn seed(store: &MemoryStore, id: &str, link: &str, with_summary: bool) {
    store
        .put_article(
            id,
            &Article {
                link: link.to_string(),
                title: format!("Title {id}"),
                readable_text: "body".to_string(),
            },
        )
        .await
        .unwrap();
    if with_summary {
        store
            .put_summary(
                link,
                &Summary {
                    summary: format!("Summary for {id}"),
                    title: None,
                    tags: vec![Tag { tag: "news".to_string() }],
                },
            )
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn pages_without_summaries_are_excluded() {
    let store = MemoryStore::new();
    seed(&store, "1", "https://a.test/1", true).await;
    seed(&store, "2", "https://a.test/2", false).await;
    seed(&store, "3", "https://a.test/3", true).await;

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("embeddings.jsonl");

    let embedder = FakeEmbedder::new();
    let job = EmbedJob::new(store, embedder.clone(), EmbedJobConfig::default());
    let records = job.run(&ArticleSource::All, &out).await.unwrap();

    let links: Vec<&str> = records.iter().map(|r| r.link.as_str()).collect();
    assert_eq!(links, vec!["https://a.test/1", "https://a.test/3"]);
    // one embedding call per retained record, none for the skipped page
    assert_eq!(embedder.calls(), 2);
}

#[tokio::test]
async fn token_budget_boundary_is_inclusive() {
    let store = MemoryStore::new();
    seed(&store, "1", "https://a.test/1", true).await;

    // Recompute exactly what the job will count for this record.
    let combined = build_combined("Title 1", &["news".to_string()], "Summary for 1");
    let exact = estimate_tokens(&combined);

    let dir = tempfile::tempdir().unwrap();

    // Budget == count: included.
    let job = EmbedJob::new(
        store.clone(),
        FakeEmbedder::new(),
        EmbedJobConfig {
            token_budget: exact,
            embed_attempts: 1,
        },
    );
    let records = job
        .run(&ArticleSource::All, &dir.path().join("in.jsonl"))
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].n_tokens, exact);

    // Budget one short: excluded, silently.
    let job = EmbedJob::new(
        store,
        FakeEmbedder::new(),
        EmbedJobConfig {
            token_budget: exact - 1,
            embed_attempts: 1,
        },
    );
    let records = job
        .run(&ArticleSource::All, &dir.path().join("out.jsonl"))
        .await
        .unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn id_file_mode_reads_explicit_ids() {
    let store = MemoryStore::new();
    seed(&store, "1", "https://a.test/1", true).await;
    seed(&store, "2", "https://a.test/2", true).await;

    let dir = tempfile::tempdir().unwrap();
    let ids_path = dir.path().join("ids.txt");
    std::fs::write(&ids_path, "article:2\n\n  \n").unwrap();

    let job = EmbedJob::new(store, FakeEmbedder::new(), EmbedJobConfig::default());
    let records = job
        .run(&ArticleSource::File(ids_path), &dir.path().join("out.jsonl"))
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].link, "https://a.test/2");
}

#[tokio::test]
async fn dataset_file_round_trips() {
    let store = MemoryStore::new();
    seed(&store, "1", "https://a.test/1", true).await;

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("embeddings.jsonl");

    let job = EmbedJob::new(store, FakeEmbedder::new(), EmbedJobConfig::default());
    let records = job.run(&ArticleSource::All, &out).await.unwrap();

    let back = dataset::read_records(&out).unwrap();
    assert_eq!(back.len(), records.len());
    assert_eq!(back[0].link, records[0].link);
    assert_eq!(back[0].combined, records[0].combined);
    assert_eq!(back[0].embedding, records[0].embedding);
}

#[tokio::test]
async fn embedding_failure_propagates_without_retry_by_default() {
    let store = MemoryStore::new();
    seed(&store, "1", "https://a.test/1", true).await;

    let dir = tempfile::tempdir().unwrap();
    let embedder = FakeEmbedder::failing_first(1);
    let job = EmbedJob::new(store, embedder.clone(), EmbedJobConfig::default());

    let err = job
        .run(&ArticleSource::All, &dir.path().join("out.jsonl"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Embedding error"));
    assert_eq!(embedder.calls(), 1);
}

#[tokio::test]
async fn embed_attempts_opts_in_to_retry() {
    let store = MemoryStore::new();
    seed(&store, "1", "https://a.test/1", true).await;

    let dir = tempfile::tempdir().unwrap();
    let embedder = FakeEmbedder::failing_first(1);
    let job = EmbedJob::new(
        store,
        embedder.clone(),
        EmbedJobConfig {
            token_budget: 8000,
            embed_attempts: 2,
        },
    );

    let records = job
        .run(&ArticleSource::All, &dir.path().join("out.jsonl"))
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(embedder.calls(), 2);
}
