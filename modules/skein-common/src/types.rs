use serde::{Deserialize, Serialize};

/// Bus notification that a crawled page is ready for summarization.
/// The payload is the page-store key of the article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlEvent {
    pub page_id: String,
}

/// A crawled page, written by the external crawler at `article:<id>`.
/// Read-only here. Unknown fields in the stored JSON are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub link: String,
    pub title: String,
    #[serde(default)]
    pub readable_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub tag: String,
}

/// Generated summary, written once per url at `summary:<url>`.
/// Later writes for the same url are idempotent overwrites.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

/// One row of the embedding dataset. Recomputed on every embed run;
/// serialized as one JSON object per line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub link: String,
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub combined: String,
    pub n_tokens: usize,
    pub embedding: Vec<f32>,
}

/// One element of the final cluster artifact, ordered by cluster id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterRecord {
    pub posts: Vec<String>,
    pub theme: String,
}

/// Key of the stored article JSON.
pub fn article_key(id: &str) -> String {
    if id.starts_with("article:") {
        id.to_string()
    } else {
        format!("article:{id}")
    }
}

/// Key of the stored summary JSON.
pub fn summary_key(url: &str) -> String {
    format!("summary:{url}")
}
