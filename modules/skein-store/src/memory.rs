use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use skein_common::{article_key, summary_key, Article, SkeinError, Summary};

use crate::store::PageStore;

/// In-memory page store. Backs the `memory` store backend and every worker /
/// batch-job test. BTreeMap so `article_keys` scans come back in key order.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<BTreeMap<String, serde_json::Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an article the way the external crawler would.
    pub async fn put_article(&self, id: &str, article: &Article) -> Result<(), SkeinError> {
        let value = serde_json::to_value(article)
            .map_err(|e| SkeinError::DataFormat(e.to_string()))?;
        self.inner.write().await.insert(article_key(id), value);
        Ok(())
    }

    /// Insert raw JSON under a key, bypassing schema validation. Used by
    /// tests exercising the malformed-payload path.
    pub async fn put_raw(&self, key: &str, value: serde_json::Value) {
        self.inner.write().await.insert(key.to_string(), value);
    }
}

#[async_trait]
impl PageStore for MemoryStore {
    async fn get_article(&self, key: &str) -> Result<Option<Article>, SkeinError> {
        let guard = self.inner.read().await;
        match guard.get(&article_key(key)) {
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| SkeinError::DataFormat(format!("article {key}: {e}"))),
            None => Ok(None),
        }
    }

    async fn get_summary(&self, url: &str) -> Result<Option<Summary>, SkeinError> {
        let guard = self.inner.read().await;
        match guard.get(&summary_key(url)) {
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| SkeinError::DataFormat(format!("summary {url}: {e}"))),
            None => Ok(None),
        }
    }

    async fn put_summary(&self, url: &str, summary: &Summary) -> Result<(), SkeinError> {
        let value = serde_json::to_value(summary)
            .map_err(|e| SkeinError::DataFormat(e.to_string()))?;
        self.inner.write().await.insert(summary_key(url), value);
        Ok(())
    }

    async fn article_keys(&self) -> Result<Vec<String>, SkeinError> {
        let guard = self.inner.read().await;
        Ok(guard
            .keys()
            .filter(|k| k.starts_with("article:"))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(link: &str) -> Article {
        Article {
            link: link.to_string(),
            title: "A title".to_string(),
            readable_text: "Some body text".to_string(),
        }
    }

    #[tokio::test]
    async fn absent_keys_are_none() {
        let store = MemoryStore::new();
        assert!(store.get_article("missing").await.unwrap().is_none());
        assert!(store.get_summary("https://x.test").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn summary_overwrite_is_idempotent() {
        let store = MemoryStore::new();
        let url = "https://x.test/post";

        let first = Summary {
            summary: "first".into(),
            title: None,
            tags: vec![],
        };
        let second = Summary {
            summary: "second".into(),
            title: Some("T".into()),
            tags: vec![],
        };

        store.put_summary(url, &first).await.unwrap();
        store.put_summary(url, &second).await.unwrap();

        let got = store.get_summary(url).await.unwrap().unwrap();
        assert_eq!(got.summary, "second");
        assert_eq!(got.title.as_deref(), Some("T"));
    }

    #[tokio::test]
    async fn article_keys_scans_only_articles() {
        let store = MemoryStore::new();
        store.put_article("b", &article("https://b.test")).await.unwrap();
        store.put_article("a", &article("https://a.test")).await.unwrap();
        store
            .put_summary("https://a.test", &Summary {
                summary: "s".into(),
                title: None,
                tags: vec![],
            })
            .await
            .unwrap();

        let keys = store.article_keys().await.unwrap();
        assert_eq!(keys, vec!["article:a", "article:b"]);
    }

    #[tokio::test]
    async fn malformed_article_is_a_data_format_error() {
        let store = MemoryStore::new();
        store
            .put_raw("article:bad", serde_json::json!({"title": 42}))
            .await;

        let err = store.get_article("bad").await.unwrap_err();
        assert!(matches!(err, SkeinError::DataFormat(_)));
    }
}
