use async_trait::async_trait;

use skein_common::{Article, SkeinError, Summary};

/// Key/value page store shared with the external crawler.
///
/// The crawler writes `article:<id>` keys; the worker writes `summary:<url>`
/// keys. Absent keys are `Ok(None)` — readers tolerate partial or late crawl
/// data. No transactions: consistency relies on write-once article keys and
/// last-writer-wins summaries.
#[async_trait]
pub trait PageStore: Send + Sync {
    async fn get_article(&self, key: &str) -> Result<Option<Article>, SkeinError>;

    async fn get_summary(&self, url: &str) -> Result<Option<Summary>, SkeinError>;

    /// Idempotent overwrite: a later summary for the same url replaces the
    /// earlier one.
    async fn put_summary(&self, url: &str, summary: &Summary) -> Result<(), SkeinError>;

    /// Full keyspace scan of stored article keys, in key order.
    async fn article_keys(&self) -> Result<Vec<String>, SkeinError>;
}

#[async_trait]
impl<T: PageStore + ?Sized> PageStore for std::sync::Arc<T> {
    async fn get_article(&self, key: &str) -> Result<Option<Article>, SkeinError> {
        (**self).get_article(key).await
    }

    async fn get_summary(&self, url: &str) -> Result<Option<Summary>, SkeinError> {
        (**self).get_summary(url).await
    }

    async fn put_summary(&self, url: &str, summary: &Summary) -> Result<(), SkeinError> {
        (**self).put_summary(url, summary).await
    }

    async fn article_keys(&self) -> Result<Vec<String>, SkeinError> {
        (**self).article_keys().await
    }
}
