use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::info;

use skein_common::{article_key, summary_key, Article, SkeinError, Summary};

use crate::store::PageStore;

/// Durable page store: one kv table, JSONB values, upsert writes.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(database_url: &str) -> Result<Self, SkeinError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| SkeinError::Store(format!("connect: {e}")))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS pages (
                key TEXT PRIMARY KEY,
                value JSONB NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| SkeinError::Store(format!("migrate: {e}")))?;

        info!("Connected to Postgres page store");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn get_value(&self, key: &str) -> Result<Option<serde_json::Value>, SkeinError> {
        let row = sqlx::query("SELECT value FROM pages WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| SkeinError::Store(format!("get {key}: {e}")))?;

        Ok(row.map(|r| r.get::<serde_json::Value, _>("value")))
    }
}

#[async_trait]
impl PageStore for PostgresStore {
    async fn get_article(&self, key: &str) -> Result<Option<Article>, SkeinError> {
        match self.get_value(&article_key(key)).await? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| SkeinError::DataFormat(format!("article {key}: {e}"))),
            None => Ok(None),
        }
    }

    async fn get_summary(&self, url: &str) -> Result<Option<Summary>, SkeinError> {
        match self.get_value(&summary_key(url)).await? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| SkeinError::DataFormat(format!("summary {url}: {e}"))),
            None => Ok(None),
        }
    }

    async fn put_summary(&self, url: &str, summary: &Summary) -> Result<(), SkeinError> {
        let value = serde_json::to_value(summary)
            .map_err(|e| SkeinError::DataFormat(e.to_string()))?;

        sqlx::query(
            "INSERT INTO pages (key, value) VALUES ($1, $2)
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
        )
        .bind(summary_key(url))
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| SkeinError::Store(format!("put summary {url}: {e}")))?;

        Ok(())
    }

    async fn article_keys(&self) -> Result<Vec<String>, SkeinError> {
        let rows = sqlx::query("SELECT key FROM pages WHERE key LIKE 'article:%' ORDER BY key")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SkeinError::Store(format!("scan article keys: {e}")))?;

        Ok(rows.iter().map(|r| r.get::<String, _>("key")).collect())
    }
}
