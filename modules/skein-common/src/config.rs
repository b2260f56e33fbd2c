use std::env;
use std::time::Duration;

use crate::error::SkeinError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Page store
    pub database_url: String,
    pub store_backend: StoreBackend,

    // LLM provider
    pub openai_api_key: String,
    pub llm_model: String,
    pub embedding_model: String,
    pub llm_base_url: Option<String>,

    // Gateway retry policy
    pub gateway_max_attempts: u32,
    pub gateway_base_delay: Duration,
    pub gateway_growth_factor: f64,

    // Summarization worker
    pub fail_fast: bool,
    pub content_char_budget: usize,

    // Embedding job
    pub token_budget: usize,
    pub embed_attempts: u32,

    // Clustering
    pub cluster_strategy: String,
}

impl Config {
    /// Configuration for the summarization worker.
    pub fn summarizer_from_env() -> Result<Self, SkeinError> {
        let mut config = Self::base_from_env()?;
        config.openai_api_key = required_env("OPENAI_API_KEY")?;
        if config.store_backend == StoreBackend::Postgres {
            config.database_url = required_env("DATABASE_URL")?;
        }
        Ok(config)
    }

    /// Configuration for the embedding batch job.
    pub fn embed_from_env() -> Result<Self, SkeinError> {
        let mut config = Self::base_from_env()?;
        config.openai_api_key = required_env("OPENAI_API_KEY")?;
        if config.store_backend == StoreBackend::Postgres {
            config.database_url = required_env("DATABASE_URL")?;
        }
        Ok(config)
    }

    /// Configuration for the clustering + theme run. No store access needed,
    /// the dataset comes from a file.
    pub fn cluster_from_env() -> Result<Self, SkeinError> {
        let mut config = Self::base_from_env()?;
        config.openai_api_key = required_env("OPENAI_API_KEY")?;
        Ok(config)
    }

    fn base_from_env() -> Result<Self, SkeinError> {
        let store_backend = match env::var("STORE_BACKEND").as_deref() {
            Ok("memory") => StoreBackend::Memory,
            Ok("postgres") | Err(_) => StoreBackend::Postgres,
            Ok(other) => {
                return Err(SkeinError::Config(format!(
                    "STORE_BACKEND must be 'postgres' or 'memory', got '{other}'"
                )))
            }
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL").unwrap_or_default(),
            store_backend,
            openai_api_key: String::new(),
            llm_model: env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            embedding_model: env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
            llm_base_url: env::var("LLM_BASE_URL").ok(),
            gateway_max_attempts: parsed_env("GATEWAY_MAX_ATTEMPTS", 3)?,
            gateway_base_delay: Duration::from_millis(parsed_env(
                "GATEWAY_BASE_DELAY_MS",
                1000,
            )?),
            gateway_growth_factor: parsed_env("GATEWAY_GROWTH_FACTOR", 1.1)?,
            fail_fast: parsed_env("WORKER_FAIL_FAST", false)?,
            content_char_budget: parsed_env("CONTENT_CHAR_BUDGET", 48_000)?,
            token_budget: parsed_env("TOKEN_BUDGET", 8000)?,
            embed_attempts: parsed_env("EMBED_ATTEMPTS", 1)?,
            cluster_strategy: env::var("CLUSTER_STRATEGY").unwrap_or_else(|_| "gmm".to_string()),
        })
    }
}

fn required_env(key: &str) -> Result<String, SkeinError> {
    env::var(key).map_err(|_| SkeinError::Config(format!("{key} environment variable is required")))
}

fn parsed_env<T>(key: &str, default: T) -> Result<T, SkeinError>
where
    T: std::str::FromStr,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| SkeinError::Config(format!("{key} has an invalid value: '{raw}'"))),
        Err(_) => Ok(default),
    }
}
