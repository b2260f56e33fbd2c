use async_trait::async_trait;

use crate::error::CompletionError;

/// A single prompt-completion request. The model is chosen by the client,
/// the caller controls sampling and output length per request.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// One prompt in, one completion out. Implemented by [`crate::OpenAi`] and by
/// scripted fakes in tests.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}

/// Turns a text into a fixed-length vector.
#[async_trait]
pub trait EmbedClient: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, CompletionError>;
}
