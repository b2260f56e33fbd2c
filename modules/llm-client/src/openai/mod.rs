mod client;
pub(crate) mod types;

use async_trait::async_trait;

use crate::error::CompletionError;
use crate::traits::{CompletionRequest, Completer, EmbedClient};

use client::OpenAiClient;

/// OpenAI-compatible chat + embeddings client. Point `base_url` at any
/// compatible provider.
#[derive(Clone)]
pub struct OpenAi {
    api_key: String,
    model: String,
    embedding_model: String,
    base_url: Option<String>,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            embedding_model: "text-embedding-3-small".to_string(),
            base_url: None,
        }
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn client(&self) -> OpenAiClient {
        let client = OpenAiClient::new(&self.api_key);
        if let Some(ref url) = self.base_url {
            client.with_base_url(url)
        } else {
            client
        }
    }
}

#[async_trait]
impl Completer for OpenAi {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let mut messages = Vec::new();
        if let Some(ref system) = request.system {
            messages.push(types::WireMessage::system(system));
        }
        messages.push(types::WireMessage::user(&request.prompt));

        let wire = types::ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self.client().chat(&wire).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(CompletionError::EmptyResponse)
    }
}

#[async_trait]
impl EmbedClient for OpenAi {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, CompletionError> {
        self.client().embed(&self.embedding_model, text).await
    }
}
