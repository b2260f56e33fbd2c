use thiserror::Error;

/// A single prompt-completion or embedding call failing.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The model answered with an empty or whitespace-only completion.
    /// Treated as retryable, same as a failed call.
    #[error("model returned an empty completion")]
    EmptyResponse,

    #[error("malformed API response: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum GatewayError {
    /// All attempts used up. Carries the last underlying failure.
    #[error("gave up after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: CompletionError,
    },

    #[error("cancelled while waiting to retry")]
    Cancelled,
}

impl GatewayError {
    pub fn attempts(&self) -> Option<u32> {
        match self {
            GatewayError::Exhausted { attempts, .. } => Some(*attempts),
            GatewayError::Cancelled => None,
        }
    }
}
