pub mod error;
pub mod gateway;
pub mod openai;
pub mod traits;

pub use error::{CompletionError, GatewayError};
pub use gateway::{Gateway, RetryPolicy};
pub use openai::OpenAi;
pub use traits::{CompletionRequest, Completer, EmbedClient};
