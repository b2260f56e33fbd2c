pub mod combined;
pub mod job;
pub mod tokens;

pub use combined::build_combined;
pub use job::{ArticleSource, EmbedJob, EmbedJobConfig};
pub use tokens::estimate_tokens;
