pub mod prompts;
pub mod worker;

pub use worker::{Worker, WorkerConfig, WorkerReport};
