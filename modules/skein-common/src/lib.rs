pub mod config;
pub mod dataset;
pub mod error;
pub mod shutdown;
pub mod types;

pub use config::{Config, StoreBackend};
pub use error::SkeinError;
pub use shutdown::Shutdown;
pub use types::*;
