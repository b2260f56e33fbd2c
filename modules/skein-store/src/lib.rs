pub mod feed;
pub mod memory;
pub mod postgres;
pub mod store;

pub use feed::{ChannelFeed, CrawlFeed, PgListenFeed};
pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use store::PageStore;
