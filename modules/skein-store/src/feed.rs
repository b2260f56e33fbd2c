use async_trait::async_trait;
use sqlx::postgres::PgListener;
use tokio::sync::mpsc;
use tracing::info;

use skein_common::{CrawlEvent, SkeinError};

/// Channel the crawler notifies on when a page lands in the store.
pub const CRAWLED_CHANNEL: &str = "crawled";

/// Single-consumer subscription to "page crawled" notifications.
///
/// `recv` is the worker's sole suspension point between messages; `None`
/// means the feed is closed and the loop should end.
#[async_trait]
pub trait CrawlFeed: Send {
    async fn recv(&mut self) -> Result<Option<CrawlEvent>, SkeinError>;
}

/// Production feed: Postgres LISTEN on the `crawled` channel. The
/// notification payload is the article's page-store key.
pub struct PgListenFeed {
    listener: PgListener,
}

impl PgListenFeed {
    pub async fn connect(database_url: &str) -> Result<Self, SkeinError> {
        let mut listener = PgListener::connect(database_url)
            .await
            .map_err(|e| SkeinError::Store(format!("listen connect: {e}")))?;
        listener
            .listen(CRAWLED_CHANNEL)
            .await
            .map_err(|e| SkeinError::Store(format!("listen {CRAWLED_CHANNEL}: {e}")))?;

        info!(channel = CRAWLED_CHANNEL, "Subscribed to crawl notifications");
        Ok(Self { listener })
    }
}

#[async_trait]
impl CrawlFeed for PgListenFeed {
    async fn recv(&mut self) -> Result<Option<CrawlEvent>, SkeinError> {
        let notification = self
            .listener
            .recv()
            .await
            .map_err(|e| SkeinError::Store(format!("recv: {e}")))?;

        Ok(Some(CrawlEvent {
            page_id: notification.payload().to_string(),
        }))
    }
}

/// In-process feed over a tokio mpsc channel. Used by tests and by
/// deployments that co-locate the crawler with the worker.
pub struct ChannelFeed {
    rx: mpsc::Receiver<CrawlEvent>,
}

impl ChannelFeed {
    pub fn pair(buffer: usize) -> (mpsc::Sender<CrawlEvent>, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Self { rx })
    }
}

#[async_trait]
impl CrawlFeed for ChannelFeed {
    async fn recv(&mut self) -> Result<Option<CrawlEvent>, SkeinError> {
        Ok(self.rx.recv().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_feed_delivers_in_order_then_closes() {
        let (tx, mut feed) = ChannelFeed::pair(8);

        tx.send(CrawlEvent { page_id: "article:1".into() }).await.unwrap();
        tx.send(CrawlEvent { page_id: "article:2".into() }).await.unwrap();
        drop(tx);

        assert_eq!(feed.recv().await.unwrap().unwrap().page_id, "article:1");
        assert_eq!(feed.recv().await.unwrap().unwrap().page_id, "article:2");
        assert!(feed.recv().await.unwrap().is_none());
    }
}
