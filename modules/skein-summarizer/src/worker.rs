use anyhow::Result;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use llm_client::{Completer, Gateway, GatewayError};
use skein_common::{CrawlEvent, Summary};
use skein_store::{CrawlFeed, PageStore};

use crate::prompts;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// When true, an exhausted gateway call for one page ends the whole run
    /// (the historically observed behavior). Default is to isolate the
    /// failure, count it, and keep consuming.
    pub fail_fast: bool,
    /// Readable text is truncated to this many bytes before prompting.
    pub content_char_budget: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            fail_fast: false,
            content_char_budget: 48_000,
        }
    }
}

/// Counters for the run, logged when the loop ends.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    pub processed: u64,
    pub skipped: u64,
    pub failed: u64,
}

enum Outcome {
    Processed,
    Skipped,
}

/// Event-driven summarization worker.
///
/// Single consumer: one crawl event is fully processed, including both
/// gateway calls and their backoff sleeps, before the next receive. Runs
/// until the feed closes or shutdown fires.
pub struct Worker<C, S, F> {
    gateway: Gateway<C>,
    store: S,
    feed: F,
    config: WorkerConfig,
    shutdown: watch::Receiver<bool>,
}

impl<C, S, F> Worker<C, S, F>
where
    C: Completer,
    S: PageStore,
    F: CrawlFeed,
{
    pub fn new(
        gateway: Gateway<C>,
        store: S,
        feed: F,
        config: WorkerConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            gateway,
            store,
            feed,
            config,
            shutdown,
        }
    }

    pub async fn run(mut self) -> Result<WorkerReport> {
        let mut report = WorkerReport::default();

        loop {
            debug!("waiting for crawl event");
            let event = tokio::select! {
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        info!("shutdown requested, stopping worker");
                        break;
                    }
                    continue;
                }
                event = self.feed.recv() => event?,
            };

            let Some(event) = event else {
                info!("crawl feed closed");
                break;
            };

            match self.handle(&event).await {
                Ok(Outcome::Processed) => report.processed += 1,
                Ok(Outcome::Skipped) => report.skipped += 1,
                Err(e) => {
                    if matches!(
                        e.downcast_ref::<GatewayError>(),
                        Some(GatewayError::Cancelled)
                    ) {
                        info!("cancelled mid-page, stopping worker");
                        break;
                    }
                    if self.config.fail_fast {
                        error!(page_id = event.page_id.as_str(), error = %e, "page failed, aborting");
                        return Err(e);
                    }
                    warn!(page_id = event.page_id.as_str(), error = %e, "page failed, continuing");
                    report.failed += 1;
                }
            }
        }

        info!(
            processed = report.processed,
            skipped = report.skipped,
            failed = report.failed,
            "worker run complete"
        );
        Ok(report)
    }

    async fn handle(&mut self, event: &CrawlEvent) -> Result<Outcome> {
        let Some(article) = self.store.get_article(&event.page_id).await? else {
            // Late or partial crawl data, the page may land later.
            info!(page_id = event.page_id.as_str(), "no article for event, skipping");
            return Ok(Outcome::Skipped);
        };

        debug!(url = article.link.as_str(), "summarizing page");
        let content =
            prompts::truncate_content(&article.readable_text, self.config.content_char_budget);

        let summary_text = self
            .gateway
            .invoke_with_cancel(
                &prompts::summary_request(&article.link, content),
                &mut self.shutdown,
            )
            .await?;

        let title_text = self
            .gateway
            .invoke_with_cancel(&prompts::title_request(content), &mut self.shutdown)
            .await?;
        let title = prompts::strip_title_quotes(&title_text);

        let summary = Summary {
            summary: summary_text,
            title: Some(title),
            tags: Vec::new(),
        };
        self.store.put_summary(&article.link, &summary).await?;

        info!(url = article.link.as_str(), "summary stored");
        Ok(Outcome::Processed)
    }
}
