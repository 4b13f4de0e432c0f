//! Bounded-concurrency batch fetching

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use tokio::sync::Semaphore;

use super::SuggestionSource;

/// Runs a [`SuggestionSource`] over many queries with a concurrency cap
#[derive(Clone)]
pub struct BatchFetcher {
    source: Arc<dyn SuggestionSource>,
}

impl BatchFetcher {
    pub fn new(source: Arc<dyn SuggestionSource>) -> Self {
        Self { source }
    }

    /// Fetch every query with at most `concurrency` requests in flight.
    ///
    /// Completions are yielded in finish order. A failed query yields an empty list.
    pub fn completions(
        &self,
        queries: &[String],
        concurrency: usize,
    ) -> FuturesUnordered<BoxFuture<'static, (String, Vec<String>)>> {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));

        queries
            .iter()
            .cloned()
            .map(|query| {
                let source = Arc::clone(&self.source);
                let semaphore = Arc::clone(&semaphore);
                async move {
                    let _permit = semaphore.acquire_owned().await.ok();
                    let suggestions = source.fetch(&query).await;
                    (query, suggestions)
                }
                .boxed()
            })
            .collect()
    }

    /// Fetch a batch and collect results keyed by query.
    ///
    /// `on_progress(processed, total)` runs after every completed query.
    pub async fn fetch_batch<F>(
        &self,
        queries: &[String],
        concurrency: usize,
        mut on_progress: F,
    ) -> HashMap<String, Vec<String>>
    where
        F: FnMut(usize, usize),
    {
        let batch_start = Instant::now();
        let total = queries.len();
        let mut processed = 0usize;
        let mut empty = 0usize;
        let mut results = HashMap::with_capacity(total);

        let mut pending = self.completions(queries, concurrency);
        while let Some((query, suggestions)) = pending.next().await {
            processed += 1;
            if suggestions.is_empty() {
                empty += 1;
            }
            results.insert(query, suggestions);
            on_progress(processed, total);
        }

        tracing::info!(
            source = self.source.name(),
            queries_requested = %total,
            queries_empty = %empty,
            concurrency = %concurrency,
            batch_duration_ms = %batch_start.elapsed().as_millis(),
            "Batch suggest fetch completed"
        );

        results
    }
}
