//! Autosuggest fetching module

pub mod batch;
pub mod fetcher;

// Re-export main functionality
pub use batch::BatchFetcher;
pub use fetcher::BaiduSuggestClient;

use crate::error::Result;
use async_trait::async_trait;

/// Trait for autosuggest sources
#[async_trait]
pub trait SuggestionSource: Send + Sync {
    /// Fetch suggestions for one query in source relevance order.
    ///
    /// Returns an error once the source has given up on the query.
    async fn try_fetch(&self, query: &str) -> Result<Vec<String>>;

    /// Get the source name
    fn name(&self) -> &'static str;

    /// Fetch suggestions, degrading any failure to an empty list
    async fn fetch(&self, query: &str) -> Vec<String> {
        match self.try_fetch(query).await {
            Ok(suggestions) => suggestions,
            Err(e) => {
                tracing::error!(
                    source = self.name(),
                    query = %query,
                    kind = e.kind(),
                    error = %e,
                    "Giving up on query"
                );
                Vec::new()
            }
        }
    }
}
