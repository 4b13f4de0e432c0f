//! Keyword Miner - autosuggest keyword expansion and opportunity scoring
//!
//! Expands a seed keyword into lexical variants, collects search autosuggest
//! completions for each of them, and ranks the resulting keyword universe by
//! commercial opportunity.

pub mod analysis;
pub mod config;
pub mod error;
pub mod insights;
pub mod scoring;
pub mod store;
pub mod suggest;
pub mod types;
pub mod variants;

// Re-export commonly used types
pub use error::{KeywordMinerError, Result};
pub use types::{
    CompetitionLevel, FetchConfig, IntentType, MetricsSnapshot, OpportunityMetrics,
    PerformanceMetrics, RunStatus, ScoringConfig, VariantType,
};

// Re-export main functionality
pub use analysis::{AnalysisRun, KeywordService, ProgressReport, RunSummary};
pub use config::Settings;
pub use insights::{Insights, Tier};
pub use scoring::KeywordScorer;
pub use suggest::{BaiduSuggestClient, BatchFetcher, SuggestionSource};
pub use variants::VariantGenerator;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library
pub fn init() -> Result<()> {
    // Load .env file if it exists
    dotenv::dotenv().ok();
    Ok(())
}
