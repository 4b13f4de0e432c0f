//! Commercial opportunity scoring
//!
//! `lexicon` holds the static word tables, `scorer` combines them with
//! optional market data from `market`, and `blue_ocean` filters provider
//! records down to low-competition opportunities.

pub mod blue_ocean;
pub mod lexicon;
pub mod market;
pub mod scorer;
pub mod summary;

pub use blue_ocean::{find_blue_ocean, is_blue_ocean, BlueOceanCriteria, BlueOceanKeyword};
pub use market::{KeywordRecord, MarketDataClient, MarketDataProvider};
pub use scorer::{score_record, score_rule_based, KeywordScorer, ScoreOutcome, ScoredKeyword};
pub use summary::{summarize, SuggestionSummary};
