//! Keyword opportunity scoring
//!
//! Two strategies share one entry point. When a market data record is
//! available the metrics are derived from real traffic and bidding numbers,
//! otherwise they are estimated from the keyword text alone.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use super::blue_ocean::{self, BlueOceanCriteria};
use super::lexicon::{
    self, COMMERCIAL_INDICATORS, DATE_UNIT_CHARS, HIGH_INTENT, INFO_INTENT, LOCATION_TERMS,
    MEDIUM_INTENT, NAVIGATIONAL,
};
use super::market::{KeywordRecord, MarketDataProvider};
use crate::error::{KeywordMinerError, Result};
use crate::types::{CompetitionLevel, IntentType, OpportunityMetrics, ScoringConfig};

const MAX_SEARCH_VOLUME: f64 = 50_000.0;

/// A keyword together with its metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredKeyword {
    pub keyword: String,
    pub metrics: OpportunityMetrics,
}

/// Metrics plus the reason the market data path was skipped, if it was
#[derive(Debug, Clone)]
pub struct ScoreOutcome {
    pub metrics: OpportunityMetrics,
    pub fallback: Option<String>,
}

/// Text-only analysis of a keyword
#[derive(Debug, Clone, Copy, PartialEq)]
struct LexiconAnalysis {
    /// Points from the intent word lists only
    intent_points: f64,
    /// Full rule-based commercial score, unclamped
    total: f64,
    intent: IntentType,
    industry: bool,
}

fn analyze_text(keyword: &str) -> LexiconAnalysis {
    let high = lexicon::count_matches(keyword, HIGH_INTENT);
    let medium = lexicon::count_matches(keyword, MEDIUM_INTENT);
    let info = lexicon::count_matches(keyword, INFO_INTENT);
    let intent_points = 15.0 * high as f64 + 8.0 * medium as f64 + 3.0 * info as f64;

    let mut total = intent_points;

    total += match keyword.chars().count() {
        n if n >= 8 => 20.0,
        n if n >= 5 => 15.0,
        n if n >= 3 => 10.0,
        _ => 5.0,
    };

    if keyword
        .chars()
        .any(|c| c.is_ascii_digit() || ('０'..='９').contains(&c))
    {
        total += 10.0;
    }
    if keyword.chars().any(|c| DATE_UNIT_CHARS.contains(&c)) {
        total += 5.0;
    }
    if lexicon::contains_any(keyword, LOCATION_TERMS) {
        total += 15.0;
    }

    let industry = lexicon::industry_of(keyword).is_some();
    if industry {
        total += 10.0;
    }

    let intent = if high > 0 {
        IntentType::Transactional
    } else if medium > 0 {
        IntentType::Commercial
    } else if info > 0 {
        IntentType::Informational
    } else if lexicon::contains_any(keyword, NAVIGATIONAL) {
        IntentType::Navigational
    } else {
        IntentType::Mixed
    };

    LexiconAnalysis {
        intent_points,
        total,
        intent,
        industry,
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn rule_competition(commercial: f64, siblings: usize) -> CompetitionLevel {
    if commercial >= 70.0 && siblings >= 8 {
        CompetitionLevel::High
    } else if commercial >= 50.0 && siblings >= 5 {
        CompetitionLevel::Medium
    } else if commercial >= 30.0 || siblings >= 3 {
        CompetitionLevel::Low
    } else {
        CompetitionLevel::VeryLow
    }
}

/// Rule-based opportunity: commercial value minus difficulty and competition
pub fn rule_opportunity(commercial: f64, difficulty: f64, competition: CompetitionLevel) -> f64 {
    (commercial - 0.3 * difficulty - competition.penalty()).clamp(0.0, 100.0)
}

/// Estimate metrics from the keyword text. `siblings` is the size of the
/// suggestion list the keyword came from.
pub fn score_rule_based(keyword: &str, siblings: usize) -> OpportunityMetrics {
    let analysis = analyze_text(keyword);
    let commercial = analysis.total.clamp(0.0, 100.0);
    let length = keyword.chars().count() as f64;
    let siblings_f = siblings as f64;

    let competition = rule_competition(commercial, siblings);

    let volume = 1000.0
        * (2.0 - 0.1 * length).max(0.5)
        * (1.0 + commercial / 100.0)
        * (1.0 + 0.1 * siblings_f);

    let mut difficulty = 0.6 * commercial + (2.0 * siblings_f).min(30.0);
    if analysis.industry {
        difficulty += 10.0;
    }
    let difficulty = difficulty.min(100.0);

    OpportunityMetrics {
        commercial_score: round1(commercial),
        intent: analysis.intent,
        competition,
        search_volume: volume.min(MAX_SEARCH_VOLUME) as u32,
        difficulty_score: round1(difficulty),
        opportunity_score: round1(rule_opportunity(commercial, difficulty, competition)),
        blue_ocean: false,
        real_data: false,
    }
}

fn market_competition(record: &KeywordRecord) -> CompetitionLevel {
    let companies = record.bid_company_count;
    if record.bid_grade == 1 || companies >= 20 {
        CompetitionLevel::High
    } else if record.bid_grade == 2 || companies >= 10 {
        CompetitionLevel::Medium
    } else if companies >= 3 {
        CompetitionLevel::Low
    } else {
        CompetitionLevel::VeryLow
    }
}

/// Derive metrics from a market data record
pub fn score_record(
    keyword: &str,
    record: &KeywordRecord,
    criteria: &BlueOceanCriteria,
) -> OpportunityMetrics {
    let analysis = analyze_text(keyword);
    let companies = record.bid_company_count as f64;

    let mut commercial = (3.0 * companies).min(30.0);
    commercial += (10.0 * record.max_bid_price().unwrap_or(0.0)).min(25.0);
    if lexicon::contains_any(&record.traffic_reason, COMMERCIAL_INDICATORS) {
        commercial += 15.0;
    }
    commercial += match record.bid_grade {
        1 => 15.0,
        2 => 8.0,
        _ => 3.0,
    };
    commercial += (0.5 * analysis.intent_points).min(15.0);
    let commercial = commercial.clamp(0.0, 100.0);

    let intent = match analysis.intent {
        IntentType::Mixed if record.bid_company_count > 0 => IntentType::Commercial,
        other => other,
    };

    let daily = record.daily_volume();
    let volume = if daily > 0 {
        30.0 * daily as f64
    } else {
        10.0 * record.index.max(record.mobile_index) as f64
    };

    let grade_points = match record.bid_grade {
        1 => 30.0,
        2 => 15.0,
        _ => 5.0,
    };
    let difficulty = ((2.0 * companies).min(40.0)
        + grade_points
        + (record.index as f64 / 100.0).min(30.0))
    .min(100.0);

    OpportunityMetrics {
        commercial_score: round1(commercial),
        intent,
        competition: market_competition(record),
        search_volume: volume.min(MAX_SEARCH_VOLUME) as u32,
        difficulty_score: round1(difficulty),
        opportunity_score: round1(blue_ocean::market_opportunity_score(record)),
        blue_ocean: blue_ocean::qualifies(keyword, record, criteria),
        real_data: true,
    }
}

/// Scoring entry point with an optional market data strategy
pub struct KeywordScorer {
    provider: Option<Arc<dyn MarketDataProvider>>,
    config: ScoringConfig,
    criteria: BlueOceanCriteria,
    gate: Semaphore,
}

impl KeywordScorer {
    /// Rule-based scorer only
    pub fn new(config: ScoringConfig) -> Self {
        Self::build(None, config)
    }

    pub fn with_provider(provider: Arc<dyn MarketDataProvider>, config: ScoringConfig) -> Self {
        Self::build(Some(provider), config)
    }

    fn build(provider: Option<Arc<dyn MarketDataProvider>>, config: ScoringConfig) -> Self {
        let permits = config.market_concurrency.max(1);
        Self {
            provider,
            config,
            criteria: BlueOceanCriteria::default(),
            gate: Semaphore::new(permits),
        }
    }

    pub fn with_criteria(mut self, criteria: BlueOceanCriteria) -> Self {
        self.criteria = criteria;
        self
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn criteria(&self) -> &BlueOceanCriteria {
        &self.criteria
    }

    pub fn has_market_data(&self) -> bool {
        self.config.use_market_data && self.provider.is_some()
    }

    /// Pure scoring: provider path when `record` is given, rule path otherwise
    pub fn score(
        &self,
        keyword: &str,
        siblings: usize,
        record: Option<&KeywordRecord>,
    ) -> OpportunityMetrics {
        match record {
            Some(record) => score_record(keyword, record, &self.criteria),
            None => score_rule_based(keyword, siblings),
        }
    }

    fn provider(&self) -> Result<&Arc<dyn MarketDataProvider>> {
        match &self.provider {
            Some(provider) if self.config.use_market_data => Ok(provider),
            _ => Err(KeywordMinerError::config("Market data provider is not configured")),
        }
    }

    /// All records the provider returns for `keyword`, one call at a time
    pub async fn related_keywords(&self, keyword: &str) -> Result<Vec<KeywordRecord>> {
        let provider = self.provider()?;
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| KeywordMinerError::internal(format!("Market data gate closed: {}", e)))?;

        let start_time = Instant::now();
        let result = provider.keyword_data(keyword).await;

        tracing::debug!(
            provider = provider.name(),
            keyword = %keyword,
            ok = result.is_ok(),
            duration_ms = %start_time.elapsed().as_millis(),
            "Market data lookup"
        );

        if !self.config.market_pause.is_zero() {
            tokio::time::sleep(self.config.market_pause).await;
        }
        result
    }

    /// Record for exactly `keyword`, if the provider knows it
    pub async fn lookup(&self, keyword: &str) -> Result<Option<KeywordRecord>> {
        let target = keyword.trim();
        Ok(self
            .related_keywords(target)
            .await?
            .into_iter()
            .find(|r| r.keyword.trim() == target))
    }

    /// Score with market data when possible, reporting why it was not used
    pub async fn score_detailed(&self, keyword: &str, siblings: usize) -> ScoreOutcome {
        if !self.has_market_data() {
            return ScoreOutcome {
                metrics: self.score(keyword, siblings, None),
                fallback: None,
            };
        }

        let fallback = match self.lookup(keyword).await {
            Ok(Some(record)) => {
                return ScoreOutcome {
                    metrics: self.score(keyword, siblings, Some(&record)),
                    fallback: None,
                };
            }
            Ok(None) => format!("no market data for '{}'", keyword),
            Err(e) => {
                tracing::warn!(
                    keyword = %keyword,
                    error = %e,
                    kind = e.kind(),
                    "Market data unavailable, using estimates"
                );
                e.to_string()
            }
        };

        ScoreOutcome {
            metrics: self.score(keyword, siblings, None),
            fallback: Some(fallback),
        }
    }

    /// Score one keyword. Never fails; provider errors fall back to estimates.
    pub async fn score_keyword(&self, keyword: &str, siblings: usize) -> OpportunityMetrics {
        self.score_detailed(keyword, siblings).await.metrics
    }
}
