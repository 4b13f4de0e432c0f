//! Core types and structures for keyword-miner

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::error::KeywordMinerError;

/// Variant group type. This is the single registry of expansion patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantType {
    Alpha,
    AlphaSpace,
    QuestionHow,
    QuestionWhat,
    QuestionCan,
    QuestionWhich,
    Numeric,
    CommonSuffix,
}

impl VariantType {
    /// All registered variant types, in display order
    pub fn all() -> &'static [VariantType] {
        &[
            VariantType::Alpha,
            VariantType::AlphaSpace,
            VariantType::QuestionHow,
            VariantType::QuestionWhat,
            VariantType::QuestionCan,
            VariantType::QuestionWhich,
            VariantType::Numeric,
            VariantType::CommonSuffix,
        ]
    }

    /// Wire tag, as accepted on the command line and stored in rows
    pub fn tag(&self) -> &'static str {
        match self {
            VariantType::Alpha => "alpha",
            VariantType::AlphaSpace => "alpha_space",
            VariantType::QuestionHow => "question_how",
            VariantType::QuestionWhat => "question_what",
            VariantType::QuestionCan => "question_can",
            VariantType::QuestionWhich => "question_which",
            VariantType::Numeric => "numeric",
            VariantType::CommonSuffix => "common_suffix",
        }
    }

    /// Human readable description
    pub fn label(&self) -> &'static str {
        match self {
            VariantType::Alpha => "Letter suffix (a-z)",
            VariantType::AlphaSpace => "Letter suffix after a space (a-z)",
            VariantType::QuestionHow => "Question infix 怎么 + letter (a-z)",
            VariantType::QuestionWhat => "Question infix 什么 + letter (a-z)",
            VariantType::QuestionCan => "Question infix 能 + letter (a-z)",
            VariantType::QuestionWhich => "Question infix 哪 + letter (a-z)",
            VariantType::Numeric => "Digit suffix (1-9)",
            VariantType::CommonSuffix => "Common phrase suffixes",
        }
    }
}

impl std::fmt::Display for VariantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl FromStr for VariantType {
    type Err = KeywordMinerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VariantType::all()
            .iter()
            .copied()
            .find(|t| t.tag() == s.trim())
            .ok_or_else(|| KeywordMinerError::validation(format!("Unknown variant type: {}", s)))
    }
}

/// Lifecycle status of an analysis run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Pending => write!(f, "pending"),
            RunStatus::Running => write!(f, "running"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Search intent classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentType {
    Transactional,
    Commercial,
    Informational,
    Navigational,
    Mixed,
}

impl std::fmt::Display for IntentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntentType::Transactional => write!(f, "transactional"),
            IntentType::Commercial => write!(f, "commercial"),
            IntentType::Informational => write!(f, "informational"),
            IntentType::Navigational => write!(f, "navigational"),
            IntentType::Mixed => write!(f, "mixed"),
        }
    }
}

/// Estimated competition level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompetitionLevel {
    VeryLow,
    Low,
    Medium,
    High,
}

impl CompetitionLevel {
    /// Points subtracted from the opportunity score
    pub fn penalty(&self) -> f64 {
        match self {
            CompetitionLevel::VeryLow => 0.0,
            CompetitionLevel::Low => 5.0,
            CompetitionLevel::Medium => 15.0,
            CompetitionLevel::High => 25.0,
        }
    }

    pub fn is_low(&self) -> bool {
        matches!(self, CompetitionLevel::VeryLow | CompetitionLevel::Low)
    }
}

impl std::fmt::Display for CompetitionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompetitionLevel::VeryLow => write!(f, "very-low"),
            CompetitionLevel::Low => write!(f, "low"),
            CompetitionLevel::Medium => write!(f, "medium"),
            CompetitionLevel::High => write!(f, "high"),
        }
    }
}

/// Scoring result for a single keyword
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpportunityMetrics {
    pub commercial_score: f64,
    pub intent: IntentType,
    pub competition: CompetitionLevel,
    pub search_volume: u32,
    pub difficulty_score: f64,
    pub opportunity_score: f64,
    pub blue_ocean: bool,
    /// True when computed from a market data record rather than estimated
    pub real_data: bool,
}

/// Configuration for suggestion fetching
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    pub suggest_url: String,
    pub timeout: Duration,
    pub delay_min: Duration,
    pub delay_max: Duration,
    pub max_retries: u32,
    pub concurrency: usize,
    /// Commit store rows after this many completed variants
    pub checkpoint_interval: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            suggest_url: "https://www.baidu.com/sugrec".to_string(),
            timeout: Duration::from_secs(10),
            delay_min: Duration::from_secs(1),
            delay_max: Duration::from_secs(3),
            max_retries: 3,
            concurrency: 2,
            checkpoint_interval: 10,
        }
    }
}

/// Configuration for opportunity scoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub use_market_data: bool,
    pub market_concurrency: usize,
    /// Pause after each market data call
    pub market_pause: Duration,
    pub blue_ocean_limit: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            use_market_data: true,
            market_concurrency: 1,
            market_pause: Duration::from_millis(500),
            blue_ocean_limit: 20,
        }
    }
}

/// Lock-free fetch counters shared between concurrent requests
#[derive(Debug, Default)]
pub struct PerformanceMetrics {
    requests_sent: AtomicU64,
    queries_completed: AtomicU64,
    queries_failed: AtomicU64,
    retries: AtomicU64,
    suggestions_fetched: AtomicU64,
    total_fetch_time_ms: AtomicU64,
}

impl PerformanceMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_requests(&self) {
        self.requests_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_retries(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self, suggestions: usize, elapsed_ms: u64) {
        self.queries_completed.fetch_add(1, Ordering::Relaxed);
        self.suggestions_fetched
            .fetch_add(suggestions as u64, Ordering::Relaxed);
        self.total_fetch_time_ms
            .fetch_add(elapsed_ms, Ordering::Relaxed);
    }

    pub fn record_failure(&self, elapsed_ms: u64) {
        self.queries_failed.fetch_add(1, Ordering::Relaxed);
        self.total_fetch_time_ms
            .fetch_add(elapsed_ms, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_sent: self.requests_sent.load(Ordering::Relaxed),
            queries_completed: self.queries_completed.load(Ordering::Relaxed),
            queries_failed: self.queries_failed.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            suggestions_fetched: self.suggestions_fetched.load(Ordering::Relaxed),
            total_fetch_time_ms: self.total_fetch_time_ms.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`PerformanceMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub requests_sent: u64,
    pub queries_completed: u64,
    pub queries_failed: u64,
    pub retries: u64,
    pub suggestions_fetched: u64,
    pub total_fetch_time_ms: u64,
}

impl MetricsSnapshot {
    pub fn avg_fetch_time_ms(&self) -> f64 {
        let total = self.queries_completed + self.queries_failed;
        if total == 0 {
            0.0
        } else {
            self.total_fetch_time_ms as f64 / total as f64
        }
    }
}
