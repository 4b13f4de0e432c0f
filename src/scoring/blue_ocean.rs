//! Blue-ocean keyword detection
//!
//! A blue-ocean keyword has real demand, few bidders and room for long-tail
//! expansion, while still showing some commercial value.

use serde::{Deserialize, Serialize};

use super::lexicon::{self, COMMERCIAL_INDICATORS, HIGH_INTENT, MEDIUM_INTENT};
use super::market::KeywordRecord;
use super::scorer::score_record;
use crate::types::OpportunityMetrics;

/// Thresholds for [`is_blue_ocean`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlueOceanCriteria {
    pub min_mobile_volume: u64,
    pub min_mobile_index: u64,
    pub max_companies: u64,
    /// Lowest accepted bid competition grade (2 medium, 3 low)
    pub min_bid_grade: u8,
    pub min_long_tail: u64,
}

impl Default for BlueOceanCriteria {
    fn default() -> Self {
        Self {
            min_mobile_volume: 50,
            min_mobile_index: 100,
            max_companies: 10,
            min_bid_grade: 2,
            min_long_tail: 100,
        }
    }
}

/// A detected blue-ocean keyword with its provider-backed metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlueOceanKeyword {
    pub keyword: String,
    pub opportunity_score: f64,
    pub metrics: OpportunityMetrics,
    pub record: KeywordRecord,
}

/// Traffic reason, SEM price or the keyword itself point to paid demand.
/// The bid-company count is not consulted here.
pub fn has_commercial_signal(keyword: &str, record: &KeywordRecord) -> bool {
    lexicon::contains_any(&record.traffic_reason, COMMERCIAL_INDICATORS)
        || !record.sem_price.trim().is_empty()
        || lexicon::contains_any(keyword, HIGH_INTENT)
        || lexicon::contains_any(keyword, MEDIUM_INTENT)
}

/// Blue-ocean test for `record` when scored under `keyword`
pub fn qualifies(keyword: &str, record: &KeywordRecord, criteria: &BlueOceanCriteria) -> bool {
    let has_demand = record.mobile_daily_volume >= criteria.min_mobile_volume
        || record.mobile_index >= criteria.min_mobile_index;

    has_demand
        && record.bid_company_count <= criteria.max_companies
        && record.bid_grade >= criteria.min_bid_grade
        && record.long_tail_count >= criteria.min_long_tail
        && has_commercial_signal(keyword, record)
}

pub fn is_blue_ocean(record: &KeywordRecord, criteria: &BlueOceanCriteria) -> bool {
    qualifies(&record.keyword, record, criteria)
}

/// Provider opportunity score in [0, 100]
pub fn market_opportunity_score(record: &KeywordRecord) -> f64 {
    let search = (record.daily_volume() as f64 / 1000.0 * 30.0).min(30.0);

    let competition = (4.0 - record.bid_company_count as f64) * 10.0
        + (record.bid_grade as f64 - 1.0) * 10.0;

    let long_tail = (record.long_tail_count as f64 / 10000.0 * 20.0).min(20.0);

    let mut platforms = 0.0;
    if record.douyin_index > 0 {
        platforms += 5.0;
    }
    if record.haosou_index > 0 {
        platforms += 3.0;
    }
    if record.mobile_index > 0 {
        platforms += 2.0;
    }

    (search + competition + long_tail + platforms).clamp(0.0, 100.0)
}

/// Filter blue-ocean records, best opportunity first, at most `limit`
pub fn find_blue_ocean(
    records: Vec<KeywordRecord>,
    criteria: &BlueOceanCriteria,
    limit: usize,
) -> Vec<BlueOceanKeyword> {
    let scanned = records.len();
    let mut found: Vec<BlueOceanKeyword> = records
        .into_iter()
        .filter(|record| is_blue_ocean(record, criteria))
        .map(|record| {
            let metrics = score_record(&record.keyword, &record, criteria);
            BlueOceanKeyword {
                keyword: record.keyword.clone(),
                opportunity_score: metrics.opportunity_score,
                metrics,
                record,
            }
        })
        .collect();

    // sort_by is stable, ties keep provider order
    found.sort_by(|a, b| b.opportunity_score.total_cmp(&a.opportunity_score));
    found.truncate(limit);

    tracing::info!(scanned = scanned, found = found.len(), limit = limit, "Blue-ocean scan complete");
    found
}
