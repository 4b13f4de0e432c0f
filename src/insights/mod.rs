//! Ranking and tiering of scored keywords into an insight report

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::scoring::ScoredKeyword;
use crate::types::{IntentType, OpportunityMetrics};

/// Number of keywords listed as recommendations
pub const RECOMMENDATION_COUNT: usize = 10;

/// Opportunity tier, best first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tier {
    BlueOcean,
    HighValue,
    Hot,
    Potential,
    General,
}

impl Tier {
    pub fn all() -> &'static [Tier] {
        &[Tier::BlueOcean, Tier::HighValue, Tier::Hot, Tier::Potential, Tier::General]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tier::BlueOcean => "blue-ocean",
            Tier::HighValue => "high-value",
            Tier::Hot => "hot",
            Tier::Potential => "potential",
            Tier::General => "general",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedKeyword {
    pub keyword: String,
    pub metrics: OpportunityMetrics,
    pub composite_score: f64,
    pub tier: Tier,
}

/// Sort key combining opportunity with bonuses for blue ocean, commercial
/// value, intent, volume and low competition
pub fn composite_score(m: &OpportunityMetrics) -> f64 {
    let mut score = m.opportunity_score;
    if m.blue_ocean {
        score += 50.0;
    }
    score += if m.commercial_score >= 70.0 {
        30.0
    } else if m.commercial_score >= 50.0 {
        15.0
    } else {
        0.0
    };
    score += match m.intent {
        IntentType::Transactional => 20.0,
        IntentType::Commercial => 10.0,
        _ => 0.0,
    };
    score += if m.search_volume >= 50_000 {
        15.0
    } else if m.search_volume >= 10_000 {
        8.0
    } else {
        0.0
    };
    if m.competition.is_low() {
        score += 10.0;
    }
    score
}

pub fn tier_of(m: &OpportunityMetrics) -> Tier {
    if m.blue_ocean && m.opportunity_score >= 60.0 {
        Tier::BlueOcean
    } else if m.commercial_score >= 70.0 {
        Tier::HighValue
    } else if m.opportunity_score >= 40.0 && m.search_volume >= 10_000 {
        Tier::Hot
    } else if m.opportunity_score >= 30.0 {
        Tier::Potential
    } else {
        Tier::General
    }
}

/// Highest composite score first. Ties go to the higher opportunity score,
/// then to input order.
pub fn rank_and_tier(mut scored: Vec<ScoredKeyword>) -> Vec<RankedKeyword> {
    scored.sort_by(|a, b| {
        b.metrics
            .opportunity_score
            .total_cmp(&a.metrics.opportunity_score)
    });
    let mut ranked: Vec<RankedKeyword> = scored
        .into_iter()
        .map(|item| RankedKeyword {
            composite_score: composite_score(&item.metrics),
            tier: tier_of(&item.metrics),
            keyword: item.keyword,
            metrics: item.metrics,
        })
        .collect();
    ranked.sort_by(|a, b| b.composite_score.total_cmp(&a.composite_score));
    ranked
}

/// Group ranked keywords by tier, keeping rank order inside each tier
pub fn bucket(ranked: &[RankedKeyword]) -> BTreeMap<Tier, Vec<RankedKeyword>> {
    let mut tiers: BTreeMap<Tier, Vec<RankedKeyword>> = BTreeMap::new();
    for item in ranked {
        tiers.entry(item.tier).or_default().push(item.clone());
    }
    tiers
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub total_opportunities: usize,
    pub tier_counts: BTreeMap<Tier, usize>,
    pub average_commercial_score: f64,
    /// Summed search volume of the recommendations
    pub top_search_volume: u64,
    pub intent_distribution: BTreeMap<IntentType, usize>,
    /// Suggestions dropped because another variant already returned them
    pub cross_variant_duplicates: usize,
    /// Keywords scored without market data
    pub estimated_count: usize,
}

/// Insight report for one session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insights {
    pub session_id: String,
    pub tiered_opportunities: BTreeMap<Tier, Vec<RankedKeyword>>,
    pub recommendations: Vec<RankedKeyword>,
    pub summary_stats: SummaryStats,
    pub messages: Vec<String>,
}

impl Insights {
    /// Report with nothing ranked, carrying only messages
    pub fn empty(session_id: impl Into<String>, messages: Vec<String>) -> Self {
        Self {
            session_id: session_id.into(),
            tiered_opportunities: BTreeMap::new(),
            recommendations: Vec::new(),
            summary_stats: SummaryStats::default(),
            messages,
        }
    }

    pub fn tier(&self, tier: Tier) -> &[RankedKeyword] {
        self.tiered_opportunities
            .get(&tier)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Build the report from an already ranked list
pub fn summarize_insights(
    session_id: &str,
    ranked: Vec<RankedKeyword>,
    cross_variant_duplicates: usize,
    warnings: Vec<String>,
) -> Insights {
    if ranked.is_empty() {
        let mut messages = vec!["No suggestions to rank for this session".to_string()];
        messages.extend(warnings);
        let mut insights = Insights::empty(session_id, messages);
        insights.summary_stats.cross_variant_duplicates = cross_variant_duplicates;
        return insights;
    }

    let total = ranked.len();
    let tiered = bucket(&ranked);
    let tier_counts: BTreeMap<Tier, usize> = Tier::all()
        .iter()
        .map(|tier| (*tier, tiered.get(tier).map_or(0, Vec::len)))
        .collect();

    let mut intent_distribution = BTreeMap::new();
    for item in &ranked {
        *intent_distribution.entry(item.metrics.intent).or_insert(0) += 1;
    }
    let commercial_sum: f64 = ranked.iter().map(|k| k.metrics.commercial_score).sum();
    let estimated_count = ranked.iter().filter(|k| !k.metrics.real_data).count();

    let recommendations: Vec<RankedKeyword> =
        ranked.iter().take(RECOMMENDATION_COUNT).cloned().collect();
    let top_search_volume = recommendations
        .iter()
        .map(|k| k.metrics.search_volume as u64)
        .sum();

    let count = |tier: Tier| tier_counts.get(&tier).copied().unwrap_or(0);
    let share = |n: usize| n as f64 / total as f64;

    let mut messages = Vec::new();
    if count(Tier::BlueOcean) > 0 {
        messages.push(format!(
            "Found {} blue-ocean keywords with real demand and few bidders",
            count(Tier::BlueOcean)
        ));
    }
    if share(count(Tier::HighValue)) >= 0.3 {
        messages.push(format!(
            "{:.0}% of keywords carry high commercial value",
            share(count(Tier::HighValue)) * 100.0
        ));
    }
    if count(Tier::Hot) > 0 {
        messages.push(format!(
            "{} hot keywords combine good opportunity with search volume",
            count(Tier::Hot)
        ));
    }
    if share(count(Tier::General)) >= 0.5 {
        messages.push("Most keywords show only general value, try a more specific seed keyword".to_string());
    }
    messages.extend(warnings);

    Insights {
        session_id: session_id.to_string(),
        tiered_opportunities: tiered,
        recommendations,
        summary_stats: SummaryStats {
            total_opportunities: total,
            tier_counts,
            average_commercial_score: (commercial_sum / total as f64 * 10.0).round() / 10.0,
            top_search_volume,
            intent_distribution,
            cross_variant_duplicates,
            estimated_count,
        },
        messages,
    }
}
