//! Commercial summary of one suggestion list

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::scorer::{score_rule_based, ScoredKeyword};
use crate::types::IntentType;

const TOP_OPPORTUNITIES: usize = 5;

/// Overall commercial value of one suggestion list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuggestionSummary {
    pub total: usize,
    pub average_commercial_score: f64,
    pub intent_distribution: BTreeMap<IntentType, usize>,
    pub top_opportunities: Vec<ScoredKeyword>,
}

/// Rule-based summary of a suggestion list, each keyword scored against the list size
pub fn summarize(suggestions: &[String]) -> SuggestionSummary {
    if suggestions.is_empty() {
        return SuggestionSummary::default();
    }

    let mut scored: Vec<ScoredKeyword> = suggestions
        .iter()
        .map(|keyword| ScoredKeyword {
            keyword: keyword.clone(),
            metrics: score_rule_based(keyword, suggestions.len()),
        })
        .collect();

    let mut intent_distribution = BTreeMap::new();
    let mut commercial_total = 0.0;
    for item in &scored {
        commercial_total += item.metrics.commercial_score;
        *intent_distribution.entry(item.metrics.intent).or_insert(0) += 1;
    }

    scored.sort_by(|a, b| {
        b.metrics
            .opportunity_score
            .total_cmp(&a.metrics.opportunity_score)
    });
    scored.truncate(TOP_OPPORTUNITIES);

    SuggestionSummary {
        total: suggestions.len(),
        average_commercial_score: (commercial_total / suggestions.len() as f64 * 10.0).round() / 10.0,
        intent_distribution,
        top_opportunities: scored,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_list() {
        let summary = summarize(&[]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.average_commercial_score, 0.0);
        assert!(summary.top_opportunities.is_empty());
    }

    #[test]
    fn test_distribution_and_top() {
        let suggestions: Vec<String> = ["减肥药价格", "减肥方法", "减肥", "减肥餐推荐", "减肥操", "减肥茶", "减肥药"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let summary = summarize(&suggestions);

        assert_eq!(summary.total, 7);
        assert_eq!(summary.top_opportunities.len(), 5);
        assert_eq!(summary.intent_distribution[&IntentType::Transactional], 1);
        assert_eq!(summary.intent_distribution.values().sum::<usize>(), 7);
        let scores: Vec<f64> = summary
            .top_opportunities
            .iter()
            .map(|k| k.metrics.opportunity_score)
            .collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    }
}
