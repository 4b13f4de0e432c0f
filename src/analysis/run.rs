//! Analysis run aggregate

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::RunRecord;
use crate::types::{RunStatus, VariantType};

/// Suggestions per query, grouped by variant type
pub type VariantResults = BTreeMap<VariantType, BTreeMap<String, Vec<String>>>;

/// Counters describing a finished run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_variants: usize,
    /// Flattened suggestion count before deduplication
    pub total_suggestions: usize,
    pub successful_variants: usize,
    pub failed_variants: usize,
    /// `total_suggestions - unique_suggestions`
    pub duplicate_removed: usize,
    pub unique_suggestions: usize,
    /// Repeats removed inside a single query's list
    pub within_variant_duplicates: usize,
}

/// One expansion of a base keyword and everything fetched for it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRun {
    pub session_id: String,
    pub original_keyword: String,
    pub variant_types: Vec<VariantType>,
    pub results: VariantResults,
    pub summary: RunSummary,
    pub status: RunStatus,
    #[serde(default)]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AnalysisRun {
    /// Create a pending run with a fresh session id
    pub fn new(original_keyword: impl Into<String>, variant_types: Vec<VariantType>) -> Self {
        Self::with_session(Uuid::new_v4().to_string(), original_keyword, variant_types)
    }

    pub fn with_session(
        session_id: impl Into<String>,
        original_keyword: impl Into<String>,
        variant_types: Vec<VariantType>,
    ) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            original_keyword: original_keyword.into(),
            variant_types,
            results: BTreeMap::new(),
            summary: RunSummary::default(),
            status: RunStatus::Pending,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn record_result(&mut self, variant_type: VariantType, query: String, suggestions: Vec<String>) {
        self.results
            .entry(variant_type)
            .or_default()
            .insert(query, suggestions);
    }

    pub fn set_status(&mut self, status: RunStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
        self.set_status(RunStatus::Failed);
    }

    /// All suggestions in variant type then query order
    pub fn flattened(&self) -> Vec<String> {
        self.results
            .values()
            .flat_map(|queries| queries.values())
            .flat_map(|suggestions| suggestions.iter().cloned())
            .collect()
    }

    /// Persistent form of the run header
    pub fn record(&self) -> RunRecord {
        RunRecord {
            session_id: self.session_id.clone(),
            original_keyword: self.original_keyword.clone(),
            variant_types: self.variant_types.clone(),
            total_suggestions: self.summary.total_suggestions,
            status: self.status,
            error: self.error.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_run_is_pending() {
        let run = AnalysisRun::new("减肥", vec![VariantType::Alpha]);
        assert_eq!(run.status, RunStatus::Pending);
        assert!(Uuid::parse_str(&run.session_id).is_ok());
        assert!(run.flattened().is_empty());
    }

    #[test]
    fn test_fail_sets_error_on_record() {
        let mut run = AnalysisRun::new("减肥", vec![VariantType::Alpha]);
        run.fail("disk full");
        let record = run.record();
        assert_eq!(record.status, RunStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("disk full"));
    }
}
