//! In-process store, used by tests and one-shot CLI runs

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{RunRecord, SuggestionRow, SuggestionStore};
use crate::error::Result;

#[derive(Debug, Default)]
pub struct MemoryStore {
    runs: RwLock<HashMap<String, RunRecord>>,
    rows: RwLock<Vec<SuggestionRow>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of suggestion rows committed so far
    pub fn row_count(&self) -> usize {
        self.rows.read().len()
    }
}

#[async_trait]
impl SuggestionStore for MemoryStore {
    async fn save_run(&self, record: &RunRecord) -> Result<()> {
        self.runs
            .write()
            .insert(record.session_id.clone(), record.clone());
        Ok(())
    }

    async fn append_suggestions(&self, rows: &[SuggestionRow]) -> Result<()> {
        self.rows.write().extend_from_slice(rows);
        Ok(())
    }

    async fn load_run(&self, session_id: &str) -> Result<Option<RunRecord>> {
        Ok(self.runs.read().get(session_id).cloned())
    }

    async fn load_suggestions(&self, session_id: &str) -> Result<Vec<SuggestionRow>> {
        Ok(self
            .rows
            .read()
            .iter()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn list_runs(&self, limit: usize) -> Result<Vec<RunRecord>> {
        let mut runs: Vec<RunRecord> = self.runs.read().values().cloned().collect();
        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        runs.truncate(limit);
        Ok(runs)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RunStatus, VariantType};
    use chrono::{Duration, Utc};

    fn record(id: &str, minutes_ago: i64) -> RunRecord {
        let at = Utc::now() - Duration::minutes(minutes_ago);
        RunRecord {
            session_id: id.to_string(),
            original_keyword: "seo".to_string(),
            variant_types: vec![VariantType::Alpha],
            total_suggestions: 0,
            status: RunStatus::Running,
            error: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_rows_filtered_by_session() {
        let store = MemoryStore::new();
        let suggestions = vec!["seo a".to_string(), "seo b".to_string()];
        let rows_a = SuggestionRow::ranked("a", "seo", VariantType::Alpha, "seoa", &suggestions);
        let rows_b = SuggestionRow::ranked("b", "seo", VariantType::Alpha, "seoa", &suggestions[..1]);

        tokio_test::block_on(async {
            store.append_suggestions(&rows_a).await.unwrap();
            store.append_suggestions(&rows_b).await.unwrap();
            let loaded = store.load_suggestions("a").await.unwrap();
            assert_eq!(loaded.len(), 2);
            assert_eq!(loaded[1].rank, 2);
        });
        assert_eq!(store.row_count(), 3);
    }

    #[tokio::test]
    async fn test_history_newest_first() {
        let store = MemoryStore::new();
        store.save_run(&record("old", 30)).await.unwrap();
        store.save_run(&record("new", 1)).await.unwrap();
        store.save_run(&record("mid", 10)).await.unwrap();

        let runs = store.list_runs(2).await.unwrap();
        let ids: Vec<_> = runs.iter().map(|r| r.session_id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid"]);
    }
}
