//! JSON-lines file store
//!
//! Every write appends whole lines and syncs the file, so a crash can lose at
//! most the batch in flight. A torn trailing line is skipped on read.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;

use super::{RunRecord, SuggestionRow, SuggestionStore};
use crate::error::{KeywordMinerError, Result};

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum StoreEntry {
    Run(RunRecord),
    Suggestion(SuggestionRow),
}

pub struct JsonlStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn store_error(&self, message: impl Into<String>) -> KeywordMinerError {
        KeywordMinerError::store(message, Some(self.path.to_string_lossy().to_string()))
    }

    async fn append(&self, entries: &[StoreEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut buf = String::new();
        for entry in entries {
            let line = serde_json::to_string(entry)
                .map_err(|e| self.store_error(format!("Failed to serialize entry: {}", e)))?;
            buf.push_str(&line);
            buf.push('\n');
        }

        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.store_error(e.to_string()))?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.store_error(e.to_string()))?;

        // a torn last line must not swallow the first new entry
        if !self.ends_with_newline(&mut file).await? {
            buf.insert(0, '\n');
        }

        file.write_all(buf.as_bytes())
            .await
            .map_err(|e| self.store_error(e.to_string()))?;
        file.sync_data()
            .await
            .map_err(|e| self.store_error(e.to_string()))?;

        Ok(())
    }

    async fn ends_with_newline(&self, file: &mut tokio::fs::File) -> Result<bool> {
        let len = file
            .metadata()
            .await
            .map_err(|e| self.store_error(e.to_string()))?
            .len();
        if len == 0 {
            return Ok(true);
        }

        let mut last = [0u8; 1];
        file.seek(std::io::SeekFrom::End(-1))
            .await
            .map_err(|e| self.store_error(e.to_string()))?;
        file.read_exact(&mut last)
            .await
            .map_err(|e| self.store_error(e.to_string()))?;
        Ok(last[0] == b'\n')
    }

    async fn read_entries(&self) -> Result<Vec<StoreEntry>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.store_error(e.to_string())),
        };

        let mut entries = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<StoreEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        line = line_no + 1,
                        error = %e,
                        "Skipping unreadable store line"
                    );
                }
            }
        }
        Ok(entries)
    }

    /// Latest version of every run, keyed by session
    async fn latest_runs(&self) -> Result<HashMap<String, RunRecord>> {
        let mut runs = HashMap::new();
        for entry in self.read_entries().await? {
            if let StoreEntry::Run(record) = entry {
                runs.insert(record.session_id.clone(), record);
            }
        }
        Ok(runs)
    }
}

#[async_trait]
impl SuggestionStore for JsonlStore {
    async fn save_run(&self, record: &RunRecord) -> Result<()> {
        self.append(&[StoreEntry::Run(record.clone())]).await
    }

    async fn append_suggestions(&self, rows: &[SuggestionRow]) -> Result<()> {
        let entries: Vec<StoreEntry> = rows.iter().cloned().map(StoreEntry::Suggestion).collect();
        self.append(&entries).await
    }

    async fn load_run(&self, session_id: &str) -> Result<Option<RunRecord>> {
        Ok(self.latest_runs().await?.remove(session_id))
    }

    async fn load_suggestions(&self, session_id: &str) -> Result<Vec<SuggestionRow>> {
        Ok(self
            .read_entries()
            .await?
            .into_iter()
            .filter_map(|entry| match entry {
                StoreEntry::Suggestion(row) if row.session_id == session_id => Some(row),
                _ => None,
            })
            .collect())
    }

    async fn list_runs(&self, limit: usize) -> Result<Vec<RunRecord>> {
        let mut runs: Vec<RunRecord> = self.latest_runs().await?.into_values().collect();
        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        runs.truncate(limit);
        Ok(runs)
    }

    fn name(&self) -> &'static str {
        "jsonl"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RunStatus, VariantType};
    use chrono::Utc;

    fn run(id: &str, status: RunStatus, total: usize) -> RunRecord {
        let now = Utc::now();
        RunRecord {
            session_id: id.to_string(),
            original_keyword: "减肥".to_string(),
            variant_types: vec![VariantType::Alpha, VariantType::Numeric],
            total_suggestions: total,
            status,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_run_updates_latest_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlStore::new(dir.path().join("nested/keywords.jsonl"));

        store.save_run(&run("s1", RunStatus::Running, 0)).await.unwrap();
        store.save_run(&run("s1", RunStatus::Completed, 42)).await.unwrap();

        let loaded = store.load_run("s1").await.unwrap().unwrap();
        assert_eq!(loaded.status, RunStatus::Completed);
        assert_eq!(loaded.total_suggestions, 42);
        assert!(store.load_run("missing").await.unwrap().is_none());
        assert_eq!(store.list_runs(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rows_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keywords.jsonl");
        let suggestions = vec!["减肥餐".to_string(), "减肥药".to_string()];

        {
            let store = JsonlStore::new(&path);
            let rows = SuggestionRow::ranked("s1", "减肥", VariantType::Alpha, "减肥a", &suggestions);
            store.append_suggestions(&rows).await.unwrap();
        }

        let reopened = JsonlStore::new(&path);
        let rows = reopened.load_suggestions("s1").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].suggestion, "减肥餐");
        assert_eq!(rows[1].rank, 2);
    }

    #[tokio::test]
    async fn test_torn_line_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keywords.jsonl");
        let store = JsonlStore::new(&path);
        store.save_run(&run("s1", RunStatus::Running, 0)).await.unwrap();

        let mut content = std::fs::read_to_string(&path).unwrap();
        content.push_str("{\"kind\":\"suggestion\",\"session_id\":\"s1\"");
        std::fs::write(&path, content).unwrap();

        assert!(store.load_run("s1").await.unwrap().is_some());
        assert!(store.load_suggestions("s1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_after_torn_line_stays_readable() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlStore::new(dir.path().join("keywords.jsonl"));
        store.save_run(&run("s1", RunStatus::Completed, 3)).await.unwrap();

        let mut content = std::fs::read_to_string(store.path()).unwrap();
        content.push_str("{\"kind\":\"run\",\"session_id\":");
        std::fs::write(store.path(), content).unwrap();

        store.save_run(&run("s2", RunStatus::Running, 0)).await.unwrap();

        assert_eq!(store.load_run("s1").await.unwrap().unwrap().total_suggestions, 3);
        assert_eq!(
            store.load_run("s2").await.unwrap().unwrap().status,
            RunStatus::Running
        );
        assert_eq!(store.list_runs(10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlStore::new(dir.path().join("none.jsonl"));
        assert!(store.list_runs(5).await.unwrap().is_empty());
    }
}
