//! Integration tests for keyword-miner

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use keyword_miner::{
    analysis::ProgressStatus,
    error::{KeywordMinerError, Result},
    insights::Tier,
    scoring::KeywordScorer,
    store::{JsonlStore, MemoryStore, RunRecord, SuggestionRow, SuggestionStore},
    KeywordService, RunStatus, ScoringConfig, Settings, SuggestionSource, VariantType,
};

/// Scripted suggestion source keyed by query; unknown queries return nothing
struct ScriptedSource {
    answers: HashMap<String, Vec<String>>,
}

impl ScriptedSource {
    fn new(answers: &[(&str, &[&str])]) -> Self {
        Self {
            answers: answers
                .iter()
                .map(|(q, s)| (q.to_string(), s.iter().map(|x| x.to_string()).collect()))
                .collect(),
        }
    }
}

#[async_trait]
impl SuggestionSource for ScriptedSource {
    async fn try_fetch(&self, query: &str) -> Result<Vec<String>> {
        Ok(self.answers.get(query).cloned().unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Every query fails
struct DownSource;

#[async_trait]
impl SuggestionSource for DownSource {
    async fn try_fetch(&self, _query: &str) -> Result<Vec<String>> {
        Err(KeywordMinerError::network("connection refused", None, None))
    }

    fn name(&self) -> &'static str {
        "down"
    }
}

/// Accepts run records but refuses suggestion rows
#[derive(Default)]
struct BrokenStore {
    inner: MemoryStore,
}

#[async_trait]
impl SuggestionStore for BrokenStore {
    async fn save_run(&self, record: &RunRecord) -> Result<()> {
        self.inner.save_run(record).await
    }

    async fn append_suggestions(&self, _rows: &[SuggestionRow]) -> Result<()> {
        Err(KeywordMinerError::store("disk full", None))
    }

    async fn load_run(&self, session_id: &str) -> Result<Option<RunRecord>> {
        self.inner.load_run(session_id).await
    }

    async fn load_suggestions(&self, session_id: &str) -> Result<Vec<SuggestionRow>> {
        self.inner.load_suggestions(session_id).await
    }

    async fn list_runs(&self, limit: usize) -> Result<Vec<RunRecord>> {
        self.inner.list_runs(limit).await
    }

    fn name(&self) -> &'static str {
        "broken"
    }
}

fn service(source: Arc<dyn SuggestionSource>, store: Arc<dyn SuggestionStore>) -> KeywordService {
    let mut settings = Settings::default();
    settings.fetch.concurrency = 3;
    settings.fetch.checkpoint_interval = 5;
    KeywordService::new(
        source,
        store,
        Arc::new(KeywordScorer::new(ScoringConfig::default())),
        settings,
    )
}

#[tokio::test]
async fn test_full_run_with_jsonl_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonlStore::new(dir.path().join("keywords.jsonl")));
    let source = Arc::new(ScriptedSource::new(&[
        ("减肥a", &["减肥app", "减肥app推荐", "减肥app"]),
        ("减肥b", &["减肥白菜", "减肥app推荐"]),
        ("减肥1", &["减肥1个月瘦多少", "减肥药哪个牌子好多少钱"]),
    ]));
    let svc = service(source, store);

    let mut updates = Vec::new();
    let run = svc
        .analyze("减肥", &[VariantType::Alpha, VariantType::Numeric], |p, t| updates.push((p, t)))
        .await
        .unwrap();

    let summary = run.summary;
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(summary.total_variants, 35);
    assert_eq!(summary.successful_variants, 3);
    assert_eq!(summary.failed_variants, 32);
    assert_eq!(summary.total_suggestions, 7);
    assert_eq!(summary.within_variant_duplicates, 1);
    assert_eq!(summary.unique_suggestions, 5);
    assert_eq!(summary.duplicate_removed, 2);
    assert_eq!(updates.len(), 35);
    assert_eq!(updates.last(), Some(&(35, 35)));

    let results = svc.get_results(&run.session_id).await.unwrap();
    assert_eq!(results.status, RunStatus::Completed);
    assert_eq!(results.total_suggestions, 7);
    // stored rows keep the raw ranked list
    assert_eq!(
        results.results[&VariantType::Alpha]["减肥a"],
        vec!["减肥app", "减肥app推荐", "减肥app"]
    );

    let history = svc.history(10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].session_id, run.session_id);

    let insights = svc.get_insights(&run.session_id).await;
    assert_eq!(insights.summary_stats.total_opportunities, 5);
    assert_eq!(insights.summary_stats.cross_variant_duplicates, 1);
    let best = insights
        .recommendations
        .iter()
        .find(|k| k.keyword == "减肥药哪个牌子好多少钱")
        .unwrap();
    assert_eq!(best.tier, Tier::HighValue);
    assert_eq!(insights.recommendations[0].keyword, "减肥药哪个牌子好多少钱");
}

#[tokio::test]
async fn test_all_empty_fetch_completes() {
    let store = Arc::new(MemoryStore::new());
    let svc = service(Arc::new(DownSource), store.clone());

    let run = svc
        .analyze("减肥", &[VariantType::Numeric], |_, _| {})
        .await
        .unwrap();

    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.summary.total_suggestions, 0);
    assert_eq!(run.summary.failed_variants, 9);
    assert_eq!(run.summary.unique_suggestions, 0);
    assert_eq!(store.row_count(), 0);
    assert_eq!(svc.get_progress(&run.session_id).status, ProgressStatus::Completed);
}

#[tokio::test]
async fn test_store_failure_marks_run_failed() {
    let store = Arc::new(BrokenStore::default());
    let source = Arc::new(ScriptedSource::new(&[("减肥1", &["减肥1个月"])]));
    let svc = service(source, store.clone());

    let err = svc
        .analyze("减肥", &[VariantType::Numeric], |_, _| {})
        .await
        .unwrap_err();
    assert!(err.to_string().contains("disk full"));

    let runs = store.list_runs(1).await.unwrap();
    assert_eq!(runs[0].status, RunStatus::Failed);
    assert!(runs[0].error.as_deref().unwrap_or_default().contains("disk full"));

    let progress = svc.get_progress(&runs[0].session_id);
    assert_eq!(progress.status, ProgressStatus::Failed);
    assert!(progress.error.is_some());
}

#[tokio::test]
async fn test_insights_for_unknown_session_are_empty() {
    let svc = service(Arc::new(DownSource), Arc::new(MemoryStore::new()));

    let insights = svc.get_insights("no-such-session").await;
    assert_eq!(insights.summary_stats.total_opportunities, 0);
    assert!(insights.tiered_opportunities.is_empty());
    assert!(!insights.messages.is_empty());
}

#[tokio::test]
async fn test_unknown_session_progress_and_results() {
    let svc = service(Arc::new(DownSource), Arc::new(MemoryStore::new()));

    assert_eq!(svc.get_progress("missing").status, ProgressStatus::NotFound);
    assert!(svc.get_results("missing").await.is_err());
}

#[tokio::test]
async fn test_blue_ocean_without_market_data_is_empty() {
    let svc = service(Arc::new(DownSource), Arc::new(MemoryStore::new()));
    assert!(svc.find_blue_ocean("护眼台灯", 20).await.is_empty());

    let metrics = svc.score_keyword("减肥药哪个牌子好多少钱").await;
    assert!(!metrics.real_data);
    assert!(metrics.commercial_score >= 70.0);
}
