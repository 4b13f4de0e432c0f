//! Keyword analysis service
//!
//! Owns the run lifecycle: validation, variant expansion, bounded fetching
//! with periodic store checkpoints, deduplication, and the read side
//! (progress, results, scoring and insights).

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use futures::stream::StreamExt;
use serde::{Deserialize, Serialize};

use super::dedupe::{dedupe, dedupe_global};
use super::progress::{ProgressReport, ProgressTracker};
use super::run::{AnalysisRun, VariantResults};
use crate::config::Settings;
use crate::error::{KeywordMinerError, Result};
use crate::insights::{self, Insights};
use crate::scoring::{
    find_blue_ocean, BlueOceanKeyword, KeywordScorer, MarketDataClient, ScoredKeyword,
};
use crate::store::{JsonlStore, RunRecord, SuggestionRow, SuggestionStore};
use crate::suggest::{BaiduSuggestClient, BatchFetcher, SuggestionSource};
use crate::types::{OpportunityMetrics, RunStatus, VariantType};
use crate::validation_error;
use crate::variants::{Pattern, VariantGenerator, VariantGroup};

/// Stored suggestions of one session, grouped by variant type and query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResults {
    pub session_id: String,
    pub original_keyword: String,
    pub status: RunStatus,
    pub total_suggestions: usize,
    pub results: VariantResults,
}

/// Registry entry shown by the `types` listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantTypeInfo {
    pub variant_type: VariantType,
    pub label: String,
    pub count: usize,
}

#[derive(Clone)]
pub struct KeywordService {
    fetcher: BatchFetcher,
    store: Arc<dyn SuggestionStore>,
    scorer: Arc<KeywordScorer>,
    tracker: Arc<ProgressTracker>,
    generator: VariantGenerator,
    settings: Settings,
}

impl KeywordService {
    pub fn new(
        source: Arc<dyn SuggestionSource>,
        store: Arc<dyn SuggestionStore>,
        scorer: Arc<KeywordScorer>,
        settings: Settings,
    ) -> Self {
        Self {
            fetcher: BatchFetcher::new(source),
            store,
            scorer,
            tracker: Arc::new(ProgressTracker::new()),
            generator: VariantGenerator::new(),
            settings,
        }
    }

    /// Production wiring: Baidu suggest, JSONL store, optional market data
    pub fn from_settings(settings: Settings) -> Result<Self> {
        settings.validate()?;

        let source = Arc::new(BaiduSuggestClient::with_config(settings.fetch.clone()));
        let store = Arc::new(JsonlStore::new(settings.store_path.clone()));

        let scorer = match settings.market_api_key.as_deref() {
            Some(key) if settings.scoring.use_market_data => {
                let client = MarketDataClient::new(key, settings.market_base_url.clone())?;
                KeywordScorer::with_provider(Arc::new(client), settings.scoring.clone())
            }
            _ => KeywordScorer::new(settings.scoring.clone()),
        };

        tracing::debug!(
            store = %store.path().display(),
            market_data = scorer.has_market_data(),
            concurrency = settings.fetch.concurrency,
            "Keyword service configured"
        );

        Ok(Self::new(source, store, Arc::new(scorer), settings))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn scorer(&self) -> &KeywordScorer {
        &self.scorer
    }

    /// Parse variant tags, rejecting unknown ones
    pub fn parse_types(tags: &[&str]) -> Result<Vec<VariantType>> {
        tags.iter().map(|tag| tag.parse::<VariantType>()).collect()
    }

    fn prepare(&self, keyword: &str, types: &[VariantType]) -> Result<(String, Vec<VariantGroup>)> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(validation_error!("Keyword must not be empty"));
        }
        if types.is_empty() {
            return Err(validation_error!("At least one variant type is required"));
        }
        Ok((keyword.to_string(), self.generator.groups(keyword, types)))
    }

    fn new_run(&self, keyword: String, groups: &[VariantGroup]) -> AnalysisRun {
        let types = groups.iter().map(|g| g.variant_type).collect();
        let run = AnalysisRun::new(keyword, types);
        let total: usize = groups.iter().map(|g| g.queries.len()).sum();

        let purged = self.tracker.purge_expired(self.settings.session_ttl);
        if purged > 0 {
            tracing::debug!(purged = purged, "Dropped expired session progress");
        }
        self.tracker.begin(&run.session_id, total);
        run
    }

    /// Start a run in the background and return its session id.
    ///
    /// Input is validated before anything is spawned.
    pub fn start_analysis(&self, keyword: &str, types: &[VariantType]) -> Result<String> {
        let (keyword, groups) = self.prepare(keyword, types)?;
        let run = self.new_run(keyword, &groups);
        let session_id = run.session_id.clone();

        let service = self.clone();
        tokio::spawn(async move {
            // failures are already recorded on the run and in the tracker
            let _ = service.execute(run, groups, |_, _| {}).await;
        });

        Ok(session_id)
    }

    /// Run an analysis to completion. `on_progress(processed, total)` runs
    /// after every fetched variant.
    pub async fn analyze<F>(&self, keyword: &str, types: &[VariantType], on_progress: F) -> Result<AnalysisRun>
    where
        F: FnMut(usize, usize) + Send,
    {
        let (keyword, groups) = self.prepare(keyword, types)?;
        let run = self.new_run(keyword, &groups);
        self.execute(run, groups, on_progress).await
    }

    async fn execute<F>(&self, mut run: AnalysisRun, groups: Vec<VariantGroup>, mut on_progress: F) -> Result<AnalysisRun>
    where
        F: FnMut(usize, usize) + Send,
    {
        let run_start = Instant::now();
        tracing::info!(
            session_id = %run.session_id,
            keyword = %run.original_keyword,
            variant_types = groups.len(),
            "Starting keyword analysis"
        );

        if let Err(e) = self.fetch_all(&mut run, &groups, &mut on_progress).await {
            return Err(self.abort(run, e).await);
        }

        let mut run = dedupe(run);
        run.set_status(RunStatus::Completed);
        if let Err(e) = self.store.save_run(&run.record()).await {
            return Err(self.abort(run, e).await);
        }
        self.tracker.finish(&run.session_id);

        let summary = run.summary;
        tracing::info!(
            session_id = %run.session_id,
            total_variants = %summary.total_variants,
            successful_variants = %summary.successful_variants,
            failed_variants = %summary.failed_variants,
            total_suggestions = %summary.total_suggestions,
            unique_suggestions = %summary.unique_suggestions,
            run_duration_ms = %run_start.elapsed().as_millis(),
            "Keyword analysis completed"
        );

        Ok(run)
    }

    /// Fetch every variant, committing rows every `checkpoint_interval` completions
    async fn fetch_all<F>(&self, run: &mut AnalysisRun, groups: &[VariantGroup], on_progress: &mut F) -> Result<()>
    where
        F: FnMut(usize, usize) + Send,
    {
        run.set_status(RunStatus::Running);
        self.tracker.set_running(&run.session_id);
        self.store.save_run(&run.record()).await?;

        let mut query_types: HashMap<String, VariantType> = HashMap::new();
        let mut queries = Vec::new();
        for group in groups {
            for query in &group.queries {
                query_types.insert(query.clone(), group.variant_type);
                queries.push(query.clone());
            }
            // a group can come back empty when all its queries were claimed earlier
            run.results.entry(group.variant_type).or_default();
        }

        let total = queries.len();
        let interval = self.settings.fetch.checkpoint_interval.max(1);
        let mut processed = 0usize;
        let mut pending_rows: Vec<SuggestionRow> = Vec::new();

        let mut completions = self.fetcher.completions(&queries, self.settings.fetch.concurrency);
        while let Some((query, suggestions)) = completions.next().await {
            processed += 1;
            let variant_type = query_types
                .get(&query)
                .copied()
                .ok_or_else(|| KeywordMinerError::internal(format!("Unexpected query in batch: {}", query)))?;

            pending_rows.extend(SuggestionRow::ranked(
                &run.session_id,
                &run.original_keyword,
                variant_type,
                &query,
                &suggestions,
            ));
            run.record_result(variant_type, query, suggestions);

            self.tracker.update(&run.session_id, processed);
            on_progress(processed, total);

            if processed % interval == 0 {
                self.checkpoint(&run.session_id, &mut pending_rows, processed, total).await?;
            }
        }

        self.checkpoint(&run.session_id, &mut pending_rows, processed, total).await
    }

    async fn checkpoint(
        &self,
        session_id: &str,
        rows: &mut Vec<SuggestionRow>,
        processed: usize,
        total: usize,
    ) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        self.store.append_suggestions(rows).await?;
        tracing::debug!(
            session_id = %session_id,
            rows = rows.len(),
            processed = processed,
            total = total,
            "Checkpoint committed"
        );
        rows.clear();
        Ok(())
    }

    /// Mark the run failed everywhere it is visible and hand the error back
    async fn abort(&self, mut run: AnalysisRun, error: KeywordMinerError) -> KeywordMinerError {
        tracing::error!(
            session_id = %run.session_id,
            kind = error.kind(),
            error = %error,
            "Keyword analysis failed"
        );
        run.fail(error.to_string());
        self.tracker.fail(&run.session_id, error.to_string());
        if let Err(e) = self.store.save_run(&run.record()).await {
            tracing::warn!(session_id = %run.session_id, error = %e, "Could not record failed run");
        }
        error
    }

    pub fn get_progress(&self, session_id: &str) -> ProgressReport {
        self.tracker.report(session_id)
    }

    /// Stored suggestions of a session in source rank order
    pub async fn get_results(&self, session_id: &str) -> Result<SessionResults> {
        let record = self
            .store
            .load_run(session_id)
            .await?
            .ok_or_else(|| validation_error!("Unknown session: {}", session_id))?;

        let mut grouped: BTreeMap<VariantType, BTreeMap<String, Vec<(u32, String)>>> = BTreeMap::new();
        for row in self.store.load_suggestions(session_id).await? {
            grouped
                .entry(row.variant_type)
                .or_default()
                .entry(row.variant_keyword)
                .or_default()
                .push((row.rank, row.suggestion));
        }

        let results: VariantResults = grouped
            .into_iter()
            .map(|(variant_type, queries)| {
                let queries = queries
                    .into_iter()
                    .map(|(query, mut ranked)| {
                        ranked.sort_by_key(|(rank, _)| *rank);
                        (query, ranked.into_iter().map(|(_, s)| s).collect())
                    })
                    .collect();
                (variant_type, queries)
            })
            .collect();

        Ok(SessionResults {
            session_id: record.session_id,
            original_keyword: record.original_keyword,
            status: record.status,
            total_suggestions: record.total_suggestions,
            results,
        })
    }

    /// Score a single keyword. Market data is used when configured.
    pub async fn score_keyword(&self, keyword: &str) -> OpportunityMetrics {
        self.scorer.score_keyword(keyword.trim(), 0).await
    }

    /// Blue-ocean keywords related to `keyword`. Empty when market data is
    /// unavailable.
    pub async fn find_blue_ocean(&self, keyword: &str, limit: usize) -> Vec<BlueOceanKeyword> {
        if !self.scorer.has_market_data() {
            tracing::warn!(keyword = %keyword, "Blue-ocean search needs market data, set MARKET_API_KEY");
            return Vec::new();
        }

        match self.scorer.related_keywords(keyword.trim()).await {
            Ok(records) => find_blue_ocean(records, self.scorer.criteria(), limit),
            Err(e) => {
                tracing::warn!(keyword = %keyword, error = %e, "Blue-ocean search failed");
                Vec::new()
            }
        }
    }

    /// Ranked insight report for a session. Never fails; problems become messages.
    pub async fn get_insights(&self, session_id: &str) -> Insights {
        let rows = match self.store.load_suggestions(session_id).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "Could not load suggestions");
                return Insights::empty(session_id, vec![format!("Could not load suggestions: {}", e)]);
            }
        };

        // repeats inside one query's list are not cross-variant duplicates
        let mut seen_pairs = HashSet::new();
        let flat: Vec<String> = rows
            .into_iter()
            .filter(|row| seen_pairs.insert((row.variant_keyword.clone(), row.suggestion.clone())))
            .map(|row| row.suggestion)
            .collect();
        let (unique, cross_variant_duplicates) = dedupe_global(&flat);

        let context = unique.len();
        let outcomes = join_all(
            unique
                .iter()
                .map(|keyword| self.scorer.score_detailed(keyword, context)),
        )
        .await;

        let mut fallbacks = Vec::new();
        let scored: Vec<ScoredKeyword> = unique
            .into_iter()
            .zip(outcomes)
            .map(|(keyword, outcome)| {
                if let Some(reason) = outcome.fallback {
                    fallbacks.push(reason);
                }
                ScoredKeyword {
                    keyword,
                    metrics: outcome.metrics,
                }
            })
            .collect();

        let mut warnings = Vec::new();
        if let Some(first) = fallbacks.first() {
            warnings.push(format!(
                "{} keywords were scored with estimates because market data was unavailable ({})",
                fallbacks.len(),
                first
            ));
        }

        let ranked = insights::rank_and_tier(scored);
        tracing::info!(
            session_id = %session_id,
            keywords = ranked.len(),
            cross_variant_duplicates = cross_variant_duplicates,
            estimated = fallbacks.len(),
            "Insights computed"
        );
        insights::summarize_insights(session_id, ranked, cross_variant_duplicates, warnings)
    }

    /// Most recent runs first
    pub async fn history(&self, limit: usize) -> Result<Vec<RunRecord>> {
        self.store.list_runs(limit).await
    }

    pub fn variant_types(&self) -> Vec<VariantTypeInfo> {
        VariantType::all()
            .iter()
            .map(|t| VariantTypeInfo {
                variant_type: *t,
                label: t.label().to_string(),
                count: Pattern::for_type(*t).size(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::scoring::{KeywordRecord, MarketDataProvider};
    use crate::store::MemoryStore;
    use crate::types::ScoringConfig;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::time::Duration;

    struct FixedSource;

    #[async_trait]
    impl SuggestionSource for FixedSource {
        async fn try_fetch(&self, query: &str) -> Result<Vec<String>> {
            Ok(vec![format!("{}1", query), "共享词".to_string()])
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    /// Memory store that remembers the size of every row batch
    #[derive(Default)]
    struct BatchLog {
        inner: MemoryStore,
        batches: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl SuggestionStore for BatchLog {
        async fn save_run(&self, record: &RunRecord) -> Result<()> {
            self.inner.save_run(record).await
        }

        async fn append_suggestions(&self, rows: &[SuggestionRow]) -> Result<()> {
            self.batches.lock().push(rows.len());
            self.inner.append_suggestions(rows).await
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
            "batch-log"
        }
    }

    /// Provider whose every call fails
    struct QuotaExhausted;

    #[async_trait]
    impl MarketDataProvider for QuotaExhausted {
        async fn keyword_data(&self, _keyword: &str) -> Result<Vec<KeywordRecord>> {
            Err(KeywordMinerError::market_data(
                "quota",
                "daily quota exceeded",
                Some("100202".to_string()),
            ))
        }

        fn name(&self) -> &'static str {
            "quota"
        }
    }

    fn service(store: Arc<MemoryStore>, interval: usize) -> KeywordService {
        let mut settings = Settings::default();
        settings.fetch.checkpoint_interval = interval;
        settings.fetch.concurrency = 4;
        KeywordService::new(
            Arc::new(FixedSource),
            store,
            Arc::new(KeywordScorer::new(ScoringConfig::default())),
            settings,
        )
    }

    #[tokio::test]
    async fn test_rejects_bad_input() {
        let svc = service(Arc::new(MemoryStore::new()), 10);
        assert!(svc.analyze("  ", &[VariantType::Alpha], |_, _| {}).await.is_err());
        assert!(svc.start_analysis("减肥", &[]).is_err());
        assert!(KeywordService::parse_types(&["alpha", "beta"]).is_err());
        assert_eq!(
            KeywordService::parse_types(&["numeric", "alpha"]).unwrap(),
            vec![VariantType::Numeric, VariantType::Alpha]
        );
    }

    #[tokio::test]
    async fn test_checkpoints_cover_every_row() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(store.clone(), 4);

        let run = svc.analyze("减肥", &[VariantType::Numeric], |_, _| {}).await.unwrap();

        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.summary.total_variants, 9);
        assert_eq!(run.summary.total_suggestions, 18);
        // 9 distinct plus one shared
        assert_eq!(run.summary.unique_suggestions, 10);
        assert_eq!(store.row_count(), 18);

        let results = svc.get_results(&run.session_id).await.unwrap();
        assert_eq!(results.status, RunStatus::Completed);
        assert_eq!(results.results[&VariantType::Numeric]["减肥3"], vec!["减肥31", "共享词"]);
    }

    #[tokio::test]
    async fn test_rows_committed_every_interval() {
        let store = Arc::new(BatchLog::default());
        let mut settings = Settings::default();
        settings.fetch.checkpoint_interval = 4;
        settings.fetch.concurrency = 2;
        let svc = KeywordService::new(
            Arc::new(FixedSource),
            store.clone(),
            Arc::new(KeywordScorer::new(ScoringConfig::default())),
            settings,
        );

        svc.analyze("减肥", &[VariantType::Numeric], |_, _| {}).await.unwrap();

        // two rows per query: 4 queries, 4 queries, then the last one
        assert_eq!(*store.batches.lock(), vec![8, 8, 2]);
        assert_eq!(store.inner.row_count(), 18);
    }

    #[tokio::test]
    async fn test_insights_warn_when_market_data_fails() {
        let store = Arc::new(MemoryStore::new());
        let config = ScoringConfig {
            market_pause: Duration::ZERO,
            ..ScoringConfig::default()
        };
        let scorer = KeywordScorer::with_provider(Arc::new(QuotaExhausted), config);
        let svc = KeywordService::new(Arc::new(FixedSource), store, Arc::new(scorer), Settings::default());

        let run = svc.analyze("减肥", &[VariantType::Numeric], |_, _| {}).await.unwrap();
        let insights = svc.get_insights(&run.session_id).await;

        assert_eq!(insights.summary_stats.total_opportunities, 10);
        assert_eq!(insights.summary_stats.estimated_count, 10);
        let warning = insights
            .messages
            .iter()
            .find(|m| m.contains("market data was unavailable"))
            .unwrap();
        assert!(warning.starts_with("10 keywords"));
        assert!(warning.contains("daily quota exceeded"));
    }

    #[tokio::test]
    async fn test_start_analysis_reports_progress() {
        let svc = service(Arc::new(MemoryStore::new()), 10);
        let session_id = svc.start_analysis("减肥", &[VariantType::Numeric]).unwrap();

        let mut report = svc.get_progress(&session_id);
        for _ in 0..100 {
            if report.status == crate::analysis::ProgressStatus::Completed {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            report = svc.get_progress(&session_id);
        }
        assert_eq!(report.status, crate::analysis::ProgressStatus::Completed);
        assert_eq!(report.processed, 9);
        assert_eq!(report.percentage, 100.0);
    }

    #[tokio::test]
    async fn test_insights_count_cross_variant_duplicates() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(store, 10);
        let run = svc.analyze("减肥", &[VariantType::Numeric], |_, _| {}).await.unwrap();

        let insights = svc.get_insights(&run.session_id).await;
        assert_eq!(insights.summary_stats.total_opportunities, 10);
        assert_eq!(insights.summary_stats.cross_variant_duplicates, 8);
        assert_eq!(insights.summary_stats.estimated_count, 10);
        assert!(insights.recommendations.len() <= 10);
    }

    #[test]
    fn test_variant_type_listing() {
        let svc = service(Arc::new(MemoryStore::new()), 10);
        let types = svc.variant_types();
        assert_eq!(types.len(), VariantType::all().len());
        assert_eq!(types[0].count, 26);
        assert!(types.iter().any(|t| t.variant_type == VariantType::CommonSuffix && t.count == 12));
    }
}
