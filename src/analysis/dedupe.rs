//! Order-preserving suggestion deduplication

use std::collections::HashSet;

use super::run::AnalysisRun;

/// Remove repeats from one list, keeping first occurrences in order.
/// Returns the cleaned list and how many entries were dropped.
pub fn dedupe_within(suggestions: &[String]) -> (Vec<String>, usize) {
    let mut seen = HashSet::with_capacity(suggestions.len());
    let kept: Vec<String> = suggestions
        .iter()
        .filter(|s| seen.insert(s.as_str()))
        .cloned()
        .collect();
    let removed = suggestions.len() - kept.len();
    (kept, removed)
}

/// Same as [`dedupe_within`], used on the flattened suggestions of a whole run
pub fn dedupe_global(suggestions: &[String]) -> (Vec<String>, usize) {
    dedupe_within(suggestions)
}

/// Deduplicate every query's list in place and recompute the run summary.
///
/// Running this twice yields the same run, since the summary's totals are
/// taken from the post-cleanup lists plus the counts already removed.
pub fn dedupe(mut run: AnalysisRun) -> AnalysisRun {
    let previously_removed = run.summary.within_variant_duplicates;
    let mut removed_now = 0usize;
    let mut total_variants = 0usize;
    let mut successful = 0usize;

    for queries in run.results.values_mut() {
        for suggestions in queries.values_mut() {
            total_variants += 1;
            let (kept, removed) = dedupe_within(suggestions);
            removed_now += removed;
            if !kept.is_empty() {
                successful += 1;
            }
            *suggestions = kept;
        }
    }

    let within = previously_removed + removed_now;
    let stage_one_total: usize = run
        .results
        .values()
        .flat_map(|queries| queries.values())
        .map(Vec::len)
        .sum();
    let (unique, _) = dedupe_global(&run.flattened());

    let total_suggestions = stage_one_total + within;
    run.summary.total_variants = total_variants.max(run.summary.total_variants);
    run.summary.successful_variants = successful;
    run.summary.failed_variants = run.summary.total_variants - successful;
    run.summary.total_suggestions = total_suggestions;
    run.summary.within_variant_duplicates = within;
    run.summary.unique_suggestions = unique.len();
    run.summary.duplicate_removed = total_suggestions - unique.len();

    tracing::debug!(
        session_id = %run.session_id,
        total = total_suggestions,
        unique = unique.len(),
        within_variant = within,
        "Deduplicated run"
    );

    run
}
