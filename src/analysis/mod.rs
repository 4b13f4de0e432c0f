//! Analysis runs: orchestration, deduplication and progress tracking

pub mod dedupe;
pub mod progress;
pub mod run;
pub mod service;

pub use dedupe::{dedupe, dedupe_global, dedupe_within};
pub use progress::{ProgressReport, ProgressStatus, ProgressTracker};
pub use run::{AnalysisRun, RunSummary, VariantResults};
pub use service::{KeywordService, SessionResults, VariantTypeInfo};
