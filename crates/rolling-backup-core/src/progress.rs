use crate::engine::{RunReport, Stage};

/// Trait for reporting backup run progress.
///
/// The CLI implements it with an indicatif spinner. All methods have default
/// no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_stage(&self, _stage: Stage) {}
    fn on_reclaim_progress(&self, _freed_bytes: u64, _required_bytes: u64) {}
    fn on_run_complete(&self, _report: &RunReport) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
