//! Composite-image rollup.
//!
//! A composite image is rendered as several independently tracked
//! sub-jobs. Their per-job outcomes accumulate in a [`RollupMap`] over
//! one walk and are folded into a single aggregate status afterwards, so
//! the image changes visible status (and notifies) at most once per run.
//! The map lives for exactly one run and is passed explicitly through
//! the walk; nothing about it is persisted.

use std::collections::BTreeMap;

use crate::status::RenderStatus;

/// What one sub-job contributed to its composite image this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Decided status was `Erro`.
    Failed,
    /// The job's completion flag was set.
    Completed,
    /// Anything else: still rendering, unknown, raw passthrough.
    Incomplete,
}

/// Accumulated sub-job outcomes for one composite image.
#[derive(Debug, Clone, Default)]
pub struct RollupEntry {
    pub responsavel_id: Option<i64>,
    pub total_jobs: u32,
    pub completed_jobs: u32,
    pub any_error: bool,
    pub any_incomplete: bool,
}

impl RollupEntry {
    pub fn record(&mut self, outcome: JobOutcome) {
        self.total_jobs += 1;
        match outcome {
            JobOutcome::Failed => self.any_error = true,
            JobOutcome::Completed => self.completed_jobs += 1,
            JobOutcome::Incomplete => self.any_incomplete = true,
        }
    }

    pub fn all_complete(&self) -> bool {
        self.total_jobs > 0 && self.completed_jobs == self.total_jobs
    }

    /// Fold the accumulated outcomes into one aggregate status. Error
    /// dominates, then incompleteness, then full completion.
    pub fn aggregate(&self) -> RenderStatus {
        if self.any_error {
            RenderStatus::Failed
        } else if self.any_incomplete {
            RenderStatus::InProgress
        } else if self.all_complete() {
            RenderStatus::AwaitingApproval
        } else {
            RenderStatus::Unknown
        }
    }
}

/// Per-run accumulator keyed by image id. BTreeMap keeps the
/// aggregation pass in a deterministic order.
pub type RollupMap = BTreeMap<i64, RollupEntry>;

/// Record one sub-job outcome, creating the image's entry on first
/// sighting. The responsible party sticks from the first sub-job that
/// knows one.
pub fn record(
    rollups: &mut RollupMap,
    imagem_id: i64,
    responsavel_id: Option<i64>,
    outcome: JobOutcome,
) {
    let entry = rollups.entry(imagem_id).or_default();
    if entry.responsavel_id.is_none() {
        entry.responsavel_id = responsavel_id;
    }
    entry.record(outcome);
}
