//! The reconciliation engine: decision rules, composite rollup, and the
//! run orchestrator.

pub mod decision;
pub mod rollup;
pub mod runner;

pub use decision::{decide, Decision, PriorAttempt};
pub use rollup::{JobOutcome, RollupEntry, RollupMap};
pub use runner::{Reconciler, RunOptions, RunSummary};
