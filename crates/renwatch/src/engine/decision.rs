//! The per-job transition decision.
//!
//! Reconciliation separates deciding from doing: this module looks at
//! the candidate status and the previously persisted attempt and returns
//! a tagged [`Decision`]; the runner interprets it in one
//! effect-application step. Keeping the decision pure makes every
//! transition in the rule set directly testable.

use crate::status::RenderStatus;

/// The slice of the persisted attempt the decision depends on.
#[derive(Debug, Clone)]
pub struct PriorAttempt {
    pub status: RenderStatus,
    pub has_preview: bool,
}

/// What the reconciler should do for one job folder.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Terminal persisted status; touch nothing.
    NoOp,
    /// The image awaits approval but no preview is on file: look for one
    /// and, if the publish succeeds, update the preview column alone.
    UpdatePreviewOnly,
    /// Upsert the attempt with this status; the status did not change,
    /// so no notification.
    Persist(RenderStatus),
    /// Upsert the attempt with this status and fire a notification
    /// round for the change.
    PersistAndNotify(RenderStatus),
}

/// Apply the transition rules for one job.
///
/// `complete_is_yes` carries the raw manifest completion flag, which the
/// error-recovery rule consults independently of the candidate: a prior
/// `Erro` with a now-complete job becomes `Em aprovação` instead of
/// whatever was classified.
pub fn decide(
    prior: Option<&PriorAttempt>,
    candidate: RenderStatus,
    complete_is_yes: bool,
) -> Decision {
    match prior {
        Some(p) if p.status.is_terminal() => Decision::NoOp,
        Some(p) if p.status == RenderStatus::AwaitingApproval && !p.has_preview => {
            Decision::UpdatePreviewOnly
        }
        _ => {
            let prior_status = prior.map(|p| &p.status);
            let decided = if prior_status == Some(&RenderStatus::Failed) && complete_is_yes {
                RenderStatus::AwaitingApproval
            } else {
                candidate
            };
            // A missing prior row counts as a change.
            if prior_status != Some(&decided) {
                Decision::PersistAndNotify(decided)
            } else {
                Decision::Persist(decided)
            }
        }
    }
}
