//! Render status labels and the candidate-status classifier.
//!
//! Labels are the exact strings persisted and displayed by the tracking
//! system. `Aprovado` and `Finalizado` are terminal: they only ever enter
//! the engine by being read back from storage and absorb any later
//! candidate.

use std::fmt;

/// A normalized render status label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderStatus {
    /// "Em andamento"
    InProgress,
    /// "Em aprovação"
    AwaitingApproval,
    /// "Erro"
    Failed,
    /// "Desconhecido"
    Unknown,
    /// "Aprovado" (terminal)
    Approved,
    /// "Finalizado" (terminal)
    Finalized,
    /// Raw passthrough for flag values outside the known vocabulary.
    Other(String),
}

impl RenderStatus {
    /// The persisted/displayed form of this status.
    pub fn label(&self) -> &str {
        match self {
            RenderStatus::InProgress => "Em andamento",
            RenderStatus::AwaitingApproval => "Em aprovação",
            RenderStatus::Failed => "Erro",
            RenderStatus::Unknown => "Desconhecido",
            RenderStatus::Approved => "Aprovado",
            RenderStatus::Finalized => "Finalizado",
            RenderStatus::Other(raw) => raw,
        }
    }

    /// Inverse of [`label`](Self::label). Unrecognized labels round-trip
    /// through [`RenderStatus::Other`].
    pub fn parse(label: &str) -> Self {
        match label {
            "Em andamento" => RenderStatus::InProgress,
            "Em aprovação" => RenderStatus::AwaitingApproval,
            "Erro" => RenderStatus::Failed,
            "Desconhecido" => RenderStatus::Unknown,
            "Aprovado" => RenderStatus::Approved,
            "Finalizado" => RenderStatus::Finalized,
            other => RenderStatus::Other(other.to_string()),
        }
    }

    /// Terminal statuses are absorbing: once persisted, no candidate may
    /// replace them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RenderStatus::Approved | RenderStatus::Finalized)
    }
}

impl fmt::Display for RenderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Derive the candidate status for one job from its manifest flags and
/// log scan outcome. First match wins:
///
/// 1. complete → `Em aprovação`
/// 2. error marker in the log → `Erro`
/// 3. active and not complete → `Em andamento`
/// 4. the raw complete value if present, else `Desconhecido`
///
/// The ordering is load-bearing: a job that finished after transient
/// warnings is not flagged erroneous, and an error outranks "in progress".
pub fn classify(active: Option<&str>, complete: Option<&str>, has_error: bool) -> RenderStatus {
    let active = normalize_flag(active);
    let complete = normalize_flag(complete);

    if complete == "yes" {
        return RenderStatus::AwaitingApproval;
    }
    if has_error {
        return RenderStatus::Failed;
    }
    if active == "yes" && complete == "no" {
        return RenderStatus::InProgress;
    }
    if complete.is_empty() {
        RenderStatus::Unknown
    } else {
        RenderStatus::parse(&complete)
    }
}

fn normalize_flag(value: Option<&str>) -> String {
    value.unwrap_or("").trim().to_lowercase()
}
