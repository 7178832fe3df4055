use crate::name::{CanonicalName, NameRejection};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a run should do about the device name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "detail", rename_all = "kebab-case")]
pub enum RenameDecision {
    /// Current name already equals the candidate (ignoring case)
    NoOpAlreadyCorrect,
    /// The candidate failed the naming rules; nothing can be applied
    NoOpInvalidCandidate(String),
    /// The device must be renamed to this name
    ApplyRename(CanonicalName),
}

impl RenameDecision {
    /// Successful outcomes that need no further action this run
    pub fn is_terminal_success(&self) -> bool {
        matches!(self, RenameDecision::NoOpAlreadyCorrect)
    }
}

impl fmt::Display for RenameDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenameDecision::NoOpAlreadyCorrect => write!(f, "name already correct"),
            RenameDecision::NoOpInvalidCandidate(reason) => {
                write!(f, "invalid candidate: {reason}")
            }
            RenameDecision::ApplyRename(name) => write!(f, "rename to {name}"),
        }
    }
}

/// Decide whether `current` must change to `candidate`.
///
/// Pure and total: every input pair yields exactly one decision.
pub fn decide(current: &str, candidate: Result<CanonicalName, NameRejection>) -> RenameDecision {
    match candidate {
        Err(rejection) => RenameDecision::NoOpInvalidCandidate(rejection.to_string()),
        Ok(name) if name.matches(current) => RenameDecision::NoOpAlreadyCorrect,
        Ok(name) => RenameDecision::ApplyRename(name),
    }
}
