use std::fmt;
use std::str::FromStr;

/// Remote run lifecycle as reported by the assistants API. A run is transient
/// request-scoped state and is never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
    Cancelled,
    Expired,
}

impl RunStatus {
    /// Whether the remote service will never advance this run further.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled | RunStatus::Expired
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Expired => "expired",
        }
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(RunStatus::Queued),
            // cancelling still advances, treat it as in flight
            "in_progress" | "cancelling" | "requires_action" => Ok(RunStatus::InProgress),
            "completed" => Ok(RunStatus::Completed),
            "failed" | "incomplete" => Ok(RunStatus::Failed),
            "cancelled" => Ok(RunStatus::Cancelled),
            "expired" => Ok(RunStatus::Expired),
            _ => Err(format!("Unknown run status: {}", s)),
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
