use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::da::{WorkItemDetails, WorkItemStatus};

/// Fixed-cadence polling parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Sleep before every status read.
    pub interval: Duration,
    /// Maximum number of status reads before giving up.
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 60,
        }
    }
}

impl PollConfig {
    /// Upper bound of the time spent sleeping between reads. Saturates at
    /// `Duration::MAX`.
    pub fn budget(&self) -> Duration {
        self.interval
            .checked_mul(self.max_attempts)
            .unwrap_or(Duration::MAX)
    }
}

/// How polling ended.
///
/// `TimedOut` and `PollFailed` are kept apart from `Failed`, which only ever
/// carries a status reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutcomeKind {
    Succeeded,
    /// The server reported a non-success final status.
    Failed { status: WorkItemStatus },
    /// The read budget ran out while the item was still pending or in progress.
    TimedOut { last_status: WorkItemStatus },
    /// A status read failed at the transport or API level.
    PollFailed { error: String },
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeKind::Succeeded => write!(f, "succeeded"),
            OutcomeKind::Failed { status } => write!(f, "failed with status {status}"),
            OutcomeKind::TimedOut { last_status } => {
                write!(f, "timed out while still {last_status}")
            }
            OutcomeKind::PollFailed { error } => write!(f, "status check failed: {error}"),
        }
    }
}

/// Structured report produced once polling is over.
#[derive(Debug, Clone, Serialize)]
pub struct WorkItemOutcome {
    pub work_item_id: String,
    pub outcome: OutcomeKind,
    /// Status reads issued by the polling loop (the diagnostic read excluded).
    pub polls: u32,
    pub max_polls: u32,
    pub status_history: Vec<WorkItemStatus>,
    /// Full server record, fetched after any non-success ending.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<WorkItemDetails>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl WorkItemOutcome {
    pub fn is_success(&self) -> bool {
        self.outcome == OutcomeKind::Succeeded
    }
}
