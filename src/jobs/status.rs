//! Job status state machine
//!
//! ```text
//! PENDING --start--> IN_PROGRESS --succeed--> SUCCESS
//! PENDING --fail---> FAILURE       IN_PROGRESS --fail--> FAILURE
//! PENDING --cancel-> CANCELED      IN_PROGRESS --cancel--> CANCELED
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    InProgress,
    Success,
    Failure,
    Canceled,
}

/// What the ledger should do with a requested transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPlan {
    /// Write the new status.
    Apply,
    /// Leave the job untouched; it is already terminal.
    NoOp,
    /// The move is not part of the state machine.
    Reject,
}

impl JobStatus {
    pub const ALL: [JobStatus; 5] = [
        JobStatus::Pending,
        JobStatus::InProgress,
        JobStatus::Success,
        JobStatus::Failure,
        JobStatus::Canceled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::InProgress => "IN_PROGRESS",
            JobStatus::Success => "SUCCESS",
            JobStatus::Failure => "FAILURE",
            JobStatus::Canceled => "CANCELED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Success | JobStatus::Failure | JobStatus::Canceled
        )
    }

    /// FAILURE or CANCELED: the executor must stop working on the job.
    pub fn is_terminally_failed(&self) -> bool {
        matches!(self, JobStatus::Failure | JobStatus::Canceled)
    }

    pub fn plan(&self, to: JobStatus) -> TransitionPlan {
        use JobStatus::*;

        if self.is_terminal() {
            return TransitionPlan::NoOp;
        }
        match (self, to) {
            (Pending, InProgress | Failure | Canceled) => TransitionPlan::Apply,
            // at-least-once redelivery resumes an already started job
            (InProgress, InProgress | Success | Failure | Canceled) => TransitionPlan::Apply,
            _ => TransitionPlan::Reject,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings_match_serde() {
        for status in JobStatus::ALL {
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json, serde_json::Value::String(status.as_str().to_string()));
        }
    }

    #[test]
    fn test_forward_transitions_apply() {
        assert_eq!(
            JobStatus::Pending.plan(JobStatus::InProgress),
            TransitionPlan::Apply
        );
        assert_eq!(JobStatus::Pending.plan(JobStatus::Canceled), TransitionPlan::Apply);
        assert_eq!(JobStatus::Pending.plan(JobStatus::Failure), TransitionPlan::Apply);
        assert_eq!(
            JobStatus::InProgress.plan(JobStatus::Success),
            TransitionPlan::Apply
        );
        assert_eq!(
            JobStatus::InProgress.plan(JobStatus::InProgress),
            TransitionPlan::Apply
        );
    }

    #[test]
    fn test_backward_and_skipping_transitions_rejected() {
        assert_eq!(JobStatus::Pending.plan(JobStatus::Success), TransitionPlan::Reject);
        assert_eq!(JobStatus::Pending.plan(JobStatus::Pending), TransitionPlan::Reject);
        assert_eq!(
            JobStatus::InProgress.plan(JobStatus::Pending),
            TransitionPlan::Reject
        );
    }

    #[test]
    fn test_terminal_states_never_move() {
        for from in [JobStatus::Success, JobStatus::Failure, JobStatus::Canceled] {
            for to in JobStatus::ALL {
                assert_eq!(from.plan(to), TransitionPlan::NoOp, "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_terminally_failed() {
        assert!(JobStatus::Failure.is_terminally_failed());
        assert!(JobStatus::Canceled.is_terminally_failed());
        assert!(!JobStatus::Success.is_terminally_failed());
        assert!(!JobStatus::InProgress.is_terminally_failed());
    }
}
