//! # Jobs
//!
//! The job status state machine, the [`JobLedger`] that owns every status
//! mutation, and the [`JobService`] that turns trusted accounts into
//! dispatched jobs.

pub mod ledger;
pub mod service;
pub mod status;

pub use ledger::{JobLedger, JobStats};
pub use service::{JobService, SweepReport};
pub use status::{JobStatus, TransitionPlan};
