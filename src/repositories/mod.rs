//! # Repository Layer
//!
//! Thin stores over the SeaORM entities: filter, create and
//! update-by-identity operations for each table, returning [`SyncError`]
//! so callers can thread failures straight into the job ledger.
//!
//! [`SyncError`]: crate::error::SyncError

pub mod job;
pub mod job_dispatch;
pub mod project;
pub mod project_group;
pub mod provider;
pub mod secret;
pub mod secret_schema;
pub mod service_account;
pub mod trusted_account;
pub mod workspace;

pub use job::{JobFilter, JobRepository};
pub use job_dispatch::JobDispatchRepository;
pub use project::ProjectRepository;
pub use project_group::ProjectGroupRepository;
pub use provider::ProviderRepository;
pub use secret::SecretRepository;
pub use secret_schema::SchemaRepository;
pub use service_account::{ServiceAccountKey, ServiceAccountRepository};
pub use trusted_account::{NewTrustedAccount, TrustedAccountRepository};
pub use workspace::WorkspaceRepository;
