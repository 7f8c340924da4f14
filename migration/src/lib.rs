//! Database migrations for the account sync service.
//!
//! Creates the provider catalog, credential tables, the managed inventory
//! hierarchy and the job/dispatch tables used by the orchestrator.

pub use sea_orm_migration::prelude::*;

mod m2025_11_10_000001_create_providers;
mod m2025_11_10_000002_create_secret_schemas;
mod m2025_11_10_000003_create_secrets;
mod m2025_11_10_000004_create_trusted_accounts;
mod m2025_11_10_000005_create_workspaces;
mod m2025_11_10_000006_create_project_groups;
mod m2025_11_10_000007_create_projects;
mod m2025_11_10_000008_create_service_accounts;
mod m2025_11_10_000009_create_jobs;
mod m2025_11_10_000010_create_job_dispatches;
mod m2025_11_10_000011_add_job_dispatch_pending_guard;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_11_10_000001_create_providers::Migration),
            Box::new(m2025_11_10_000002_create_secret_schemas::Migration),
            Box::new(m2025_11_10_000003_create_secrets::Migration),
            Box::new(m2025_11_10_000004_create_trusted_accounts::Migration),
            Box::new(m2025_11_10_000005_create_workspaces::Migration),
            Box::new(m2025_11_10_000006_create_project_groups::Migration),
            Box::new(m2025_11_10_000007_create_projects::Migration),
            Box::new(m2025_11_10_000008_create_service_accounts::Migration),
            Box::new(m2025_11_10_000009_create_jobs::Migration),
            Box::new(m2025_11_10_000010_create_job_dispatches::Migration),
            Box::new(m2025_11_10_000011_add_job_dispatch_pending_guard::Migration),
        ]
    }
}
