//! # Hierarchy Reconciler
//!
//! Maps one [`DiscoveredRecord`] onto the managed inventory:
//! workspace, then one project group per remaining location node, then the
//! project, then the service account. Every level is a lookup-then-upsert on
//! the provider id, so running the same record twice leaves the inventory
//! unchanged apart from `last_synced_at`.

use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use rand::seq::SliceRandom;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{DatabaseConnection, Set};
use serde_json::{Value as JsonValue, json};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::SyncError;
use crate::models::project::PROJECT_TYPE_PRIVATE;
use crate::models::trusted_account::{ScopeKind, SyncOptions};
use crate::models::{project, project_group, service_account, workspace};
use crate::plugins::{DiscoveredRecord, LocationNode};
use crate::repositories::{
    ProjectGroupRepository, ProjectRepository, ServiceAccountKey, ServiceAccountRepository,
    WorkspaceRepository,
};

/// Theme tags assigned to newly created workspaces.
pub const WORKSPACE_THEMES: &[&str] = &[
    "blue", "coral", "green", "indigo", "orange", "peacock", "purple", "red", "violet", "yellow",
];

/// Per-job context shared by every record of a sync run.
#[derive(Debug, Clone)]
pub struct ReconciliationParams {
    pub scope: ScopeKind,
    pub sync_options: SyncOptions,
    pub domain_id: String,
    /// Owning workspace of a `WORKSPACE` trusted account
    pub workspace_id: Option<Uuid>,
    pub trusted_account_id: Uuid,
    pub trusted_secret_id: Option<Uuid>,
    pub provider: String,
}

/// The inventory stores the reconciler writes to.
#[derive(Debug, Clone)]
pub struct Inventory {
    pub workspaces: WorkspaceRepository,
    pub project_groups: ProjectGroupRepository,
    pub projects: ProjectRepository,
    pub service_accounts: ServiceAccountRepository,
}

impl Inventory {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            workspaces: WorkspaceRepository::new(db.clone()),
            project_groups: ProjectGroupRepository::new(db.clone()),
            projects: ProjectRepository::new(db.clone()),
            service_accounts: ServiceAccountRepository::new(db),
        }
    }
}

/// Location nodes a record is placed with.
///
/// With `skip_project_group`, a domain account keeps only the root node (its
/// workspace) and a workspace account keeps none.
pub fn derive_location(
    location: &[LocationNode],
    scope: ScopeKind,
    options: &SyncOptions,
) -> Vec<LocationNode> {
    if !options.skip_project_group {
        return location.to_vec();
    }
    match scope {
        ScopeKind::Domain => location.iter().take(1).cloned().collect(),
        ScopeKind::Workspace => Vec::new(),
    }
}

fn random_theme() -> JsonValue {
    let theme = WORKSPACE_THEMES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or("blue");
    json!({ "theme": theme })
}

fn json_object(map: &serde_json::Map<String, JsonValue>) -> JsonValue {
    JsonValue::Object(map.clone())
}

#[derive(Debug, Clone)]
pub struct HierarchyReconciler {
    inventory: Inventory,
}

impl HierarchyReconciler {
    pub fn new(inventory: Inventory) -> Self {
        Self { inventory }
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// Upserts the record's workspace, groups, project and service account.
    ///
    /// Returns `None` when a domain-scoped record carries no placement.
    pub async fn reconcile(
        &self,
        record: &DiscoveredRecord,
        params: &ReconciliationParams,
    ) -> Result<Option<service_account::Model>, SyncError> {
        let mut location =
            derive_location(&record.location, params.scope, &params.sync_options).into_iter();

        let workspace_id = match params.scope {
            ScopeKind::Domain => {
                if let Some(single_workspace_id) = params.sync_options.single_workspace_id {
                    self.inventory
                        .workspaces
                        .find(&params.domain_id, single_workspace_id)
                        .await?
                        .ok_or_else(|| {
                            SyncError::Reconciliation(format!(
                                "single workspace {single_workspace_id} does not exist"
                            ))
                        })?
                        .id
                } else if let Some(root) = location.next() {
                    self.upsert_workspace(&root, params).await?.id
                } else {
                    debug!(resource_id = %record.resource_id, "domain record without location, skipping");
                    return Ok(None);
                }
            }
            ScopeKind::Workspace => params.workspace_id.ok_or_else(|| {
                SyncError::Reconciliation(format!(
                    "workspace trusted account {} has no workspace",
                    params.trusted_account_id
                ))
            })?,
        };

        let mut parent_group_id = None;
        for node in location {
            let group = self
                .upsert_project_group(&node, workspace_id, parent_group_id, params)
                .await?;
            parent_group_id = Some(group.id);
        }

        let project = self
            .upsert_project(record, workspace_id, parent_group_id, params)
            .await?;
        let account = self.upsert_service_account(record, &project, params).await?;
        Ok(Some(account))
    }

    async fn upsert_workspace(
        &self,
        node: &LocationNode,
        params: &ReconciliationParams,
    ) -> Result<workspace::Model, SyncError> {
        let workspaces = &self.inventory.workspaces;
        let now = Utc::now().fixed_offset();

        let Some(existing) = workspaces.find_by_name(&params.domain_id, &node.name).await? else {
            let created = workspaces
                .insert(workspace::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    domain_id: Set(params.domain_id.clone()),
                    name: Set(node.name.clone()),
                    tags: Set(random_theme()),
                    references: Set(json!([node.resource_id])),
                    is_managed: Set(true),
                    trusted_account_id: Set(Some(params.trusted_account_id)),
                    last_synced_at: Set(Some(now)),
                    created_at: Set(now),
                    updated_at: Set(now),
                })
                .await?;
            counter!("account_sync_inventory_created_total", "kind" => "workspace").increment(1);
            info!(workspace_id = %created.id, name = %created.name, "created workspace");
            return Ok(created);
        };

        let workspace_id = existing.id;
        let mut references = existing.reference_ids();
        let mut active: workspace::ActiveModel = existing.clone().into();
        if existing.name != node.name {
            active.name = Set(node.name.clone());
        }
        if !references.contains(&node.resource_id) {
            references.push(node.resource_id.clone());
            active.references = Set(json!(references));
        }
        active.is_managed = Set(true);
        active.trusted_account_id = Set(Some(params.trusted_account_id));
        active.last_synced_at = Set(Some(now));
        active.updated_at = Set(now);
        let updated = workspaces.update(active).await?;

        self.release_reference(&params.domain_id, &node.resource_id, workspace_id, now)
            .await?;
        Ok(updated)
    }

    /// Removes `reference_id` from every workspace but `keep`.
    async fn release_reference(
        &self,
        domain_id: &str,
        reference_id: &str,
        keep: Uuid,
        now: DateTimeWithTimeZone,
    ) -> Result<(), SyncError> {
        let holders = self
            .inventory
            .workspaces
            .list_holding_reference(domain_id, reference_id)
            .await?;

        for holder in holders.into_iter().filter(|ws| ws.id != keep) {
            let remaining: Vec<String> = holder
                .reference_ids()
                .into_iter()
                .filter(|id| id != reference_id)
                .collect();
            info!(
                workspace_id = %holder.id,
                reference_id = %reference_id,
                new_owner = %keep,
                "moving provider reference to another workspace"
            );
            let mut active: workspace::ActiveModel = holder.into();
            active.references = Set(json!(remaining));
            active.updated_at = Set(now);
            self.inventory.workspaces.update(active).await?;
        }
        Ok(())
    }

    async fn upsert_project_group(
        &self,
        node: &LocationNode,
        workspace_id: Uuid,
        parent_group_id: Option<Uuid>,
        params: &ReconciliationParams,
    ) -> Result<project_group::Model, SyncError> {
        let groups = &self.inventory.project_groups;
        let now = Utc::now().fixed_offset();

        match groups
            .find_managed_by_reference(&params.domain_id, workspace_id, &node.resource_id)
            .await?
        {
            Some(existing) => {
                let name_changed = existing.name != node.name;
                let mut active: project_group::ActiveModel = existing.into();
                if name_changed {
                    active.name = Set(node.name.clone());
                }
                if parent_group_id.is_some() {
                    active.parent_group_id = Set(parent_group_id);
                }
                active.trusted_account_id = Set(Some(params.trusted_account_id));
                active.last_synced_at = Set(Some(now));
                active.updated_at = Set(now);
                groups.update(active).await
            }
            None => {
                let created = groups
                    .insert(project_group::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        domain_id: Set(params.domain_id.clone()),
                        workspace_id: Set(workspace_id),
                        name: Set(node.name.clone()),
                        reference_id: Set(Some(node.resource_id.clone())),
                        parent_group_id: Set(parent_group_id),
                        is_managed: Set(true),
                        trusted_account_id: Set(Some(params.trusted_account_id)),
                        last_synced_at: Set(Some(now)),
                        created_at: Set(now),
                        updated_at: Set(now),
                    })
                    .await?;
                counter!("account_sync_inventory_created_total", "kind" => "project_group")
                    .increment(1);
                debug!(project_group_id = %created.id, name = %created.name, "created project group");
                Ok(created)
            }
        }
    }

    async fn upsert_project(
        &self,
        record: &DiscoveredRecord,
        workspace_id: Uuid,
        project_group_id: Option<Uuid>,
        params: &ReconciliationParams,
    ) -> Result<project::Model, SyncError> {
        let projects = &self.inventory.projects;
        let now = Utc::now().fixed_offset();

        match projects
            .find_by_reference(&params.domain_id, workspace_id, &record.resource_id)
            .await?
        {
            Some(existing) => {
                let name_changed = existing.name != record.name;
                let mut active: project::ActiveModel = existing.into();
                if name_changed {
                    active.name = Set(record.name.clone());
                }
                active.project_group_id = Set(project_group_id);
                active.trusted_account_id = Set(Some(params.trusted_account_id));
                active.last_synced_at = Set(Some(now));
                active.updated_at = Set(now);
                projects.update(active).await
            }
            None => {
                let created = projects
                    .insert(project::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        domain_id: Set(params.domain_id.clone()),
                        workspace_id: Set(workspace_id),
                        project_group_id: Set(project_group_id),
                        name: Set(record.name.clone()),
                        project_type: Set(PROJECT_TYPE_PRIVATE.to_string()),
                        reference_id: Set(Some(record.resource_id.clone())),
                        is_managed: Set(true),
                        trusted_account_id: Set(Some(params.trusted_account_id)),
                        last_synced_at: Set(Some(now)),
                        created_at: Set(now),
                        updated_at: Set(now),
                    })
                    .await?;
                counter!("account_sync_inventory_created_total", "kind" => "project").increment(1);
                debug!(project_id = %created.id, name = %created.name, "created project");
                Ok(created)
            }
        }
    }

    async fn upsert_service_account(
        &self,
        record: &DiscoveredRecord,
        project: &project::Model,
        params: &ReconciliationParams,
    ) -> Result<service_account::Model, SyncError> {
        let accounts = &self.inventory.service_accounts;
        let now = Utc::now().fixed_offset();
        let key = ServiceAccountKey {
            provider: &params.provider,
            reference_id: &record.resource_id,
            domain_id: &project.domain_id,
            workspace_id: project.workspace_id,
            project_id: project.id,
        };

        match accounts.find_managed(key).await? {
            Some(existing) => {
                let name_changed = existing.name != record.name;
                let mut active: service_account::ActiveModel = existing.into();
                if name_changed {
                    active.name = Set(record.name.clone());
                }
                active.trusted_account_id = Set(Some(params.trusted_account_id));
                active.last_synced_at = Set(Some(now));
                active.updated_at = Set(now);
                accounts.update(active).await
            }
            None => {
                let created = accounts
                    .insert(service_account::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        domain_id: Set(project.domain_id.clone()),
                        workspace_id: Set(project.workspace_id),
                        project_id: Set(project.id),
                        provider: Set(params.provider.clone()),
                        name: Set(record.name.clone()),
                        reference_id: Set(record.resource_id.clone()),
                        data: Set(json_object(&record.data)),
                        tags: Set(json_object(&record.tags)),
                        schema_id: Set(record.secret_schema_id.clone()),
                        secret_id: Set(None),
                        is_managed: Set(true),
                        trusted_account_id: Set(Some(params.trusted_account_id)),
                        last_synced_at: Set(Some(now)),
                        created_at: Set(now),
                        updated_at: Set(now),
                    })
                    .await?;
                counter!("account_sync_inventory_created_total", "kind" => "service_account")
                    .increment(1);
                info!(service_account_id = %created.id, name = %created.name, "created service account");
                Ok(created)
            }
        }
    }
}
