//! Secret entity model
//!
//! Credential payloads are stored as AES-GCM ciphertext bound to
//! `domain_id|id`; plaintext never touches the table.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "secrets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub domain_id: String,

    pub name: String,

    /// `DOMAIN`, `WORKSPACE` or `PROJECT`
    pub resource_group: String,

    pub workspace_id: Option<Uuid>,

    pub project_id: Option<Uuid>,

    /// Service account this secret backs, if any
    pub service_account_id: Option<Uuid>,

    /// Trusted secret the payload was derived from (lineage)
    pub trusted_secret_id: Option<Uuid>,

    pub schema_id: Option<String>,

    /// Sealed JSON payload
    pub ciphertext: Vec<u8>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
