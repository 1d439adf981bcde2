//! Deletion log entity - Append-only audit trail of hard deletes.
//!
//! Rows carry a frozen metadata snapshot of the deleted record so the
//! context survives after the parent row is gone. No foreign keys.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Deletion log database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "deletion_logs")]
pub struct Model {
    /// Unique identifier for the log entry
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Kind of record deleted, e.g. `"grant"`
    pub entity_type: String,
    /// Id of the deleted record, stringified
    pub entity_id: String,
    /// Human label of the deleted record
    pub entity_label: Option<String>,
    /// Non-empty reason supplied by the deleting user
    pub reason: String,
    /// Identity that performed the delete
    pub deleted_by: Option<String>,
    /// Snapshot of the record at delete time
    pub metadata: Option<Json>,
    /// When the entry was written
    pub created_at: DateTimeUtc,
}

/// `DeletionLog` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
