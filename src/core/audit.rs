//! Deletion audit trail.
//!
//! Writes are best effort: a failed append is logged as a warning and reported
//! as `false`, never turned into an error, so it can not undo or block the
//! delete it describes.

use crate::{
    auth::AuthContext,
    core::grant::DisplayNames,
    entities::{DeletionLog, deletion_log, profile},
    errors::Result,
};
use sea_orm::{QueryOrder, QuerySelect, Set, prelude::*};
use serde_json::Value;
use tracing::{info, warn};

/// Maximum number of entries returned by the deletion log viewer.
pub const DELETION_LOG_LIMIT: u64 = 100;

/// Entity type recorded for grant deletions.
pub const GRANT_ENTITY: &str = "grant";

/// What to append to the deletion log.
#[derive(Debug, Clone, PartialEq)]
pub struct DeletionRecord {
    /// Kind of record deleted
    pub entity_type: String,
    /// Id of the deleted record
    pub entity_id: String,
    /// Human label, e.g. the project name
    pub entity_label: Option<String>,
    /// Reason given by the deleting user
    pub reason: String,
    /// Acting identity
    pub deleted_by: Option<String>,
    /// Snapshot of the record at delete time
    pub metadata: Option<Value>,
}

/// Appends a deletion log entry. Returns whether the write succeeded.
pub async fn record_deletion<C>(db: &C, record: DeletionRecord) -> bool
where
    C: ConnectionTrait,
{
    if record.reason.trim().is_empty() {
        warn!(
            entity_type = %record.entity_type,
            entity_id = %record.entity_id,
            "Refusing to record a deletion without a reason"
        );
        return false;
    }

    let entity_type = record.entity_type.clone();
    let entity_id = record.entity_id.clone();
    let entry = deletion_log::ActiveModel {
        entity_type: Set(record.entity_type),
        entity_id: Set(record.entity_id),
        entity_label: Set(record.entity_label),
        reason: Set(record.reason.trim().to_string()),
        deleted_by: Set(record.deleted_by),
        metadata: Set(record.metadata),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    match entry.insert(db).await {
        Ok(_) => {
            info!(%entity_type, %entity_id, "Deletion recorded");
            true
        }
        Err(e) => {
            warn!(%entity_type, %entity_id, "Failed to record deletion reason: {e}");
            false
        }
    }
}

/// Lists the newest deletion log entries for an entity type.
pub async fn list_deletion_logs(
    db: &DatabaseConnection,
    ctx: &AuthContext,
    entity_type: &str,
) -> Result<Vec<deletion_log::Model>> {
    ctx.require_admin_tier("view deletion logs")?;
    DeletionLog::find()
        .filter(deletion_log::Column::EntityType.eq(entity_type))
        .order_by_desc(deletion_log::Column::CreatedAt)
        .order_by_desc(deletion_log::Column::Id)
        .limit(DELETION_LOG_LIMIT)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Fills `names` with display names (full name first) for every
/// `deleted_by` not already known.
pub async fn resolve_deleted_by(
    db: &DatabaseConnection,
    names: &mut DisplayNames,
    logs: &[deletion_log::Model],
) -> Result<usize> {
    names
        .fill_missing(
            db,
            logs.iter().filter_map(|log| log.deleted_by.as_deref()),
            profile::Model::display_name,
        )
        .await
}
