//! Grant lifecycle, access policy and listing.
//!
//! Two authorities change a grant's status:
//!
//! - a *privileged edit* (`admin`, `super_admin`) rewrites any field, status
//!   included, with no ordering rule;
//! - a *self-service change* (any signed-in role) rewrites only the status,
//!   to any of the three values, and stamps `user_id` with the actor.
//!
//! Deletion is reserved to `super_admin`, needs a non-empty reason and always
//! attempts an audit entry. Updates are last-write-wins; there is no version
//! check.

use crate::{
    auth::AuthContext,
    core::audit::{self, DeletionRecord},
    entities::{
        FundSource, Grant, GrantStatus, GrantYear, Profile, fund_source, grant, grant_year, profile,
    },
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Serialize;
use serde_json::json;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};

/// A grant joined with its fund source and year.
///
/// Built once right after fetching, so business logic never has to deal with
/// partially loaded relations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrantWithRelations {
    /// The grant row
    pub grant: grant::Model,
    /// Fund source, if it still resolves
    pub fund_source: Option<fund_source::Model>,
    /// Grant year, if it still resolves
    pub year: Option<grant_year::Model>,
}

impl GrantWithRelations {
    /// Joins grants with lookup tables, preserving the grant order.
    #[must_use]
    pub fn assemble(
        grants: Vec<grant::Model>,
        sources: &[fund_source::Model],
        years: &[grant_year::Model],
    ) -> Vec<Self> {
        let sources: HashMap<i64, &fund_source::Model> = sources.iter().map(|s| (s.id, s)).collect();
        let years: HashMap<i64, &grant_year::Model> = years.iter().map(|y| (y.id, y)).collect();
        grants
            .into_iter()
            .map(|grant| Self {
                fund_source: sources.get(&grant.fund_source_id).map(|s| (*s).clone()),
                year: years.get(&grant.year_id).map(|y| (*y).clone()),
                grant,
            })
            .collect()
    }

    /// Fund source display name, if resolved.
    #[must_use]
    pub fn fund_source_name(&self) -> Option<&str> {
        self.fund_source.as_ref().map(|s| s.source_name.as_str())
    }

    /// Calendar year, if resolved.
    #[must_use]
    pub fn year_value(&self) -> Option<i32> {
        self.year.as_ref().map(|y| y.year_value)
    }

    /// Snapshot frozen into the deletion log.
    #[must_use]
    pub fn audit_snapshot(&self) -> serde_json::Value {
        json!({
            "projectName": self.grant.project_name,
            "amountApproved": self.grant.amount_approved,
            "fundSource": self.fund_source_name(),
            "year": self.year_value(),
            "status": self.grant.status,
        })
    }
}

/// Editable grant fields.
#[derive(Debug, Clone, PartialEq)]
pub struct GrantDraft {
    /// Project name, trimmed before saving
    pub project_name: String,
    /// Approved amount, zero or more
    pub amount_approved: f64,
    /// Status to set
    pub status: GrantStatus,
    /// Grant year id
    pub year_id: i64,
    /// Fund source id
    pub fund_source_id: i64,
    /// Attached document URL
    pub document_url: Option<String>,
}

impl GrantDraft {
    fn validate(&self) -> Result<()> {
        if self.project_name.trim().is_empty() {
            return Err(Error::Validation("Project name cannot be empty".to_string()));
        }
        if !self.amount_approved.is_finite() || self.amount_approved < 0.0 {
            return Err(Error::InvalidAmount {
                amount: self.amount_approved,
            });
        }
        Ok(())
    }
}

/// Set of statuses selected in the grant list. Empty means "all".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusFilter(BTreeSet<GrantStatus>);

impl StatusFilter {
    /// Parses a comma-separated query value such as `"ongoing,approved"`.
    ///
    /// Tokens are trimmed and lower-cased; duplicates collapse and unknown
    /// tokens are dropped silently.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        Self(value.split(',').filter_map(GrantStatus::parse).collect())
    }

    /// Parses an optional `status` query parameter.
    #[must_use]
    pub fn from_query(value: Option<&str>) -> Self {
        value.map(Self::parse).unwrap_or_default()
    }

    /// Whether no status is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether a status passes the filter.
    #[must_use]
    pub fn matches(&self, status: GrantStatus) -> bool {
        self.0.is_empty() || self.0.contains(&status)
    }

    /// Selected statuses in display order.
    pub fn statuses(&self) -> impl Iterator<Item = GrantStatus> + '_ {
        self.0.iter().copied()
    }

    /// Canonical query value, e.g. `"approved,ongoing"`.
    #[must_use]
    pub fn to_query_value(&self) -> String {
        self.statuses()
            .map(GrantStatus::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Filters applied to the grant list. Every set criterion must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantFilter {
    /// Case-insensitive substring of the project name
    pub search: String,
    /// Grant year id
    pub year_id: Option<i64>,
    /// Fund source id
    pub fund_source_id: Option<i64>,
    /// Accepted statuses
    pub statuses: StatusFilter,
}

impl GrantFilter {
    /// Whether a row passes every criterion.
    #[must_use]
    pub fn matches(&self, row: &GrantWithRelations) -> bool {
        let grant = &row.grant;
        grant
            .project_name
            .to_lowercase()
            .contains(&self.search.to_lowercase())
            && self.year_id.is_none_or(|id| grant.year_id == id)
            && self.fund_source_id.is_none_or(|id| grant.fund_source_id == id)
            && self.statuses.matches(grant.status)
    }

    /// Rows passing the filter, in their original order.
    #[must_use]
    pub fn apply<'a>(&self, rows: &'a [GrantWithRelations]) -> Vec<&'a GrantWithRelations> {
        rows.iter().filter(|row| self.matches(row)).collect()
    }
}

/// Cache of profile id → display name, filled lazily.
#[derive(Debug, Clone, Default)]
pub struct DisplayNames {
    names: HashMap<String, String>,
}

impl DisplayNames {
    /// Records a known name.
    pub fn remember(&mut self, id: impl Into<String>, name: impl Into<String>) {
        self.names.insert(id.into(), name.into());
    }

    /// Cached name for an id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    /// Number of cached names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Looks up every id not yet cached in one query and caches the result
    /// of `label`. Ids with no profile stay unknown. Returns how many names
    /// were added.
    pub async fn fill_missing<'a>(
        &mut self,
        db: &DatabaseConnection,
        ids: impl IntoIterator<Item = &'a str>,
        label: fn(&profile::Model) -> String,
    ) -> Result<usize> {
        let missing: BTreeSet<&str> = ids
            .into_iter()
            .filter(|id| !id.is_empty() && !self.names.contains_key(*id))
            .collect();
        if missing.is_empty() {
            return Ok(0);
        }

        let profiles = Profile::find()
            .filter(profile::Column::Id.is_in(missing))
            .all(db)
            .await?;
        let added = profiles.len();
        for profile in &profiles {
            self.names.insert(profile.id.clone(), label(profile));
        }
        debug!("Cached {added} display names");
        Ok(added)
    }
}

/// Result of a grant deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// Whether the audit entry was written
    pub audit_recorded: bool,
}

/// Loads one grant with its relations.
pub async fn get_grant(db: &DatabaseConnection, grant_id: i64) -> Result<GrantWithRelations> {
    let (grant, fund_source) = Grant::find_by_id(grant_id)
        .find_also_related(FundSource)
        .one(db)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "grant",
            id: grant_id.to_string(),
        })?;
    let year = GrantYear::find_by_id(grant.year_id).one(db).await?;
    Ok(GrantWithRelations {
        grant,
        fund_source,
        year,
    })
}

/// All grants with relations, newest first.
pub async fn list_grants(db: &DatabaseConnection) -> Result<Vec<GrantWithRelations>> {
    let grants = Grant::find()
        .order_by_desc(grant::Column::CreatedAt)
        .order_by_desc(grant::Column::Id)
        .all(db)
        .await?;
    let sources = FundSource::find().all(db).await?;
    let years = GrantYear::find().all(db).await?;
    Ok(GrantWithRelations::assemble(grants, &sources, &years))
}

/// Caches "last updated by" names (email first) for the listed grants.
pub async fn resolve_updated_by(
    db: &DatabaseConnection,
    names: &mut DisplayNames,
    rows: &[GrantWithRelations],
) -> Result<usize> {
    names
        .fill_missing(
            db,
            rows.iter().filter_map(|row| row.grant.user_id.as_deref()),
            profile::Model::contact_label,
        )
        .await
}

/// Creates a grant. Admin tier only.
pub async fn create_grant(
    db: &DatabaseConnection,
    ctx: &AuthContext,
    draft: GrantDraft,
) -> Result<grant::Model> {
    ctx.require_admin_tier("create grants")?;
    draft.validate()?;

    let grant = grant::ActiveModel {
        project_name: Set(draft.project_name.trim().to_string()),
        amount_approved: Set(draft.amount_approved),
        status: Set(draft.status),
        year_id: Set(draft.year_id),
        fund_source_id: Set(draft.fund_source_id),
        created_at: Set(chrono::Utc::now()),
        user_id: Set(None),
        document_url: Set(draft.document_url),
        ..Default::default()
    };

    let created = grant.insert(db).await?;
    info!(grant_id = created.id, actor = %ctx.user_id, "Grant created");
    Ok(created)
}

/// Rewrites every editable field of a grant. Admin tier only; any status may
/// be set.
pub async fn update_grant(
    db: &DatabaseConnection,
    ctx: &AuthContext,
    grant_id: i64,
    draft: GrantDraft,
) -> Result<grant::Model> {
    ctx.require_admin_tier("edit grants")?;
    draft.validate()?;

    let existing = Grant::find_by_id(grant_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "grant",
            id: grant_id.to_string(),
        })?;

    let mut grant: grant::ActiveModel = existing.into();
    grant.project_name = Set(draft.project_name.trim().to_string());
    grant.amount_approved = Set(draft.amount_approved);
    grant.status = Set(draft.status);
    grant.year_id = Set(draft.year_id);
    grant.fund_source_id = Set(draft.fund_source_id);
    grant.document_url = Set(draft.document_url);

    let updated = grant.update(db).await?;
    info!(grant_id, actor = %ctx.user_id, "Grant updated");
    Ok(updated)
}

/// Self-service status change, open to every signed-in role.
///
/// Any status may follow any other. Setting the current status is a no-op
/// without a write. On change, `user_id` is stamped with the actor and the
/// actor's name is cached in `names`.
pub async fn change_status(
    db: &DatabaseConnection,
    ctx: &AuthContext,
    names: &mut DisplayNames,
    grant_id: i64,
    next: GrantStatus,
) -> Result<grant::Model> {
    let existing = Grant::find_by_id(grant_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "grant",
            id: grant_id.to_string(),
        })?;

    if existing.status == next {
        debug!(grant_id, status = %next, "Status unchanged, skipping update");
        return Ok(existing);
    }

    let previous = existing.status;
    let mut grant: grant::ActiveModel = existing.into();
    grant.status = Set(next);
    grant.user_id = Set(Some(ctx.user_id.clone()));
    let updated = grant.update(db).await?;

    names.remember(ctx.user_id.clone(), ctx.display_name());
    info!(grant_id, from = %previous, to = %next, actor = %ctx.user_id, "Grant status changed");
    Ok(updated)
}

/// Deletes a grant and records why. `super_admin` only.
///
/// The audit entry is attempted whether or not the delete succeeds, with a
/// snapshot of `target` taken before the delete. An audit failure is reported
/// in the outcome and never undoes the delete.
pub async fn delete_grant(
    db: &DatabaseConnection,
    ctx: &AuthContext,
    target: &GrantWithRelations,
    reason: &str,
) -> Result<DeleteOutcome> {
    ctx.require_super_admin("delete grants")?;
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(Error::MissingReason);
    }

    let grant_id = target.grant.id;
    let snapshot = target.audit_snapshot();
    let deleted = Grant::delete_by_id(grant_id).exec(db).await;

    let audit_recorded = audit::record_deletion(
        db,
        DeletionRecord {
            entity_type: audit::GRANT_ENTITY.to_string(),
            entity_id: grant_id.to_string(),
            entity_label: Some(target.grant.project_name.clone()),
            reason: reason.to_string(),
            deleted_by: Some(ctx.user_id.clone()),
            metadata: Some(snapshot),
        },
    )
    .await;
    if !audit_recorded {
        warn!(grant_id, "Grant deletion reason could not be recorded");
    }

    let result = deleted.map_err(|e| Error::from_delete("grant", grant_id, e))?;
    if result.rows_affected == 0 {
        return Err(Error::NotFound {
            entity: "grant",
            id: grant_id.to_string(),
        });
    }

    info!(grant_id, actor = %ctx.user_id, "Grant deleted");
    Ok(DeleteOutcome { audit_recorded })
}
