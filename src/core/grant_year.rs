//! Grant year management.

use crate::{
    auth::AuthContext,
    entities::{GrantYear, grant_year},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, SqlErr, prelude::*};
use std::ops::RangeInclusive;
use tracing::info;

/// Accepted calendar years.
pub const YEAR_RANGE: RangeInclusive<i32> = 1900..=2100;

/// Rejects years outside [`YEAR_RANGE`].
pub fn validate_year(year: i32) -> Result<()> {
    if YEAR_RANGE.contains(&year) {
        Ok(())
    } else {
        Err(Error::InvalidYear { year })
    }
}

/// Grant years, most recent first.
pub async fn list_grant_years(db: &DatabaseConnection) -> Result<Vec<grant_year::Model>> {
    GrantYear::find()
        .order_by_desc(grant_year::Column::YearValue)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Creates a grant year. Admin tier only; the year must be in range and unique.
pub async fn create_grant_year(
    db: &DatabaseConnection,
    ctx: &AuthContext,
    year: i32,
) -> Result<grant_year::Model> {
    ctx.require_admin_tier("create grant years")?;
    validate_year(year)?;

    let row = grant_year::ActiveModel {
        year_value: Set(year),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let created = row.insert(db).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => Error::DuplicateYear { year },
        _ => Error::Database(e),
    })?;
    info!(year, "Grant year created");
    Ok(created)
}

/// Deletes a grant year. Fails with [`Error::InUse`] while grants reference it.
pub async fn delete_grant_year(
    db: &DatabaseConnection,
    ctx: &AuthContext,
    grant_year_id: i64,
) -> Result<()> {
    ctx.require_admin_tier("delete grant years")?;
    let result = GrantYear::delete_by_id(grant_year_id)
        .exec(db)
        .await
        .map_err(|e| Error::from_delete("grant year", grant_year_id, e))?;
    if result.rows_affected == 0 {
        return Err(Error::NotFound {
            entity: "grant year",
            id: grant_year_id.to_string(),
        });
    }
    info!(grant_year_id, "Grant year deleted");
    Ok(())
}
