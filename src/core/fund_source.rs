//! Fund source management and per-source totals.

use crate::{
    auth::AuthContext,
    entities::{FundSource, Grant, fund_source},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

/// A fund source with the sum of every grant drawing from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FundSourceTotal {
    /// The fund source
    pub source: fund_source::Model,
    /// Sum of `amount_approved` across all its grants, any status
    pub total_approved: f64,
}

fn normalize_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation("Fund source name cannot be empty".to_string()));
    }
    Ok(name.to_string())
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

/// Fund sources ordered by name.
pub async fn list_fund_sources(db: &DatabaseConnection) -> Result<Vec<fund_source::Model>> {
    FundSource::find()
        .order_by_asc(fund_source::Column::SourceName)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Creates a fund source. Admin tier only.
pub async fn create_fund_source(
    db: &DatabaseConnection,
    ctx: &AuthContext,
    name: &str,
    description: Option<String>,
) -> Result<fund_source::Model> {
    ctx.require_admin_tier("create fund sources")?;
    let source_name = normalize_name(name)?;

    let source = fund_source::ActiveModel {
        source_name: Set(source_name),
        description: Set(normalize_description(description)),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let created = source.insert(db).await?;
    info!(fund_source_id = created.id, name = %created.source_name, "Fund source created");
    Ok(created)
}

/// Renames a fund source and replaces its description. Admin tier only.
pub async fn rename_fund_source(
    db: &DatabaseConnection,
    ctx: &AuthContext,
    fund_source_id: i64,
    name: &str,
    description: Option<String>,
) -> Result<fund_source::Model> {
    ctx.require_admin_tier("edit fund sources")?;
    let source_name = normalize_name(name)?;

    let existing = FundSource::find_by_id(fund_source_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "fund source",
            id: fund_source_id.to_string(),
        })?;

    let mut source: fund_source::ActiveModel = existing.into();
    source.source_name = Set(source_name);
    source.description = Set(normalize_description(description));
    let updated = source.update(db).await?;
    info!(fund_source_id, name = %updated.source_name, "Fund source renamed");
    Ok(updated)
}

/// Every fund source with its total over all grants, largest first.
///
/// Sources are read in name order and the sort is stable, so equal totals
/// stay alphabetical.
pub async fn totals_by_source(db: &DatabaseConnection) -> Result<Vec<FundSourceTotal>> {
    let sources = list_fund_sources(db).await?;
    let grants = Grant::find().all(db).await?;

    let mut sums: HashMap<i64, f64> = HashMap::new();
    for grant in &grants {
        *sums.entry(grant.fund_source_id).or_insert(0.0) += grant.amount_approved;
    }

    let mut totals: Vec<FundSourceTotal> = sources
        .into_iter()
        .map(|source| FundSourceTotal {
            total_approved: sums.get(&source.id).copied().unwrap_or(0.0),
            source,
        })
        .collect();
    totals.sort_by(|a, b| b.total_approved.total_cmp(&a.total_approved));
    Ok(totals)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::entities::GrantStatus;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_fund_source_trims_and_validates() -> Result<()> {
        let db = setup_test_db().await?;
        let ctx = admin_context();

        let created =
            create_fund_source(&db, &ctx, "  Federal  ", Some("   ".to_string())).await?;
        assert_eq!(created.source_name, "Federal");
        assert!(created.description.is_none());

        let result = create_fund_source(&db, &ctx, "  ", None).await;
        assert!(matches!(result, Err(Error::Validation(_))));

        let result = create_fund_source(&db, &user_context(), "State", None).await;
        assert!(matches!(result, Err(Error::Forbidden { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_rename_fund_source() -> Result<()> {
        let db = setup_test_db().await?;
        let source = create_test_fund_source(&db, "Federal").await?;

        let renamed = rename_fund_source(
            &db,
            &admin_context(),
            source.id,
            "Federal Grants",
            Some("National budget".to_string()),
        )
        .await?;
        assert_eq!(renamed.source_name, "Federal Grants");
        assert_eq!(renamed.description.as_deref(), Some("National budget"));

        let missing = rename_fund_source(&db, &admin_context(), 999, "X", None).await;
        assert!(matches!(missing, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_totals_cover_all_statuses_and_empty_sources() -> Result<()> {
        let db = setup_test_db().await?;
        let year = create_test_year(&db, 2024).await?;
        let a = create_test_fund_source(&db, "Alpha").await?;
        let b = create_test_fund_source(&db, "Beta").await?;
        create_test_fund_source(&db, "Gamma").await?;

        create_test_grant(&db, "One", 100.0, GrantStatus::Approved, year.id, a.id).await?;
        create_test_grant(&db, "Two", 400.0, GrantStatus::Completed, year.id, b.id).await?;
        create_test_grant(&db, "Three", 50.0, GrantStatus::Ongoing, year.id, a.id).await?;

        let totals = totals_by_source(&db).await?;
        let view: Vec<(&str, f64)> = totals
            .iter()
            .map(|t| (t.source.source_name.as_str(), t.total_approved))
            .collect();
        assert_eq!(view, vec![("Beta", 400.0), ("Alpha", 150.0), ("Gamma", 0.0)]);
        Ok(())
    }
}
