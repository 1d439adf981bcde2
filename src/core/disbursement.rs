//! Disbursement creation, history and deletion.

use crate::{
    auth::AuthContext,
    core::ledger::{GrantLedger, validate_positive_amount},
    entities::{Disbursement, Grant, disbursement},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{debug, info};

/// Disbursements of a grant, most recent payment first.
pub async fn list_for_grant(
    db: &DatabaseConnection,
    grant_id: i64,
) -> Result<Vec<disbursement::Model>> {
    let rows = Disbursement::find()
        .filter(disbursement::Column::GrantId.eq(grant_id))
        .order_by_desc(disbursement::Column::PaymentDate)
        .order_by_desc(disbursement::Column::Id)
        .all(db)
        .await?;
    debug!(grant_id, count = rows.len(), "Loaded disbursements");
    Ok(rows)
}

/// Current ledger for a grant, recomputed from its disbursements.
pub async fn ledger_for_grant(db: &DatabaseConnection, grant_id: i64) -> Result<GrantLedger> {
    let grant = Grant::find_by_id(grant_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "grant",
            id: grant_id.to_string(),
        })?;
    let disbursements = list_for_grant(db, grant_id).await?;
    Ok(GrantLedger::new(grant.amount_approved, &disbursements))
}

/// Records a payment against a grant. Admin tier only.
///
/// The amount is checked against the remaining balance computed just before
/// the insert; concurrent creations are not serialized.
pub async fn create_disbursement(
    db: &DatabaseConnection,
    ctx: &AuthContext,
    grant_id: i64,
    amount: f64,
    payment_date: NaiveDate,
) -> Result<disbursement::Model> {
    ctx.require_admin_tier("record disbursements")?;
    validate_positive_amount(amount)?;

    let ledger = ledger_for_grant(db, grant_id).await?;
    ledger.validate_disbursement(amount)?;

    let row = disbursement::ActiveModel {
        grant_id: Set(grant_id),
        amount: Set(amount),
        payment_date: Set(payment_date),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let created = row.insert(db).await?;

    info!(
        grant_id,
        amount,
        remaining = ledger.with_disbursement(amount).remaining_balance,
        actor = %ctx.user_id,
        "Disbursement recorded"
    );
    Ok(created)
}

/// Deletes a disbursement. `super_admin` only.
pub async fn delete_disbursement(
    db: &DatabaseConnection,
    ctx: &AuthContext,
    disbursement_id: i64,
) -> Result<()> {
    ctx.require_super_admin("delete disbursements")?;
    let result = Disbursement::delete_by_id(disbursement_id)
        .exec(db)
        .await
        .map_err(|e| Error::from_delete("disbursement", disbursement_id, e))?;
    if result.rows_affected == 0 {
        return Err(Error::NotFound {
            entity: "disbursement",
            id: disbursement_id.to_string(),
        });
    }
    info!(disbursement_id, actor = %ctx.user_id, "Disbursement deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::entities::Role;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_invalid_amount_never_reaches_database() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let ctx = admin_context();

        for amount in [0.0, -5.0, f64::NAN] {
            let result = create_disbursement(&db, &ctx, 1, amount, date(2024, 1, 1)).await;
            assert!(matches!(result, Err(Error::InvalidAmount { .. })));
        }
        let result = create_disbursement(&db, &user_context(), 1, 10.0, date(2024, 1, 1)).await;
        assert!(matches!(result, Err(Error::Forbidden { role: Role::User, .. })));

        assert!(db.into_transaction_log().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_disbursement_cannot_exceed_remaining_balance() -> Result<()> {
        let (db, grant) = setup_with_grant(10_000.0).await?;
        let ctx = admin_context();
        create_disbursement(&db, &ctx, grant.id, 3_000.0, date(2024, 2, 1)).await?;
        create_disbursement(&db, &ctx, grant.id, 2_000.0, date(2024, 3, 1)).await?;

        let ledger = ledger_for_grant(&db, grant.id).await?;
        assert_eq!(ledger.total_disbursed, 5_000.0);
        assert_eq!(ledger.remaining_balance, 5_000.0);

        let err = create_disbursement(&db, &ctx, grant.id, 5_000.01, date(2024, 4, 1))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Amount cannot exceed remaining balance of 5000.00");

        create_disbursement(&db, &ctx, grant.id, 5_000.0, date(2024, 4, 1)).await?;
        let ledger = ledger_for_grant(&db, grant.id).await?;
        assert_eq!(ledger.remaining_balance, 0.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_disbursement_for_missing_grant() -> Result<()> {
        let db = setup_test_db().await?;
        let result = create_disbursement(&db, &admin_context(), 42, 1.0, date(2024, 1, 1)).await;
        assert!(matches!(result, Err(Error::NotFound { entity: "grant", .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_history_ordered_by_payment_date_desc() -> Result<()> {
        let (db, grant) = setup_with_grant(10_000.0).await?;
        let ctx = super_admin_context();
        create_disbursement(&db, &ctx, grant.id, 100.0, date(2024, 1, 10)).await?;
        create_disbursement(&db, &ctx, grant.id, 200.0, date(2024, 5, 10)).await?;
        create_disbursement(&db, &ctx, grant.id, 300.0, date(2024, 3, 10)).await?;

        let history = list_for_grant(&db, grant.id).await?;
        let amounts: Vec<f64> = history.iter().map(|d| d.amount).collect();
        assert_eq!(amounts, vec![200.0, 300.0, 100.0]);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_disbursement_is_super_admin_only() -> Result<()> {
        let (db, grant) = setup_with_grant(1_000.0).await?;
        let created =
            create_disbursement(&db, &admin_context(), grant.id, 400.0, date(2024, 1, 1)).await?;

        let result = delete_disbursement(&db, &admin_context(), created.id).await;
        assert!(matches!(result, Err(Error::Forbidden { .. })));

        delete_disbursement(&db, &super_admin_context(), created.id).await?;
        assert_eq!(ledger_for_grant(&db, grant.id).await?.remaining_balance, 1_000.0);

        let again = delete_disbursement(&db, &super_admin_context(), created.id).await;
        assert!(matches!(again, Err(Error::NotFound { .. })));
        Ok(())
    }
}
