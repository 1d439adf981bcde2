//! Disbursement entity - A payment made against a grant.
//!
//! The sum of a grant's disbursements must never exceed its approved amount;
//! that rule is enforced by `core::ledger` before insertion.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Disbursement database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "disbursements")]
pub struct Model {
    /// Unique identifier for the disbursement
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Grant this payment was made against
    pub grant_id: i64,
    /// Paid amount, strictly positive
    pub amount: f64,
    /// Calendar date of the payment; drives the monthly disbursed series
    pub payment_date: Date,
    /// When the row was recorded
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Disbursement and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each disbursement belongs to one grant and goes away with it
    #[sea_orm(
        belongs_to = "super::grant::Entity",
        from = "Column::GrantId",
        to = "super::grant::Column::Id",
        on_delete = "Cascade"
    )]
    Grant,
}

impl Related<super::grant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Grant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
