//! Fund source entity - The budget origin a grant draws from.
//!
//! Fund sources are created by admin-tier staff and referenced by grants.
//! They may be renamed but are never deleted once a grant points at them.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Fund source database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "fund_sources")]
pub struct Model {
    /// Unique identifier for the fund source
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name shown in grant listings and dashboard charts
    pub source_name: String,
    /// Optional free-form description
    pub description: Option<String>,
    /// When the fund source was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `FundSource` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One fund source backs many grants
    #[sea_orm(has_many = "super::grant::Entity")]
    Grants,
}

impl Related<super::grant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Grants.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
