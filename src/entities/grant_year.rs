//! Grant year entity - A fiscal year grants are filed under.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Grant year database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "grant_years")]
pub struct Model {
    /// Unique identifier for the grant year
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Calendar year, unique across the table (1900-2100)
    #[sea_orm(unique)]
    pub year_value: i32,
    /// When the year was added
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `GrantYear` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One year groups many grants
    #[sea_orm(has_many = "super::grant::Entity")]
    Grants,
}

impl Related<super::grant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Grants.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
