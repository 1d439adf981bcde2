//! Grant entity - An approved project budget and its lifecycle status.
//!
//! Each grant belongs to one grant year and one fund source, and owns the
//! disbursements paid out against it. `user_id` records the identity that
//! last changed the status through the self-service control.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a grant.
///
/// Variants are declared in display order, so the derived `Ord` sorts
/// `approved < ongoing < completed`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum GrantStatus {
    /// Budget approved, no work started
    #[sea_orm(string_value = "approved")]
    Approved,
    /// Project under way
    #[sea_orm(string_value = "ongoing")]
    Ongoing,
    /// Project finished; excluded from the active KPI scope
    #[sea_orm(string_value = "completed")]
    Completed,
}

impl GrantStatus {
    /// All statuses in their fixed display order.
    pub const ALL: [Self; 3] = [Self::Approved, Self::Ongoing, Self::Completed];

    /// Lower-case wire value, as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Ongoing => "ongoing",
            Self::Completed => "completed",
        }
    }

    /// Capitalised label used in charts and filter chips.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Approved => "Approved",
            Self::Ongoing => "Ongoing",
            Self::Completed => "Completed",
        }
    }

    /// Whether a grant in this status counts towards the dashboard KPIs.
    #[must_use]
    pub const fn is_active_scope(self) -> bool {
        matches!(self, Self::Approved | Self::Ongoing)
    }

    /// Parses a status token, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(token))
    }
}

impl fmt::Display for GrantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grant database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "grants")]
pub struct Model {
    /// Unique identifier for the grant
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Name of the funded project
    pub project_name: String,
    /// Approved budget, never negative
    pub amount_approved: f64,
    /// Current lifecycle status
    pub status: GrantStatus,
    /// Grant year this grant is filed under
    pub year_id: i64,
    /// Fund source backing this grant
    pub fund_source_id: i64,
    /// When the grant was created; drives the monthly budget series
    pub created_at: DateTimeUtc,
    /// Identity that last changed the status, if any
    pub user_id: Option<String>,
    /// Public URL of an attached document, if any
    pub document_url: Option<String>,
}

/// Defines relationships between Grant and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each grant is filed under one grant year
    #[sea_orm(
        belongs_to = "super::grant_year::Entity",
        from = "Column::YearId",
        to = "super::grant_year::Column::Id"
    )]
    GrantYear,
    /// Each grant is backed by one fund source
    #[sea_orm(
        belongs_to = "super::fund_source::Entity",
        from = "Column::FundSourceId",
        to = "super::fund_source::Column::Id"
    )]
    FundSource,
    /// One grant has many disbursements
    #[sea_orm(has_many = "super::disbursement::Entity")]
    Disbursements,
}

impl Related<super::grant_year::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GrantYear.def()
    }
}

impl Related<super::fund_source::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FundSource.def()
    }
}

impl Related<super::disbursement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Disbursements.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
