//! Profile entity - A team member known to the application.
//!
//! Ids are issued by the identity provider. An `invited` profile may exist
//! alongside a later `active` row for the same email until registration is
//! reconciled, so `email` carries no unique constraint here.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Access role of a team member, lowest privilege first.
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
pub enum Role {
    /// Staff member; may only advance grant status
    #[sea_orm(string_value = "user")]
    User,
    /// Manages grants, disbursements and invitations
    #[sea_orm(string_value = "admin")]
    Admin,
    /// Full control, including deletions and role changes
    #[sea_orm(string_value = "super_admin")]
    SuperAdmin,
}

impl Role {
    /// Lower-case wire value, as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
        }
    }

    /// `admin` or `super_admin`.
    #[must_use]
    pub const fn is_admin_tier(self) -> bool {
        matches!(self, Self::Admin | Self::SuperAdmin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registration state of a profile. `Invited` → `Active` is terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum ProfileStatus {
    /// Account has signed in at least once
    #[sea_orm(string_value = "active")]
    Active,
    /// Placeholder awaiting registration
    #[sea_orm(string_value = "invited")]
    Invited,
}

/// Profile database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    /// Identity-provider user id
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Login email; compared case-insensitively
    pub email: String,
    /// Access role
    pub role: Role,
    /// Optional display name
    pub full_name: Option<String>,
    /// Registration state
    pub status: ProfileStatus,
    /// When the profile was created
    pub created_at: DateTimeUtc,
}

impl Model {
    /// Name shown in "last updated by" columns: email first, then full name.
    #[must_use]
    pub fn contact_label(&self) -> String {
        if self.email.trim().is_empty() {
            self.full_name
                .clone()
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| "Unknown".to_string())
        } else {
            self.email.clone()
        }
    }

    /// Name shown in audit views: full name first, then email.
    #[must_use]
    pub fn display_name(&self) -> String {
        match self.full_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ if !self.email.trim().is_empty() => self.email.clone(),
            _ => "Unknown".to_string(),
        }
    }
}

/// Profiles have no foreign-key relationships
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
