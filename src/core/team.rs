//! Team listing, role management and invitations.
//!
//! Operations that touch identity-provider accounts (invite, reset link,
//! deleting an active member) are delegated to the privileged functions
//! through [`AdminFunctions`]; everything else is a plain profile row change.

use crate::{
    auth::AuthContext,
    entities::{Profile, ProfileStatus, Role, profile},
    errors::{Error, Result},
};
use async_trait::async_trait;
use sea_orm::{
    QueryOrder, Set, TransactionTrait,
    prelude::*,
    sea_query::{Expr, Func},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Full name given to a profile created by an invitation.
pub const INVITED_FULL_NAME: &str = "Invited Member";

/// Body of the `admin-invite-user` function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteRequest {
    /// Email to invite
    pub email: String,
    /// Role granted on registration; `user` or `admin`
    pub role: Role,
    /// Placeholder display name
    #[serde(default)]
    pub full_name: Option<String>,
    /// Where the action link lands after use
    #[serde(default)]
    pub redirect_to: Option<String>,
}

/// Body of the `admin-generate-reset-link` function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetLinkRequest {
    /// Email of an active member
    pub email: String,
    /// Where the action link lands after use
    #[serde(default)]
    pub redirect_to: Option<String>,
}

/// Body of the `admin-delete-user` function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteUserRequest {
    /// Identity-provider user id
    pub user_id: String,
}

/// Privileged operations executed server-side with elevated credentials.
///
/// Implementations carry the caller's bearer token; the server re-checks the
/// caller's role before acting.
#[async_trait]
pub trait AdminFunctions: Send + Sync {
    /// Creates an identity account and invited profile, returning the action link.
    async fn invite_user(&self, request: &InviteRequest) -> Result<String>;

    /// Mints a password recovery action link.
    async fn generate_reset_link(&self, request: &ResetLinkRequest) -> Result<String>;

    /// Removes an identity account and its profile.
    async fn delete_user(&self, request: &DeleteUserRequest) -> Result<()>;
}

/// Trims and lower-cases an email, rejecting obviously malformed input.
pub fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(Error::Validation(format!("'{email}' is not a valid email address"))),
    }
}

/// Profiles whose email matches case-insensitively, in insertion order.
pub async fn find_by_email<C>(db: &C, email: &str) -> Result<Vec<profile::Model>>
where
    C: ConnectionTrait,
{
    Profile::find()
        .filter(Expr::expr(Func::lower(Expr::col(profile::Column::Email))).eq(email.to_lowercase()))
        .order_by_asc(profile::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Collapses rows sharing an email (case-insensitive) to one visible member.
///
/// An `active` row wins; otherwise the first `invited` row is kept. The result
/// is ordered by email, and collapsing it again returns it unchanged.
#[must_use]
pub fn collapse_profiles(mut rows: Vec<profile::Model>) -> Vec<profile::Model> {
    rows.sort_by_cached_key(|row| row.email.to_lowercase());

    let mut order: Vec<String> = Vec::new();
    let mut chosen: HashMap<String, profile::Model> = HashMap::new();
    for row in rows {
        let key = row.email.to_lowercase();
        match chosen.get(&key) {
            None => {
                order.push(key.clone());
                chosen.insert(key, row);
            }
            Some(kept)
                if kept.status == ProfileStatus::Invited
                    && row.status == ProfileStatus::Active =>
            {
                chosen.insert(key, row);
            }
            Some(_) => {}
        }
    }

    order
        .into_iter()
        .filter_map(|key| chosen.remove(&key))
        .collect()
}

/// Team members, one per email, ordered by email.
pub async fn list_team(db: &DatabaseConnection) -> Result<Vec<profile::Model>> {
    let rows = Profile::find()
        .order_by_asc(profile::Column::Email)
        .all(db)
        .await?;
    let total = rows.len();
    let team = collapse_profiles(rows);
    debug!(rows = total, members = team.len(), "Loaded team");
    Ok(team)
}

async fn load_profile(db: &DatabaseConnection, profile_id: &str) -> Result<profile::Model> {
    Profile::find_by_id(profile_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "profile",
            id: profile_id.to_string(),
        })
}

/// Changes a member's role. `super_admin` only, never on oneself.
pub async fn change_role(
    db: &DatabaseConnection,
    ctx: &AuthContext,
    profile_id: &str,
    role: Role,
) -> Result<profile::Model> {
    ctx.require_super_admin("change roles")?;
    if profile_id == ctx.user_id {
        return Err(Error::SelfRoleChange);
    }

    let existing = load_profile(db, profile_id).await?;
    if existing.role == role {
        return Ok(existing);
    }

    let previous = existing.role;
    let mut active: profile::ActiveModel = existing.into();
    active.role = Set(role);
    let updated = active.update(db).await?;
    info!(profile_id, from = %previous, to = %role, actor = %ctx.user_id, "Role changed");
    Ok(updated)
}

/// Invites a new member and returns the action link to hand over manually.
///
/// Admin tier only. The invited role must be `user` or `admin`. A duplicate
/// email is rejected before the privileged function is called.
pub async fn invite_member(
    db: &DatabaseConnection,
    ctx: &AuthContext,
    functions: &dyn AdminFunctions,
    email: &str,
    role: Role,
    redirect_to: Option<String>,
) -> Result<String> {
    ctx.require_admin_tier("invite members")?;
    if role == Role::SuperAdmin {
        return Err(Error::Validation(
            "Invited members can only be given the user or admin role".to_string(),
        ));
    }
    let email = normalize_email(email)?;

    if !find_by_email(db, &email).await?.is_empty() {
        return Err(Error::DuplicateEmail { email });
    }

    let request = InviteRequest {
        email,
        role,
        full_name: Some(INVITED_FULL_NAME.to_string()),
        redirect_to,
    };
    let link = functions.invite_user(&request).await?;
    info!(email = %request.email, role = %role, actor = %ctx.user_id, "Member invited");
    Ok(link)
}

/// Generates a password reset link for an active member. `super_admin` only.
pub async fn generate_reset_link(
    db: &DatabaseConnection,
    ctx: &AuthContext,
    functions: &dyn AdminFunctions,
    profile_id: &str,
    redirect_to: Option<String>,
) -> Result<String> {
    ctx.require_super_admin("generate reset links")?;
    let target = load_profile(db, profile_id).await?;
    if target.status != ProfileStatus::Active {
        return Err(Error::InactiveProfile {
            email: target.email,
        });
    }

    let request = ResetLinkRequest {
        email: target.email,
        redirect_to,
    };
    let link = functions.generate_reset_link(&request).await?;
    info!(profile_id, actor = %ctx.user_id, "Reset link generated");
    Ok(link)
}

/// Removes a member. `super_admin` only.
///
/// An invited placeholder has no identity account and is deleted as a row;
/// an active member is removed through the privileged function.
pub async fn delete_member(
    db: &DatabaseConnection,
    ctx: &AuthContext,
    functions: &dyn AdminFunctions,
    profile_id: &str,
) -> Result<()> {
    ctx.require_super_admin("delete members")?;
    let target = load_profile(db, profile_id).await?;

    match target.status {
        ProfileStatus::Invited => {
            Profile::delete_by_id(target.id.clone())
                .exec(db)
                .await
                .map_err(|e| Error::from_delete("profile", &target.id, e))?;
        }
        ProfileStatus::Active => {
            functions
                .delete_user(&DeleteUserRequest {
                    user_id: target.id.clone(),
                })
                .await?;
        }
    }
    info!(profile_id, status = ?target.status, actor = %ctx.user_id, "Member deleted");
    Ok(())
}

/// Reconciles a profile once an identity completes registration.
///
/// A profile already carrying `user_id` is marked active. Otherwise an invited
/// placeholder with the same email is replaced by an active row with the real
/// id, keeping the placeholder's role and name. Without either, a new `user`
/// profile is created.
pub async fn complete_registration(
    db: &DatabaseConnection,
    user_id: &str,
    email: &str,
) -> Result<profile::Model> {
    let email = normalize_email(email)?;

    if let Some(existing) = Profile::find_by_id(user_id.to_string()).one(db).await? {
        if existing.status == ProfileStatus::Active {
            return Ok(existing);
        }
        let mut active: profile::ActiveModel = existing.into();
        active.status = Set(ProfileStatus::Active);
        let updated = active.update(db).await?;
        info!(user_id, "Invited profile activated");
        return Ok(updated);
    }

    let txn = db.begin().await?;
    let placeholders: Vec<profile::Model> = find_by_email(&txn, &email)
        .await?
        .into_iter()
        .filter(|p| p.status == ProfileStatus::Invited)
        .collect();

    let (role, full_name) = placeholders
        .first()
        .map_or((Role::User, None), |p| (p.role, p.full_name.clone()));

    for placeholder in &placeholders {
        Profile::delete_by_id(placeholder.id.clone())
            .exec(&txn)
            .await?;
    }

    let created = profile::ActiveModel {
        id: Set(user_id.to_string()),
        email: Set(email),
        role: Set(role),
        full_name: Set(full_name),
        status: Set(ProfileStatus::Active),
        created_at: Set(chrono::Utc::now()),
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    if placeholders.is_empty() {
        warn!(user_id, "Registration without a prior invitation; created user profile");
    } else {
        info!(user_id, replaced = placeholders.len(), "Invited placeholder reconciled");
    }
    Ok(created)
}
