//! Authentication context and session lifecycle.
//!
//! The signed-in identity and its role are carried in an explicit
//! [`AuthContext`] passed to every operation that needs a role check.
//! [`Session`] owns the context between sign-in and sign-out.

use crate::{
    entities::{Profile, ProfileStatus, Role, profile},
    errors::{Error, Result},
};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use tracing::info;

/// The acting identity for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    /// Identity-provider user id
    pub user_id: String,
    /// Login email
    pub email: String,
    /// Optional display name
    pub full_name: Option<String>,
    /// Access role
    pub role: Role,
}

impl AuthContext {
    /// Builds a context from a stored profile.
    #[must_use]
    pub fn from_profile(profile: &profile::Model) -> Self {
        Self {
            user_id: profile.id.clone(),
            email: profile.email.clone(),
            full_name: profile.full_name.clone(),
            role: profile.role,
        }
    }

    /// Requires `admin` or `super_admin`.
    pub fn require_admin_tier(&self, action: &'static str) -> Result<()> {
        if self.role.is_admin_tier() {
            Ok(())
        } else {
            Err(Error::Forbidden {
                action,
                role: self.role,
            })
        }
    }

    /// Requires `super_admin`.
    pub fn require_super_admin(&self, action: &'static str) -> Result<()> {
        match self.role {
            Role::SuperAdmin => Ok(()),
            role => Err(Error::Forbidden { action, role }),
        }
    }

    /// Name recorded in the updated-by cache after this actor changes a grant:
    /// full name first, then email.
    #[must_use]
    pub fn display_name(&self) -> String {
        match self.full_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ if !self.email.trim().is_empty() => self.email.clone(),
            _ => "Unknown".to_string(),
        }
    }
}

/// Holds the current [`AuthContext`] from sign-in until sign-out.
#[derive(Debug, Default)]
pub struct Session {
    current: Option<AuthContext>,
}

impl Session {
    /// Creates an empty, signed-out session.
    #[must_use]
    pub const fn new() -> Self {
        Self { current: None }
    }

    /// Starts a session for an identity, loading its profile.
    ///
    /// An `invited` profile is flipped to `active` on first sign-in.
    pub async fn sign_in(&mut self, db: &DatabaseConnection, user_id: &str) -> Result<&AuthContext> {
        let mut profile = Profile::find_by_id(user_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| Error::NotFound {
                entity: "profile",
                id: user_id.to_string(),
            })?;

        if profile.status == ProfileStatus::Invited {
            let mut active: profile::ActiveModel = profile.into();
            active.status = Set(ProfileStatus::Active);
            profile = active.update(db).await?;
        }

        info!(user_id = %profile.id, role = %profile.role, "Session started");
        Ok(&*self.current.insert(AuthContext::from_profile(&profile)))
    }

    /// Starts a session from an already-resolved context.
    pub fn begin(&mut self, context: AuthContext) -> &AuthContext {
        self.current.insert(context)
    }

    /// Clears the session.
    pub fn sign_out(&mut self) {
        if let Some(context) = self.current.take() {
            info!(user_id = %context.user_id, "Session ended");
        }
    }

    /// The current context, or [`Error::NotSignedIn`].
    pub fn context(&self) -> Result<&AuthContext> {
        self.current.as_ref().ok_or(Error::NotSignedIn)
    }

    /// Whether a context is present.
    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        self.current.is_some()
    }
}
