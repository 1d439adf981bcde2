//! Identity provider admin API.
//!
//! [`IdentityAdmin`] is the seam the privileged functions call; [`IdentityClient`]
//! implements it over HTTP with the service key.

mod client;

pub use client::IdentityClient;

use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// An identity resolved from an access token.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IdentityUser {
    /// Provider-issued user id
    pub id: String,
    /// Login email, if the provider returns one
    #[serde(default)]
    pub email: Option<String>,
}

/// Kind of one-time action link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    /// Creates the account if needed and lets the user set a password
    Invite,
    /// Lets an existing user reset their password
    Recovery,
}

/// Request body for link generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkRequest {
    /// Link kind
    #[serde(rename = "type")]
    pub kind: LinkKind,
    /// Target email
    pub email: String,
    /// Where the link lands after verification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
    /// User metadata stored on account creation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// A minted action link and the account it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedLink {
    /// Provider-issued user id
    pub user_id: String,
    /// One-time URL to hand to the user
    pub action_link: String,
}

/// Admin operations on the identity provider.
#[async_trait]
pub trait IdentityAdmin: Send + Sync {
    /// Resolves a session access token. `None` when the token is not accepted.
    async fn user_for_token(&self, access_token: &str) -> Result<Option<IdentityUser>>;

    /// Mints an action link, creating the account for invitations.
    async fn generate_link(&self, request: &LinkRequest) -> Result<GeneratedLink>;

    /// Deletes an account.
    async fn delete_user(&self, user_id: &str) -> Result<()>;
}
