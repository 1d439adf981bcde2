//! Client for the privileged admin functions.
//!
//! Calls are made with the signed-in user's bearer token; the function
//! re-verifies that user's role before touching the identity provider.

use crate::{
    core::team::{AdminFunctions, DeleteUserRequest, InviteRequest, ResetLinkRequest},
    errors::{Error, Result},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::{debug, warn};

/// Invites a member and returns an action link.
pub const INVITE_USER: &str = "admin-invite-user";
/// Mints a password recovery link. `super_admin` only.
pub const GENERATE_RESET_LINK: &str = "admin-generate-reset-link";
/// Deletes an identity account and its profile. `super_admin` only.
pub const DELETE_USER: &str = "admin-delete-user";

/// Success body of the link-minting functions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionLinkResponse {
    /// One-time URL
    pub action_link: String,
    /// Account the link belongs to, returned by invitations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Success body of `admin-delete-user`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OkResponse {
    /// Always `true`
    pub ok: bool,
}

/// Failure body of every function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable failure
    pub error: String,
}

/// Invokes functions at `{base_url}/functions/v1/<name>`.
pub struct FunctionsClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl FunctionsClient {
    /// Creates a client acting with `access_token`.
    pub fn new(base_url: &str, access_token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    async fn invoke<B, R>(&self, function: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        debug!(function, "Invoking admin function");
        let response = self
            .http
            .post(format!("{}/functions/v1/{function}", self.base_url))
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let message = response
            .json::<ErrorResponse>()
            .await
            .map_or_else(|_| format!("HTTP {status}"), |body| body.error);
        warn!(function, status = status.as_u16(), "Admin function failed: {message}");
        Err(Error::Function {
            function: function.to_string(),
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl AdminFunctions for FunctionsClient {
    async fn invite_user(&self, request: &InviteRequest) -> Result<String> {
        let response: ActionLinkResponse = self.invoke(INVITE_USER, request).await?;
        Ok(response.action_link)
    }

    async fn generate_reset_link(&self, request: &ResetLinkRequest) -> Result<String> {
        let response: ActionLinkResponse = self.invoke(GENERATE_RESET_LINK, request).await?;
        Ok(response.action_link)
    }

    async fn delete_user(&self, request: &DeleteUserRequest) -> Result<()> {
        let _: OkResponse = self.invoke(DELETE_USER, request).await?;
        Ok(())
    }
}
