use super::{GeneratedLink, IdentityAdmin, IdentityUser, LinkRequest};
use crate::{
    config::IdentityConfig,
    errors::{Error, Result},
};
use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

/// HTTP client for the identity provider's `/auth/v1` API.
///
/// Every request carries the service key both as `apikey` and as bearer
/// token, except token lookups which use the caller's own token.
pub struct IdentityClient {
    http: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl std::fmt::Debug for IdentityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct LinkResponse {
    id: String,
    action_link: String,
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

impl IdentityClient {
    /// Builds a client from settings and the service key.
    pub fn new(config: &IdentityConfig, service_key: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("grant-ledger/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            service_key: service_key.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }

    async fn error_from(response: Response) -> Error {
        let status = response.status();
        let body: ErrorBody = response.json().await.unwrap_or_default();
        let message = body
            .msg
            .or(body.message)
            .or(body.error_description)
            .or(body.error)
            .unwrap_or_else(|| format!("HTTP {status}"));
        Error::Identity(message)
    }
}

#[async_trait]
impl IdentityAdmin for IdentityClient {
    async fn user_for_token(&self, access_token: &str) -> Result<Option<IdentityUser>> {
        let response = self
            .http
            .get(self.url("user"))
            .header("apikey", &self.service_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                debug!("Access token rejected by identity provider");
                Ok(None)
            }
            status if status.is_success() => Ok(Some(response.json().await?)),
            _ => Err(Self::error_from(response).await),
        }
    }

    async fn generate_link(&self, request: &LinkRequest) -> Result<GeneratedLink> {
        let response = self
            .http
            .post(self.url("admin/generate_link"))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        let link: LinkResponse = response.json().await?;
        info!(kind = ?request.kind, user_id = %link.id, "Action link generated");
        Ok(GeneratedLink {
            user_id: link.id,
            action_link: link.action_link,
        })
    }

    async fn delete_user(&self, user_id: &str) -> Result<()> {
        let response = self
            .http
            .delete(self.url(&format!("admin/users/{user_id}")))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        info!(user_id, "Identity account deleted");
        Ok(())
    }
}
