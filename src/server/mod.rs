//! HTTP server hosting the privileged admin functions.
//!
//! Each function is a `POST /functions/v1/<name>` endpoint that authenticates
//! the caller's bearer token, re-checks the caller's role against the profiles
//! table and only then calls the identity provider with the service key.

pub mod admin;

use crate::{
    errors::Result,
    functions::{DELETE_USER, GENERATE_RESET_LINK, INVITE_USER},
    identity::IdentityAdmin,
};
use axum::{Router, routing::post};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Persistence gateway
    pub db: Arc<DatabaseConnection>,
    /// Identity provider admin API
    pub identity: Arc<dyn IdentityAdmin>,
    /// Redirect used when a request does not supply one
    pub redirect_to: Option<String>,
}

/// Builds the function router with permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(&format!("/functions/v1/{INVITE_USER}"), post(admin::invite_user))
        .route(
            &format!("/functions/v1/{GENERATE_RESET_LINK}"),
            post(admin::generate_reset_link),
        )
        .route(&format!("/functions/v1/{DELETE_USER}"), post(admin::delete_user))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves the router until the process is stopped.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    info!("Admin functions listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}
