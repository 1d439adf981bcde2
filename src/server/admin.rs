//! Handlers for the three privileged functions.

use super::AppState;
use crate::{
    auth::AuthContext,
    core::team::{self, DeleteUserRequest, INVITED_FULL_NAME, InviteRequest, ResetLinkRequest},
    entities::{Profile, ProfileStatus, Role, profile},
    errors::Error,
    functions::{ActionLinkResponse, ErrorResponse, OkResponse},
    identity::{LinkKind, LinkRequest},
};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::json;
use tracing::{error, info, instrument, warn};

/// Failure returned by a function as `{ "error": ... }`.
#[derive(Debug)]
pub struct FunctionError {
    status: StatusCode,
    message: String,
}

impl FunctionError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// HTTP status of the response.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for FunctionError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<Error> for FunctionError {
    fn from(err: Error) -> Self {
        let status = match &err {
            e if e.is_validation() || matches!(e, Error::Identity(_)) => {
                StatusCode::BAD_REQUEST
            }
            Error::NotSignedIn => StatusCode::UNAUTHORIZED,
            Error::Forbidden { .. } => StatusCode::FORBIDDEN,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::DuplicateEmail { .. }
            | Error::DuplicateYear { .. }
            | Error::InactiveProfile { .. }
            | Error::InUse { .. } => StatusCode::CONFLICT,
            Error::Function { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            _ => {
                error!("Admin function failed: {err}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, err.to_string())
    }
}

impl From<JsonRejection> for FunctionError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

type FunctionResult<T> = std::result::Result<Json<T>, FunctionError>;

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Resolves the caller from the bearer token and loads their profile.
async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthContext, FunctionError> {
    let token = bearer_token(headers).ok_or_else(|| {
        FunctionError::new(StatusCode::UNAUTHORIZED, "Missing Authorization bearer token")
    })?;
    let user = state
        .identity
        .user_for_token(token)
        .await?
        .ok_or_else(|| FunctionError::new(StatusCode::UNAUTHORIZED, "Invalid session"))?;

    let profile = Profile::find_by_id(user.id.clone())
        .one(&*state.db)
        .await
        .map_err(|e| {
            error!(user_id = %user.id, "Failed to verify caller role: {e}");
            FunctionError::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to verify admin role")
        })?
        .ok_or_else(|| FunctionError::new(StatusCode::FORBIDDEN, "Forbidden: no profile"))?;
    Ok(AuthContext::from_profile(&profile))
}

fn effective_redirect(state: &AppState, requested: Option<String>) -> Option<String> {
    requested
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .or_else(|| state.redirect_to.clone())
}

/// `POST /functions/v1/admin-invite-user`
///
/// Admin tier. Creates the identity account through an invite link and stores
/// an `invited` profile under the new account id.
#[instrument(skip_all)]
pub async fn invite_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<InviteRequest>, JsonRejection>,
) -> FunctionResult<ActionLinkResponse> {
    let caller = authenticate(&state, &headers).await?;
    caller.require_admin_tier("invite members")?;
    let Json(request) = payload?;

    if request.role == Role::SuperAdmin {
        return Err(FunctionError::new(
            StatusCode::BAD_REQUEST,
            "Role must be user or admin",
        ));
    }
    let email = team::normalize_email(&request.email)?;
    if !team::find_by_email(&*state.db, &email).await?.is_empty() {
        return Err(Error::DuplicateEmail { email }.into());
    }

    let full_name = request
        .full_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| INVITED_FULL_NAME.to_string());
    let link = state
        .identity
        .generate_link(&LinkRequest {
            kind: LinkKind::Invite,
            email: email.clone(),
            redirect_to: effective_redirect(&state, request.redirect_to),
            data: Some(json!({ "full_name": full_name })),
        })
        .await?;

    profile::ActiveModel {
        id: Set(link.user_id.clone()),
        email: Set(email.clone()),
        role: Set(request.role),
        full_name: Set(Some(full_name)),
        status: Set(ProfileStatus::Invited),
        created_at: Set(chrono::Utc::now()),
    }
    .insert(&*state.db)
    .await
    .map_err(|e| {
        warn!(user_id = %link.user_id, "Identity account created but profile insert failed: {e}");
        Error::Database(e)
    })?;

    info!(%email, role = %request.role, actor = %caller.user_id, "Invitation issued");
    Ok(Json(ActionLinkResponse {
        action_link: link.action_link,
        user_id: Some(link.user_id),
    }))
}

/// `POST /functions/v1/admin-generate-reset-link`
///
/// `super_admin` only. The target must have an active profile.
#[instrument(skip_all)]
pub async fn generate_reset_link(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ResetLinkRequest>, JsonRejection>,
) -> FunctionResult<ActionLinkResponse> {
    let caller = authenticate(&state, &headers).await?;
    caller.require_super_admin("generate reset links")?;
    let Json(request) = payload?;

    let email = team::normalize_email(&request.email)?;
    let matches = team::find_by_email(&*state.db, &email).await?;
    if matches.is_empty() {
        return Err(Error::NotFound {
            entity: "profile",
            id: email,
        }
        .into());
    }
    if !matches.iter().any(|p| p.status == ProfileStatus::Active) {
        return Err(Error::InactiveProfile { email }.into());
    }

    let link = state
        .identity
        .generate_link(&LinkRequest {
            kind: LinkKind::Recovery,
            email: email.clone(),
            redirect_to: effective_redirect(&state, request.redirect_to),
            data: None,
        })
        .await?;

    info!(%email, actor = %caller.user_id, "Reset link issued");
    Ok(Json(ActionLinkResponse {
        action_link: link.action_link,
        user_id: None,
    }))
}

/// `POST /functions/v1/admin-delete-user`
///
/// `super_admin` only. Removes the identity account, then the profile row.
/// The two deletes are not atomic; a profile left behind is logged.
#[instrument(skip_all)]
pub async fn delete_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<DeleteUserRequest>, JsonRejection>,
) -> FunctionResult<OkResponse> {
    let caller = authenticate(&state, &headers).await?;
    caller.require_super_admin("delete members")?;
    let Json(request) = payload?;

    let user_id = request.user_id.trim();
    if user_id.is_empty() {
        return Err(FunctionError::new(StatusCode::BAD_REQUEST, "Missing userId"));
    }
    if user_id == caller.user_id {
        return Err(FunctionError::new(
            StatusCode::BAD_REQUEST,
            "You cannot delete your own account",
        ));
    }

    state.identity.delete_user(user_id).await?;
    if let Err(e) = Profile::delete_by_id(user_id.to_string())
        .exec(&*state.db)
        .await
    {
        warn!(user_id, "Identity account deleted but profile row remains: {e}");
        return Err(Error::Database(e).into());
    }

    info!(user_id, actor = %caller.user_id, "Member deleted");
    Ok(Json(OkResponse { ok: true }))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::server::router;
    use crate::test_utils::*;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request},
    };
    use sea_orm::DatabaseConnection;
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    struct Harness {
        db: Arc<DatabaseConnection>,
        identity: Arc<FakeIdentity>,
    }

    impl Harness {
        async fn new() -> Self {
            let db = Arc::new(setup_test_db().await.unwrap());
            Self {
                db,
                identity: Arc::new(FakeIdentity::default()),
            }
        }

        /// Creates an active profile reachable through `token`.
        async fn caller(&self, token: &str, email: &str, role: Role) -> profile::Model {
            let profile = create_test_profile(&self.db, email, role).await.unwrap();
            self.identity.accept_token(token, &profile.id);
            profile
        }

        async fn call(&self, function: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
            let app = router(AppState {
                db: Arc::clone(&self.db),
                identity: self.identity.clone(),
                redirect_to: Some("https://app.example/welcome".to_string()),
            });
            let mut request = Request::builder()
                .method(Method::POST)
                .uri(format!("/functions/v1/{function}"))
                .header("content-type", "application/json");
            if let Some(token) = token {
                request = request.header("authorization", format!("Bearer {token}"));
            }
            let response = app
                .oneshot(request.body(Body::from(body.to_string())).unwrap())
                .await
                .unwrap();
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
        }
    }

    #[tokio::test]
    async fn test_missing_or_invalid_token_is_unauthorized() {
        let h = Harness::new().await;
        let body = json!({ "email": "a@example.com" });

        let (status, body_out) = h.call("admin-generate-reset-link", None, body.clone()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body_out["error"], "Missing Authorization bearer token");

        let (status, _) = h.call("admin-generate-reset-link", Some("nope"), body).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_reset_link_requires_super_admin() {
        let h = Harness::new().await;
        h.caller("admin-token", "admin@example.com", Role::Admin).await;

        let (status, body) = h
            .call("admin-generate-reset-link", Some("admin-token"), json!({ "email": "admin@example.com" }))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body["error"].as_str().unwrap().contains("not permitted"));
        assert!(h.identity.links().is_empty());
    }

    #[tokio::test]
    async fn test_reset_link_for_active_member() {
        let h = Harness::new().await;
        h.caller("root", "root@example.com", Role::SuperAdmin).await;
        create_test_profile(&h.db, "staff@example.com", Role::User).await.unwrap();
        create_invited_profile(&h.db, "pending@example.com", Role::User).await.unwrap();

        let (status, body) = h
            .call("admin-generate-reset-link", Some("root"), json!({ "email": "Staff@example.com" }))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["actionLink"], "https://id.example/recovery/staff@example.com");

        let links = h.identity.links();
        assert_eq!(links[0].kind, LinkKind::Recovery);
        assert_eq!(links[0].redirect_to.as_deref(), Some("https://app.example/welcome"));

        let (status, _) = h
            .call("admin-generate-reset-link", Some("root"), json!({ "email": "pending@example.com" }))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = h
            .call("admin-generate-reset-link", Some("root"), json!({ "email": "ghost@example.com" }))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invite_user_creates_invited_profile() {
        let h = Harness::new().await;
        h.caller("admin-token", "admin@example.com", Role::Admin).await;

        let (status, body) = h
            .call(
                "admin-invite-user",
                Some("admin-token"),
                json!({
                    "email": "New@Example.com",
                    "role": "user",
                    "fullName": "Invited Member",
                    "redirectTo": "https://app.example/set-password"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["actionLink"], "https://id.example/invite/new@example.com");
        let user_id = body["userId"].as_str().unwrap().to_string();

        let stored = Profile::find_by_id(user_id).one(&*h.db).await.unwrap().unwrap();
        assert_eq!(stored.email, "new@example.com");
        assert_eq!(stored.status, ProfileStatus::Invited);
        assert_eq!(stored.role, Role::User);
        assert_eq!(stored.full_name.as_deref(), Some(INVITED_FULL_NAME));
        assert_eq!(
            h.identity.links()[0].redirect_to.as_deref(),
            Some("https://app.example/set-password")
        );

        let (status, _) = h
            .call("admin-invite-user", Some("admin-token"), json!({ "email": "new@example.com", "role": "user" }))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_invite_user_rejects_bad_input() {
        let h = Harness::new().await;
        h.caller("root", "root@example.com", Role::SuperAdmin).await;

        let (status, _) = h
            .call("admin-invite-user", Some("root"), json!({ "email": "x@example.com", "role": "super_admin" }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = h
            .call("admin-invite-user", Some("root"), json!({ "email": "x@example.com", "role": "owner" }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = h
            .call("admin-invite-user", Some("root"), json!({ "email": "nope", "role": "user" }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = h.call("admin-invite-user", Some("staff"), json!({})).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_delete_user_removes_account_and_profile() {
        let h = Harness::new().await;
        let root = h.caller("root", "root@example.com", Role::SuperAdmin).await;
        let staff = create_test_profile(&h.db, "staff@example.com", Role::User).await.unwrap();

        let (status, body) = h
            .call("admin-delete-user", Some("root"), json!({ "userId": staff.id }))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true }));
        assert_eq!(h.identity.deleted(), vec![staff.id.clone()]);
        assert!(Profile::find_by_id(staff.id).one(&*h.db).await.unwrap().is_none());

        let (status, _) = h
            .call("admin-delete-user", Some("root"), json!({ "userId": root.id }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_is_method_not_allowed() {
        let h = Harness::new().await;
        let app = router(AppState {
            db: Arc::clone(&h.db),
            identity: h.identity.clone(),
            redirect_to: None,
        });
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/functions/v1/admin-delete-user")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
        headers.insert(AUTHORIZATION, "bearer  abc ".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc"));
        headers.insert(AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_error_status_mapping() {
        let status = |err: Error| FunctionError::from(err).status();
        assert_eq!(status(Error::MissingReason), StatusCode::BAD_REQUEST);
        assert_eq!(status(Error::InvalidYear { year: 1800 }), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(Error::Identity("User not found".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status(Error::NotSignedIn), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status(Error::DuplicateEmail {
                email: "a@example.com".to_string()
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(Error::Database(sea_orm::DbErr::Custom("boom".to_string()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
