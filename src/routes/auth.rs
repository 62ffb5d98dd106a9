use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::app::AppState;
use crate::errors::AppResult;
use crate::identity::{Credentials, CurrentUser};
use crate::models::user::{LoginRequest, LoginResponse, SessionStatus, UserSummary};
use crate::routes::MessageResponse;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/validate", get(validate))
        .route("/me", get(me))
        .route("/logout", post(logout))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid username or password")
    )
)]
pub async fn login(State(state): State<AppState>, Json(payload): Json<LoginRequest>) -> AppResult<Json<LoginResponse>> {
    let response = state.auth.login(&payload.username, &payload.password).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/auth/validate",
    tag = "Auth",
    responses(
        (status = 200, description = "Session is valid", body = SessionStatus),
        (status = 401, description = "Missing, invalid or expired token")
    ),
    security(("bearerAuth" = []))
)]
pub async fn validate(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Json<SessionStatus>> {
    let status = state
        .auth
        .validate_current_session(&Credentials::from_headers(&headers))
        .await?;
    Ok(Json(status))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user", body = UserSummary),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearerAuth" = []))
)]
pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Json<UserSummary>> {
    let user = state.auth.current_user(&Credentials::from_headers(&headers)).await?;
    Ok(Json(user))
}

/// Tokens are stateless; the client drops its copy.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    responses((status = 200, description = "Logout acknowledged", body = MessageResponse)),
    security(("bearerAuth" = []))
)]
pub async fn logout(CurrentUser(user): CurrentUser) -> AppResult<Json<MessageResponse>> {
    tracing::info!(user_id = user.id, "logout");
    Ok(Json(MessageResponse::new("Logged out")))
}
