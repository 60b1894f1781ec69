use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, LogoutResponse, TokenResponse},
        jwt::{AuthUser, JwtKeys},
        password::verify_password,
    },
    error::{AppError, Violations},
    response::{ApiResponse, ApiResult},
    state::AppState,
    users::{model::UserView, services as users},
    validation::{is_valid_email, normalize_email},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", get(logout))
        .route("/auth/me", get(me))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<TokenResponse> {
    let mut violations = Violations::new();
    let email = payload.email.as_deref().map(normalize_email).unwrap_or_default();
    if email.is_empty() {
        violations.push("email", "is required");
    } else if !is_valid_email(&email) {
        violations.push("email", "must be a valid email address");
    }
    let password = payload.password.unwrap_or_default();
    if password.is_empty() {
        violations.push("password", "is required");
    }
    violations.into_result().map_err(AppError::Validation)?;

    let invalid = || AppError::Unauthorized("Invalid credentials".into());

    let Some(user) = state.store.find_user_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(invalid());
    };

    let ok = verify_password(&password, &user.password_hash).map_err(AppError::Storage)?;
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(invalid());
    }

    let token = JwtKeys::from_ref(&state)
        .sign(user.id)
        .map_err(AppError::Storage)?;

    info!(user_id = %user.id, "user logged in");
    Ok(ApiResponse::ok("Login successful", TokenResponse { token }))
}

/// Tokens are stateless; the client discards its copy.
pub async fn logout() -> ApiResult<LogoutResponse> {
    Ok(ApiResponse::ok(
        "Logout successful",
        LogoutResponse {
            message: "Please discard the JWT token on the client side",
        },
    ))
}

#[instrument(skip(state))]
pub async fn me(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> ApiResult<UserView> {
    let user = users::get_user(&state, principal.id).await?;
    Ok(ApiResponse::ok("User fetched successfully", user))
}
