use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    response::{ApiResponse, ApiResult, Deleted},
    signups::{dto::SignupView, services},
    state::AppState,
};

/// `/events/:id/opportunities` is keyed by the signer on GET/POST and by the
/// approver on PUT, where the second segment is the signup id.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events/:id/opportunities", get(list_signups))
        .route(
            "/events/:id/opportunities/:sub_id",
            post(sign_up).put(approve),
        )
        .route("/events/:id", delete(withdraw))
}

#[instrument(skip(state))]
pub async fn list_signups(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Vec<SignupView>> {
    let signups = services::list_for_user(&state, user_id).await?;
    Ok(ApiResponse::ok("Signups fetched successfully", signups))
}

#[instrument(skip(state))]
pub async fn sign_up(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path((user_id, opportunity_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<SignupView> {
    let signup = services::sign_up(&state, &principal, user_id, opportunity_id).await?;
    Ok(ApiResponse::created("Signed up successfully", signup))
}

#[instrument(skip(state))]
pub async fn approve(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path((approver_id, signup_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<SignupView> {
    let signup = services::approve(&state, &principal, approver_id, signup_id).await?;
    Ok(ApiResponse::ok("Signup approved successfully", signup))
}

#[instrument(skip(state))]
pub async fn withdraw(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Deleted> {
    services::withdraw(&state, &principal, id).await?;
    Ok(ApiResponse::ok("Signup withdrawn successfully", Deleted { id }))
}
