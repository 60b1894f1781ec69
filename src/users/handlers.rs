use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::AppError,
    response::{ApiResponse, ApiResult, Deleted},
    state::AppState,
    users::{dto::UserRequest, model::UserView, services},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/:id", get(get_user).put(update_user).delete(delete_user))
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Vec<UserView>> {
    let users = services::list_users(&state).await?;
    Ok(ApiResponse::ok("Users fetched successfully", users))
}

#[instrument(skip(state))]
pub async fn get_user(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<UserView> {
    let user = services::get_user(&state, id).await?;
    Ok(ApiResponse::ok("User fetched successfully", user))
}

/// Open registration; a bearer token is only needed to create admins.
#[instrument(skip(state, auth, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    auth: Option<AuthUser>,
    Json(payload): Json<UserRequest>,
) -> ApiResult<UserView> {
    let principal = auth.map(|AuthUser(p)| p);
    let input = payload.validate(true).map_err(AppError::Validation)?;
    let user = services::create_user(&state, principal.as_ref(), input).await?;
    Ok(ApiResponse::created("User created successfully", user))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UserRequest>,
) -> ApiResult<UserView> {
    let input = payload.validate(false).map_err(AppError::Validation)?;
    let user = services::update_user(&state, &principal, id, input).await?;
    Ok(ApiResponse::ok("User updated successfully", user))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Deleted> {
    services::delete_user(&state, &principal, id).await?;
    Ok(ApiResponse::ok("User deleted successfully", Deleted { id }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn create_returns_201_and_rejects_bad_bodies() {
        let state = AppState::fake();
        let body = json!({
            "firstName": "Grace",
            "lastName": "Hopper",
            "email": "grace@navy.mil",
            "password": crate::test_support::PASSWORD,
            "phoneNumber": "1234567890",
            "accountType": "organizer"
        });
        let payload: UserRequest = serde_json::from_value(body).unwrap();
        let (status, Json(res)) = create_user(State(state.clone()), None, Json(payload)).await.unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(res.data.graduation_year, None);

        let bad: UserRequest = serde_json::from_value(json!({ "email": "nope" })).unwrap();
        let err = create_user(State(state), None, Json(bad)).await.err().unwrap();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn admin_accounts_need_an_admin_caller() {
        let state = AppState::fake();
        let body = json!({
            "firstName": "Mallory",
            "lastName": "Root",
            "email": "mallory@example.com",
            "password": crate::test_support::PASSWORD,
            "phoneNumber": "1234567890",
            "accountType": "admin"
        });

        let payload: UserRequest = serde_json::from_value(body.clone()).unwrap();
        let err = create_user(State(state.clone()), None, Json(payload)).await.err().unwrap();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let admin = crate::auth::Principal {
            id: uuid::Uuid::new_v4(),
            account_type: crate::users::model::AccountType::Admin,
        };
        let payload: UserRequest = serde_json::from_value(body).unwrap();
        let (status, _) = create_user(State(state), Some(AuthUser(admin)), Json(payload))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn list_is_empty_not_missing() {
        let (status, Json(res)) = list_users(State(AppState::fake())).await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert!(res.data.is_empty());
    }
}
