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
    opportunities::{dto::OpportunityRequest, model::Opportunity, services},
    response::{ApiResponse, ApiResult, Deleted},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/opportunities", get(list_opportunities).post(create_opportunity))
        .route(
            "/opportunities/:id",
            get(get_opportunity).put(update_opportunity).delete(delete_opportunity),
        )
}

#[instrument(skip(state))]
pub async fn list_opportunities(State(state): State<AppState>) -> ApiResult<Vec<Opportunity>> {
    let opps = services::list_opportunities(&state).await?;
    Ok(ApiResponse::ok("Opportunities fetched successfully", opps))
}

#[instrument(skip(state))]
pub async fn get_opportunity(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Opportunity> {
    let opp = services::get_opportunity(&state, id).await?;
    Ok(ApiResponse::ok("Opportunity fetched successfully", opp))
}

#[instrument(skip(state, payload))]
pub async fn create_opportunity(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(payload): Json<OpportunityRequest>,
) -> ApiResult<Opportunity> {
    let input = payload.validate().map_err(AppError::Validation)?;
    let opp = services::create_opportunity(&state, &principal, input).await?;
    Ok(ApiResponse::created("Opportunity created successfully", opp))
}

#[instrument(skip(state, payload))]
pub async fn update_opportunity(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<OpportunityRequest>,
) -> ApiResult<Opportunity> {
    let input = payload.validate().map_err(AppError::Validation)?;
    let opp = services::update_opportunity(&state, &principal, id, input).await?;
    Ok(ApiResponse::ok("Opportunity updated successfully", opp))
}

#[instrument(skip(state))]
pub async fn delete_opportunity(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Deleted> {
    services::delete_opportunity(&state, &principal, id).await?;
    Ok(ApiResponse::ok("Opportunity deleted successfully", Deleted { id }))
}
