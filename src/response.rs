use axum::{http::StatusCode, Json};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;

/// Success envelope shared by every route: `{ message, data }`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: T,
}

pub type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), AppError>;

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> (StatusCode, Json<Self>) {
        Self::with_status(StatusCode::OK, message, data)
    }

    pub fn created(message: impl Into<String>, data: T) -> (StatusCode, Json<Self>) {
        Self::with_status(StatusCode::CREATED, message, data)
    }

    fn with_status(
        status: StatusCode,
        message: impl Into<String>,
        data: T,
    ) -> (StatusCode, Json<Self>) {
        (
            status,
            Json(Self {
                message: message.into(),
                data,
            }),
        )
    }
}

/// Payload returned by soft-delete routes.
#[derive(Debug, Serialize)]
pub struct Deleted {
    pub id: Uuid,
}
