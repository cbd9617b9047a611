use axum::{http::StatusCode, response::IntoResponse};
use tracing::info;

use crate::usecases::errors::UseCaseError;

pub async fn not_found() -> impl IntoResponse {
    info!("backend router: not_found handler invoked");
    UseCaseError::NotFound("route").into_response()
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK").into_response()
}
