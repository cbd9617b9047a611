use axum::{
    Json,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::usecases::errors::{FieldErrors, UseCaseError};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
}

impl IntoResponse for UseCaseError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let (message, errors) = match self {
            UseCaseError::Validation(errors) => ("Invalid input.".to_string(), Some(errors)),
            UseCaseError::Internal(err) => {
                // Detail stays in the logs.
                error!(error = ?err, "http: internal error");
                ("Internal server error".to_string(), None)
            }
            other => (other.to_string(), None),
        };

        let body = Json(ErrorResponse {
            code: status.as_u16(),
            message,
            errors,
        });

        (status, body).into_response()
    }
}
