use std::collections::BTreeMap;

use axum::http::StatusCode;
use thiserror::Error;
use validator::ValidationErrors;

/// Per-field messages, rendered as `{"field": ["message", ...]}`.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

pub const REQUIRED_FIELD: &str = "This field is required.";

#[derive(Debug, Error)]
pub enum UseCaseError {
    #[error("Authentication credentials were not provided or are invalid.")]
    Unauthenticated,
    #[error("You do not have permission to perform this action.")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Invalid input.")]
    Validation(FieldErrors),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Gateway(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl UseCaseError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            UseCaseError::Unauthenticated => StatusCode::UNAUTHORIZED,
            UseCaseError::Forbidden => StatusCode::FORBIDDEN,
            UseCaseError::NotFound(_) => StatusCode::NOT_FOUND,
            UseCaseError::Validation(_)
            | UseCaseError::BadRequest(_)
            | UseCaseError::Gateway(_) => StatusCode::BAD_REQUEST,
            UseCaseError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.into()]);
        UseCaseError::Validation(errors)
    }

    /// `Ok` when nothing is missing, otherwise one "required" error per field.
    pub fn require(missing: &[&'static str]) -> Result<(), Self> {
        if missing.is_empty() {
            return Ok(());
        }

        let errors = missing
            .iter()
            .map(|field| (field.to_string(), vec![REQUIRED_FIELD.to_string()]))
            .collect();
        Err(UseCaseError::Validation(errors))
    }
}

impl From<ValidationErrors> for UseCaseError {
    fn from(errors: ValidationErrors) -> Self {
        UseCaseError::Validation(field_errors(&errors))
    }
}

pub fn field_errors(errors: &ValidationErrors) -> FieldErrors {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errors)| {
            let messages = errors
                .iter()
                .map(|error| match &error.message {
                    Some(message) => message.to_string(),
                    None => default_message(&error.code),
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}

fn default_message(code: &str) -> String {
    match code {
        "email" => "Enter a valid email address.".to_string(),
        "length" => "Ensure this field has a valid length.".to_string(),
        other => format!("Invalid value ({other})."),
    }
}

pub type UseCaseResult<T> = std::result::Result<T, UseCaseError>;

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 8))]
        password: String,
    }

    #[test]
    fn validation_errors_become_field_messages() {
        let errors = Sample {
            password: "short".to_string(),
        }
        .validate()
        .unwrap_err();

        let mapped = field_errors(&errors);
        assert_eq!(
            mapped.get("password"),
            Some(&vec!["Ensure this field has a valid length.".to_string()])
        );
    }

    #[test]
    fn require_lists_every_missing_field() {
        let err = UseCaseError::require(&["title", "course"]).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        match err {
            UseCaseError::Validation(errors) => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors["title"], vec![REQUIRED_FIELD.to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(UseCaseError::require(&[]).is_ok());
    }

    #[test]
    fn gateway_errors_are_client_errors() {
        let err = UseCaseError::Gateway("Invalid API Key provided".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Invalid API Key provided");
    }
}
