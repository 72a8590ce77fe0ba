// Centralized error handling for the access gate

use crate::models::feature::FeatureCode;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Errors surfaced by the HTTP layer and the fail-fast access check.
///
/// Ordinary denials are not errors: the evaluator answers `false` and the
/// guards render a denial payload. `FeatureRequired` exists for call sites
/// that prefer to propagate a denial with `?`.
#[derive(Error, Debug)]
pub enum AccessError {
    #[error("Feature required: {feature}")]
    FeatureRequired { feature: FeatureCode },

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Unknown plan: {0}")]
    UnknownPlan(String),

    #[error("Subscription backend error: {0}")]
    SubscriptionBackend(String),
}

impl AccessError {
    pub fn status(&self) -> StatusCode {
        match self {
            AccessError::FeatureRequired { .. } => StatusCode::FORBIDDEN,
            AccessError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AccessError::InvalidApiKey => StatusCode::UNAUTHORIZED,
            AccessError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            AccessError::NotFound(_) => StatusCode::NOT_FOUND,
            AccessError::UnknownPlan(_) => StatusCode::BAD_REQUEST,
            AccessError::SubscriptionBackend(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AccessError {
    fn into_response(self) -> Response {
        use crate::models::api::ErrorResponse;
        use axum::response::Json;

        (
            self.status(),
            Json(ErrorResponse {
                success: false,
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[derive(Error, Debug)]
pub enum MonitoringError {
    #[error("Invalid API key")]
    InvalidApiKey,
}

impl IntoResponse for MonitoringError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            MonitoringError::InvalidApiKey => (StatusCode::UNAUTHORIZED, "Unauthorized"),
        };

        (status, message).into_response()
    }
}
