use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures surfaced by the dispatcher and the HTTP layer.
///
/// Every variant maps to a structured `{"error": ...}` response; none of them
/// ends the process.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DispatchError {
    #[error("Content-Type must be application/json")]
    UnsupportedMediaType,
    #[error("{0}")]
    Validation(String),
    #[error("Ride not found")]
    RideNotFound,
    #[error("Driver not found: {0}")]
    DriverNotFound(String),
    #[error("No drivers available")]
    NoDriversAvailable,
    #[error("Address not found")]
    AddressNotFound,
    #[error("Route unavailable")]
    RouteUnavailable,
}

impl DispatchError {
    pub fn missing_coordinates() -> Self {
        Self::Validation("Missing latitude or longitude".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::RideNotFound
            | Self::DriverNotFound(_)
            | Self::NoDriversAvailable
            | Self::AddressNotFound => StatusCode::NOT_FOUND,
            Self::RouteUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}
