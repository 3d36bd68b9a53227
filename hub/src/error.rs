use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Unified error type for hub API responses.
#[derive(Debug)]
pub enum HubError {
    BadRequest(String),
    /// The store target could not be reached, or was already marked offline.
    Connection(String),
    /// A stored field could not be coerced to the type the bar shape needs.
    DataIntegrity(String),
    Db(String),
    Internal(String),
}

impl HubError {
    /// Wrap a failure at an endpoint boundary: validation errors pass through,
    /// everything else is logged and becomes `Internal("{what}: {self}")`.
    pub fn at_endpoint(self, what: &str) -> Self {
        match self {
            Self::BadRequest(_) => self,
            other => {
                tracing::error!("{what}: {other}");
                Self::Internal(format!("{what}: {other}"))
            }
        }
    }
}

impl std::fmt::Display for HubError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest(msg) => write!(f, "bad_request: {msg}"),
            Self::Connection(msg) => write!(f, "connection_error: {msg}"),
            Self::DataIntegrity(msg) => write!(f, "data_integrity: {msg}"),
            Self::Db(msg) => write!(f, "db_error: {msg}"),
            Self::Internal(msg) => write!(f, "internal_error: {msg}"),
        }
    }
}

impl std::error::Error for HubError {}

impl IntoResponse for HubError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Connection(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("connection_error:{msg}"),
            ),
            Self::DataIntegrity(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("data_integrity:{msg}"),
            ),
            Self::Db(msg) => (StatusCode::INTERNAL_SERVER_ERROR, format!("db_error:{msg}")),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = json!({ "detail": detail });
        (status, axum::Json(body)).into_response()
    }
}

impl From<r2d2::Error> for HubError {
    fn from(e: r2d2::Error) -> Self {
        Self::Db(e.to_string())
    }
}
