use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Failures at the HTTP boundary. None of them reach the caller in detail.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to read request body: {0}")]
    Body(#[from] BytesRejection),

    #[error("request body is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("request body is not a JSON object")]
    NotAnObject,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        tracing::error!("Error processing request: {}", self);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": INTERNAL_ERROR_MESSAGE })),
        )
            .into_response()
    }
}
