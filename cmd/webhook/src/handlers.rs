use crate::error::{Error, Result};
use crate::state::WebhookState;

use axum::body::Bytes;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{Router, get, post};
use podgate_admission::review::{mutation_response, validation_response};
use podgate_admission::{AdmissionReview, extract, mutation, validation};
use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};

pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/readyz", get(readyz))
        .route("/validate", post(validate))
        .route("/mutate", post(mutate))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

async fn readyz(State(state): State<WebhookState>) -> impl IntoResponse {
    if state.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn parse_review(body: Result<Bytes, BytesRejection>) -> Result<Value> {
    let body = body?;
    let payload: Value = serde_json::from_slice(&body).map_err(Error::InvalidJson)?;
    if !payload.is_object() {
        return Err(Error::NotAnObject);
    }
    Ok(payload)
}

#[instrument(skip_all)]
pub async fn validate(body: Result<Bytes, BytesRejection>) -> Result<Json<AdmissionReview>> {
    let payload = parse_review(body)?;
    let request = extract(&payload);
    info!("Validating {} {}", request.kind, request.object_ref());

    let verdict = validation::validate(&request);
    if verdict.allowed {
        info!(uid = %request.uid, "Admission request allowed");
    } else {
        warn!(uid = %request.uid, message = %verdict.message, "Admission request denied");
    }
    Ok(Json(validation_response(request.uid, verdict)))
}

#[instrument(skip_all)]
pub async fn mutate(body: Result<Bytes, BytesRejection>) -> Result<Json<AdmissionReview>> {
    let payload = parse_review(body)?;
    let request = extract(&payload);
    info!("Mutating {} {}", request.kind, request.object_ref());

    let patch = mutation::mutate(&request);
    debug!(uid = %request.uid, operations = patch.0.len(), patch = ?patch, "Built patch");
    Ok(Json(mutation_response(request.uid, patch)))
}
