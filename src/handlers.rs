use crate::config::{AffinitySettings, Config};
use crate::errors::AppError;
use crate::models::{
    AddToAffinityResponse, ClientMessage, DuplicateCheckResponse, InputRecord,
};
use crate::pipeline::ReconciliationEngine;
use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use std::sync::Arc;

/// Shared application state injected into handlers.
///
/// Holds only server-level config. Affinity settings are read from the
/// process environment on every request; `.env` itself is loaded once at
/// startup.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
}

impl AppState {
    fn engine(&self) -> Result<ReconciliationEngine, AppError> {
        ReconciliationEngine::from_config(&self.config, AffinitySettings::from_env())
    }
}

/// Health check endpoint.
///
/// # Returns
///
/// * `(StatusCode, Json<serde_json::Value>)` - HTTP 200 OK with health status JSON.
pub async fn health() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "affinity-stealth-adder",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// POST /api/v1/messages
///
/// Entry point for the extension's `{action, data}` messages. Dispatches to
/// the add or duplicate-check flow and answers with that flow's response body.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `message` - The extension message.
///
/// # Returns
///
/// * `Result<Json<Value>, AppError>` - The flow response, or an error if the engine could not be built.
pub async fn handle_message(
    State(state): State<Arc<AppState>>,
    Json(message): Json<ClientMessage>,
) -> Result<Json<Value>, AppError> {
    let engine = match state.engine() {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!("Could not build engine: {}", e);
            return Ok(Json(failure_body(&message, e)?));
        }
    };

    let body = match message {
        ClientMessage::AddToAffinity(record) => {
            tracing::info!("Message: addToAffinity");
            to_value(&AddToAffinityResponse::from(
                engine.add_to_affinity(&record).await,
            ))?
        }
        ClientMessage::CheckDuplicate(record) => {
            tracing::info!("Message: checkDuplicate");
            to_value(&engine.check_duplicate(&record).await)?
        }
    };

    Ok(Json(body))
}

/// POST /api/v1/affinity/add
///
/// Runs the full reconciliation pipeline for one scraped record. Pipeline
/// failures are reported in the body as `{success: false, error}`.
pub async fn add_to_affinity(
    State(state): State<Arc<AppState>>,
    Json(record): Json<InputRecord>,
) -> Result<Json<AddToAffinityResponse>, AppError> {
    let engine = state.engine()?;
    let result = engine.add_to_affinity(&record).await;
    if let Err(e) = &result {
        tracing::error!("Affinity API Error: {}", e);
    }
    Ok(Json(AddToAffinityResponse::from(result)))
}

/// POST /api/v1/affinity/check-duplicate
///
/// Reports whether an organization for this record already exists.
pub async fn check_duplicate(
    State(state): State<Arc<AppState>>,
    Json(record): Json<InputRecord>,
) -> Result<Json<DuplicateCheckResponse>, AppError> {
    match state.engine() {
        Ok(engine) => Ok(Json(engine.check_duplicate(&record).await)),
        Err(e) => {
            tracing::error!("Could not build engine: {}", e);
            Ok(Json(duplicate_failure(&e)))
        }
    }
}

/// Response for a message whose engine could not be built, in the shape the
/// message's action expects.
fn failure_body(message: &ClientMessage, error: AppError) -> Result<Value, AppError> {
    match message {
        ClientMessage::AddToAffinity(_) => to_value(&AddToAffinityResponse::from(Err(error))),
        ClientMessage::CheckDuplicate(_) => to_value(&duplicate_failure(&error)),
    }
}

fn duplicate_failure(error: &AppError) -> DuplicateCheckResponse {
    DuplicateCheckResponse {
        error: Some(error.caller_message().to_string()),
        ..Default::default()
    }
}

fn to_value<T: serde::Serialize>(body: &T) -> Result<Value, AppError> {
    serde_json::to_value(body)
        .map_err(|e| AppError::InternalError(format!("Failed to serialize response: {}", e)))
}
