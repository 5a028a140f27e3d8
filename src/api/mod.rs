mod payload;
mod script;

use axum::{
    Router,
    extract::{Json, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

pub use payload::decode;
pub use script::{normalize_script, resolve_script};

use crate::core::{EngineError, Scenario, ScenarioOutcome, run_scenario};
use crate::export::export_rollover_workbook;

const NOT_JSON: &str = "Invalid Content-Type. Must be application/json.";

#[derive(Debug, Default, Deserialize)]
pub struct CalculateRequest {
    #[serde(default)]
    pub script: Option<String>,
    /// Explicit tag; takes precedence over `script`.
    #[serde(default)]
    pub scenario: Option<Scenario>,
    #[serde(default)]
    pub data: Value,
}

impl CalculateRequest {
    pub fn resolve(&self) -> Result<Scenario, EngineError> {
        match self.scenario {
            Some(scenario) => Ok(scenario),
            None => resolve_script(self.script.as_deref().unwrap_or_default()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub excel_base64: String,
    pub filename: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CalculateResponse {
    Scenario(ScenarioOutcome),
    Export(ExportResponse),
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    received_script: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    normalized_script: Option<String>,
}

impl From<&EngineError> for ErrorResponse {
    fn from(err: &EngineError) -> Self {
        let (received_script, normalized_script) = match err {
            EngineError::UnknownScript {
                received,
                normalized,
            } => (Some(received.clone()), Some(normalized.clone())),
            _ => (None, None),
        };
        Self {
            error: err.to_string(),
            received_script,
            normalized_script,
        }
    }
}

fn status_for(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Infeasible(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::Calculation { source, .. } => status_for(source),
        EngineError::InvalidInput(_)
        | EngineError::Coercion { .. }
        | EngineError::UnknownScript { .. } => StatusCode::BAD_REQUEST,
    }
}

/// Decodes `data` for `scenario`, runs it, and for the export scenario turns
/// the rollover into a base64 workbook.
pub fn run(scenario: Scenario, data: Value) -> Result<CalculateResponse, EngineError> {
    let params = decode(scenario, data).map_err(|e| e.within(scenario.label()))?;
    match run_scenario(&params)? {
        ScenarioOutcome::Rollover(summary) if scenario == Scenario::RolloverExport => {
            let workbook =
                export_rollover_workbook(&summary).map_err(|e| e.within(scenario.label()))?;
            Ok(CalculateResponse::Export(ExportResponse {
                excel_base64: STANDARD.encode(&workbook.bytes),
                filename: workbook.filename,
            }))
        }
        outcome => Ok(CalculateResponse::Scenario(outcome)),
    }
}

pub fn calculate(request: CalculateRequest) -> Result<CalculateResponse, EngineError> {
    let scenario = request.resolve()?;
    run(scenario, request.data)
}

pub fn router() -> Router {
    Router::new()
        .route("/calculate", post(calculate_handler))
        .fallback(not_found_handler)
}

pub async fn run_http_server(addr: SocketAddr) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "amortize HTTP API listening");
    axum::serve(listener, router())
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(e) => {
            warn!(error = %e, "cannot listen for ctrl-c; running until killed");
            std::future::pending::<()>().await;
        }
    }
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

fn data_keys(data: &Value) -> Vec<&str> {
    data.as_object()
        .map(|map| map.keys().map(String::as_str).collect())
        .unwrap_or_default()
}

async fn calculate_handler(payload: Result<Json<CalculateRequest>, JsonRejection>) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(JsonRejection::MissingJsonContentType(_)) => {
            return error_response(StatusCode::BAD_REQUEST, NOT_JSON);
        }
        Err(rejection) => {
            warn!(reason = %rejection.body_text(), "rejected request body");
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("Invalid JSON payload: {}", rejection.body_text()),
            );
        }
    };

    info!(
        script = request.script.as_deref().unwrap_or_default(),
        scenario = ?request.scenario,
        keys = ?data_keys(&request.data),
        "calculate request"
    );
    let scenario = match request.resolve() {
        Ok(scenario) => scenario,
        Err(err) => {
            warn!(error = %err, "script not recognised");
            return engine_error_response(&err);
        }
    };
    debug!(?scenario, "resolved scenario");

    match run(scenario, request.data) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(err) => {
            warn!(?scenario, error = %err, "scenario failed");
            engine_error_response(&err)
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
            received_script: None,
            normalized_script: None,
        },
    )
}

fn engine_error_response(err: &EngineError) -> Response {
    json_response(status_for(err), ErrorResponse::from(err))
}
