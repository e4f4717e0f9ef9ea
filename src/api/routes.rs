//! API route definitions and handlers.

use crate::api::state::AppState;
use crate::auth;
use crate::triage::stats;
use crate::triage::{IncidentReport, RequestContext, SecurityIncident};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/incidents", post(ingest_incident))
        .route("/stats", get(query_stats))
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("internal error")]
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            // Internals are logged server-side, never leaked.
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = json!({ "success": false, "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

async fn health() -> Json<Value> {
    Json(json!({
        "data": {
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION")
        },
        "meta": {
            "timestamp": Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION")
        }
    }))
}

/// Ingest a security-event report. Token check happens before any state
/// mutation; a rejected request stores nothing.
async fn ingest_incident(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let report: IncidentReport =
        serde_json::from_value(body).map_err(|e| ApiError::Validation(e.to_string()))?;

    let token = headers
        .get("x-security-token")
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;
    auth::verify_ingest_token(
        &report.session_id,
        token,
        &state.config.ingest_secret,
        Utc::now().timestamp_millis(),
    )
    .map_err(|_| ApiError::Unauthorized)?;

    let ctx = RequestContext {
        ip_address: client_ip(&headers),
        user_agent: header_str(&headers, "user-agent"),
        url: header_str(&headers, "referer"),
    };

    let outcome = state.engine.ingest(report, ctx);
    Ok(Json(json!({
        "success": true,
        "incidentId": outcome.incident.id,
        "severity": outcome.incident.severity,
        "action": outcome.response.action,
        "message": "incident recorded"
    })))
}

#[derive(Debug, Deserialize)]
struct StatsQuery {
    token: Option<String>,
}

/// Admin read: aggregate statistics plus the last 50 incidents with
/// fingerprint and IP partially masked.
async fn query_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<Value>, ApiError> {
    let token = query.token.as_deref().ok_or(ApiError::Unauthorized)?;
    auth::verify_admin_token(token, &state.config.admin_token)
        .map_err(|_| ApiError::Unauthorized)?;

    let report = {
        let store_state = state.store.lock();
        stats::compute(&store_state, Utc::now())
    };
    let recent: Vec<Value> = state
        .store
        .recent()
        .iter()
        .map(masked_view)
        .collect();

    Ok(Json(json!({
        "stats": report,
        "recentIncidents": recent
    })))
}

fn masked_view(incident: &SecurityIncident) -> Value {
    json!({
        "id": incident.id,
        "type": incident.kind,
        "timestamp": incident.timestamp,
        "severity": incident.severity,
        "fingerprint": mask_fingerprint(&incident.fingerprint),
        "ipAddress": mask_ip(&incident.ip_address),
        "url": incident.url,
    })
}

/// Keep the first two octets of a dotted quad; anything else is fully
/// masked.
fn mask_ip(ip: &str) -> String {
    let octets: Vec<&str> = ip.split('.').collect();
    if octets.len() == 4 && octets.iter().all(|o| o.parse::<u8>().is_ok()) {
        format!("{}.{}.xxx.xxx", octets[0], octets[1])
    } else {
        "xxx.xxx.xxx.xxx".to_string()
    }
}

/// First 8 characters plus an ellipsis; shorter fingerprints keep what
/// they have.
fn mask_fingerprint(fingerprint: &str) -> String {
    let prefix: String = fingerprint.chars().take(8).collect();
    format!("{prefix}...")
}

fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn header_str(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}
