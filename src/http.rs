//! REST intake endpoint for tasks.
//!
//! Thin HTTP skin over the orchestrator: extracts identity, origin, and WAF
//! headers from the request, then translates the verdict into status codes.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::SecurityError;
use crate::guardrails::{FailureKind, GuardrailVerdict};
use crate::orchestrator::{TaskOrchestrator, TaskOutcome, TaskRequest};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<TaskOrchestrator>,
}

/// Build the Axum router for the intake API.
pub fn intake_routes(orchestrator: Arc<TaskOrchestrator>) -> Router {
    let state = AppState { orchestrator };

    Router::new()
        .route("/health", get(health))
        .route("/api/intake", post(intake))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "apptrack-intake"
    }))
}

// ── Intake ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct IntakeBody {
    task: String,
    identity: Option<String>,
    #[serde(default)]
    payload: Option<serde_json::Value>,
}

/// Client IP as reported by the proxy chain, first hop wins.
fn origin_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Map a guardrail rejection to the security error it represents.
fn security_error(verdict: &GuardrailVerdict) -> SecurityError {
    match verdict.failure {
        Some(FailureKind::WafBlocked) => SecurityError::WafBlocked {
            reason: verdict
                .warnings
                .first()
                .cloned()
                .unwrap_or_else(|| "high_threat_score".to_string()),
        },
        Some(FailureKind::PromptInjection) => SecurityError::PromptInjection {
            pattern: verdict
                .matched_pattern
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
        },
        Some(FailureKind::RateLimited) => SecurityError::RateLimited {
            retry_after_seconds: verdict.retry_after_seconds.unwrap_or(1),
        },
        None => SecurityError::Unauthorized,
    }
}

fn rejection_label(err: &SecurityError) -> &'static str {
    match err {
        SecurityError::WafBlocked { .. } => "waf_blocked",
        SecurityError::PromptInjection { .. } => "prompt_injection",
        SecurityError::RateLimited { .. } => "rate_limited",
        SecurityError::Unauthorized => "unauthorized",
    }
}

async fn intake(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<IntakeBody>,
) -> impl IntoResponse {
    let Some(identity) = body.identity else {
        let err = SecurityError::Unauthorized;
        return (
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::UNAUTHORIZED),
            Json(serde_json::json!({"error": rejection_label(&err)})),
        );
    };

    // Correlation id for log lines across the pipeline.
    let request_id = Uuid::new_v4();
    info!(request_id = %request_id, identity = %identity, "Intake request received");

    let request = TaskRequest {
        task_text: body.task,
        identity: Some(identity),
        origin_ip: origin_ip(&headers),
        headers: Some(headers),
        payload: body.payload,
    };

    match state.orchestrator.handle(request).await {
        Ok(TaskOutcome::Completed {
            skill,
            rationale,
            response,
        }) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "skill": skill,
                "rationale": rationale,
                "content": response.content,
                "model": response.model,
            })),
        ),
        Ok(TaskOutcome::Rejected(verdict)) => {
            let err = security_error(&verdict);
            let status =
                StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::FORBIDDEN);
            warn!(request_id = %request_id, error = %err, "Intake request rejected");
            let mut payload = serde_json::json!({"error": rejection_label(&err)});
            if let SecurityError::RateLimited {
                retry_after_seconds,
            } = err
            {
                payload["retry_after_seconds"] = retry_after_seconds.into();
            }
            (status, Json(payload))
        }
        Err(e) => {
            error!(request_id = %request_id, error = %e, "Intake request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "internal_error"})),
            )
        }
    }
}
