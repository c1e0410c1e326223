use axum::{extract::State, http::StatusCode, routing::get, Router};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::{config::Environment, db, response::ApiResponse, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/info", get(info))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RootData {
    pub message: String,
    pub version: String,
    pub environment: Environment,
    pub docs: String,
    pub api: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthData {
    pub status: String,
    pub environment: Environment,
    pub version: String,
    pub api_version: String,
    pub database: String,
    pub database_error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseInfo {
    pub status: String,
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InfoData {
    pub name: String,
    pub version: String,
    pub environment: Environment,
    pub api_version: String,
    pub docs_url: String,
    pub redoc_url: String,
    pub database: DatabaseInfo,
}

pub async fn root(State(state): State<AppState>) -> ApiResponse<RootData> {
    let cfg = &state.config;
    ApiResponse::ok(RootData {
        message: format!("Welcome to {}", cfg.project_name),
        version: cfg.version.clone(),
        environment: cfg.environment,
        docs: "/docs".into(),
        api: cfg.api_v1_str.clone(),
    })
}

/// 200 when `SELECT 1` succeeds, 503 otherwise. The envelope's `success`
/// flag mirrors the status code.
#[instrument(skip(state))]
pub async fn health(State(state): State<AppState>) -> (StatusCode, ApiResponse<HealthData>) {
    let cfg = &state.config;
    let probe = db::ping(&state.db).await;
    let healthy = probe.is_ok();
    let database_error = probe.err().map(|e| {
        warn!(error = %e, "health check: database unreachable");
        e.to_string()
    });

    let data = HealthData {
        status: if healthy { "healthy" } else { "unhealthy" }.into(),
        environment: cfg.environment,
        version: cfg.version.clone(),
        api_version: cfg.api_v1_str.clone(),
        database: if healthy { "connected" } else { "disconnected" }.into(),
        database_error,
    };

    if healthy {
        (StatusCode::OK, ApiResponse::ok(data).with_message("healthy"))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            ApiResponse::ok(data)
                .with_success(false)
                .with_message("unhealthy - database disconnected"),
        )
    }
}

#[instrument(skip(state))]
pub async fn info(State(state): State<AppState>) -> ApiResponse<InfoData> {
    let cfg = &state.config;
    let database = match db::server_version(&state.db).await {
        Ok(version) => DatabaseInfo {
            status: "connected".into(),
            version: Some(version),
            error: None,
        },
        Err(e) => {
            warn!(error = %e, "info: database unreachable");
            DatabaseInfo {
                status: "disconnected".into(),
                version: None,
                error: Some(e.to_string()),
            }
        }
    };

    ApiResponse::ok(InfoData {
        name: cfg.project_name.clone(),
        version: cfg.version.clone(),
        environment: cfg.environment,
        api_version: cfg.api_v1_str.clone(),
        docs_url: "/docs".into(),
        redoc_url: "/redoc".into(),
        database,
    })
}
