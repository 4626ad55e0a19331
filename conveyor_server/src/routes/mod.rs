//! HTTP routes — webhooks, the reporting API, project registry.

pub mod copr_builds;
pub mod webhook;

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::json;

use crate::config::ServiceConfig;
use crate::db::DbPool;
use crate::services::bodhi::BodhiClient;
use crate::services::build_records::CoprBuildStore;
use crate::services::copr::CoprClient;
use crate::services::forge::{split_project_url, ForgeClients};
use crate::services::koji::KojiClient;
use crate::services::packagers::PackagerLookup;
use crate::services::projects;

/// Shared state for route handlers and event processing.
#[derive(Clone)]
pub struct ServiceState {
    pub pool: DbPool,
    pub config: Arc<ServiceConfig>,
    pub forge: Arc<ForgeClients>,
    pub copr: Arc<CoprClient>,
    pub koji: Arc<KojiClient>,
    pub bodhi: Arc<BodhiClient>,
    pub packagers: Arc<dyn PackagerLookup>,
    pub copr_builds: Arc<dyn CoprBuildStore>,
}

/// Build the service's Axum router.
pub fn service_router(state: ServiceState) -> Router {
    Router::new()
        // Webhooks
        .route("/webhook/github", post(github_webhook_handler))
        .route("/webhook/gitlab", post(gitlab_webhook_handler))
        .route("/events/fedora", post(fedora_events_handler))
        // Reporting API
        .route("/copr-builds", get(list_copr_builds_handler))
        .route("/copr-builds/{id}", get(get_copr_build_handler))
        // Project registry
        .route("/projects", get(list_projects_handler).post(register_project_handler))
        .with_state(state)
}

// ── Webhooks ──

async fn github_webhook_handler(
    State(state): State<ServiceState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, StatusCode> {
    webhook::handle_github(&state, &headers, body).await
}

async fn gitlab_webhook_handler(
    State(state): State<ServiceState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, StatusCode> {
    webhook::handle_gitlab(&state, &headers, body).await
}

async fn fedora_events_handler(
    State(state): State<ServiceState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, StatusCode> {
    webhook::handle_fedora(&state, &headers, body).await
}

// ── Reporting API ──

async fn list_copr_builds_handler(
    State(state): State<ServiceState>,
    Query(pagination): Query<copr_builds::Pagination>,
) -> Result<Response, StatusCode> {
    let mut conn = state
        .pool
        .get()
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let (first, last) = copr_builds::indices(&pagination);
    let builds = copr_builds::list_builds(&mut conn, first, last)
        .await
        .map_err(|e| {
            tracing::error!("Copr build listing failed: {e:#}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok((
        StatusCode::PARTIAL_CONTENT,
        [(
            header::CONTENT_RANGE,
            copr_builds::content_range(first, last),
        )],
        Json(builds),
    )
        .into_response())
}

async fn get_copr_build_handler(
    State(state): State<ServiceState>,
    Path(id): Path<i64>,
) -> Result<Response, StatusCode> {
    let mut conn = state
        .pool
        .get()
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    match copr_builds::get_build_detail(&mut conn, id).await {
        Ok(Some(detail)) => Ok(Json(detail).into_response()),
        Ok(None) => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({"error": "No info about build stored in DB"})),
        )
            .into_response()),
        Err(e) => {
            tracing::error!("Copr build lookup failed: {e:#}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

// ── Project registry ──

async fn list_projects_handler(
    State(state): State<ServiceState>,
) -> Result<Json<Vec<crate::models::project::Project>>, StatusCode> {
    let mut conn = state
        .pool
        .get()
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    projects::list_projects(&mut conn)
        .await
        .map(Json)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

#[derive(serde::Deserialize)]
pub struct RegisterProjectRequest {
    pub project_url: String,
    pub default_branch: Option<String>,
    pub package_config: Option<serde_json::Value>,
    pub issue_repository: Option<String>,
}

async fn register_project_handler(
    State(state): State<ServiceState>,
    Json(req): Json<RegisterProjectRequest>,
) -> Result<(StatusCode, Json<crate::models::project::Project>), StatusCode> {
    let Some((_, namespace, name)) = split_project_url(&req.project_url) else {
        return Err(StatusCode::BAD_REQUEST);
    };

    let mut conn = state
        .pool
        .get()
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let new_project = crate::models::project::NewProject {
        name,
        namespace,
        project_url: req.project_url,
        default_branch: req.default_branch.unwrap_or_else(|| "main".to_string()),
        package_config: req.package_config,
        issue_repository: req.issue_repository,
        active: true,
    };

    projects::create_project(&mut conn, new_project)
        .await
        .map(|project| (StatusCode::CREATED, Json(project)))
        .map_err(|e| {
            tracing::error!("Project registration failed: {e}");
            StatusCode::BAD_REQUEST
        })
}
