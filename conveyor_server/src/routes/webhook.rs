//! Inbound webhook handling — validate, normalize, hand off to processing.

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};

use crate::events;
use crate::handlers;
use crate::services::forge;

use super::ServiceState;

/// Handle a GitHub webhook delivery.
pub async fn handle_github(
    state: &ServiceState,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<StatusCode, StatusCode> {
    let signature = headers
        .get("x-hub-signature-256")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if !forge::validate_signature(&state.config.github_webhook_secret, &body, signature) {
        tracing::warn!("Webhook signature validation failed");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let event_type = headers
        .get("x-github-event")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");
    crate::metrics::webhook_received(event_type);

    if event_type == "ping" {
        tracing::info!("Received GitHub ping webhook");
        return Ok(StatusCode::OK);
    }

    let payload: serde_json::Value =
        serde_json::from_slice(&body).map_err(|_| StatusCode::BAD_REQUEST)?;

    let Some(event) = events::github::parse_event(event_type, &payload) else {
        return Ok(StatusCode::OK);
    };
    process(state, event, None).await
}

/// Handle a GitLab webhook delivery.
pub async fn handle_gitlab(
    state: &ServiceState,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<StatusCode, StatusCode> {
    let token = headers
        .get("x-gitlab-token")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if !state.config.gitlab_webhook_token.is_empty()
        && token != state.config.gitlab_webhook_token
    {
        tracing::warn!("GitLab webhook token mismatch");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let payload: serde_json::Value =
        serde_json::from_slice(&body).map_err(|_| StatusCode::BAD_REQUEST)?;
    crate::metrics::webhook_received(
        payload["object_kind"].as_str().unwrap_or("unknown"),
    );

    let Some(event) = events::gitlab::parse_event(&payload) else {
        return Ok(StatusCode::OK);
    };
    process(state, event, None).await
}

/// Handle a message forwarded from the fedora-messaging bridge.
///
/// Carries Pagure pushes, Pagure PR comments and Koji build-state changes,
/// wrapped as `{"topic": ..., "body": ...}`.
pub async fn handle_fedora(
    state: &ServiceState,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<StatusCode, StatusCode> {
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let expected = format!("Bearer {}", state.config.fedora_events_token);
    if !state.config.fedora_events_token.is_empty() && authorization != expected {
        tracing::warn!("Fedora events token mismatch");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let payload: serde_json::Value =
        serde_json::from_slice(&body).map_err(|_| StatusCode::BAD_REQUEST)?;
    let topic = payload["topic"].as_str().unwrap_or("unknown");
    crate::metrics::webhook_received(topic);

    if topic.ends_with("buildsys.build.state.change") {
        let Some((event, build)) = events::koji::parse_event(&payload["body"]) else {
            return Ok(StatusCode::OK);
        };
        return process(state, event, Some(build)).await;
    }

    let Some(event) = events::pagure::parse_event(topic, &payload["body"]) else {
        return Ok(StatusCode::OK);
    };
    process(state, event, None).await
}

async fn process(
    state: &ServiceState,
    event: crate::events::EventData,
    koji_build: Option<crate::events::koji::KojiBuildData>,
) -> Result<StatusCode, StatusCode> {
    match handlers::process_event(state, event, koji_build).await {
        Ok(()) => Ok(StatusCode::ACCEPTED),
        Err(e) => {
            tracing::error!("Event processing failed: {e:#}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
