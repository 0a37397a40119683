use std::net::SocketAddr;

use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use deployment::Deployment;
use utils::response::ApiResponse;

use crate::DeploymentImpl;

fn parse_authorization_bearer(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    let (prefix, rest) = trimmed.split_once(' ')?;
    if !prefix.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = rest.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

fn peer_is_loopback(req: &Request) -> Option<bool> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|connect_info| connect_info.0.ip().is_loopback())
}

fn extract_request_token(req: &Request) -> Option<String> {
    // 1) Authorization: Bearer <token>
    if let Some(value) = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_authorization_bearer)
    {
        return Some(value.to_string());
    }

    // 2) X-API-Token: <token>
    if let Some(value) = req
        .headers()
        .get("x-api-token")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        return Some(value.to_string());
    }

    None
}

pub async fn require_api_auth(
    State(deployment): State<DeploymentImpl>,
    req: Request,
    next: Next,
) -> Response {
    let access_control = deployment.config().access_control.clone();

    if matches!(
        access_control.mode,
        services::services::config::AccessControlMode::Disabled
    ) {
        return next.run(req).await;
    }

    let Some(expected_token) = access_control.token.as_deref().filter(|t| !t.is_empty()) else {
        tracing::warn!(
            "accessControl.mode=TOKEN but accessControl.token is missing; treating as disabled"
        );
        return next.run(req).await;
    };

    let is_loopback = peer_is_loopback(&req).unwrap_or(false);
    if access_control.allow_localhost_bypass && is_loopback {
        return next.run(req).await;
    }

    let presented = extract_request_token(&req);
    if presented.as_deref() != Some(expected_token) {
        let peer = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|connect_info| connect_info.0.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let reason = if presented.is_none() {
            "missing_token"
        } else {
            "token_mismatch"
        };

        tracing::warn!(
            path = %req.uri().path(),
            method = %req.method(),
            peer = %peer,
            reason,
            "Unauthorized API request"
        );

        // All unauthorized requests return the standard ApiResponse error
        // envelope with a 401 status.
        let response = ApiResponse::<()>::error("Unauthorized");
        return (axum::http::StatusCode::UNAUTHORIZED, Json(response)).into_response();
    }

    next.run(req).await
}
