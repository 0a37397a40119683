use axum::{Router, middleware::from_fn_with_state, routing::get};

use crate::{DeploymentImpl, routes};

mod auth;

pub fn router(deployment: DeploymentImpl) -> Router {
    let api_routes = Router::new()
        .merge(routes::agents::router(&deployment))
        .merge(routes::auto_post::router())
        .layer(from_fn_with_state(
            deployment.clone(),
            auth::require_api_auth,
        ));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api_routes)
        .with_state(deployment)
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    use axum::{
        body::{Body, to_bytes},
        extract::ConnectInfo,
        http::{Request, StatusCode, header},
    };
    use deployment::Deployment;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::{DeploymentImpl, test_support::TestEnvGuard};

    async fn setup_deployment(
        api_token: Option<&str>,
        allow_localhost_bypass: bool,
    ) -> (TestEnvGuard, DeploymentImpl) {
        let temp_root = std::env::temp_dir().join(format!("avee-test-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&temp_root).unwrap();

        let db_path = temp_root.join("db.sqlite");
        let db_url = format!("sqlite://{}?mode=rwc", db_path.to_string_lossy());
        let env_guard = TestEnvGuard::with_access_control(
            &temp_root,
            db_url,
            api_token,
            allow_localhost_bypass,
        );

        let deployment = DeploymentImpl::new().await.unwrap();

        (env_guard, deployment)
    }

    fn loopback_connect_info() -> ConnectInfo<SocketAddr> {
        ConnectInfo(SocketAddr::new(
            IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            12345,
        ))
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn response_json(response: axum::response::Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn health_remains_public_in_token_mode() {
        let (_env_guard, deployment) = setup_deployment(Some("sekrit"), false).await;

        let app = super::router(deployment);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn api_requires_token_when_enabled() {
        let (_env_guard, deployment) = setup_deployment(Some("sekrit"), false).await;

        let app = super::router(deployment);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/agents")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let json = response_json(response).await;
        assert_eq!(json.get("success").and_then(|v| v.as_bool()), Some(false));
        assert_eq!(
            json.get("message").and_then(|v| v.as_str()),
            Some("Unauthorized")
        );
    }

    #[tokio::test]
    async fn api_accepts_authorization_header() {
        let (_env_guard, deployment) = setup_deployment(Some("sekrit"), false).await;

        let app = super::router(deployment);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/agents")
                    .header(header::AUTHORIZATION, "Bearer sekrit")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert_eq!(json.get("success").and_then(|v| v.as_bool()), Some(true));
    }

    #[tokio::test]
    async fn api_accepts_x_api_token_header() {
        let (_env_guard, deployment) = setup_deployment(Some("sekrit"), false).await;

        let app = super::router(deployment);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/agents")
                    .header("x-api-token", "sekrit")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn api_allows_localhost_bypass_when_enabled() {
        let (_env_guard, deployment) = setup_deployment(Some("sekrit"), true).await;

        let app = super::router(deployment);

        let mut request = Request::builder()
            .uri("/api/agents")
            .body(Body::empty())
            .unwrap();
        request.extensions_mut().insert(loopback_connect_info());

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn agent_lifecycle_via_router() {
        let (_env_guard, deployment) = setup_deployment(None, false).await;

        let app = super::router(deployment);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/agents",
                serde_json::json!({
                    "handle": "stellar",
                    "display_name": "Stellar",
                    "persona": "space correspondent"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        let agent_id = json
            .pointer("/data/id")
            .and_then(|v| v.as_str())
            .unwrap()
            .to_string();

        // Duplicate handles are rejected with a conflict.
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/agents",
                serde_json::json!({
                    "handle": "stellar",
                    "display_name": "Other",
                    "persona": null
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/api/agents/{agent_id}/auto-post-settings"),
                serde_json::json!({
                    "auto_post_enabled": true,
                    "auto_post_settings": {
                        "frequency": "daily",
                        "preferred_time": "09:00",
                        "categories": ["technology"]
                    }
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(
            json.pointer("/data/auto_post_enabled").and_then(|v| v.as_bool()),
            Some(true)
        );

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/agents/{agent_id}/reference-images"),
                serde_json::json!({
                    "url": "https://cdn.example.com/ref.png",
                    "is_primary": true
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/agents/{agent_id}/reference-images"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(
            json.pointer("/data").and_then(|v| v.as_array()).map(Vec::len),
            Some(1)
        );

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/auto-post/status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(
            json.pointer("/data/0/auto_post_enabled")
                .and_then(|v| v.as_bool()),
            Some(true)
        );
        assert_eq!(
            json.pointer("/data/0/reference_images")
                .and_then(|v| v.as_array())
                .map(Vec::len),
            Some(1)
        );
    }

    #[tokio::test]
    async fn unknown_agent_returns_not_found() {
        let (_env_guard, deployment) = setup_deployment(None, false).await;

        let app = super::router(deployment);

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/agents/{}", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
