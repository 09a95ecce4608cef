use axum::{extract::DefaultBodyLimit, routing::post, Router};
use std::sync::Arc;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::error::{Result, ServiceError};
use crate::handlers;
use crate::state::ServiceState;

/// Fallback for unknown methods.
async fn not_found() -> ServiceError {
    ServiceError::NotFound
}

/// Builds the RPC router.
///
/// Session negotiation and the password/login calls share one per-peer-IP
/// rate limit, so the router must be served with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn router(state: ServiceState) -> Result<Router> {
    let auth_governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(state.config.auth_replenish_ms)
            .burst_size(state.config.auth_burst)
            .finish()
            .ok_or_else(|| ServiceError::Internal("Invalid rate limit configuration".to_string()))?,
    );

    let auth_routes = Router::new()
        .route("/api/auth/set-password", post(handlers::auth::set_password))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/command", post(handlers::auth::command))
        .layer(GovernorLayer::new(auth_governor_conf.clone()));

    let session_routes = Router::new()
        .route("/api/service/open-session", post(handlers::service::open_session))
        .route("/api/service/create-session", post(handlers::service::open_session))
        .layer(GovernorLayer::new(auth_governor_conf));

    let service_routes = Router::new()
        .route("/api/service/close-session", post(handlers::service::close_session))
        .route(
            "/api/service/create-collection",
            post(handlers::service::create_collection),
        )
        .route("/api/service/read-alias", post(handlers::service::read_alias))
        .route("/api/collection/create-item", post(handlers::item::create_item))
        .route("/api/item/get-secret", post(handlers::item::get_secret))
        .route("/api/item/set-secret", post(handlers::item::set_secret))
        .route("/api/item/get", post(handlers::item::get_item));

    let body_limit = state.config.body_limit_bytes;

    Ok(Router::new()
        .merge(session_routes)
        .merge(service_routes)
        .merge(auth_routes)
        .fallback(not_found)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default())
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::repositories::password::MemoryPasswordStore;
    use axum::{
        body::Body,
        extract::ConnectInfo,
        http::{Request, StatusCode},
        response::Response,
    };
    use std::net::SocketAddr;
    use tower::ServiceExt;

    fn app_with(config: Config) -> Router {
        let state = ServiceState::new(config, Arc::new(MemoryPasswordStore::default()));
        router(state).unwrap()
    }

    fn app() -> Router {
        app_with(Config::default())
    }

    async fn send(app: Router, uri: &str, body: serde_json::Value) -> Response {
        let peer = SocketAddr::from(([127, 0, 0, 1], 40000));
        app.oneshot(
            Request::post(uri)
                .header("content-type", "application/json")
                .extension(ConnectInfo(peer))
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
    }

    async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let response = send(app, uri, body).await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn unsupported_algorithm_maps_to_not_supported() {
        let (status, body) = post_json(
            app(),
            "/api/service/open-session",
            serde_json::json!({ "algorithm": "plain", "input": "" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["name"], "org.freedesktop.DBus.Error.NotSupported");
    }

    #[tokio::test]
    async fn unknown_method_is_not_found() {
        let (status, body) = post_json(app(), "/api/service/lock", serde_json::json!({})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["name"], "org.freedesktop.Secret.Error.NoSuchObject");
    }

    #[tokio::test]
    async fn default_collection_over_the_wire() {
        let (status, body) = post_json(
            app(),
            "/api/service/create-collection",
            serde_json::json!({ "properties": {}, "alias": "default" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["collection"], "/org/freedesktop/secrets/aliases/default");
        assert_eq!(body["prompt"], "/");
    }

    #[tokio::test]
    async fn get_secret_with_unknown_session() {
        let (status, body) = post_json(
            app(),
            "/api/item/get-secret",
            serde_json::json!({
                "item": "/org/freedesktop/secrets/aliases/default/0123456789abcdef0123456789abcdef",
                "session": "/org/freedesktop/secrets/session/0123456789abcdef0123456789abcdef"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["name"], "org.freedesktop.Secret.Error.NoSession");
    }

    #[tokio::test]
    async fn session_negotiation_is_rate_limited_per_peer() {
        let app = app_with(Config {
            auth_burst: 1,
            auth_replenish_ms: 60_000,
            ..Config::default()
        });
        let request = || serde_json::json!({ "algorithm": "plain", "input": "" });

        let first = send(app.clone(), "/api/service/open-session", request()).await;
        assert_eq!(first.status(), StatusCode::BAD_REQUEST);

        let second = send(app.clone(), "/api/service/create-session", request()).await;
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

        // Routes outside the limiter are unaffected.
        let (status, _) = post_json(
            app,
            "/api/service/read-alias",
            serde_json::json!({ "name": "default" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
}
