//! Route configuration and setup

use crate::auth::{auth_middleware, AuthState, JwtValidator};
use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tubely_core::constants::API_PREFIX;
use tubely_core::Config;
use tubely_infra::request_id_middleware;

/// Room for multipart boundaries and part headers on top of the video bytes. The
/// staging cap, not this limit, decides whether an upload is too large.
const MULTIPART_OVERHEAD_BYTES: u64 = 1024 * 1024;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router, anyhow::Error> {
    let auth_state = Arc::new(AuthState {
        jwt: Arc::new(JwtValidator::new(config.jwt_secret())),
    });

    let upload_body_limit =
        usize::try_from(config.max_video_size_bytes().saturating_add(MULTIPART_OVERHEAD_BYTES))
            .unwrap_or(usize::MAX);

    // Public routes (no authentication required)
    let public_routes = Router::new().route("/health", get(handlers::health::health_check));

    // Protected routes (require a bearer token)
    let protected_routes = Router::new()
        .route(
            &format!("{}/videos", API_PREFIX),
            post(handlers::video_create::create_video),
        )
        .route(
            &format!("{}/videos/{{video_id}}", API_PREFIX),
            get(handlers::video_get::get_video),
        )
        .route(
            &format!("{}/videos/{{video_id}}/upload", API_PREFIX),
            post(handlers::video_upload::upload_video)
                .layer(DefaultBodyLimit::max(upload_body_limit)),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    // Server-level concurrency limit to protect against resource exhaustion under extreme load
    let http_concurrency_limit = config.http_concurrency_limit();

    tracing::info!(
        upload_body_limit_bytes = upload_body_limit,
        http_concurrency_limit = http_concurrency_limit,
        "Routes configured"
    );

    Ok(public_routes
        .merge(protected_routes)
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware)))
}
