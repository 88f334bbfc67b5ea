//! 路由装配

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::middleware;
use axum::routing::post;
use taller_bootstrap::{OpsState, ops_routes, track_http_metrics};
use taller_config::ServerConfig;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use super::handlers::{generate_otp, validate_otp};
use crate::application::{GenerateOtpHandler, ValidateOtpHandler};

#[derive(Clone)]
pub struct AppState {
    pub generate: Arc<GenerateOtpHandler>,
    pub validate: Arc<ValidateOtpHandler>,
}

/// OTP 业务路由
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/otp/generate", post(generate_otp))
        .route("/api/otp/validate", post(validate_otp))
        .route_layer(middleware::from_fn(track_http_metrics))
        .with_state(state)
}

/// 完整应用：业务路由 + 运维路由 + 通用中间件
pub fn build_app(state: AppState, ops: OpsState, server: &ServerConfig) -> Router {
    router(state)
        .merge(ops_routes(ops))
        .layer(DefaultBodyLimit::max(server.max_body_size))
        .layer(cors_layer(&server.cors_allowed_origins))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::POST, Method::GET])
        .allow_headers([header::CONTENT_TYPE])
}
