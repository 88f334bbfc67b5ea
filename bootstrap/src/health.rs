//! 健康检查模块
//!
//! 提供 /health、/ready 和 /metrics 端点

use std::time::Duration;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use sqlx::PgPool;
use taller_adapter_postgres::{check_connection, pool_status};
use taller_errors::AppError;

/// 健康检查状态
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub checks: Vec<ComponentHealth>,
}

/// 组件健康状态
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HealthStatus {
    pub fn healthy() -> Self {
        Self {
            status: "healthy",
            checks: vec![],
        }
    }

    pub fn add_check(&mut self, check: ComponentHealth) {
        if check.status != "healthy" {
            self.status = "unhealthy";
        }
        self.checks.push(check);
    }

    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

impl ComponentHealth {
    pub fn healthy(name: impl Into<String>, latency: Duration) -> Self {
        Self {
            name: name.into(),
            status: "healthy",
            latency_ms: Some(latency.as_millis() as u64),
            message: None,
        }
    }

    pub fn unhealthy(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: "unhealthy",
            latency_ms: None,
            message: Some(message.into()),
        }
    }
}

/// 运维端点依赖的资源
#[derive(Clone, Default)]
pub struct OpsState {
    pool: Option<PgPool>,
    metrics: Option<PrometheusHandle>,
}

impl OpsState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_postgres(mut self, pool: PgPool) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// 就绪检查：依赖全部可用
    pub async fn readiness(&self) -> HealthStatus {
        let mut status = HealthStatus::healthy();

        if let Some(pool) = &self.pool {
            let pool_stats = pool_status(pool);
            metrics::gauge!("db_pool_connections").set(f64::from(pool_stats.size));
            metrics::gauge!("db_pool_idle_connections").set(f64::from(pool_stats.idle));

            let check = match check_connection(pool, Duration::from_secs(2)).await {
                Ok(latency) => ComponentHealth::healthy("postgres", latency),
                Err(e) => ComponentHealth::unhealthy("postgres", e.to_string()),
            };
            status.add_check(check);
        }

        status
    }
}

/// 运维路由
pub fn ops_routes(state: OpsState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Liveness 端点处理器
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthStatus::healthy()))
}

/// Readiness 端点处理器
async fn ready_handler(State(state): State<OpsState>) -> impl IntoResponse {
    let status = state.readiness().await;
    let code = if status.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status))
}

/// Metrics 端点处理器
async fn metrics_handler(State(state): State<OpsState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [("content-type", "text/plain; charset=utf-8")],
            handle.render(),
        )
            .into_response(),
        None => AppError::not_found("Metrics exporter is not configured").into_response(),
    }
}
