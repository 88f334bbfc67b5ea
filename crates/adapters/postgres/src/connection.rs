//! PostgreSQL 连接管理

use std::time::{Duration, Instant};

use sqlx::postgres::{PgPool, PgPoolOptions};
use taller_common::{RetryConfig, is_transient_error, with_retry};
use taller_errors::{AppError, AppResult};
use tracing::info;

/// PostgreSQL 连接池配置
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),
            retry: RetryConfig::default(),
        }
    }
}

impl PostgresConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self.min_connections = self.min_connections.min(max);
        self
    }

    pub fn with_connect_attempts(mut self, attempts: u32) -> Self {
        self.retry = RetryConfig::new(attempts, self.retry.initial_delay, self.retry.max_delay);
        self
    }
}

/// 创建 PostgreSQL 连接池
///
/// 启动时数据库可能尚未就绪，连接类错误按退避重试。
pub async fn create_pool(config: &PostgresConfig) -> AppResult<PgPool> {
    let pool = with_retry(
        &config.retry,
        "postgres_connect",
        || {
            PgPoolOptions::new()
                .max_connections(config.max_connections)
                .min_connections(config.min_connections)
                .acquire_timeout(config.acquire_timeout)
                .idle_timeout(config.idle_timeout)
                .connect(&config.url)
        },
        |e| is_transient_error(&e.to_string()),
    )
    .await
    .map_err(|e| AppError::database(format!("Failed to create pool: {}", e)))?;

    info!(max_connections = config.max_connections, "PostgreSQL pool created");
    Ok(pool)
}

/// 连接池状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    pub size: u32,
    pub idle: u32,
}

pub fn pool_status(pool: &PgPool) -> PoolStatus {
    PoolStatus {
        size: pool.size(),
        idle: pool.num_idle() as u32,
    }
}

/// 检查数据库连接，返回往返耗时
pub async fn check_connection(pool: &PgPool, timeout: Duration) -> AppResult<Duration> {
    let started = Instant::now();

    tokio::time::timeout(timeout, sqlx::query("SELECT 1").execute(pool))
        .await
        .map_err(|_| AppError::unavailable("Database health check timed out"))?
        .map_err(|e| AppError::database(format!("Database health check failed: {}", e)))?;

    Ok(started.elapsed())
}
