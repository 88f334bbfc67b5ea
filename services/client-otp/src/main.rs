//! client-otp 服务入口

use std::sync::Arc;
use std::time::Duration;

use client_otp::api::http::{AppState, build_app};
use client_otp::application::{GenerateOtpHandler, ValidateOtpHandler};
use client_otp::domain::OtpPolicy;
use client_otp::domain::repositories::{ClientDirectory, OtpRecordRepository};
use client_otp::domain::services::{OtpDelivery, OtpService};
use client_otp::infrastructure::CleanupTask;
use client_otp::infrastructure::delivery::{EmailOtpDelivery, LoggingOtpDelivery};
use client_otp::infrastructure::persistence::{
    PostgresClientDirectory, PostgresOtpRecordRepository, run_migrations,
};
use secrecy::ExposeSecret;
use taller_adapter_email::EmailClient;
use taller_adapter_postgres::{PostgresConfig, create_pool};
use taller_bootstrap::{OpsState, shutdown_token};
use taller_config::AppConfig;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
    let config = AppConfig::load(&config_dir)?;

    taller_telemetry::init(&config.telemetry.log_level, config.telemetry.json);
    let metrics = taller_telemetry::init_metrics()?;

    info!(app = %config.app_name, env = %config.app_env, "Starting service");

    // 数据库
    let pg_config = PostgresConfig::new(config.database.url.expose_secret().clone())
        .with_max_connections(config.database.max_connections)
        .with_connect_attempts(config.database.connect_attempts);
    let pool = create_pool(&pg_config).await?;

    let applied = run_migrations(&pool).await?;
    info!(applied = applied, "Database migrations applied");

    // 投递通道
    let delivery: Arc<dyn OtpDelivery> = match &config.email {
        Some(email) => {
            info!(smtp_host = %email.smtp_host, "Using email OTP delivery");
            Arc::new(EmailOtpDelivery::new(Arc::new(EmailClient::new(email)?))?)
        }
        None => {
            info!("Email not configured, OTP delivery is log-only");
            Arc::new(LoggingOtpDelivery)
        }
    };

    // 领域服务
    let policy = OtpPolicy::from_config(&config.otp)?;
    let records: Arc<dyn OtpRecordRepository> =
        Arc::new(PostgresOtpRecordRepository::new(pool.clone()));
    let directory: Arc<dyn ClientDirectory> = Arc::new(PostgresClientDirectory::new(pool.clone()));
    let service = Arc::new(OtpService::new(records, delivery, policy));

    let shutdown = shutdown_token();

    let cleanup = if config.otp.cleanup_interval_secs > 0 {
        let task = Arc::new(CleanupTask::new(
            service.clone(),
            Duration::from_secs(config.otp.cleanup_interval_secs),
        ));
        Some(task.start(shutdown.clone()))
    } else {
        None
    };

    // HTTP
    let state = AppState {
        generate: Arc::new(GenerateOtpHandler::new(directory.clone(), service.clone())),
        validate: Arc::new(ValidateOtpHandler::new(directory, service)),
    };
    let ops = OpsState::new().with_postgres(pool).with_metrics(metrics);
    let app = build_app(state, ops, &config.server);

    let addr = config.server_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "HTTP server listening");

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
        .await?;

    shutdown.cancel();
    if let Some(handle) = cleanup {
        handle.await?;
    }

    info!("Service stopped");
    Ok(())
}
