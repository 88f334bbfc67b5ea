//! 数据库迁移

use sqlx::PgPool;
use taller_adapter_postgres::{Migration, MigrationManager};
use taller_errors::AppResult;

pub const MIGRATIONS: &[Migration] = &[
    Migration::new(
        1,
        "create_clients",
        include_str!("../../../migrations/0001_create_clients.sql"),
    ),
    Migration::new(
        2,
        "create_otp_validaciones",
        include_str!("../../../migrations/0002_create_otp_validaciones.sql"),
    ),
    Migration::new(
        3,
        "add_otp_failed_attempts",
        include_str!("../../../migrations/0003_add_otp_failed_attempts.sql"),
    ),
];

pub async fn run_migrations(pool: &PgPool) -> AppResult<usize> {
    MigrationManager::new(pool.clone()).run(MIGRATIONS).await
}
