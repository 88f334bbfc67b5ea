//! PostgreSQL 迁移管理模块
//!
//! 服务把迁移 SQL 编译进二进制，启动时按版本号顺序应用未执行的迁移。

use std::collections::HashSet;

use sqlx::PgPool;
use taller_errors::{AppError, AppResult};
use tracing::{debug, info};

/// 迁移定义
#[derive(Debug, Clone)]
pub struct Migration {
    /// 版本号
    pub version: i64,
    /// 名称
    pub name: &'static str,
    /// 升级 SQL
    pub up_sql: &'static str,
}

impl Migration {
    pub const fn new(version: i64, name: &'static str, up_sql: &'static str) -> Self {
        Self {
            version,
            name,
            up_sql,
        }
    }
}

/// 记录已应用迁移的表
const MIGRATIONS_TABLE: &str = "_migrations";

/// 迁移管理器
pub struct MigrationManager {
    pool: PgPool,
}

impl MigrationManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 初始化迁移表
    async fn init(&self) -> AppResult<()> {
        let create_sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                version BIGINT PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            MIGRATIONS_TABLE
        );

        sqlx::query(&create_sql)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to create migration table: {}", e)))?;

        Ok(())
    }

    /// 已应用的版本号
    pub async fn applied_versions(&self) -> AppResult<HashSet<i64>> {
        self.init().await?;

        let sql = format!("SELECT version FROM {}", MIGRATIONS_TABLE);
        let rows: Vec<(i64,)> = sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to get migrations: {}", e)))?;

        Ok(rows.into_iter().map(|(v,)| v).collect())
    }

    /// 应用所有未执行的迁移，返回本次应用的数量
    pub async fn run(&self, migrations: &[Migration]) -> AppResult<usize> {
        let applied = self.applied_versions().await?;

        let mut pending: Vec<&Migration> = migrations
            .iter()
            .filter(|m| !applied.contains(&m.version))
            .collect();
        pending.sort_by_key(|m| m.version);

        for migration in &pending {
            self.apply(migration).await?;
        }

        if pending.is_empty() {
            debug!("Database schema is up to date");
        }
        Ok(pending.len())
    }

    /// 在单个事务中执行迁移并记录版本
    async fn apply(&self, migration: &Migration) -> AppResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {}", e)))?;

        sqlx::raw_sql(migration.up_sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::database(format!(
                    "Failed to apply migration {}: {}",
                    migration.version, e
                ))
            })?;

        let insert_sql = format!(
            "INSERT INTO {} (version, name) VALUES ($1, $2)",
            MIGRATIONS_TABLE
        );
        sqlx::query(&insert_sql)
            .bind(migration.version)
            .bind(migration.name)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to record migration: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit migration: {}", e)))?;

        info!(version = migration.version, name = migration.name, "Migration applied");
        Ok(())
    }
}
