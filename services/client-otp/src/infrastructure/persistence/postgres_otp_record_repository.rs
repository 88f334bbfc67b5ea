//! PostgreSQL OTP 记录仓储实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use taller_common::ClientId;
use taller_errors::{AppError, AppResult};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::otp_record::{OtpCode, OtpRecord, OtpRecordId};
use crate::domain::repositories::OtpRecordRepository;

pub struct PostgresOtpRecordRepository {
    pool: PgPool,
}

impl PostgresOtpRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct OtpRecordRow {
    id: Uuid,
    client_id: Uuid,
    code: String,
    issued_at: DateTime<Utc>,
    consumed_at: Option<DateTime<Utc>>,
    valid: bool,
    failed_attempts: i32,
}

impl From<OtpRecordRow> for OtpRecord {
    fn from(row: OtpRecordRow) -> Self {
        Self {
            id: OtpRecordId::from_uuid(row.id),
            client_id: ClientId::from_uuid(row.client_id),
            code: OtpCode::from_stored(row.code),
            issued_at: row.issued_at,
            consumed_at: row.consumed_at,
            valid: row.valid,
            failed_attempts: row.failed_attempts.max(0) as u32,
        }
    }
}

async fn insert_row<'e>(executor: impl PgExecutor<'e>, record: &OtpRecord) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO otp_validaciones
            (id, client_id, code, issued_at, consumed_at, valid, failed_attempts)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(record.id.0)
    .bind(record.client_id.0)
    .bind(record.code.as_str())
    .bind(record.issued_at)
    .bind(record.consumed_at)
    .bind(record.valid)
    .bind(record.failed_attempts as i32)
    .execute(executor)
    .await
    .map_err(|e| {
        warn!(error = %e, "Failed to save OTP record");
        AppError::database(format!("Failed to save OTP record: {}", e))
    })?;

    Ok(())
}

#[async_trait]
impl OtpRecordRepository for PostgresOtpRecordRepository {
    async fn insert(&self, record: &OtpRecord) -> AppResult<()> {
        debug!(record_id = %record.id, client_id = %record.client_id, "Saving OTP record");
        insert_row(&self.pool, record).await
    }

    /// 同一客户的签发通过事务级 advisory lock 串行化
    async fn insert_within_cap(
        &self,
        record: &OtpRecord,
        since: DateTime<Utc>,
        max: u32,
    ) -> AppResult<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {}", e)))?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
            .bind(record.client_id.0)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to lock client: {}", e)))?;

        let issued: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM otp_validaciones WHERE client_id = $1 AND issued_at >= $2",
        )
        .bind(record.client_id.0)
        .bind(since)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to count OTP records: {}", e)))?;

        if issued >= i64::from(max) {
            debug!(client_id = %record.client_id, issued, "Daily OTP cap reached");
            return Ok(false);
        }

        insert_row(&mut *tx, record).await?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit OTP record: {}", e)))?;

        Ok(true)
    }

    async fn find_latest_by_client(&self, client_id: &ClientId) -> AppResult<Option<OtpRecord>> {
        let row = sqlx::query_as::<_, OtpRecordRow>(
            r#"
            SELECT id, client_id, code, issued_at, consumed_at, valid, failed_attempts
            FROM otp_validaciones
            WHERE client_id = $1
            ORDER BY issued_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(client_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to find latest OTP record: {}", e)))?;

        Ok(row.map(Into::into))
    }

    async fn find_unconsumed_by_code(
        &self,
        client_id: &ClientId,
        code: &str,
    ) -> AppResult<Option<OtpRecord>> {
        let row = sqlx::query_as::<_, OtpRecordRow>(
            r#"
            SELECT id, client_id, code, issued_at, consumed_at, valid, failed_attempts
            FROM otp_validaciones
            WHERE client_id = $1 AND code = $2 AND valid = FALSE
            ORDER BY issued_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(client_id.0)
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to find OTP record: {}", e)))?;

        Ok(row.map(Into::into))
    }

    async fn mark_consumed(
        &self,
        id: &OtpRecordId,
        consumed_at: DateTime<Utc>,
        max_failed_attempts: u32,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE otp_validaciones
            SET valid = TRUE, consumed_at = $2
            WHERE id = $1 AND valid = FALSE AND ($3 = 0 OR failed_attempts < $3)
            "#,
        )
        .bind(id.0)
        .bind(consumed_at)
        .bind(max_failed_attempts as i32)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to consume OTP record: {}", e)))?;

        Ok(result.rows_affected() == 1)
    }

    async fn record_failed_attempt(&self, id: &OtpRecordId) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE otp_validaciones
            SET failed_attempts = failed_attempts + 1
            WHERE id = $1 AND valid = FALSE
            "#,
        )
        .bind(id.0)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to record OTP attempt: {}", e)))?;

        Ok(())
    }

    async fn delete_stale(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM otp_validaciones WHERE issued_at < $1")
            .bind(before)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::database(format!("Failed to delete stale OTP records: {}", e))
            })?;

        Ok(result.rows_affected())
    }
}
