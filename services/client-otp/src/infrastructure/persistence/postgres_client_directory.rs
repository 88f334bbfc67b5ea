//! PostgreSQL 客户目录（只读）

use async_trait::async_trait;
use sqlx::PgPool;
use taller_common::ClientId;
use taller_errors::{AppError, AppResult};
use tracing::warn;
use uuid::Uuid;

use crate::domain::client::{Cedula, ClientContact};
use crate::domain::repositories::ClientDirectory;

pub struct PostgresClientDirectory {
    pool: PgPool,
}

impl PostgresClientDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ClientRow {
    id: Uuid,
    cedula: String,
    name: String,
    email: String,
}

#[async_trait]
impl ClientDirectory for PostgresClientDirectory {
    async fn find_by_cedula(&self, cedula: &Cedula) -> AppResult<Option<ClientContact>> {
        let row = sqlx::query_as::<_, ClientRow>(
            "SELECT id, cedula, name, email FROM clients WHERE cedula = $1",
        )
        .bind(cedula.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to find client: {}", e)))?;

        let Some(row) = row else {
            return Ok(None);
        };

        // 存量数据可能不满足证件号格式，按未找到处理
        match Cedula::parse(&row.cedula) {
            Ok(cedula) => Ok(Some(ClientContact {
                id: ClientId::from_uuid(row.id),
                cedula,
                name: row.name,
                email: row.email,
            })),
            Err(e) => {
                warn!(client_id = %row.id, error = %e, "Stored cedula is malformed");
                Ok(None)
            }
        }
    }
}
