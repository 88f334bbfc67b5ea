//! 内存仓储实现，用于测试与本地运行

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use taller_common::ClientId;
use taller_errors::AppResult;
use tokio::sync::RwLock;

use crate::domain::client::{Cedula, ClientContact};
use crate::domain::otp_record::{OtpRecord, OtpRecordId};
use crate::domain::repositories::{ClientDirectory, OtpRecordRepository};

/// 内存 OTP 记录仓储
///
/// 条件更新与限流检查都在写锁内完成，与数据库实现的语义一致。
#[derive(Default)]
pub struct InMemoryOtpRecordRepository {
    records: RwLock<Vec<OtpRecord>>,
}

impl InMemoryOtpRecordRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl OtpRecordRepository for InMemoryOtpRecordRepository {
    async fn insert(&self, record: &OtpRecord) -> AppResult<()> {
        self.records.write().await.push(record.clone());
        Ok(())
    }

    async fn insert_within_cap(
        &self,
        record: &OtpRecord,
        since: DateTime<Utc>,
        max: u32,
    ) -> AppResult<bool> {
        let mut records = self.records.write().await;
        let issued = records
            .iter()
            .filter(|r| r.client_id == record.client_id && r.issued_at >= since)
            .count();

        if issued >= max as usize {
            return Ok(false);
        }
        records.push(record.clone());
        Ok(true)
    }

    async fn find_latest_by_client(&self, client_id: &ClientId) -> AppResult<Option<OtpRecord>> {
        let records = self.records.read().await;
        // 签发时间相同时取后插入的一条
        Ok(records
            .iter()
            .filter(|r| r.client_id == *client_id)
            .max_by_key(|r| r.issued_at)
            .cloned())
    }

    async fn find_unconsumed_by_code(
        &self,
        client_id: &ClientId,
        code: &str,
    ) -> AppResult<Option<OtpRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| r.client_id == *client_id && !r.valid && r.code.matches(code))
            .max_by_key(|r| r.issued_at)
            .cloned())
    }

    async fn mark_consumed(
        &self,
        id: &OtpRecordId,
        consumed_at: DateTime<Utc>,
        max_failed_attempts: u32,
    ) -> AppResult<bool> {
        let mut records = self.records.write().await;
        let candidate = records
            .iter_mut()
            .find(|r| r.id == *id && !r.valid && !r.is_locked(max_failed_attempts));

        match candidate {
            Some(record) => {
                record.consume(consumed_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn record_failed_attempt(&self, id: &OtpRecordId) -> AppResult<()> {
        let mut records = self.records.write().await;
        if let Some(record) = records.iter_mut().find(|r| r.id == *id && !r.valid) {
            record.failed_attempts += 1;
        }
        Ok(())
    }

    async fn delete_stale(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let mut records = self.records.write().await;
        let original = records.len();
        records.retain(|r| r.issued_at >= before);
        Ok((original - records.len()) as u64)
    }
}

/// 内存客户目录
#[derive(Default)]
pub struct InMemoryClientDirectory {
    clients: RwLock<HashMap<Cedula, ClientContact>>,
}

impl InMemoryClientDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, contact: ClientContact) {
        self.clients
            .write()
            .await
            .insert(contact.cedula.clone(), contact);
    }
}

#[async_trait]
impl ClientDirectory for InMemoryClientDirectory {
    async fn find_by_cedula(&self, cedula: &Cedula) -> AppResult<Option<ClientContact>> {
        Ok(self.clients.read().await.get(cedula).cloned())
    }
}
