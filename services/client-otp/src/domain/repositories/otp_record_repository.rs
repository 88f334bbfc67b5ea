//! OTP 记录仓储接口

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use taller_common::ClientId;
use taller_errors::AppResult;

use crate::domain::otp_record::{OtpRecord, OtpRecordId};

/// OTP 记录仓储接口
#[async_trait]
pub trait OtpRecordRepository: Send + Sync {
    /// 保存新签发的记录
    async fn insert(&self, record: &OtpRecord) -> AppResult<()>;

    /// 原子地检查签发上限并保存
    ///
    /// 客户自 `since` 起已有 `max` 条记录时不保存，返回 `false`。
    async fn insert_within_cap(
        &self,
        record: &OtpRecord,
        since: DateTime<Utc>,
        max: u32,
    ) -> AppResult<bool>;

    /// 客户最近签发的一条记录（按 `issued_at` 倒序）
    async fn find_latest_by_client(&self, client_id: &ClientId) -> AppResult<Option<OtpRecord>>;

    /// 客户未使用且验证码匹配的记录，最近的优先
    async fn find_unconsumed_by_code(
        &self,
        client_id: &ClientId,
        code: &str,
    ) -> AppResult<Option<OtpRecord>>;

    /// 条件更新：仅当 `valid = false` 且错误次数低于上限时置为已使用
    ///
    /// `max_failed_attempts` 为 0 表示不限制。返回 `false` 表示条件不满足。
    async fn mark_consumed(
        &self,
        id: &OtpRecordId,
        consumed_at: DateTime<Utc>,
        max_failed_attempts: u32,
    ) -> AppResult<bool>;

    /// 未使用的记录错误次数加一
    async fn record_failed_attempt(&self, id: &OtpRecordId) -> AppResult<()>;

    /// 删除 `before` 之前签发的记录
    async fn delete_stale(&self, before: DateTime<Utc>) -> AppResult<u64>;
}
