//! OTP 验证记录实体

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::rngs::OsRng;
use taller_common::ClientId;
use uuid::Uuid;

/// OTP 记录 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OtpRecordId(pub Uuid);

impl OtpRecordId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for OtpRecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OtpRecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 一次性验证码
///
/// Debug 输出不包含验证码本身。
#[derive(Clone, PartialEq, Eq)]
pub struct OtpCode(String);

impl OtpCode {
    /// 用操作系统 CSPRNG 生成定长数字验证码（前导零保留）
    pub fn generate(length: usize) -> Self {
        let upper = 10u64.pow(length as u32);
        let value = OsRng.gen_range(0..upper);
        Self(format!("{:0width$}", value, width = length))
    }

    /// 从存储中还原
    pub fn from_stored(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 常量时间比较
    pub fn matches(&self, submitted: &str) -> bool {
        let expected = self.0.as_bytes();
        let submitted = submitted.as_bytes();
        if expected.len() != submitted.len() {
            return false;
        }
        expected
            .iter()
            .zip(submitted)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl std::fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OtpCode({})", "*".repeat(self.0.len()))
    }
}

/// 记录的逻辑状态，`Expired` 不落库，只在校验时按签发时间推导
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpState {
    Issued,
    Consumed,
    Expired,
}

/// OTP 验证记录
#[derive(Debug, Clone)]
pub struct OtpRecord {
    pub id: OtpRecordId,
    /// 所属客户
    pub client_id: ClientId,
    pub code: OtpCode,
    pub issued_at: DateTime<Utc>,
    /// 仅在校验成功时写入
    pub consumed_at: Option<DateTime<Utc>>,
    /// 校验成功后为 true，与 `consumed_at` 同时写入
    pub valid: bool,
    /// 错误验证码的提交次数
    pub failed_attempts: u32,
}

impl OtpRecord {
    /// 签发新记录
    pub fn issue(client_id: ClientId, code: OtpCode, now: DateTime<Utc>) -> Self {
        Self {
            id: OtpRecordId::new(),
            client_id,
            code,
            issued_at: now,
            consumed_at: None,
            valid: false,
            failed_attempts: 0,
        }
    }

    pub fn is_consumed(&self) -> bool {
        self.valid
    }

    pub fn expires_at(&self, ttl: Duration) -> DateTime<Utc> {
        self.issued_at + ttl
    }

    pub fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now >= self.expires_at(ttl)
    }

    pub fn state(&self, ttl: Duration, now: DateTime<Utc>) -> OtpState {
        if self.is_consumed() {
            OtpState::Consumed
        } else if self.is_expired(ttl, now) {
            OtpState::Expired
        } else {
            OtpState::Issued
        }
    }

    /// 剩余有效时间（秒）
    pub fn remaining_seconds(&self, ttl: Duration, now: DateTime<Utc>) -> i64 {
        (self.expires_at(ttl) - now).num_seconds().max(0)
    }

    /// 错误次数已达上限，0 表示不限制
    pub fn is_locked(&self, max_failed_attempts: u32) -> bool {
        max_failed_attempts > 0 && self.failed_attempts >= max_failed_attempts
    }

    /// 反映存储层条件更新成功后的状态
    pub(crate) fn consume(&mut self, at: DateTime<Utc>) {
        self.valid = true;
        self.consumed_at = Some(at);
    }
}
