//! 验证码有效期策略

use chrono::{DateTime, Duration, Utc};
use taller_config::{ConfigError, OtpConfig};

pub use taller_config::OtpPrecedence;

/// 限流统计窗口
const RATE_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Clone)]
pub struct OtpPolicy {
    pub ttl: Duration,
    pub code_length: usize,
    pub precedence: OtpPrecedence,
    /// 0 表示不限制
    pub max_per_day: u32,
    /// 单条验证码的错误次数上限，0 表示不限制
    pub max_failed_attempts: u32,
    pub retention: Duration,
}

impl Default for OtpPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::minutes(10),
            code_length: 6,
            precedence: OtpPrecedence::LatestOnly,
            max_per_day: 10,
            max_failed_attempts: 5,
            retention: Duration::hours(24),
        }
    }
}

impl OtpPolicy {
    pub fn from_config(config: &OtpConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            ttl: Duration::minutes(config.ttl_minutes),
            code_length: config.code_length,
            precedence: config.precedence,
            max_per_day: config.max_per_day,
            max_failed_attempts: config.max_failed_attempts,
            retention: Duration::hours(config.retention_hours),
        })
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_precedence(mut self, precedence: OtpPrecedence) -> Self {
        self.precedence = precedence;
        self
    }

    pub fn with_max_per_day(mut self, max_per_day: u32) -> Self {
        self.max_per_day = max_per_day;
        self
    }

    pub fn with_max_failed_attempts(mut self, max_failed_attempts: u32) -> Self {
        self.max_failed_attempts = max_failed_attempts;
        self
    }

    pub fn ttl_minutes(&self) -> i64 {
        self.ttl.num_minutes()
    }

    /// 早于该时间签发的记录可以清理
    pub fn stale_before(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.ttl - self.retention
    }

    /// 限流窗口起点
    pub fn rate_window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::hours(RATE_WINDOW_HOURS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_defaults() {
        let policy = OtpPolicy::from_config(&OtpConfig::default()).unwrap();
        assert_eq!(policy.ttl, Duration::minutes(10));
        assert_eq!(policy.code_length, 6);
        assert_eq!(policy.precedence, OtpPrecedence::LatestOnly);
        assert_eq!(policy.max_per_day, 10);
        assert_eq!(policy.max_failed_attempts, 5);
    }

    #[test]
    fn test_from_config_rejects_out_of_range_ttl() {
        let config = OtpConfig {
            ttl_minutes: 0,
            ..OtpConfig::default()
        };
        assert!(OtpPolicy::from_config(&config).is_err());
    }

    #[test]
    fn test_stale_before() {
        let now = Utc::now();
        let policy = OtpPolicy::default();
        assert_eq!(
            policy.stale_before(now),
            now - Duration::minutes(10) - Duration::hours(24)
        );
    }
}
