//! OTP 签发与校验服务

use std::sync::Arc;

use chrono::{DateTime, Utc};
use taller_common::ClientId;
use taller_errors::AppResult;
use tracing::{debug, info, warn};

use crate::domain::client::ClientContact;
use crate::domain::clock::{Clock, SystemClock};
use crate::domain::otp_policy::{OtpPolicy, OtpPrecedence};
use crate::domain::otp_record::{OtpCode, OtpRecord};
use crate::domain::repositories::OtpRecordRepository;
use crate::domain::services::OtpDelivery;
use crate::error::OtpError;

/// 已签发的验证码
#[derive(Debug, Clone)]
pub struct IssuedOtp {
    pub record: OtpRecord,
    pub expires_at: DateTime<Utc>,
    pub expires_in_seconds: i64,
}

/// OTP 服务
pub struct OtpService {
    repo: Arc<dyn OtpRecordRepository>,
    delivery: Arc<dyn OtpDelivery>,
    policy: OtpPolicy,
    clock: Arc<dyn Clock>,
}

impl OtpService {
    pub fn new(
        repo: Arc<dyn OtpRecordRepository>,
        delivery: Arc<dyn OtpDelivery>,
        policy: OtpPolicy,
    ) -> Self {
        Self {
            repo,
            delivery,
            policy,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn policy(&self) -> &OtpPolicy {
        &self.policy
    }

    /// 为客户签发验证码并投递
    ///
    /// 投递失败时记录保留，返回 `DeliveryFailed`。
    pub async fn generate(&self, contact: &ClientContact) -> Result<IssuedOtp, OtpError> {
        let now = self.clock.now();
        debug!(client_id = %contact.id, "Generating OTP");

        // 1. 创建记录，开启上限时计数与写入在存储层原子完成
        let code = OtpCode::generate(self.policy.code_length);
        let record = OtpRecord::issue(contact.id, code, now);

        if self.policy.max_per_day > 0 {
            let since = self.policy.rate_window_start(now);
            let inserted = self
                .repo
                .insert_within_cap(&record, since, self.policy.max_per_day)
                .await?;

            if !inserted {
                warn!(
                    client_id = %contact.id,
                    max_per_day = self.policy.max_per_day,
                    "Too many OTPs issued today"
                );
                metrics::counter!("otp_rate_limited_total").increment(1);
                return Err(OtpError::RateLimited);
            }
        } else {
            self.repo.insert(&record).await?;
        }
        metrics::counter!("otp_generated_total").increment(1);

        // 2. 投递
        if let Err(e) = self
            .delivery
            .deliver(contact, &record.code, self.policy.ttl_minutes())
            .await
        {
            warn!(
                client_id = %contact.id,
                record_id = %record.id,
                error = %e,
                "OTP created but delivery failed"
            );
            metrics::counter!("otp_delivery_failed_total").increment(1);
            return Err(OtpError::DeliveryFailed(e.to_string()));
        }

        let expires_at = record.expires_at(self.policy.ttl);
        info!(
            client_id = %contact.id,
            record_id = %record.id,
            expires_at = %expires_at,
            "OTP issued"
        );

        Ok(IssuedOtp {
            expires_in_seconds: record.remaining_seconds(self.policy.ttl, now),
            expires_at,
            record,
        })
    }

    /// 校验客户提交的验证码，成功时记录被标记为已使用
    pub async fn validate(
        &self,
        client_id: &ClientId,
        submitted: &str,
    ) -> Result<OtpRecord, OtpError> {
        let now = self.clock.now();
        debug!(client_id = %client_id, "Validating OTP");

        let result = self.try_consume(client_id, submitted, now).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(OtpError::InvalidOrExpiredCode) => "rejected",
            Err(_) => "error",
        };
        metrics::counter!("otp_validated_total", "outcome" => outcome).increment(1);

        result
    }

    async fn try_consume(
        &self,
        client_id: &ClientId,
        submitted: &str,
        now: DateTime<Utc>,
    ) -> Result<OtpRecord, OtpError> {
        let max_failed = self.policy.max_failed_attempts;
        let latest = self.repo.find_latest_by_client(client_id).await?;

        // 1. 最新记录错误次数达到上限后，该客户的所有验证码都不可用
        if let Some(latest) = latest.as_ref().filter(|r| r.is_locked(max_failed)) {
            debug!(client_id = %client_id, record_id = %latest.id, "OTP locked");
            return Err(OtpError::InvalidOrExpiredCode);
        }

        // 2. 按优先级查找候选记录
        let candidate = match self.policy.precedence {
            OtpPrecedence::LatestOnly => latest
                .clone()
                .filter(|record| !record.is_consumed() && record.code.matches(submitted)),
            OtpPrecedence::AnyUnconsumed => {
                self.repo
                    .find_unconsumed_by_code(client_id, submitted)
                    .await?
            }
        };

        let Some(mut record) = candidate else {
            debug!(client_id = %client_id, "No matching unconsumed OTP");
            // 错误次数记在仍然有效的最新记录上
            if let Some(latest) = latest
                .as_ref()
                .filter(|r| !r.is_consumed() && !r.is_expired(self.policy.ttl, now))
            {
                self.repo.record_failed_attempt(&latest.id).await?;
            }
            return Err(OtpError::InvalidOrExpiredCode);
        };

        // 3. 过期与锁定检查
        if record.is_expired(self.policy.ttl, now) || record.is_locked(max_failed) {
            debug!(client_id = %client_id, record_id = %record.id, "OTP expired or locked");
            return Err(OtpError::InvalidOrExpiredCode);
        }

        // 4. 条件更新，失败说明已被并发请求消费或已锁定
        if !self.repo.mark_consumed(&record.id, now, max_failed).await? {
            debug!(client_id = %client_id, record_id = %record.id, "OTP already consumed");
            return Err(OtpError::InvalidOrExpiredCode);
        }

        record.consume(now);
        info!(client_id = %client_id, record_id = %record.id, "OTP validated");
        Ok(record)
    }

    /// 删除过期且超过保留期的记录
    pub async fn cleanup_stale(&self) -> AppResult<u64> {
        let before = self.policy.stale_before(self.clock.now());
        let deleted = self.repo.delete_stale(before).await?;

        if deleted > 0 {
            info!(deleted = deleted, before = %before, "Stale OTP records cleaned up");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::ManualClock;
    use crate::domain::client::Cedula;
    use crate::domain::services::MockOtpDelivery;
    use crate::infrastructure::persistence::InMemoryOtpRecordRepository;
    use chrono::Duration;
    use std::sync::Mutex;
    use taller_errors::AppError;

    fn contact() -> ClientContact {
        ClientContact {
            id: ClientId::new(),
            cedula: Cedula::parse("C-001").unwrap(),
            name: "Ana Torres".to_string(),
            email: "ana@example.com".to_string(),
        }
    }

    /// 记录投递的验证码，便于测试读取
    fn capturing_delivery(captured: Arc<Mutex<Vec<String>>>) -> MockOtpDelivery {
        let mut delivery = MockOtpDelivery::new();
        delivery.expect_deliver().returning(move |_, code, _| {
            captured.lock().unwrap().push(code.as_str().to_string());
            Ok(())
        });
        delivery
    }

    fn service(
        policy: OtpPolicy,
        delivery: MockOtpDelivery,
    ) -> (OtpService, Arc<InMemoryOtpRecordRepository>, Arc<ManualClock>) {
        let repo = Arc::new(InMemoryOtpRecordRepository::new());
        let clock = Arc::new(ManualClock::default());
        let service = OtpService::new(repo.clone(), Arc::new(delivery), policy)
            .with_clock(clock.clone());
        (service, repo, clock)
    }

    #[tokio::test]
    async fn test_generate_then_validate_once() {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let delivery = capturing_delivery(captured.clone());
        let (service, _, _) = service(OtpPolicy::default(), delivery);
        let contact = contact();

        let issued = service.generate(&contact).await.unwrap();
        assert_eq!(issued.expires_in_seconds, 600);
        assert!(!issued.record.valid);

        let code = captured.lock().unwrap()[0].clone();
        assert_eq!(code, issued.record.code.as_str());

        let record = service.validate(&contact.id, &code).await.unwrap();
        assert!(record.valid);
        assert!(record.consumed_at.is_some());

        assert!(matches!(
            service.validate(&contact.id, &code).await,
            Err(OtpError::InvalidOrExpiredCode)
        ));
    }

    #[tokio::test]
    async fn test_delivery_receives_ttl_minutes() {
        let mut delivery = MockOtpDelivery::new();
        delivery
            .expect_deliver()
            .withf(|_, code, minutes| code.as_str().len() == 6 && *minutes == 15)
            .times(1)
            .returning(|_, _, _| Ok(()));

        let policy = OtpPolicy::default().with_ttl(Duration::minutes(15));
        let (service, _, _) = service(policy, delivery);

        service.generate(&contact()).await.unwrap();
    }

    #[tokio::test]
    async fn test_delivery_failure_keeps_record() {
        let mut delivery = MockOtpDelivery::new();
        delivery
            .expect_deliver()
            .returning(|_, _, _| Err(AppError::external_service("smtp down")));

        let (service, repo, _) = service(OtpPolicy::default(), delivery);
        let contact = contact();

        let err = service.generate(&contact).await.unwrap_err();
        assert!(matches!(err, OtpError::DeliveryFailed(_)));

        let stored = repo.find_latest_by_client(&contact.id).await.unwrap();
        assert!(stored.is_some());
    }

    #[tokio::test]
    async fn test_expired_code_rejected() {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let policy = OtpPolicy::default().with_ttl(Duration::minutes(15));
        let (service, _, clock) = service(policy, capturing_delivery(captured.clone()));
        let contact = contact();

        service.generate(&contact).await.unwrap();
        let code = captured.lock().unwrap()[0].clone();

        clock.advance(Duration::minutes(20));
        assert!(matches!(
            service.validate(&contact.id, &code).await,
            Err(OtpError::InvalidOrExpiredCode)
        ));
    }

    #[tokio::test]
    async fn test_expiry_boundary_is_exclusive() {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let delivery = capturing_delivery(captured.clone());
        let (service, _, clock) = service(OtpPolicy::default(), delivery);
        let contact = contact();

        service.generate(&contact).await.unwrap();
        let code = captured.lock().unwrap()[0].clone();

        clock.advance(Duration::minutes(10));
        assert!(service.validate(&contact.id, &code).await.is_err());
    }

    #[tokio::test]
    async fn test_latest_only_retires_older_codes() {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let delivery = capturing_delivery(captured.clone());
        let (service, _, clock) = service(OtpPolicy::default(), delivery);
        let contact = contact();

        service.generate(&contact).await.unwrap();
        clock.advance(Duration::seconds(30));
        service.generate(&contact).await.unwrap();

        let (first, second) = {
            let codes = captured.lock().unwrap();
            (codes[0].clone(), codes[1].clone())
        };

        if first != second {
            assert!(service.validate(&contact.id, &first).await.is_err());
        }
        assert!(service.validate(&contact.id, &second).await.is_ok());
    }

    #[tokio::test]
    async fn test_any_unconsumed_accepts_older_codes() {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let policy = OtpPolicy::default().with_precedence(OtpPrecedence::AnyUnconsumed);
        let (service, _, clock) = service(policy, capturing_delivery(captured.clone()));
        let contact = contact();

        service.generate(&contact).await.unwrap();
        clock.advance(Duration::seconds(30));
        service.generate(&contact).await.unwrap();

        let (first, second) = {
            let codes = captured.lock().unwrap();
            (codes[0].clone(), codes[1].clone())
        };

        assert!(service.validate(&contact.id, &first).await.is_ok());
        assert!(service.validate(&contact.id, &second).await.is_ok() || first == second);
    }

    #[tokio::test]
    async fn test_rate_limit() {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let policy = OtpPolicy::default().with_max_per_day(2);
        let (service, _, clock) = service(policy, capturing_delivery(captured));
        let contact = contact();

        service.generate(&contact).await.unwrap();
        service.generate(&contact).await.unwrap();
        assert!(matches!(
            service.generate(&contact).await,
            Err(OtpError::RateLimited)
        ));

        clock.advance(Duration::hours(25));
        assert!(service.generate(&contact).await.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_generate_respects_daily_cap() {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let policy = OtpPolicy::default().with_max_per_day(1);
        let (service, repo, _) = service(policy, capturing_delivery(captured));
        let service = Arc::new(service);
        let contact = contact();

        let attempts = (0..32).map(|_| {
            let service = service.clone();
            let contact = contact.clone();
            tokio::spawn(async move { service.generate(&contact).await })
        });
        let results = futures::future::join_all(attempts).await;

        let issued = results
            .into_iter()
            .filter(|r| matches!(r, Ok(Ok(_))))
            .count();
        assert_eq!(issued, 1);
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_failed_attempts_lock_code() {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let policy = OtpPolicy::default().with_max_failed_attempts(3);
        let (service, repo, _) = service(policy, capturing_delivery(captured.clone()));
        let contact = contact();

        let issued = service.generate(&contact).await.unwrap();
        let code = captured.lock().unwrap()[0].clone();
        let wrong = if code == "000000" { "111111" } else { "000000" };

        for _ in 0..3 {
            assert!(service.validate(&contact.id, wrong).await.is_err());
        }

        let stored = repo.find_latest_by_client(&contact.id).await.unwrap().unwrap();
        assert_eq!(stored.id, issued.record.id);
        assert_eq!(stored.failed_attempts, 3);

        assert!(matches!(
            service.validate(&contact.id, &code).await,
            Err(OtpError::InvalidOrExpiredCode)
        ));
    }

    #[tokio::test]
    async fn test_failed_attempts_below_cap_still_validate() {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let policy = OtpPolicy::default().with_max_failed_attempts(3);
        let (service, _, _) = service(policy, capturing_delivery(captured.clone()));
        let contact = contact();

        service.generate(&contact).await.unwrap();
        let code = captured.lock().unwrap()[0].clone();
        let wrong = if code == "000000" { "111111" } else { "000000" };

        assert!(service.validate(&contact.id, wrong).await.is_err());
        assert!(service.validate(&contact.id, wrong).await.is_err());
        assert!(service.validate(&contact.id, &code).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_client_has_no_code() {
        let (service, _, _) = service(OtpPolicy::default(), MockOtpDelivery::new());
        assert!(matches!(
            service.validate(&ClientId::new(), "123456").await,
            Err(OtpError::InvalidOrExpiredCode)
        ));
    }

    #[tokio::test]
    async fn test_cleanup_stale() {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let delivery = capturing_delivery(captured);
        let (service, repo, clock) = service(OtpPolicy::default(), delivery);
        let contact = contact();

        service.generate(&contact).await.unwrap();
        assert_eq!(service.cleanup_stale().await.unwrap(), 0);

        clock.advance(Duration::hours(25));
        assert_eq!(service.cleanup_stale().await.unwrap(), 1);
        assert!(repo.find_latest_by_client(&contact.id).await.unwrap().is_none());
    }
}
