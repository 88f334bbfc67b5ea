//! 定期清理过期的 OTP 记录

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::domain::services::OtpService;

pub struct CleanupTask {
    service: Arc<OtpService>,
    interval: Duration,
}

impl CleanupTask {
    pub fn new(service: Arc<OtpService>, interval: Duration) -> Self {
        Self { service, interval }
    }

    pub fn start(self: Arc<Self>, shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval_secs = self.interval.as_secs(), "Cleanup task started");
            let mut ticker = interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.run_once().await;
                    }
                    _ = shutdown.cancelled() => {
                        info!("Cleanup task received shutdown signal");
                        break;
                    }
                }
            }
            info!("Cleanup task stopped");
        })
    }

    /// 执行一次清理，失败只记录日志
    pub async fn run_once(&self) -> u64 {
        match self.service.cleanup_stale().await {
            Ok(deleted) => deleted,
            Err(e) => {
                error!(error = %e, "Failed to clean up stale OTP records");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OtpPolicy;
    use crate::infrastructure::delivery::LoggingOtpDelivery;
    use crate::infrastructure::persistence::InMemoryOtpRecordRepository;

    #[tokio::test]
    async fn test_stops_on_shutdown() {
        let service = Arc::new(OtpService::new(
            Arc::new(InMemoryOtpRecordRepository::new()),
            Arc::new(LoggingOtpDelivery),
            OtpPolicy::default(),
        ));
        let task = Arc::new(CleanupTask::new(service, Duration::from_secs(3600)));
        let shutdown = CancellationToken::new();

        let handle = task.clone().start(shutdown.clone());
        shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(task.run_once().await, 0);
    }
}
