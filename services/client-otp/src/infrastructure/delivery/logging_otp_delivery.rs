//! 开发环境投递：只记录日志

use async_trait::async_trait;
use taller_errors::AppResult;
use tracing::info;

use crate::domain::client::ClientContact;
use crate::domain::otp_record::OtpCode;
use crate::domain::services::OtpDelivery;

/// 不发送任何消息，日志中不出现验证码
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingOtpDelivery;

#[async_trait]
impl OtpDelivery for LoggingOtpDelivery {
    async fn deliver(
        &self,
        contact: &ClientContact,
        _code: &OtpCode,
        expires_in_minutes: i64,
    ) -> AppResult<()> {
        info!(
            client_id = %contact.id,
            expires_in_minutes = expires_in_minutes,
            "OTP issued, email delivery not configured"
        );
        Ok(())
    }
}
