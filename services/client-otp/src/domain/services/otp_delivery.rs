//! 验证码投递通道

use async_trait::async_trait;
use taller_errors::AppResult;

use crate::domain::client::ClientContact;
use crate::domain::otp_record::OtpCode;

/// 把验证码送达客户
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OtpDelivery: Send + Sync {
    async fn deliver(
        &self,
        contact: &ClientContact,
        code: &OtpCode,
        expires_in_minutes: i64,
    ) -> AppResult<()>;
}
