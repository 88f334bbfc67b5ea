//! OTP 命令处理器

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::{CommandHandler, GenerateOtpCommand, OtpResult, ValidateOtpCommand};
use crate::domain::client::Cedula;
use crate::domain::repositories::ClientDirectory;
use crate::domain::services::OtpService;
use crate::error::OtpError;

/// 签发验证码处理器
pub struct GenerateOtpHandler {
    directory: Arc<dyn ClientDirectory>,
    service: Arc<OtpService>,
}

impl GenerateOtpHandler {
    pub fn new(directory: Arc<dyn ClientDirectory>, service: Arc<OtpService>) -> Self {
        Self { directory, service }
    }
}

#[async_trait]
impl CommandHandler<GenerateOtpCommand> for GenerateOtpHandler {
    async fn handle(&self, command: GenerateOtpCommand) -> Result<OtpResult, OtpError> {
        let cedula = Cedula::parse(&command.client_identifier)?;
        info!(cedula = %cedula.as_str(), "Handling GenerateOtpCommand");

        let contact = self
            .directory
            .find_by_cedula(&cedula)
            .await?
            .ok_or(OtpError::ClientNotFound)?;

        let issued = self.service.generate(&contact).await?;
        Ok(OtpResult::issued(issued.expires_in_seconds))
    }
}

/// 校验验证码处理器
///
/// 证件号格式错误和客户不存在都按验证码无效返回。
pub struct ValidateOtpHandler {
    directory: Arc<dyn ClientDirectory>,
    service: Arc<OtpService>,
}

impl ValidateOtpHandler {
    pub fn new(directory: Arc<dyn ClientDirectory>, service: Arc<OtpService>) -> Self {
        Self { directory, service }
    }
}

#[async_trait]
impl CommandHandler<ValidateOtpCommand> for ValidateOtpHandler {
    async fn handle(&self, command: ValidateOtpCommand) -> Result<OtpResult, OtpError> {
        let cedula = Cedula::parse(&command.client_identifier).map_err(|e| {
            debug!(error = %e, "Rejecting malformed identifier on validate");
            OtpError::InvalidOrExpiredCode
        })?;

        let Some(contact) = self.directory.find_by_cedula(&cedula).await? else {
            debug!(cedula = %cedula.as_str(), "Unknown client on validate");
            return Err(OtpError::InvalidOrExpiredCode);
        };

        self.service
            .validate(&contact.id, command.code.trim())
            .await?;
        Ok(OtpResult::validated())
    }
}
