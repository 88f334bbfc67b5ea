//! OTP 命令

use serde::{Deserialize, Serialize};

use super::Command;

/// 为客户签发验证码
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateOtpCommand {
    /// 客户证件号
    pub client_identifier: String,
}

impl Command for GenerateOtpCommand {
    type Result = OtpResult;
}

/// 校验客户提交的验证码
#[derive(Clone, Serialize, Deserialize)]
pub struct ValidateOtpCommand {
    pub client_identifier: String,
    pub code: String,
}

impl std::fmt::Debug for ValidateOtpCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidateOtpCommand")
            .field("client_identifier", &self.client_identifier)
            .field("code", &"<redacted>")
            .finish()
    }
}

impl Command for ValidateOtpCommand {
    type Result = OtpResult;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpResult {
    pub success: bool,
    pub message: String,
    /// 仅签发成功时返回
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in_seconds: Option<i64>,
}

impl OtpResult {
    pub fn issued(expires_in_seconds: i64) -> Self {
        Self {
            success: true,
            message: "Código de verificación enviado".to_string(),
            expires_in_seconds: Some(expires_in_seconds),
        }
    }

    pub fn validated() -> Self {
        Self {
            success: true,
            message: "Código verificado correctamente".to_string(),
            expires_in_seconds: None,
        }
    }
}
