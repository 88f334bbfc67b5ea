//! 请求与响应

use serde::{Deserialize, Serialize};

use crate::application::{GenerateOtpCommand, OtpResult, ValidateOtpCommand};
use crate::error::OtpError;

#[derive(Debug, Deserialize)]
pub struct GenerateOtpRequest {
    #[serde(alias = "cedula", alias = "clientIdentifier")]
    pub client_identifier: String,
}

impl From<GenerateOtpRequest> for GenerateOtpCommand {
    fn from(request: GenerateOtpRequest) -> Self {
        Self {
            client_identifier: request.client_identifier,
        }
    }
}

#[derive(Deserialize)]
pub struct ValidateOtpRequest {
    #[serde(alias = "cedula", alias = "clientIdentifier")]
    pub client_identifier: String,
    #[serde(alias = "codigo")]
    pub code: String,
}

impl From<ValidateOtpRequest> for ValidateOtpCommand {
    fn from(request: ValidateOtpRequest) -> Self {
        Self {
            client_identifier: request.client_identifier,
            code: request.code,
        }
    }
}

/// 所有 OTP 接口的响应体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in_seconds: Option<i64>,
}

impl OtpResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            expires_in_seconds: None,
        }
    }
}

impl From<OtpResult> for OtpResponse {
    fn from(result: OtpResult) -> Self {
        Self {
            success: result.success,
            message: result.message,
            expires_in_seconds: result.expires_in_seconds,
        }
    }
}

impl From<&OtpError> for OtpResponse {
    fn from(err: &OtpError) -> Self {
        Self::failure(err.public_message())
    }
}
