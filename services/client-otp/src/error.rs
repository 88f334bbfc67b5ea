//! OTP 错误类型

use taller_errors::AppError;
use thiserror::Error;

use crate::domain::CedulaError;

#[derive(Debug, Error)]
pub enum OtpError {
    #[error("malformed client identifier: {0}")]
    MalformedIdentifier(#[from] CedulaError),

    #[error("client not found")]
    ClientNotFound,

    /// 验证码错误、已使用、已过期或并发校验失败，对外不作区分
    #[error("invalid or expired code")]
    InvalidOrExpiredCode,

    /// 记录已创建但未能送达
    #[error("delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("too many codes issued")]
    RateLimited,

    #[error("service unavailable: {0}")]
    Unavailable(#[from] AppError),
}

impl OtpError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MalformedIdentifier(_) | Self::ClientNotFound | Self::InvalidOrExpiredCode => {
                400
            }
            Self::RateLimited => 429,
            Self::DeliveryFailed(_) => 502,
            Self::Unavailable(_) => 503,
        }
    }

    /// 返回给调用方的文案，不含内部原因
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::MalformedIdentifier(_) => "El identificador del cliente no es válido",
            Self::ClientNotFound => "Cliente no encontrado",
            Self::InvalidOrExpiredCode => "Código inválido o expirado",
            Self::DeliveryFailed(_) => "No se pudo enviar el código de verificación",
            Self::RateLimited => "Se alcanzó el límite de códigos por hoy, intente mañana",
            Self::Unavailable(_) => "Servicio no disponible, intente más tarde",
        }
    }
}
