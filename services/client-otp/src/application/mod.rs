//! 应用层

mod commands;
mod handlers;

pub use commands::{GenerateOtpCommand, OtpResult, ValidateOtpCommand};
pub use handlers::{GenerateOtpHandler, ValidateOtpHandler};

use async_trait::async_trait;

use crate::error::OtpError;

pub trait Command: Send + Sync {
    type Result: Send;
}

#[async_trait]
pub trait CommandHandler<C: Command>: Send + Sync {
    async fn handle(&self, command: C) -> Result<C::Result, OtpError>;
}
