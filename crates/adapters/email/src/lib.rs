//! Email 适配器
//!
//! 提供邮件发送功能，支持：
//! - SMTP 邮件发送
//! - 模板渲染（HTML + 纯文本）

mod client;
mod template;

pub use client::{EmailClient, EmailMessage};
pub use taller_config::EmailConfig;
pub use template::EmailTemplate;

use taller_errors::AppResult;

/// 邮件发送接口
#[async_trait::async_trait]
pub trait EmailSender: Send + Sync {
    /// 发送 HTML 邮件，附带纯文本备用正文
    async fn send_html_email(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
        text_body: &str,
    ) -> AppResult<()>;
}

/// 校验收件地址格式
pub fn is_valid_address(address: &str) -> bool {
    email_address::EmailAddress::is_valid(address)
}
