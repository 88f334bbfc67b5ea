//! 邮件投递

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use taller_adapter_email::{EmailSender, EmailTemplate, is_valid_address};
use taller_errors::{AppError, AppResult};
use tracing::debug;

use crate::domain::client::ClientContact;
use crate::domain::otp_record::OtpCode;
use crate::domain::services::OtpDelivery;

const TEMPLATE_NAME: &str = "otp_code";
const SUBJECT: &str = "Código de verificación";

pub struct EmailOtpDelivery {
    sender: Arc<dyn EmailSender>,
    templates: EmailTemplate,
}

impl EmailOtpDelivery {
    /// 使用内置模板
    pub fn new(sender: Arc<dyn EmailSender>) -> AppResult<Self> {
        let templates = EmailTemplate::from_strings([
            (
                "otp_code.html",
                include_str!("../../../templates/otp_code.html"),
            ),
            ("otp_code.txt", include_str!("../../../templates/otp_code.txt")),
        ])?;

        Ok(Self::with_templates(sender, templates))
    }

    pub fn with_templates(sender: Arc<dyn EmailSender>, templates: EmailTemplate) -> Self {
        Self { sender, templates }
    }
}

#[async_trait]
impl OtpDelivery for EmailOtpDelivery {
    async fn deliver(
        &self,
        contact: &ClientContact,
        code: &OtpCode,
        expires_in_minutes: i64,
    ) -> AppResult<()> {
        if !is_valid_address(&contact.email) {
            return Err(AppError::validation(format!(
                "Client {} has no valid email address",
                contact.id
            )));
        }

        let context = json!({
            "name": contact.name,
            "code": code.as_str(),
            "expires_in_minutes": expires_in_minutes,
        });
        let (html, text) = self.templates.render_pair(TEMPLATE_NAME, &context)?;

        self.sender
            .send_html_email(&contact.email, SUBJECT, &html, &text)
            .await?;

        debug!(client_id = %contact.id, "OTP email sent");
        Ok(())
    }
}
