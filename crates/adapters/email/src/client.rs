//! 邮件客户端实现

use std::time::Duration;

use lettre::message::{Mailbox, MultiPart, SinglePart, header};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::ExposeSecret;
use taller_errors::{AppError, AppResult};
use tracing::{debug, info};

use crate::{EmailConfig, EmailSender};

/// 邮件消息
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

/// SMTP 邮件客户端
pub struct EmailClient {
    from: Mailbox,
    transport: SmtpTransport,
}

impl EmailClient {
    /// 创建新的邮件客户端
    pub fn new(config: &EmailConfig) -> AppResult<Self> {
        let from = format!("{} <{}>", config.from_name, config.from_email)
            .parse()
            .map_err(|e| AppError::internal(format!("Invalid from address: {}", e)))?;

        let credentials = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().clone(),
        );

        let transport = if config.use_tls {
            SmtpTransport::starttls_relay(&config.smtp_host)
        } else {
            SmtpTransport::relay(&config.smtp_host)
        }
        .map_err(|e| AppError::internal(format!("Failed to create SMTP transport: {}", e)))?
        .port(config.smtp_port)
        .credentials(credentials)
        .timeout(Some(Duration::from_secs(config.timeout_secs)))
        .build();

        Ok(Self { from, transport })
    }

    /// 构建邮件消息
    fn build_message(&self, msg: &EmailMessage) -> AppResult<Message> {
        let to: Mailbox = msg
            .to
            .parse()
            .map_err(|e| AppError::validation(format!("Invalid to address: {}", e)))?;

        let body = MultiPart::alternative()
            .singlepart(
                SinglePart::builder()
                    .header(header::ContentType::TEXT_PLAIN)
                    .body(msg.text_body.clone()),
            )
            .singlepart(
                SinglePart::builder()
                    .header(header::ContentType::TEXT_HTML)
                    .body(msg.html_body.clone()),
            );

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&msg.subject)
            .multipart(body)
            .map_err(|e| AppError::internal(format!("Failed to build message: {}", e)))
    }

    /// 发送邮件
    ///
    /// lettre 的同步传输放到 blocking 线程池执行。
    async fn send_message(&self, message: Message) -> AppResult<()> {
        let transport = self.transport.clone();

        tokio::task::spawn_blocking(move || {
            transport
                .send(&message)
                .map_err(|e| AppError::external_service(format!("Failed to send email: {}", e)))
        })
        .await
        .map_err(|e| AppError::internal(format!("Task join error: {}", e)))??;

        Ok(())
    }
}

#[async_trait::async_trait]
impl EmailSender for EmailClient {
    async fn send_html_email(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
        text_body: &str,
    ) -> AppResult<()> {
        debug!(to = %to, subject = %subject, "Sending HTML email");

        let message = self.build_message(&EmailMessage {
            to: to.to_string(),
            subject: subject.to_string(),
            html_body: html_body.to_string(),
            text_body: text_body.to_string(),
        })?;
        self.send_message(message).await?;

        info!(to = %to, subject = %subject, "HTML email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> EmailConfig {
        EmailConfig {
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: 587,
            username: "taller@example.com".to_string(),
            password: secrecy::Secret::new("password".to_string()),
            from_email: "noreply@example.com".to_string(),
            from_name: "Taller".to_string(),
            use_tls: true,
            timeout_secs: 30,
        }
    }

    #[test]
    fn test_build_message() {
        let client = EmailClient::new(&test_config()).unwrap();

        let msg = EmailMessage {
            to: "cliente@example.com".to_string(),
            subject: "Código de verificación".to_string(),
            html_body: "<p>123456</p>".to_string(),
            text_body: "123456".to_string(),
        };

        assert!(client.build_message(&msg).is_ok());
    }

    #[test]
    fn test_build_message_rejects_bad_recipient() {
        let client = EmailClient::new(&test_config()).unwrap();

        let msg = EmailMessage {
            to: "not an address".to_string(),
            subject: "x".to_string(),
            html_body: "<p>x</p>".to_string(),
            text_body: "x".to_string(),
        };

        assert!(matches!(
            client.build_message(&msg),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_invalid_from_address() {
        let mut config = test_config();
        config.from_email = "broken".to_string();
        assert!(EmailClient::new(&config).is_err());
    }
}
