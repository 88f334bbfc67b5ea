//! 验证码投递实现

mod email_otp_delivery;
mod logging_otp_delivery;

pub use email_otp_delivery::EmailOtpDelivery;
pub use logging_otp_delivery::LoggingOtpDelivery;
