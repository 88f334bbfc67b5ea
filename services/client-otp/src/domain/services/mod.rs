//! 领域服务

mod otp_delivery;
mod otp_service;

pub use otp_delivery::OtpDelivery;
#[cfg(test)]
pub use otp_delivery::MockOtpDelivery;
pub use otp_service::{IssuedOtp, OtpService};
