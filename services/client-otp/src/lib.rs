//! client-otp - 客户一次性验证码服务
//!
//! 为维修店客户签发短时有效的数字验证码，并在客户提交时一次性校验。

pub mod api;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use error::OtpError;
