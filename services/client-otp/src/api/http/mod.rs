//! HTTP 接口

mod dto;
mod handlers;
mod routes;

pub use dto::{GenerateOtpRequest, OtpResponse, ValidateOtpRequest};
pub use routes::{AppState, build_app, router};
