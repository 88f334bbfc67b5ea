//! HTTP 处理器

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{debug, error, warn};

use super::dto::{GenerateOtpRequest, OtpResponse, ValidateOtpRequest};
use super::routes::AppState;
use crate::application::CommandHandler;
use crate::error::OtpError;

const INVALID_REQUEST: &str = "Solicitud inválida";

impl IntoResponse for OtpError {
    fn into_response(self) -> Response {
        match &self {
            Self::Unavailable(e) => error!(error = %e, "OTP request failed on infrastructure"),
            Self::DeliveryFailed(reason) => warn!(reason = %reason, "OTP delivery failed"),
            other => debug!(error = %other, "OTP request rejected"),
        }

        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(OtpResponse::from(&self))).into_response()
    }
}

fn bad_request(rejection: JsonRejection) -> Response {
    debug!(error = %rejection, "Rejected OTP request body");
    (
        StatusCode::BAD_REQUEST,
        Json(OtpResponse::failure(INVALID_REQUEST)),
    )
        .into_response()
}

/// POST /api/otp/generate
pub async fn generate_otp(
    State(state): State<AppState>,
    payload: Result<Json<GenerateOtpRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_request(rejection),
    };

    match state.generate.handle(request.into()).await {
        Ok(result) => (StatusCode::OK, Json(OtpResponse::from(result))).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /api/otp/validate
///
/// 所有失败原因返回相同的响应体。
pub async fn validate_otp(
    State(state): State<AppState>,
    payload: Result<Json<ValidateOtpRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_request(rejection),
    };

    match state.validate.handle(request.into()).await {
        Ok(result) => (StatusCode::OK, Json(OtpResponse::from(result))).into_response(),
        Err(e) => e.into_response(),
    }
}
