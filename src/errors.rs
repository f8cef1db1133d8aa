use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde_json::{json, Value};
use thiserror::Error;

use crate::domain::errors::DomainError;

/// Failures reported to HTTP callers.
///
/// Both kinds travel as a `status: "error"` body with HTTP 200; clients
/// only look at the body.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("서버 오류가 발생했습니다: {0}")]
    Internal(String),
}

impl AppError {
    pub fn envelope(&self) -> Value {
        json!({
            "status": "error",
            "message": self.to_string(),
        })
    }
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::InvalidInput(msg) => AppError::BadRequest(msg),
            other => {
                log::error!("request failed: {}", other);
                AppError::Internal(other.to_string())
            }
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        StatusCode::OK
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::Ok().json(self.envelope())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::ResponseError;

    #[test]
    fn errors_are_reported_with_http_200() {
        let resp = AppError::BadRequest("bad".to_string()).error_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let resp = AppError::Internal("boom".to_string()).error_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[test]
    fn envelope_carries_the_message() {
        let body = AppError::BadRequest("지원하지 않는 요청입니다.".to_string()).envelope();
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "지원하지 않는 요청입니다.");
    }

    #[test]
    fn invalid_input_keeps_its_message_verbatim() {
        let app_err: AppError = DomainError::invalid("연락처 을(를) 입력해주세요.").into();
        assert!(matches!(app_err, AppError::BadRequest(_)));
        assert_eq!(app_err.to_string(), "연락처 을(를) 입력해주세요.");
    }

    #[test]
    fn storage_faults_map_to_internal() {
        let app_err: AppError = DomainError::Storage("connection refused".to_string()).into();
        assert!(matches!(app_err, AppError::Internal(_)));
        assert_eq!(
            app_err.to_string(),
            "서버 오류가 발생했습니다: Storage error: connection refused"
        );
    }
}
