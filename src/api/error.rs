//! 错误到 HTTP 响应的映射
//!
//! 所有错误响应体均为 `{"detail": "<message>"}`。

use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::errors::IpInfoError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

impl ErrorDetail {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

pub fn status_for(err: &IpInfoError) -> StatusCode {
    match err {
        IpInfoError::InvalidAddress(_) | IpInfoError::BulkLimitExceeded(_) => {
            StatusCode::BAD_REQUEST
        }
        IpInfoError::FieldNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// 内部错误统一加上 "Error processing IP: " 前缀
pub fn error_response(err: &IpInfoError) -> HttpResponse {
    let status = status_for(err);
    let detail = if status == StatusCode::INTERNAL_SERVER_ERROR {
        format!("Error processing IP: {}", err.message())
    } else {
        err.message().to_string()
    };

    HttpResponse::build(status).json(ErrorDetail::new(detail))
}
