use crate::domain::errors::DomainError;
use axum::http::StatusCode;
use axum::response::Json;
use serde::Serialize;
use serde_json::{json, Value};

/// 统一响应信封
///
/// 失败时 data 固定为空对象，永远不是 null，调用方无需判空。
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub code: u16,
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: 200,
            success: true,
            message: "ok".to_string(),
            data,
        }
    }
}

impl ApiResponse<Value> {
    pub fn err(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code: status.as_u16(),
            success: false,
            message: message.into(),
            data: json!({}),
        }
    }
}

/// 领域错误映射为HTTP状态码与响应信封
pub fn error_response(error: DomainError) -> (StatusCode, Json<ApiResponse<Value>>) {
    let status = match &error {
        DomainError::ValidationError(_) | DomainError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
        DomainError::ServiceNotFound(_) => StatusCode::BAD_REQUEST,
        DomainError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        DomainError::InvalidState { .. }
        | DomainError::DuplicateOrder(_)
        | DomainError::InsufficientBalance { .. } => StatusCode::CONFLICT,
        // 可整体重试的瞬时失败
        DomainError::LockTimeout(_) | DomainError::OrderNumberExhausted(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        DomainError::GatewayFailure(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (status, Json(ApiResponse::err(status, error.to_string())))
}
