use crate::api::response::{error_response, ApiResponse};
use crate::application::{
    BalanceLedgerService, BalanceResponse, CreateOrderRequest, OrderAdmissionService,
    RefundRequest,
};
use crate::domain::errors::DomainError;
use crate::domain::value_objects::ProviderCode;
use crate::infrastructure::config::AppConfig;
use crate::ports::{BalanceRepositoryPort, OrderRepositoryPort};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

/// 应用状态
pub struct AppState<R: OrderRepositoryPort, B: BalanceRepositoryPort> {
    pub admission_service: Arc<OrderAdmissionService<R, B>>,
    pub ledger_service: Arc<BalanceLedgerService<B>>,
    pub config: Arc<AppConfig>,
}

impl<R: OrderRepositoryPort, B: BalanceRepositoryPort> Clone for AppState<R, B> {
    fn clone(&self) -> Self {
        Self {
            admission_service: self.admission_service.clone(),
            ledger_service: self.ledger_service.clone(),
            config: self.config.clone(),
        }
    }
}

type ApiError = (StatusCode, Json<ApiResponse<Value>>);

/// 创建订单
pub async fn create_order<R: OrderRepositoryPort, B: BalanceRepositoryPort>(
    State(state): State<AppState<R, B>>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!(
        "received order creation request: {} / {}",
        request.merchant_id, request.merchant_order_no
    );

    state
        .admission_service
        .create_order(request)
        .await
        .map(|response| (StatusCode::OK, Json(ApiResponse::ok(response))))
        .map_err(|e| {
            error!("order creation error: {}", e);
            error_response(e)
        })
}

/// 查询订单（未终态时触发网关对账）
pub async fn query_order<R: OrderRepositoryPort, B: BalanceRepositoryPort>(
    State(state): State<AppState<R, B>>,
    Path(platform_order_no): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .admission_service
        .query_order(&platform_order_no)
        .await
        .map(|response| (StatusCode::OK, Json(ApiResponse::ok(response))))
        .map_err(|e| {
            error!("order query error: {}", e);
            error_response(e)
        })
}

/// 服务商回调入口
///
/// 验签与来源IP白名单由上游公共API层完成，进入此处的报文
/// 只做形状归一化与状态流转。应答体为服务商约定的 "success"。
pub async fn provider_callback<R: OrderRepositoryPort, B: BalanceRepositoryPort>(
    State(state): State<AppState<R, B>>,
    Path(provider): Path<String>,
    Json(raw): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    info!("received callback from provider: {}", provider);

    let code = ProviderCode::parse(&provider).ok_or_else(|| {
        error_response(DomainError::ServiceNotFound(provider.clone()))
    })?;

    state
        .admission_service
        .handle_callback(code, raw)
        .await
        .map(|_| (StatusCode::OK, "success"))
        .map_err(|e| {
            error!("callback handling error: {}", e);
            error_response(e)
        })
}

/// 退款（管理端）
pub async fn refund_order<R: OrderRepositoryPort, B: BalanceRepositoryPort>(
    State(state): State<AppState<R, B>>,
    Path(platform_order_no): Path<String>,
    Json(request): Json<RefundRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let operator = request.operator.as_deref().unwrap_or("admin");

    state
        .admission_service
        .refund_order(&platform_order_no, operator)
        .await
        .map(|response| (StatusCode::OK, Json(ApiResponse::ok(response))))
        .map_err(|e| {
            error!("refund error: {}", e);
            error_response(e)
        })
}

/// 关闭订单（管理端）
pub async fn close_order<R: OrderRepositoryPort, B: BalanceRepositoryPort>(
    State(state): State<AppState<R, B>>,
    Path(platform_order_no): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .admission_service
        .close_order(&platform_order_no)
        .await
        .map(|response| (StatusCode::OK, Json(ApiResponse::ok(response))))
        .map_err(|e| {
            error!("close error: {}", e);
            error_response(e)
        })
}

/// 过期订单补单（管理端）
pub async fn reissue_order<R: OrderRepositoryPort, B: BalanceRepositoryPort>(
    State(state): State<AppState<R, B>>,
    Path(platform_order_no): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .admission_service
        .reissue(&platform_order_no)
        .await
        .map(|response| (StatusCode::OK, Json(ApiResponse::ok(response))))
        .map_err(|e| {
            error!("reissue error: {}", e);
            error_response(e)
        })
}

#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    /// 请求时间戳（秒），±300秒新鲜度窗口
    pub timestamp: i64,
}

/// 余额查询
pub async fn query_balance<R: OrderRepositoryPort, B: BalanceRepositoryPort>(
    State(state): State<AppState<R, B>>,
    Path(account_id): Path<String>,
    Query(query): Query<BalanceQuery>,
) -> Result<impl IntoResponse, ApiError> {
    // 时间戳新鲜度校验，防重放
    let skew = (chrono::Utc::now().timestamp() - query.timestamp).abs();
    if skew > state.config.query_freshness_secs {
        return Err(error_response(DomainError::ValidationError(format!(
            "timestamp outside freshness window ({}s)",
            state.config.query_freshness_secs
        ))));
    }

    state
        .ledger_service
        .balance_of(&account_id)
        .await
        .map(|balance_cents| {
            (
                StatusCode::OK,
                Json(ApiResponse::ok(BalanceResponse::new(account_id, balance_cents))),
            )
        })
        .map_err(|e| {
            error!("balance query error: {}", e);
            error_response(e)
        })
}

/// 健康检查
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}
