use crate::domain::OrderRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 创建订单请求（验签由上游公共API层完成后进入本服务）
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    /// 商户标识
    pub merchant_id: String,

    /// 商户订单号（6-64位，字母数字下划线）
    pub merchant_order_no: String,

    /// 金额（两位小数字符串，内部转分）
    pub amount: String,

    /// 服务商编码
    pub provider: String,

    /// 商户异步通知地址
    pub notify_url: String,

    /// 同步跳转地址
    pub return_url: Option<String>,

    /// 下单终端IP
    pub client_ip: String,

    /// 商户透传数据
    pub extra: Option<Value>,
}

/// 创建订单响应
#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    /// 平台订单号
    pub platform_order_no: String,

    /// 商户订单号
    pub merchant_order_no: String,

    /// 金额（两位小数）
    pub amount: String,

    /// 服务商编码
    pub provider: String,

    /// 订单状态
    pub status: String,

    /// 网关支付凭据（二维码/跳转地址），失败时为空对象
    pub pay_payload: Value,

    /// 是否幂等命中（返回的是首次提交的结果）
    pub duplicate: bool,
}

impl CreateOrderResponse {
    pub fn from_order(order: &OrderRecord, duplicate: bool) -> Self {
        Self {
            platform_order_no: order.platform_order_no.clone(),
            merchant_order_no: order.merchant_order_no.clone(),
            amount: order.amount.to_decimal_string(),
            provider: order.provider.to_string(),
            status: order.status.to_string(),
            pay_payload: order
                .pay_payload
                .clone()
                .unwrap_or_else(|| Value::Object(serde_json::Map::new())),
            duplicate,
        }
    }
}

/// 退款请求（管理端）
#[derive(Debug, Deserialize)]
pub struct RefundRequest {
    /// 操作者标识
    pub operator: Option<String>,
}

/// 订单查询响应
#[derive(Debug, Serialize)]
pub struct OrderQueryResponse {
    pub platform_order_no: String,
    pub merchant_order_no: String,
    pub amount: String,
    pub provider: String,
    pub status: String,
    pub provider_txn_id: Option<String>,
    pub notify_status: String,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl OrderQueryResponse {
    pub fn from_order(order: &OrderRecord) -> Self {
        Self {
            platform_order_no: order.platform_order_no.clone(),
            merchant_order_no: order.merchant_order_no.clone(),
            amount: order.amount.to_decimal_string(),
            provider: order.provider.to_string(),
            status: order.status.to_string(),
            provider_txn_id: order.provider_txn_id.clone(),
            notify_status: order.notify_status.to_string(),
            created_at: order.created_at,
            paid_at: order.paid_at,
        }
    }
}

/// 余额查询响应
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub account_id: String,

    /// 余额（两位小数）
    pub balance: String,

    /// 余额（分）
    pub balance_cents: i64,
}

impl BalanceResponse {
    pub fn new(account_id: String, balance_cents: i64) -> Self {
        Self {
            account_id,
            balance: format!("{}.{:02}", balance_cents / 100, (balance_cents % 100).abs()),
            balance_cents,
        }
    }
}
