use crate::domain::value_objects::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// 归一化支付状态（各服务商原生状态由适配器翻译）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// 成功
    Success,
    /// 失败
    Failed,
    /// 处理中
    Processing,
    /// 未知
    Unknown,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Success => write!(f, "success"),
            PaymentStatus::Failed => write!(f, "failed"),
            PaymentStatus::Processing => write!(f, "processing"),
            PaymentStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// 服务商无关的支付结果信封
///
/// `data` 为适配器归一化后的字段；`raw` 保留服务商原始响应用于审计与
/// 状态判定兜底，任何组件不得修改。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResult {
    /// 归一化状态
    pub status: PaymentStatus,

    /// 平台订单号
    pub order_no: String,

    /// 服务商交易号
    pub provider_txn_id: Option<String>,

    /// 金额
    pub amount: Option<Money>,

    /// 货币代码
    pub currency: String,

    /// 归一化数据
    pub data: Map<String, Value>,

    /// 服务商原始响应（只读保留）
    pub raw: Value,

    /// 结果产生时间
    pub occurred_at: DateTime<Utc>,
}

impl PaymentResult {
    pub fn new(status: PaymentStatus, order_no: impl Into<String>) -> Self {
        Self {
            status,
            order_no: order_no.into(),
            provider_txn_id: None,
            amount: None,
            currency: "CNY".to_string(),
            data: Map::new(),
            raw: Value::Null,
            occurred_at: Utc::now(),
        }
    }

    pub fn success(order_no: impl Into<String>) -> Self {
        Self::new(PaymentStatus::Success, order_no)
    }

    pub fn processing(order_no: impl Into<String>) -> Self {
        Self::new(PaymentStatus::Processing, order_no)
    }

    pub fn failed(order_no: impl Into<String>) -> Self {
        Self::new(PaymentStatus::Failed, order_no)
    }

    /// 网关网络/协议失败收敛为失败信封，原始错误入 raw 供审计
    pub fn failed_from_error(order_no: impl Into<String>, error: &str) -> Self {
        let mut result = Self::new(PaymentStatus::Failed, order_no);
        result.raw = serde_json::json!({ "error": error });
        result
    }

    pub fn with_txn_id(mut self, txn_id: impl Into<String>) -> Self {
        self.provider_txn_id = Some(txn_id.into());
        self
    }

    pub fn with_amount(mut self, amount: Money) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_raw(mut self, raw: Value) -> Self {
        self.raw = raw;
        self
    }

    pub fn insert_data(&mut self, key: impl Into<String>, value: Value) {
        self.data.insert(key.into(), value);
    }

    /// 按键名取归一化字段，未命中时回落原始响应
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.data.get(key).or_else(|| self.raw.get(key))
    }
}
