use serde::{Deserialize, Serialize};
use std::fmt;

/// 终态支付/退款事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// 支付成功
    PaymentSuccess,
    /// 支付失败
    PaymentFailed,
    /// 支付处理中
    PaymentProcessing,
    /// 退款成功
    RefundSuccess,
    /// 退款失败
    RefundFailed,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::PaymentSuccess => "payment_success",
            EventKind::PaymentFailed => "payment_failed",
            EventKind::PaymentProcessing => "payment_processing",
            EventKind::RefundSuccess => "refund_success",
            EventKind::RefundFailed => "refund_failed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
