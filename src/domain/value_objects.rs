use crate::domain::errors::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 订单状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// 待支付
    Pending,
    /// 支付中（已拉起网关）
    Paying,
    /// 支付成功
    Success,
    /// 支付失败
    Failed,
    /// 已退款
    Refunded,
    /// 已关闭
    Closed,
    /// 已过期
    Expired,
}

impl OrderStatus {
    /// 是否终态（过期订单可由管理端重新拉起，但对账不再主动查询）
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Success
                | OrderStatus::Failed
                | OrderStatus::Refunded
                | OrderStatus::Closed
                | OrderStatus::Expired
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Paying => write!(f, "paying"),
            OrderStatus::Success => write!(f, "success"),
            OrderStatus::Failed => write!(f, "failed"),
            OrderStatus::Refunded => write!(f, "refunded"),
            OrderStatus::Closed => write!(f, "closed"),
            OrderStatus::Expired => write!(f, "expired"),
        }
    }
}

/// 支付服务商编码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderCode {
    /// 易付（扫码）
    Epay,
    /// 万付（跳转收银台）
    Wanpay,
    /// 杉付（H5）
    Sandpay,
}

impl ProviderCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderCode::Epay => "epay",
            ProviderCode::Wanpay => "wanpay",
            ProviderCode::Sandpay => "sandpay",
        }
    }

    /// 解析服务商编码，未知编码由调用方映射为 ServiceNotFound
    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "epay" => Some(ProviderCode::Epay),
            "wanpay" => Some(ProviderCode::Wanpay),
            "sandpay" => Some(ProviderCode::Sandpay),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 商户回调通知状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyStatus {
    /// 未通知
    Pending,
    /// 已送达
    Sent,
    /// 通知失败
    Failed,
}

impl fmt::Display for NotifyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyStatus::Pending => write!(f, "pending"),
            NotifyStatus::Sent => write!(f, "sent"),
            NotifyStatus::Failed => write!(f, "failed"),
        }
    }
}

/// 账务操作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    /// 入账
    Credit,
    /// 出账
    Debit,
    /// 结算入账（网关回调触发）
    Settlement,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Credit => "credit",
            OperationType::Debit => "debit",
            OperationType::Settlement => "settlement",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 货币金额（分为单位，避免浮点数精度问题）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money {
    /// 金额（分）
    pub amount_cents: i64,
}

impl Money {
    /// 创建新的金额对象（单位：元）
    pub fn from_yuan(amount: i64) -> Self {
        Self {
            amount_cents: amount * 100,
        }
    }

    /// 创建新的金额对象（单位：分）
    pub fn from_cents(cents: i64) -> Self {
        Self { amount_cents: cents }
    }

    /// 解析外部接口传入的两位小数金额字符串（如 "100.00"）
    pub fn from_decimal_str(input: &str) -> DomainResult<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(DomainError::ValidationError(
                "amount must not be empty".to_string(),
            ));
        }

        let (int_part, frac_part) = match trimmed.split_once('.') {
            Some((i, f)) => (i, f),
            None => (trimmed, ""),
        };

        if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::ValidationError(format!(
                "invalid amount: {}",
                input
            )));
        }
        if frac_part.len() > 2 || !frac_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::ValidationError(format!(
                "amount must have at most 2 decimal places: {}",
                input
            )));
        }

        let yuan: i64 = int_part
            .parse()
            .map_err(|_| DomainError::ValidationError(format!("amount out of range: {}", input)))?;

        let cents_frac: i64 = if frac_part.is_empty() {
            0
        } else {
            // "5" 代表 50 分
            let parsed: i64 = frac_part
                .parse()
                .map_err(|_| DomainError::ValidationError(format!("invalid amount: {}", input)))?;
            if frac_part.len() == 1 { parsed * 10 } else { parsed }
        };

        yuan.checked_mul(100)
            .and_then(|c| c.checked_add(cents_frac))
            .map(Money::from_cents)
            .ok_or_else(|| DomainError::ValidationError(format!("amount out of range: {}", input)))
    }

    /// 转换为元
    pub fn to_yuan(&self) -> f64 {
        self.amount_cents as f64 / 100.0
    }

    /// 转换为分
    pub fn to_cents(&self) -> i64 {
        self.amount_cents
    }

    /// 格式化为两位小数字符串（对外接口使用）
    pub fn to_decimal_string(&self) -> String {
        format!("{}.{:02}", self.amount_cents / 100, self.amount_cents % 100)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "¥{:.2}", self.to_yuan())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_from_yuan() {
        let money = Money::from_yuan(10);
        assert_eq!(money.to_cents(), 1000);
        assert_eq!(money.to_yuan(), 10.0);
    }

    #[test]
    fn test_money_from_decimal_str() {
        assert_eq!(Money::from_decimal_str("100.00").unwrap().to_cents(), 10000);
        assert_eq!(Money::from_decimal_str("0.01").unwrap().to_cents(), 1);
        assert_eq!(Money::from_decimal_str("7.5").unwrap().to_cents(), 750);
        assert_eq!(Money::from_decimal_str("42").unwrap().to_cents(), 4200);
    }

    #[test]
    fn test_money_from_decimal_str_rejects_garbage() {
        assert!(Money::from_decimal_str("").is_err());
        assert!(Money::from_decimal_str("abc").is_err());
        assert!(Money::from_decimal_str("1.234").is_err());
        assert!(Money::from_decimal_str("-5.00").is_err());
        assert!(Money::from_decimal_str("1.2x").is_err());
    }

    #[test]
    fn test_money_decimal_round_trip() {
        let money = Money::from_decimal_str("100.00").unwrap();
        assert_eq!(money.to_decimal_string(), "100.00");
    }

    #[test]
    fn test_provider_code_parse() {
        assert_eq!(ProviderCode::parse("epay"), Some(ProviderCode::Epay));
        assert_eq!(ProviderCode::parse("wanpay"), Some(ProviderCode::Wanpay));
        assert_eq!(ProviderCode::parse("unknown"), None);
    }

    #[test]
    fn test_money_display() {
        let money = Money::from_yuan(10);
        assert_eq!(format!("{}", money), "¥10.00");
    }
}
