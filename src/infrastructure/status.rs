use crate::domain::payment_result::PaymentResult;
use crate::domain::value_objects::ProviderCode;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// 支付成功判定策略
///
/// 各服务商的成功语义互不相同（数字1、字符串success、状态码"3"），
/// 无法合并成一条规则，判定逻辑按服务商拆分。
pub trait StatusChecker: Send + Sync {
    fn is_paid(&self, result: &PaymentResult) -> bool;
}

/// 易付：code == 1，回调侧 trade_status == "TRADE_SUCCESS"
pub struct EpayStatusChecker;

impl StatusChecker for EpayStatusChecker {
    fn is_paid(&self, result: &PaymentResult) -> bool {
        if result
            .field("trade_status")
            .and_then(Value::as_str)
            .is_some_and(|s| s == "TRADE_SUCCESS")
        {
            return true;
        }
        result.field("code").and_then(Value::as_i64) == Some(1)
    }
}

/// 万付：status == "success"
pub struct WanpayStatusChecker;

impl StatusChecker for WanpayStatusChecker {
    fn is_paid(&self, result: &PaymentResult) -> bool {
        result
            .field("status")
            .and_then(Value::as_str)
            .is_some_and(|s| s == "success")
    }
}

/// 杉付：pay_status == "3"（1待支付 2支付中 3成功 4失败）
pub struct SandpayStatusChecker;

impl StatusChecker for SandpayStatusChecker {
    fn is_paid(&self, result: &PaymentResult) -> bool {
        result
            .field("pay_status")
            .and_then(Value::as_str)
            .is_some_and(|s| s == "3")
    }
}

/// 兜底判定：扫描常见字段名与成功值
///
/// 未配置判定器的服务商降级为"未确认"而不是崩溃；兜底命中同样
/// 告警输出，提示为新服务商补充专用判定而不是长期依赖猜测。
pub struct DefaultStatusChecker;

const FALLBACK_FIELDS: &[&str] = &["status", "trade_status", "pay_status", "code", "state", "result"];

impl DefaultStatusChecker {
    fn value_is_success(value: &Value) -> bool {
        match value {
            Value::Number(n) => n.as_i64() == Some(1),
            Value::String(s) => {
                matches!(s.as_str(), "1" | "success" | "SUCCESS" | "TRADE_SUCCESS" | "paid")
            }
            _ => false,
        }
    }
}

impl StatusChecker for DefaultStatusChecker {
    fn is_paid(&self, result: &PaymentResult) -> bool {
        for field in FALLBACK_FIELDS {
            if let Some(value) = result.field(field) {
                if Self::value_is_success(value) {
                    warn!(
                        "fallback status checker matched field '{}' for order {}, add a dedicated checker",
                        field, result.order_no
                    );
                    return true;
                }
            }
        }
        warn!(
            "fallback status checker found no success marker for order {}, payload: {}",
            result.order_no, result.raw
        );
        false
    }
}

/// 判定策略注册表
///
/// 未注册的服务商编码返回兜底判定，永不报错。
pub struct StatusCheckerRegistry {
    checkers: HashMap<ProviderCode, Arc<dyn StatusChecker>>,
    fallback: Arc<dyn StatusChecker>,
}

impl StatusCheckerRegistry {
    pub fn new() -> Self {
        Self {
            checkers: HashMap::new(),
            fallback: Arc::new(DefaultStatusChecker),
        }
    }

    /// 注册全部内置服务商判定
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(ProviderCode::Epay, Arc::new(EpayStatusChecker));
        registry.register(ProviderCode::Wanpay, Arc::new(WanpayStatusChecker));
        registry.register(ProviderCode::Sandpay, Arc::new(SandpayStatusChecker));
        registry
    }

    pub fn register(&mut self, code: ProviderCode, checker: Arc<dyn StatusChecker>) {
        self.checkers.insert(code, checker);
    }

    pub fn checker_for(&self, code: ProviderCode) -> Arc<dyn StatusChecker> {
        self.checkers
            .get(&code)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl Default for StatusCheckerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result_with_raw(raw: Value) -> PaymentResult {
        PaymentResult::processing("P20250101120000123456").with_raw(raw)
    }

    #[test]
    fn test_epay_checker() {
        let registry = StatusCheckerRegistry::with_builtin();
        let checker = registry.checker_for(ProviderCode::Epay);

        assert!(checker.is_paid(&result_with_raw(json!({ "code": 1 }))));
        assert!(checker.is_paid(&result_with_raw(json!({ "trade_status": "TRADE_SUCCESS" }))));
        assert!(!checker.is_paid(&result_with_raw(json!({ "code": 0 }))));
        assert!(!checker.is_paid(&result_with_raw(json!({ "trade_status": "WAIT_BUYER_PAY" }))));
    }

    #[test]
    fn test_wanpay_checker() {
        let registry = StatusCheckerRegistry::with_builtin();
        let checker = registry.checker_for(ProviderCode::Wanpay);

        assert!(checker.is_paid(&result_with_raw(json!({ "status": "success" }))));
        assert!(!checker.is_paid(&result_with_raw(json!({ "status": "pending" }))));
        // 大小写敏感，万付文档只有小写
        assert!(!checker.is_paid(&result_with_raw(json!({ "status": "Success" }))));
    }

    #[test]
    fn test_sandpay_checker() {
        let registry = StatusCheckerRegistry::with_builtin();
        let checker = registry.checker_for(ProviderCode::Sandpay);

        assert!(checker.is_paid(&result_with_raw(json!({ "pay_status": "3" }))));
        assert!(!checker.is_paid(&result_with_raw(json!({ "pay_status": "2" }))));
        // 数字3不是字符串"3"，不算成功
        assert!(!checker.is_paid(&result_with_raw(json!({ "pay_status": 3 }))));
    }

    #[test]
    fn test_unregistered_code_falls_back_without_error() {
        // 空注册表模拟未配置的服务商
        let registry = StatusCheckerRegistry::new();
        let checker = registry.checker_for(ProviderCode::Epay);

        assert!(checker.is_paid(&result_with_raw(json!({ "status": "success" }))));
        assert!(!checker.is_paid(&result_with_raw(json!({ "everything": "else" }))));
    }

    #[test]
    fn test_default_checker_common_markers() {
        let checker = DefaultStatusChecker;

        assert!(checker.is_paid(&result_with_raw(json!({ "code": 1 }))));
        assert!(checker.is_paid(&result_with_raw(json!({ "state": "paid" }))));
        assert!(checker.is_paid(&result_with_raw(json!({ "result": "SUCCESS" }))));
        assert!(!checker.is_paid(&result_with_raw(json!({ "code": 200 }))));
        assert!(!checker.is_paid(&result_with_raw(json!({ "status": true }))));
    }

    #[test]
    fn test_normalized_data_takes_precedence_over_raw() {
        let mut result = result_with_raw(json!({ "status": "success" }));
        result.insert_data("status", json!("pending"));

        let checker = WanpayStatusChecker;
        assert!(!checker.is_paid(&result));
    }
}
