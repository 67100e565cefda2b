use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::OrderRecord;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};

/// 商户异步通知
///
/// 订单终态后把归一化结果POST到商户 notify_url；是否送达由返回值
/// 告知调用方，调用方负责落库 NotifyStatus。通知失败不影响订单状态。
pub struct MerchantNotifier {
    client: Client,
}

impl MerchantNotifier {
    pub fn new(timeout_secs: u64) -> DomainResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| DomainError::ConfigError(format!("notify http client: {}", e)))?;
        Ok(Self { client })
    }

    pub async fn notify(&self, order: &OrderRecord) -> bool {
        let payload = json!({
            "platform_order_no": order.platform_order_no,
            "merchant_order_no": order.merchant_order_no,
            "amount": order.amount.to_decimal_string(),
            "status": order.status.to_string(),
            "provider_txn_id": order.provider_txn_id,
            "paid_at": order.paid_at,
        });

        match self.client.post(&order.notify_url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                info!("merchant notified: {}", order.platform_order_no);
                true
            }
            Ok(response) => {
                warn!(
                    "merchant notify rejected: {} -> {}",
                    order.platform_order_no,
                    response.status()
                );
                false
            }
            Err(e) => {
                warn!("merchant notify failed: {} -> {}", order.platform_order_no, e);
                false
            }
        }
    }
}
