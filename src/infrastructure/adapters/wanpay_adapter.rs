use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::payment_result::PaymentResult;
use crate::domain::value_objects::Money;
use crate::infrastructure::adapters::sign;
use crate::infrastructure::config::ProviderEndpoint;
use crate::ports::gateway_port::{CreatePaymentParams, PaymentGatewayPort};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, error};

/// 万付适配器（跳转收银台）
///
/// 金额走分为单位的整数；status == "success" 为成功，
/// 下单响应携带收银台跳转地址 pay_url。
pub struct WanpayAdapter {
    endpoint: ProviderEndpoint,
    callback_url: String,
    client: Client,
}

impl WanpayAdapter {
    pub fn new(
        endpoint: ProviderEndpoint,
        callback_base: &str,
        timeout_secs: u64,
    ) -> DomainResult<Self> {
        if endpoint.secret.is_empty() {
            return Err(DomainError::ConfigError("wanpay secret is empty".to_string()));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| DomainError::ConfigError(format!("wanpay http client: {}", e)))?;

        Ok(Self {
            endpoint,
            callback_url: format!("{}/api/callback/wanpay", callback_base),
            client,
        })
    }

    fn build_signature(&self, body: &BTreeMap<String, String>) -> DomainResult<String> {
        sign::sign_params(&self.endpoint.secret, body)
    }
}

#[async_trait]
impl PaymentGatewayPort for WanpayAdapter {
    async fn create_payment(&self, params: CreatePaymentParams) -> DomainResult<PaymentResult> {
        if params.order_no.is_empty() {
            return Err(DomainError::ValidationError(
                "wanpay: order_no is required".to_string(),
            ));
        }
        if params.amount.to_cents() <= 0 {
            return Err(DomainError::ValidationError(
                "wanpay: amount must be greater than 0".to_string(),
            ));
        }
        // 万付收银台要求同步跳转地址
        let return_url = params.return_url.as_deref().ok_or_else(|| {
            DomainError::ValidationError("wanpay: return_url is required".to_string())
        })?;

        let mut fields = BTreeMap::new();
        fields.insert("mch_id".to_string(), self.endpoint.merchant_no.clone());
        fields.insert("order_no".to_string(), params.order_no.clone());
        fields.insert("amount".to_string(), params.amount.to_cents().to_string());
        fields.insert("notify_url".to_string(), self.callback_url.clone());
        fields.insert("return_url".to_string(), return_url.to_string());
        let signature = self.build_signature(&fields)?;

        let body = json!({
            "mch_id": self.endpoint.merchant_no,
            "order_no": params.order_no,
            "amount": params.amount.to_cents(),
            "notify_url": self.callback_url,
            "return_url": return_url,
            "sign": signature,
        });

        let url = format!("{}/v2/trade/create", self.endpoint.base_url);
        debug!("wanpay create request: {}", params.order_no);

        let response = match self.client.post(&url).json(&body).send().await {
            Ok(response) => response,
            Err(e) => {
                error!("wanpay create request failed: {}", e);
                return Ok(PaymentResult::failed_from_error(&params.order_no, &e.to_string()));
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            error!("wanpay create API error: {} - {}", status, text);
            return Ok(PaymentResult::failed_from_error(
                &params.order_no,
                &format!("HTTP {}: {}", status, text),
            ));
        }

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                return Ok(PaymentResult::failed_from_error(&params.order_no, &e.to_string()));
            }
        };

        if body["status"].as_str() == Some("success") {
            let mut result = PaymentResult::processing(&params.order_no)
                .with_amount(params.amount)
                .with_raw(body.clone());
            if let Some(pay_url) = body["pay_url"].as_str() {
                result.insert_data("pay_url", Value::String(pay_url.to_string()));
            }
            if let Some(txn_id) = body["txn_id"].as_str() {
                result = result.with_txn_id(txn_id);
            }
            Ok(result)
        } else {
            error!("wanpay create rejected: {}", body);
            Ok(PaymentResult::failed(&params.order_no).with_raw(body))
        }
    }

    async fn query_status(&self, order_no: &str) -> DomainResult<PaymentResult> {
        let mut fields = BTreeMap::new();
        fields.insert("mch_id".to_string(), self.endpoint.merchant_no.clone());
        fields.insert("order_no".to_string(), order_no.to_string());
        let signature = self.build_signature(&fields)?;

        let url = format!("{}/v2/trade/query", self.endpoint.base_url);
        let body: Value = self
            .client
            .post(&url)
            .json(&json!({
                "mch_id": self.endpoint.merchant_no,
                "order_no": order_no,
                "sign": signature,
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let status = body["status"].as_str().unwrap_or_default();
        let mut result = match status {
            "success" => PaymentResult::success(order_no),
            "failed" => PaymentResult::failed(order_no),
            _ => PaymentResult::processing(order_no),
        };
        result.insert_data("status", Value::String(status.to_string()));
        if let Some(txn_id) = body["txn_id"].as_str() {
            result = result.with_txn_id(txn_id);
        }
        Ok(result.with_raw(body))
    }

    async fn parse_callback(&self, raw: Value) -> DomainResult<PaymentResult> {
        let order_no = raw["order_no"].as_str().ok_or_else(|| {
            DomainError::ValidationError("wanpay callback: missing order_no".to_string())
        })?;

        let status = raw["status"].as_str().unwrap_or_default();
        let mut result = match status {
            "success" => PaymentResult::success(order_no),
            "failed" => PaymentResult::failed(order_no),
            _ => PaymentResult::processing(order_no),
        };

        result.insert_data("status", Value::String(status.to_string()));
        if let Some(txn_id) = raw["txn_id"].as_str() {
            result = result.with_txn_id(txn_id);
            result.insert_data("txn_id", Value::String(txn_id.to_string()));
        }
        if let Some(cents) = raw["amount"].as_i64() {
            result = result.with_amount(Money::from_cents(cents));
        }

        Ok(result.with_raw(raw))
    }

    fn service_name(&self) -> &'static str {
        "wanpay"
    }

    fn service_type(&self) -> &'static str {
        "redirect"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment_result::PaymentStatus;

    fn adapter() -> WanpayAdapter {
        WanpayAdapter::new(
            ProviderEndpoint {
                base_url: "https://gateway.wanpay.example.com".to_string(),
                merchant_no: "M10086".to_string(),
                secret: "test_secret".to_string(),
            },
            "http://localhost:3000",
            5,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_requires_return_url() {
        let adapter = adapter();
        let result = adapter
            .create_payment(CreatePaymentParams {
                order_no: "P20250101120000123456".to_string(),
                amount: Money::from_yuan(1),
                return_url: None,
                client_ip: "127.0.0.1".to_string(),
                extra: None,
            })
            .await;
        assert!(
            matches!(result, Err(DomainError::ValidationError(msg)) if msg.contains("return_url"))
        );
    }

    #[tokio::test]
    async fn test_parse_callback_success() {
        let adapter = adapter();
        let result = adapter
            .parse_callback(json!({
                "order_no": "P20250101120000123456",
                "txn_id": "WP556677",
                "amount": 10000,
                "status": "success"
            }))
            .await
            .unwrap();

        assert_eq!(result.status, PaymentStatus::Success);
        assert_eq!(result.provider_txn_id.as_deref(), Some("WP556677"));
        assert_eq!(result.amount.map(|a| a.to_cents()), Some(10000));
    }

    #[tokio::test]
    async fn test_parse_callback_failed() {
        let adapter = adapter();
        let result = adapter
            .parse_callback(json!({
                "order_no": "P20250101120000123456",
                "status": "failed"
            }))
            .await
            .unwrap();
        assert_eq!(result.status, PaymentStatus::Failed);
    }
}
