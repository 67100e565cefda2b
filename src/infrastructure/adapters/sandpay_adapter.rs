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

/// 杉付适配器（H5）
///
/// 状态为数字字符串：1待支付 2支付中 3成功 4失败；
/// 受理成功 code == "0000"，携带 H5 跳转地址 jump_url。
pub struct SandpayAdapter {
    endpoint: ProviderEndpoint,
    callback_url: String,
    client: Client,
}

impl SandpayAdapter {
    pub fn new(
        endpoint: ProviderEndpoint,
        callback_base: &str,
        timeout_secs: u64,
    ) -> DomainResult<Self> {
        if endpoint.secret.is_empty() {
            return Err(DomainError::ConfigError("sandpay secret is empty".to_string()));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| DomainError::ConfigError(format!("sandpay http client: {}", e)))?;

        Ok(Self {
            endpoint,
            callback_url: format!("{}/api/callback/sandpay", callback_base),
            client,
        })
    }

    fn status_to_result(order_no: &str, pay_status: &str) -> PaymentResult {
        match pay_status {
            "3" => PaymentResult::success(order_no),
            "4" => PaymentResult::failed(order_no),
            _ => PaymentResult::processing(order_no),
        }
    }
}

#[async_trait]
impl PaymentGatewayPort for SandpayAdapter {
    async fn create_payment(&self, params: CreatePaymentParams) -> DomainResult<PaymentResult> {
        if params.order_no.is_empty() {
            return Err(DomainError::ValidationError(
                "sandpay: order_code is required".to_string(),
            ));
        }
        if params.amount.to_cents() <= 0 {
            return Err(DomainError::ValidationError(
                "sandpay: amt must be greater than 0".to_string(),
            ));
        }
        if params.client_ip.is_empty() {
            return Err(DomainError::ValidationError(
                "sandpay: user_ip is required".to_string(),
            ));
        }

        let mut fields = BTreeMap::new();
        fields.insert("merc_id".to_string(), self.endpoint.merchant_no.clone());
        fields.insert("order_code".to_string(), params.order_no.clone());
        fields.insert("amt".to_string(), params.amount.to_decimal_string());
        fields.insert("notify_url".to_string(), self.callback_url.clone());
        fields.insert("user_ip".to_string(), params.client_ip.clone());
        let signature = sign::sign_params(&self.endpoint.secret, &fields)?;

        let body = json!({
            "merc_id": self.endpoint.merchant_no,
            "order_code": params.order_no,
            "amt": params.amount.to_decimal_string(),
            "notify_url": self.callback_url,
            "user_ip": params.client_ip,
            "sign": signature,
        });

        let url = format!("{}/gateway/h5/pay", self.endpoint.base_url);
        debug!("sandpay create request: {}", params.order_no);

        let response = match self.client.post(&url).json(&body).send().await {
            Ok(response) => response,
            Err(e) => {
                error!("sandpay create request failed: {}", e);
                return Ok(PaymentResult::failed_from_error(&params.order_no, &e.to_string()));
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            error!("sandpay create API error: {} - {}", status, text);
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

        if body["code"].as_str() == Some("0000") {
            let mut result = PaymentResult::processing(&params.order_no)
                .with_amount(params.amount)
                .with_raw(body.clone());
            if let Some(jump_url) = body["jump_url"].as_str() {
                result.insert_data("jump_url", Value::String(jump_url.to_string()));
            }
            Ok(result)
        } else {
            error!("sandpay create rejected: {}", body);
            Ok(PaymentResult::failed(&params.order_no).with_raw(body))
        }
    }

    async fn query_status(&self, order_no: &str) -> DomainResult<PaymentResult> {
        let mut fields = BTreeMap::new();
        fields.insert("merc_id".to_string(), self.endpoint.merchant_no.clone());
        fields.insert("order_code".to_string(), order_no.to_string());
        let signature = sign::sign_params(&self.endpoint.secret, &fields)?;

        let url = format!("{}/gateway/h5/query", self.endpoint.base_url);
        let body: Value = self
            .client
            .post(&url)
            .json(&json!({
                "merc_id": self.endpoint.merchant_no,
                "order_code": order_no,
                "sign": signature,
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let pay_status = body["pay_status"].as_str().unwrap_or_default();
        let mut result = Self::status_to_result(order_no, pay_status);
        result.insert_data("pay_status", Value::String(pay_status.to_string()));
        if let Some(trade_id) = body["trade_id"].as_str() {
            result = result.with_txn_id(trade_id);
        }
        Ok(result.with_raw(body))
    }

    async fn parse_callback(&self, raw: Value) -> DomainResult<PaymentResult> {
        let order_no = raw["order_code"].as_str().ok_or_else(|| {
            DomainError::ValidationError("sandpay callback: missing order_code".to_string())
        })?;

        let pay_status = raw["pay_status"].as_str().unwrap_or_default();
        let mut result = Self::status_to_result(order_no, pay_status);
        result.insert_data("pay_status", Value::String(pay_status.to_string()));

        if let Some(trade_id) = raw["trade_id"].as_str() {
            result = result.with_txn_id(trade_id);
            result.insert_data("trade_id", Value::String(trade_id.to_string()));
        }
        if let Some(amt) = raw["amt"].as_str() {
            if let Ok(amount) = Money::from_decimal_str(amt) {
                result = result.with_amount(amount);
            }
        }

        Ok(result.with_raw(raw))
    }

    fn service_name(&self) -> &'static str {
        "sandpay"
    }

    fn service_type(&self) -> &'static str {
        "h5"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment_result::PaymentStatus;

    fn adapter() -> SandpayAdapter {
        SandpayAdapter::new(
            ProviderEndpoint {
                base_url: "https://open.sandpay.example.com".to_string(),
                merchant_no: "M10086".to_string(),
                secret: "test_secret".to_string(),
            },
            "http://localhost:3000",
            5,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_validates_fields() {
        let adapter = adapter();
        let result = adapter
            .create_payment(CreatePaymentParams {
                order_no: String::new(),
                amount: Money::from_yuan(1),
                return_url: None,
                client_ip: "127.0.0.1".to_string(),
                extra: None,
            })
            .await;
        assert!(
            matches!(result, Err(DomainError::ValidationError(msg)) if msg.contains("order_code"))
        );
    }

    #[tokio::test]
    async fn test_parse_callback_paid() {
        let adapter = adapter();
        let result = adapter
            .parse_callback(json!({
                "order_code": "P20250101120000123456",
                "trade_id": "SP112233",
                "amt": "55.50",
                "pay_status": "3"
            }))
            .await
            .unwrap();

        assert_eq!(result.status, PaymentStatus::Success);
        assert_eq!(result.provider_txn_id.as_deref(), Some("SP112233"));
        assert_eq!(result.amount.map(|a| a.to_cents()), Some(5550));
    }

    #[tokio::test]
    async fn test_parse_callback_paying_is_processing() {
        let adapter = adapter();
        let result = adapter
            .parse_callback(json!({
                "order_code": "P20250101120000123456",
                "pay_status": "2"
            }))
            .await
            .unwrap();
        assert_eq!(result.status, PaymentStatus::Processing);
    }
}
