use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::payment_result::PaymentResult;
use crate::domain::value_objects::Money;
use crate::infrastructure::adapters::sign;
use crate::infrastructure::config::ProviderEndpoint;
use crate::ports::gateway_port::{CreatePaymentParams, PaymentGatewayPort};
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, error};

/// 易付适配器（扫码）
///
/// 下单返回二维码内容；接口约定 code == 1 为受理成功，
/// 回调 trade_status == "TRADE_SUCCESS" 为支付成功。
pub struct EpayAdapter {
    endpoint: ProviderEndpoint,
    callback_url: String,
    client: Client,
}

impl EpayAdapter {
    pub fn new(
        endpoint: ProviderEndpoint,
        callback_base: &str,
        timeout_secs: u64,
    ) -> DomainResult<Self> {
        if endpoint.secret.is_empty() {
            return Err(DomainError::ConfigError("epay secret is empty".to_string()));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| DomainError::ConfigError(format!("epay http client: {}", e)))?;

        Ok(Self {
            endpoint,
            callback_url: format!("{}/api/callback/epay", callback_base),
            client,
        })
    }

    fn signed(&self, mut params: BTreeMap<String, String>) -> DomainResult<BTreeMap<String, String>> {
        let signature = sign::sign_params(&self.endpoint.secret, &params)?;
        params.insert("sign".to_string(), signature);
        Ok(params)
    }
}

#[async_trait]
impl PaymentGatewayPort for EpayAdapter {
    async fn create_payment(&self, params: CreatePaymentParams) -> DomainResult<PaymentResult> {
        // 网络调用前完成必填校验
        if params.order_no.is_empty() {
            return Err(DomainError::ValidationError(
                "epay: out_trade_no is required".to_string(),
            ));
        }
        if params.amount.to_cents() <= 0 {
            return Err(DomainError::ValidationError(
                "epay: money must be greater than 0".to_string(),
            ));
        }
        if params.client_ip.is_empty() {
            return Err(DomainError::ValidationError(
                "epay: clientip is required".to_string(),
            ));
        }

        let mut form = BTreeMap::new();
        form.insert("pid".to_string(), self.endpoint.merchant_no.clone());
        form.insert("out_trade_no".to_string(), params.order_no.clone());
        form.insert("money".to_string(), params.amount.to_decimal_string());
        form.insert("notify_url".to_string(), self.callback_url.clone());
        form.insert("clientip".to_string(), params.client_ip.clone());
        if let Some(return_url) = &params.return_url {
            form.insert("return_url".to_string(), return_url.clone());
        }
        let form = self.signed(form)?;

        let url = format!("{}/api/pay/create", self.endpoint.base_url);
        debug!("epay create request: {}", params.order_no);

        let response = match self.client.post(&url).json(&form).send().await {
            Ok(response) => response,
            Err(e) => {
                error!("epay create request failed: {}", e);
                return Ok(PaymentResult::failed_from_error(&params.order_no, &e.to_string()));
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            error!("epay create API error: {} - {}", status, text);
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

        if body["code"].as_i64() == Some(1) {
            let mut result = PaymentResult::processing(&params.order_no)
                .with_amount(params.amount)
                .with_raw(body.clone());
            if let Some(trade_no) = body["trade_no"].as_str() {
                result = result.with_txn_id(trade_no);
            }
            if let Some(qrcode) = body["qrcode"].as_str() {
                // 二维码内容转base64给商户端嵌入
                result.insert_data(
                    "qr_code",
                    Value::String(base64::engine::general_purpose::STANDARD.encode(qrcode)),
                );
            }
            Ok(result)
        } else {
            error!("epay create rejected: {}", body);
            Ok(PaymentResult::failed(&params.order_no).with_raw(body))
        }
    }

    async fn query_status(&self, order_no: &str) -> DomainResult<PaymentResult> {
        let mut query = BTreeMap::new();
        query.insert("pid".to_string(), self.endpoint.merchant_no.clone());
        query.insert("out_trade_no".to_string(), order_no.to_string());
        let query = self.signed(query)?;

        let url = format!("{}/api/pay/query", self.endpoint.base_url);
        let body: Value = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut result = match body["trade_status"].as_str() {
            Some("TRADE_SUCCESS") => PaymentResult::success(order_no),
            Some("TRADE_CLOSED") => PaymentResult::failed(order_no),
            _ => PaymentResult::processing(order_no),
        };
        if let Some(trade_no) = body["trade_no"].as_str() {
            result = result.with_txn_id(trade_no);
        }
        if let Some(status) = body["trade_status"].as_str() {
            result.insert_data("trade_status", Value::String(status.to_string()));
        }
        if let Some(code) = body["code"].as_i64() {
            result.insert_data("code", Value::from(code));
        }
        Ok(result.with_raw(body))
    }

    async fn parse_callback(&self, raw: Value) -> DomainResult<PaymentResult> {
        let order_no = raw["out_trade_no"].as_str().ok_or_else(|| {
            DomainError::ValidationError("epay callback: missing out_trade_no".to_string())
        })?;

        let trade_status = raw["trade_status"].as_str().unwrap_or_default();
        let mut result = if trade_status == "TRADE_SUCCESS" {
            PaymentResult::success(order_no)
        } else {
            PaymentResult::processing(order_no)
        };

        result.insert_data("trade_status", Value::String(trade_status.to_string()));
        if let Some(trade_no) = raw["trade_no"].as_str() {
            result = result.with_txn_id(trade_no);
            result.insert_data("trade_no", Value::String(trade_no.to_string()));
        }
        if let Some(money) = raw["money"].as_str() {
            if let Ok(amount) = Money::from_decimal_str(money) {
                result = result.with_amount(amount);
            }
            result.insert_data("money", Value::String(money.to_string()));
        }

        Ok(result.with_raw(raw))
    }

    fn service_name(&self) -> &'static str {
        "epay"
    }

    fn service_type(&self) -> &'static str {
        "qrcode"
    }
}
