use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::events::EventKind;
use crate::domain::payment_result::PaymentResult;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// 事件订阅者
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    fn name(&self) -> &'static str;

    async fn on_event(&self, kind: EventKind, result: &PaymentResult) -> DomainResult<()>;
}

/// 事件分发器（观察者）
///
/// 订阅者按注册顺序依次调用；单个订阅者报错或panic只记录日志，
/// 不中断后续投递，也不会传染到发布方的事务。
pub struct EventDispatcher {
    subscribers: Vec<Arc<dyn EventSubscriber>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, subscriber: Arc<dyn EventSubscriber>) {
        self.subscribers.push(subscriber);
    }

    pub async fn publish(&self, kind: EventKind, result: &PaymentResult) {
        for subscriber in &self.subscribers {
            // spawn + await：保持顺序投递，同时把panic隔离成JoinError
            let task = {
                let subscriber = subscriber.clone();
                let result = result.clone();
                tokio::spawn(async move { subscriber.on_event(kind, &result).await })
            };

            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!("subscriber {} failed on {}: {}", subscriber.name(), kind, e);
                }
                Err(join_error) => {
                    error!(
                        "subscriber {} panicked on {}: {}",
                        subscriber.name(),
                        kind,
                        join_error
                    );
                }
            }
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// 日志订阅者
pub struct LoggingSubscriber;

#[async_trait]
impl EventSubscriber for LoggingSubscriber {
    fn name(&self) -> &'static str {
        "logging"
    }

    async fn on_event(&self, kind: EventKind, result: &PaymentResult) -> DomainResult<()> {
        info!(
            "payment event {}: order={} status={} amount={:?}",
            kind,
            result.order_no,
            result.status,
            result.amount.map(|a| a.to_cents())
        );
        Ok(())
    }
}

/// 运营Webhook订阅者：事件推送到配置的告警地址
pub struct WebhookSubscriber {
    url: String,
    client: reqwest::Client,
}

impl WebhookSubscriber {
    pub fn new(url: String, timeout_secs: u64) -> DomainResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| DomainError::ConfigError(format!("webhook http client: {}", e)))?;
        Ok(Self { url, client })
    }
}

#[async_trait]
impl EventSubscriber for WebhookSubscriber {
    fn name(&self) -> &'static str {
        "ops_webhook"
    }

    async fn on_event(&self, kind: EventKind, result: &PaymentResult) -> DomainResult<()> {
        self.client
            .post(&self.url)
            .json(&json!({
                "event": kind.as_str(),
                "order_no": result.order_no,
                "status": result.status.to_string(),
                "amount_cents": result.amount.map(|a| a.to_cents()),
                "provider_txn_id": result.provider_txn_id,
                "occurred_at": result.occurred_at,
            }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
