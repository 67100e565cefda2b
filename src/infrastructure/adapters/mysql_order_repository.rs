use crate::domain::errors::DomainResult;
use crate::domain::OrderRecord;
use crate::ports::order_repository_port::OrderRepositoryPort;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySql, Pool};
use std::sync::Arc;
use tracing::{debug, error};

/// MySQL订单仓储实现
///
/// platform_order_no 与 (merchant_id, merchant_order_no) 两个唯一键
/// 由表约束兜底，应用层幂等在其之上。
#[derive(Clone)]
pub struct MySqlOrderRepository {
    pool: Arc<Pool<MySql>>,
}

impl MySqlOrderRepository {
    pub fn new(pool: Arc<Pool<MySql>>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderRepositoryPort for MySqlOrderRepository {
    /// 保存新订单
    async fn insert(&self, order: &OrderRecord) -> DomainResult<()> {
        let query = r#"
            INSERT INTO orders (
                id, platform_order_no, merchant_id, merchant_order_no,
                amount_cents, provider, status, notify_url, return_url,
                client_ip, extra, provider_txn_id, pay_payload,
                notify_status, created_at, updated_at, paid_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#;

        sqlx::query(query)
            .bind(order.id)
            .bind(&order.platform_order_no)
            .bind(&order.merchant_id)
            .bind(&order.merchant_order_no)
            .bind(order.amount.to_cents())
            .bind(order.provider.to_string())
            .bind(order.status.to_string())
            .bind(&order.notify_url)
            .bind(&order.return_url)
            .bind(&order.client_ip)
            .bind(&order.extra)
            .bind(&order.provider_txn_id)
            .bind(&order.pay_payload)
            .bind(order.notify_status.to_string())
            .bind(order.created_at)
            .bind(order.updated_at)
            .bind(order.paid_at)
            .execute(self.pool.as_ref())
            .await?;

        debug!("order saved: {}", order.platform_order_no);
        Ok(())
    }

    /// 根据平台订单号查找
    async fn find_by_platform_no(
        &self,
        platform_order_no: &str,
    ) -> DomainResult<Option<OrderRecord>> {
        let query = r#"
            SELECT id, platform_order_no, merchant_id, merchant_order_no,
                   amount_cents, provider, status, notify_url, return_url,
                   client_ip, extra, provider_txn_id, pay_payload,
                   notify_status, created_at, updated_at, paid_at
            FROM orders
            WHERE platform_order_no = ?
        "#;

        let result = sqlx::query_as::<_, OrderRow>(query)
            .bind(platform_order_no)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(result.map(|row| row.into_order()))
    }

    /// 根据商户维度订单号查找
    async fn find_by_merchant_order(
        &self,
        merchant_id: &str,
        merchant_order_no: &str,
    ) -> DomainResult<Option<OrderRecord>> {
        let query = r#"
            SELECT id, platform_order_no, merchant_id, merchant_order_no,
                   amount_cents, provider, status, notify_url, return_url,
                   client_ip, extra, provider_txn_id, pay_payload,
                   notify_status, created_at, updated_at, paid_at
            FROM orders
            WHERE merchant_id = ? AND merchant_order_no = ?
        "#;

        let result = sqlx::query_as::<_, OrderRow>(query)
            .bind(merchant_id)
            .bind(merchant_order_no)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(result.map(|row| row.into_order()))
    }

    /// 更新订单
    async fn update(&self, order: &OrderRecord) -> DomainResult<()> {
        let query = r#"
            UPDATE orders
            SET status = ?, provider_txn_id = ?, pay_payload = ?,
                notify_status = ?, updated_at = ?, paid_at = ?
            WHERE id = ?
        "#;

        let rows_affected = sqlx::query(query)
            .bind(order.status.to_string())
            .bind(&order.provider_txn_id)
            .bind(&order.pay_payload)
            .bind(order.notify_status.to_string())
            .bind(order.updated_at)
            .bind(order.paid_at)
            .bind(order.id)
            .execute(self.pool.as_ref())
            .await?
            .rows_affected();

        if rows_affected == 0 {
            error!("no order found to update: {}", order.platform_order_no);
            return Err(crate::domain::errors::DomainError::OrderNotFound(
                order.platform_order_no.clone(),
            ));
        }

        debug!("order updated: {}", order.platform_order_no);
        Ok(())
    }

    /// 查找超时未终态订单
    async fn find_stale(&self, cutoff: DateTime<Utc>) -> DomainResult<Vec<OrderRecord>> {
        let query = r#"
            SELECT id, platform_order_no, merchant_id, merchant_order_no,
                   amount_cents, provider, status, notify_url, return_url,
                   client_ip, extra, provider_txn_id, pay_payload,
                   notify_status, created_at, updated_at, paid_at
            FROM orders
            WHERE status IN ('pending', 'paying') AND created_at < ?
        "#;

        let rows = sqlx::query_as::<_, OrderRow>(query)
            .bind(cutoff)
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(rows.into_iter().map(|row| row.into_order()).collect())
    }
}

/// 数据库行结构体
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: uuid::Uuid,
    platform_order_no: String,
    merchant_id: String,
    merchant_order_no: String,
    amount_cents: i64,
    provider: String,
    status: String,
    notify_url: String,
    return_url: Option<String>,
    client_ip: String,
    extra: Option<serde_json::Value>,
    provider_txn_id: Option<String>,
    pay_payload: Option<serde_json::Value>,
    notify_status: String,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
    paid_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl OrderRow {
    fn into_order(self) -> OrderRecord {
        use crate::domain::value_objects::{Money, NotifyStatus, OrderStatus, ProviderCode};

        let provider = ProviderCode::parse(&self.provider)
            .unwrap_or_else(|| panic!("Invalid provider code: {}", self.provider));

        let status = match self.status.as_str() {
            "pending" => OrderStatus::Pending,
            "paying" => OrderStatus::Paying,
            "success" => OrderStatus::Success,
            "failed" => OrderStatus::Failed,
            "refunded" => OrderStatus::Refunded,
            "closed" => OrderStatus::Closed,
            "expired" => OrderStatus::Expired,
            _ => panic!("Invalid order status: {}", self.status),
        };

        let notify_status = match self.notify_status.as_str() {
            "pending" => NotifyStatus::Pending,
            "sent" => NotifyStatus::Sent,
            "failed" => NotifyStatus::Failed,
            _ => panic!("Invalid notify status: {}", self.notify_status),
        };

        OrderRecord {
            id: self.id,
            platform_order_no: self.platform_order_no,
            merchant_id: self.merchant_id,
            merchant_order_no: self.merchant_order_no,
            amount: Money::from_cents(self.amount_cents),
            provider,
            status,
            notify_url: self.notify_url,
            return_url: self.return_url,
            client_ip: self.client_ip,
            extra: self.extra,
            provider_txn_id: self.provider_txn_id,
            pay_payload: self.pay_payload,
            notify_status,
            created_at: self.created_at,
            updated_at: self.updated_at,
            paid_at: self.paid_at,
        }
    }
}
