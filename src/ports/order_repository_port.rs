use crate::domain::errors::DomainResult;
use crate::domain::OrderRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// 订单仓储端口接口
///
/// insert 必须保证平台订单号与 (merchant_id, merchant_order_no)
/// 两个唯一性约束。
#[async_trait]
pub trait OrderRepositoryPort: Send + Sync {
    /// 保存新订单
    async fn insert(&self, order: &OrderRecord) -> DomainResult<()>;

    /// 根据平台订单号查找
    async fn find_by_platform_no(
        &self,
        platform_order_no: &str,
    ) -> DomainResult<Option<OrderRecord>>;

    /// 根据商户维度订单号查找
    async fn find_by_merchant_order(
        &self,
        merchant_id: &str,
        merchant_order_no: &str,
    ) -> DomainResult<Option<OrderRecord>>;

    /// 更新订单
    async fn update(&self, order: &OrderRecord) -> DomainResult<()>;

    /// 查找超时未终态订单（过期清理用）
    async fn find_stale(&self, cutoff: DateTime<Utc>) -> DomainResult<Vec<OrderRecord>>;
}
