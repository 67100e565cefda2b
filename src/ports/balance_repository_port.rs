use crate::domain::errors::DomainResult;
use crate::domain::value_objects::OperationType;
use crate::domain::{BalanceLogEntry, OperationStat};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// 账务仓储端口接口
///
/// apply_delta 必须原子完成：读余额（行锁）→ 校验 → 写余额 → 追加流水。
/// 任何一步失败整体回滚，不允许出现部分写入。
#[async_trait]
pub trait BalanceRepositoryPort: Send + Sync {
    /// 应用带符号余额变动并追加流水
    ///
    /// 出账导致余额为负时返回 InsufficientBalance，余额与流水均不变。
    async fn apply_delta(
        &self,
        account_id: &str,
        amount_cents: i64,
        operation: OperationType,
        operator: &str,
        order_no: Option<&str>,
        remark: Option<&str>,
    ) -> DomainResult<BalanceLogEntry>;

    /// 查询当前余额（分）
    async fn balance_of(&self, account_id: &str) -> DomainResult<i64>;

    /// 按操作类型聚合统计（只读衍生视图）
    async fn stats(
        &self,
        account_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<Vec<OperationStat>>;
}
