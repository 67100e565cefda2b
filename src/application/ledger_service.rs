use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::value_objects::OperationType;
use crate::domain::{BalanceLogEntry, OperationStat};
use crate::ports::BalanceRepositoryPort;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

/// 账务服务
///
/// 薄封装：符号与操作类型一致性校验后委托仓储原子执行。
/// 余额不足、事务失败都整体回滚，调用方可重试。
pub struct BalanceLedgerService<B: BalanceRepositoryPort> {
    repository: Arc<B>,
}

impl<B: BalanceRepositoryPort> BalanceLedgerService<B> {
    pub fn new(repository: Arc<B>) -> Self {
        Self { repository }
    }

    /// 应用带符号余额变动
    pub async fn apply_delta(
        &self,
        account_id: &str,
        amount_cents: i64,
        operation: OperationType,
        operator: &str,
        order_no: Option<&str>,
        remark: Option<&str>,
    ) -> DomainResult<BalanceLogEntry> {
        if amount_cents == 0 {
            return Err(DomainError::ValidationError(
                "delta amount must not be zero".to_string(),
            ));
        }
        match operation {
            OperationType::Credit | OperationType::Settlement if amount_cents < 0 => {
                return Err(DomainError::ValidationError(format!(
                    "{} amount must be positive",
                    operation
                )));
            }
            OperationType::Debit if amount_cents > 0 => {
                return Err(DomainError::ValidationError(
                    "debit amount must be negative".to_string(),
                ));
            }
            _ => {}
        }

        let entry = self
            .repository
            .apply_delta(account_id, amount_cents, operation, operator, order_no, remark)
            .await?;

        info!(
            "ledger entry appended: account={} op={} amount={} balance={}",
            account_id, operation, amount_cents, entry.balance_after
        );
        Ok(entry)
    }

    /// 查询当前余额（分）
    pub async fn balance_of(&self, account_id: &str) -> DomainResult<i64> {
        self.repository.balance_of(account_id).await
    }

    /// 按操作类型聚合统计
    pub async fn stats(
        &self,
        account_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<Vec<OperationStat>> {
        self.repository.stats(account_id, from, to).await
    }
}
