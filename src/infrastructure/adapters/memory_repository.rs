use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::value_objects::OperationType;
use crate::domain::{BalanceLogEntry, OperationStat, OrderRecord};
use crate::ports::balance_repository_port::BalanceRepositoryPort;
use crate::ports::order_repository_port::OrderRepositoryPort;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::{Mutex, RwLock};

/// 内存订单仓储（测试与本地开发）
///
/// 与MySQL实现保持相同的唯一性语义：平台订单号与
/// (merchant_id, merchant_order_no) 冲突时拒绝写入。
#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<String, OrderRecord>>,
    merchant_index: RwLock<HashMap<(String, String), String>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self) -> usize {
        self.orders.read().await.len()
    }
}

#[async_trait]
impl OrderRepositoryPort for InMemoryOrderRepository {
    async fn insert(&self, order: &OrderRecord) -> DomainResult<()> {
        // 锁顺序与读路径一致：index → orders
        let mut index = self.merchant_index.write().await;
        let mut orders = self.orders.write().await;

        let merchant_key = (order.merchant_id.clone(), order.merchant_order_no.clone());
        if let Some(existing) = index.get(&merchant_key) {
            return Err(DomainError::DuplicateOrder(existing.clone()));
        }
        if orders.contains_key(&order.platform_order_no) {
            return Err(DomainError::DuplicateOrder(order.platform_order_no.clone()));
        }

        index.insert(merchant_key, order.platform_order_no.clone());
        orders.insert(order.platform_order_no.clone(), order.clone());
        Ok(())
    }

    async fn find_by_platform_no(
        &self,
        platform_order_no: &str,
    ) -> DomainResult<Option<OrderRecord>> {
        Ok(self.orders.read().await.get(platform_order_no).cloned())
    }

    async fn find_by_merchant_order(
        &self,
        merchant_id: &str,
        merchant_order_no: &str,
    ) -> DomainResult<Option<OrderRecord>> {
        let key = (merchant_id.to_string(), merchant_order_no.to_string());
        let index = self.merchant_index.read().await;
        let Some(platform_no) = index.get(&key) else {
            return Ok(None);
        };
        Ok(self.orders.read().await.get(platform_no).cloned())
    }

    async fn update(&self, order: &OrderRecord) -> DomainResult<()> {
        let mut orders = self.orders.write().await;
        match orders.get_mut(&order.platform_order_no) {
            Some(slot) => {
                *slot = order.clone();
                Ok(())
            }
            None => Err(DomainError::OrderNotFound(order.platform_order_no.clone())),
        }
    }

    async fn find_stale(&self, cutoff: DateTime<Utc>) -> DomainResult<Vec<OrderRecord>> {
        Ok(self
            .orders
            .read()
            .await
            .values()
            .filter(|order| !order.is_finished() && order.created_at < cutoff)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct BalanceState {
    accounts: HashMap<String, i64>,
    log: Vec<BalanceLogEntry>,
}

/// 内存账务仓储
///
/// 单把互斥锁等价于数据库行锁：同账户的并发变动串行提交，
/// 流水按提交顺序追加。
#[derive(Default)]
pub struct InMemoryBalanceRepository {
    state: Mutex<BalanceState>,
}

impl InMemoryBalanceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定账户的流水（按提交顺序），测试断言用
    pub async fn entries_of(&self, account_id: &str) -> Vec<BalanceLogEntry> {
        self.state
            .lock()
            .await
            .log
            .iter()
            .filter(|entry| entry.account_id == account_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl BalanceRepositoryPort for InMemoryBalanceRepository {
    async fn apply_delta(
        &self,
        account_id: &str,
        amount_cents: i64,
        operation: OperationType,
        operator: &str,
        order_no: Option<&str>,
        remark: Option<&str>,
    ) -> DomainResult<BalanceLogEntry> {
        let mut state = self.state.lock().await;

        let balance_before = *state.accounts.get(account_id).unwrap_or(&0);
        if balance_before + amount_cents < 0 {
            // 拒绝时余额与流水均不动
            return Err(DomainError::InsufficientBalance {
                balance: balance_before,
                requested: amount_cents,
            });
        }

        let entry = BalanceLogEntry::new(
            account_id.to_string(),
            operation,
            amount_cents,
            balance_before,
            operator.to_string(),
            order_no.map(String::from),
            remark.map(String::from),
        );

        state
            .accounts
            .insert(account_id.to_string(), entry.balance_after);
        state.log.push(entry.clone());
        Ok(entry)
    }

    async fn balance_of(&self, account_id: &str) -> DomainResult<i64> {
        Ok(*self.state.lock().await.accounts.get(account_id).unwrap_or(&0))
    }

    async fn stats(
        &self,
        account_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<Vec<OperationStat>> {
        let state = self.state.lock().await;
        let mut grouped: HashMap<OperationType, (i64, i64)> = HashMap::new();

        for entry in state
            .log
            .iter()
            .filter(|e| e.account_id == account_id && e.created_at >= from && e.created_at < to)
        {
            let slot = grouped.entry(entry.operation).or_insert((0, 0));
            slot.0 += 1;
            slot.1 += entry.amount_cents;
        }

        Ok(grouped
            .into_iter()
            .map(|(operation, (count, total_cents))| OperationStat {
                operation,
                count,
                total_cents,
                avg_cents: total_cents as f64 / count as f64,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{Money, ProviderCode};

    fn order(merchant_order_no: &str, platform_no: &str) -> OrderRecord {
        OrderRecord::new(
            platform_no.to_string(),
            "M1001".to_string(),
            merchant_order_no.to_string(),
            Money::from_yuan(10),
            ProviderCode::Epay,
            "https://merchant.example.com/notify".to_string(),
            None,
            "127.0.0.1".to_string(),
            None,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_merchant_order_uniqueness() {
        let repo = InMemoryOrderRepository::new();
        repo.insert(&order("ORDER_0001", "P1111")).await.unwrap();

        let result = repo.insert(&order("ORDER_0001", "P2222")).await;
        assert!(matches!(result, Err(DomainError::DuplicateOrder(no)) if no == "P1111"));

        let found = repo
            .find_by_merchant_order("M1001", "ORDER_0001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.platform_order_no, "P1111");
    }

    #[tokio::test]
    async fn test_insufficient_balance_leaves_nothing() {
        let repo = InMemoryBalanceRepository::new();
        repo.apply_delta("M1001", 500, OperationType::Credit, "admin", None, None)
            .await
            .unwrap();

        let result = repo
            .apply_delta("M1001", -800, OperationType::Debit, "admin", None, None)
            .await;
        assert!(matches!(result, Err(DomainError::InsufficientBalance { balance: 500, requested: -800 })));

        assert_eq!(repo.balance_of("M1001").await.unwrap(), 500);
        assert_eq!(repo.entries_of("M1001").await.len(), 1);
    }

    #[tokio::test]
    async fn test_ledger_chains() {
        let repo = InMemoryBalanceRepository::new();
        repo.apply_delta("M1001", 1000, OperationType::Credit, "admin", None, None)
            .await
            .unwrap();
        repo.apply_delta("M1001", -300, OperationType::Debit, "admin", None, None)
            .await
            .unwrap();
        repo.apply_delta("M1001", 200, OperationType::Settlement, "gateway", None, None)
            .await
            .unwrap();

        let entries = repo.entries_of("M1001").await;
        for pair in entries.windows(2) {
            assert_eq!(pair[0].balance_after, pair[1].balance_before);
        }
        assert_eq!(repo.balance_of("M1001").await.unwrap(), 900);
    }
}
