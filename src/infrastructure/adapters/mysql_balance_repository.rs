use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::value_objects::OperationType;
use crate::domain::{BalanceLogEntry, OperationStat};
use crate::ports::balance_repository_port::BalanceRepositoryPort;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySql, Pool};
use std::sync::Arc;
use tracing::debug;

/// MySQL账务仓储实现
///
/// 余额列是唯一事实来源；变动在单个事务内完成：
/// SELECT ... FOR UPDATE → 校验 → UPDATE → INSERT 流水 → COMMIT。
#[derive(Clone)]
pub struct MySqlBalanceRepository {
    pool: Arc<Pool<MySql>>,
}

impl MySqlBalanceRepository {
    pub fn new(pool: Arc<Pool<MySql>>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BalanceRepositoryPort for MySqlBalanceRepository {
    /// 应用带符号余额变动并追加流水
    async fn apply_delta(
        &self,
        account_id: &str,
        amount_cents: i64,
        operation: OperationType,
        operator: &str,
        order_no: Option<&str>,
        remark: Option<&str>,
    ) -> DomainResult<BalanceLogEntry> {
        let mut tx = self.pool.begin().await?;

        // 行锁串行化同账户并发变动
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT balance_cents FROM merchant_accounts WHERE account_id = ? FOR UPDATE")
                .bind(account_id)
                .fetch_optional(&mut *tx)
                .await?;

        let balance_before = match row {
            Some((balance,)) => balance,
            None => {
                // 首笔入账时建账
                sqlx::query(
                    "INSERT INTO merchant_accounts (account_id, balance_cents, updated_at) VALUES (?, 0, ?)",
                )
                .bind(account_id)
                .bind(Utc::now())
                .execute(&mut *tx)
                .await?;
                0
            }
        };

        let balance_after = balance_before + amount_cents;
        if balance_after < 0 {
            tx.rollback().await?;
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

        sqlx::query("UPDATE merchant_accounts SET balance_cents = ?, updated_at = ? WHERE account_id = ?")
            .bind(entry.balance_after)
            .bind(Utc::now())
            .bind(account_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO balance_log (
                id, account_id, operation_type, amount_cents,
                balance_before, balance_after, operator, order_no,
                remark, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id)
        .bind(&entry.account_id)
        .bind(entry.operation.to_string())
        .bind(entry.amount_cents)
        .bind(entry.balance_before)
        .bind(entry.balance_after)
        .bind(&entry.operator)
        .bind(&entry.order_no)
        .bind(&entry.remark)
        .bind(entry.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(
            "balance delta applied: account={} op={} amount={} -> {}",
            account_id, operation, amount_cents, entry.balance_after
        );
        Ok(entry)
    }

    /// 查询当前余额
    async fn balance_of(&self, account_id: &str) -> DomainResult<i64> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT balance_cents FROM merchant_accounts WHERE account_id = ?")
                .bind(account_id)
                .fetch_optional(self.pool.as_ref())
                .await?;

        Ok(row.map(|(balance,)| balance).unwrap_or(0))
    }

    /// 按操作类型聚合统计
    async fn stats(
        &self,
        account_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<Vec<OperationStat>> {
        let query = r#"
            SELECT operation_type,
                   CAST(COUNT(*) AS SIGNED) AS count,
                   CAST(COALESCE(SUM(amount_cents), 0) AS SIGNED) AS total_cents,
                   CAST(COALESCE(AVG(amount_cents), 0) AS DOUBLE) AS avg_cents
            FROM balance_log
            WHERE account_id = ? AND created_at >= ? AND created_at < ?
            GROUP BY operation_type
        "#;

        let rows = sqlx::query_as::<_, StatRow>(query)
            .bind(account_id)
            .bind(from)
            .bind(to)
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(rows.into_iter().map(|row| row.into_stat()).collect())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StatRow {
    operation_type: String,
    count: i64,
    total_cents: i64,
    avg_cents: f64,
}

impl StatRow {
    fn into_stat(self) -> OperationStat {
        let operation = match self.operation_type.as_str() {
            "credit" => OperationType::Credit,
            "debit" => OperationType::Debit,
            "settlement" => OperationType::Settlement,
            _ => panic!("Invalid operation type: {}", self.operation_type),
        };

        OperationStat {
            operation,
            count: self.count,
            total_cents: self.total_cents,
            avg_cents: self.avg_cents,
        }
    }
}
