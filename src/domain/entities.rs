use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::value_objects::{Money, NotifyStatus, OperationType, OrderStatus, ProviderCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// 聚合支付订单实体
///
/// 状态流转仅允许：
/// pending → paying → success/failed → refunded/closed，
/// pending/paying 超时进入 expired，expired 可由管理端重新拉起。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    /// 订单ID（内部）
    pub id: Uuid,

    /// 平台订单号（全局唯一，生成后不可变更）
    pub platform_order_no: String,

    /// 商户标识
    pub merchant_id: String,

    /// 商户订单号（商户维度唯一）
    pub merchant_order_no: String,

    /// 订单金额
    pub amount: Money,

    /// 支付服务商
    pub provider: ProviderCode,

    /// 订单状态
    pub status: OrderStatus,

    /// 商户异步通知地址
    pub notify_url: String,

    /// 同步跳转地址
    pub return_url: Option<String>,

    /// 下单终端IP
    pub client_ip: String,

    /// 商户透传数据
    pub extra: Option<Value>,

    /// 服务商交易号（支付后回填）
    pub provider_txn_id: Option<String>,

    /// 网关下单返回的支付凭据（二维码/跳转地址，重复提交时原样返回）
    pub pay_payload: Option<Value>,

    /// 商户通知状态
    pub notify_status: NotifyStatus,

    /// 创建时间
    pub created_at: DateTime<Utc>,

    /// 更新时间
    pub updated_at: DateTime<Utc>,

    /// 支付完成时间
    pub paid_at: Option<DateTime<Utc>>,
}

/// 商户订单号限制：6-64位，字母数字下划线
pub fn validate_merchant_order_no(order_no: &str) -> DomainResult<()> {
    if order_no.len() < 6 || order_no.len() > 64 {
        return Err(DomainError::ValidationError(
            "merchant_order_no must be 6-64 characters".to_string(),
        ));
    }
    if !order_no
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_')
    {
        return Err(DomainError::ValidationError(
            "merchant_order_no must contain only letters, digits and underscore".to_string(),
        ));
    }
    Ok(())
}

impl OrderRecord {
    /// 创建新订单
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        platform_order_no: String,
        merchant_id: String,
        merchant_order_no: String,
        amount: Money,
        provider: ProviderCode,
        notify_url: String,
        return_url: Option<String>,
        client_ip: String,
        extra: Option<Value>,
    ) -> DomainResult<Self> {
        // 验证金额
        if amount.to_cents() <= 0 {
            return Err(DomainError::InvalidAmount(
                "Amount must be greater than 0".to_string(),
            ));
        }

        // 验证商户订单号
        validate_merchant_order_no(&merchant_order_no)?;

        // 验证商户标识与通知地址
        if merchant_id.is_empty() {
            return Err(DomainError::ValidationError(
                "merchant_id must not be empty".to_string(),
            ));
        }
        if notify_url.is_empty() {
            return Err(DomainError::ValidationError(
                "notify_url must not be empty".to_string(),
            ));
        }

        let now = Utc::now();

        Ok(Self {
            id: Uuid::new_v4(),
            platform_order_no,
            merchant_id,
            merchant_order_no,
            amount,
            provider,
            status: OrderStatus::Pending,
            notify_url,
            return_url,
            client_ip,
            extra,
            provider_txn_id: None,
            pay_payload: None,
            notify_status: NotifyStatus::Pending,
            created_at: now,
            updated_at: now,
            paid_at: None,
        })
    }

    fn invalid_state(&self, expected: &str) -> DomainError {
        DomainError::InvalidState {
            expected: expected.to_string(),
            actual: self.status.to_string(),
        }
    }

    /// 网关下单成功，进入支付中
    pub fn mark_paying(&mut self) -> DomainResult<()> {
        if self.status != OrderStatus::Pending {
            return Err(self.invalid_state("pending"));
        }
        self.status = OrderStatus::Paying;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// 标记为支付成功（回调或主动查询确认）
    pub fn mark_success(&mut self, provider_txn_id: Option<String>) -> DomainResult<()> {
        if self.status != OrderStatus::Paying && self.status != OrderStatus::Pending {
            return Err(self.invalid_state("pending or paying"));
        }
        self.status = OrderStatus::Success;
        if provider_txn_id.is_some() {
            self.provider_txn_id = provider_txn_id;
        }
        self.paid_at = Some(Utc::now());
        self.updated_at = Utc::now();
        Ok(())
    }

    /// 标记为支付失败
    pub fn mark_failed(&mut self) -> DomainResult<()> {
        if self.status != OrderStatus::Paying && self.status != OrderStatus::Pending {
            return Err(self.invalid_state("pending or paying"));
        }
        self.status = OrderStatus::Failed;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// 标记为已退款
    pub fn mark_refunded(&mut self) -> DomainResult<()> {
        if self.status != OrderStatus::Success {
            return Err(self.invalid_state("success"));
        }
        self.status = OrderStatus::Refunded;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// 标记为已关闭
    pub fn mark_closed(&mut self) -> DomainResult<()> {
        if self.status != OrderStatus::Success && self.status != OrderStatus::Failed {
            return Err(self.invalid_state("success or failed"));
        }
        self.status = OrderStatus::Closed;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// 超时过期（管理端定时清理）
    pub fn mark_expired(&mut self) -> DomainResult<()> {
        if self.status != OrderStatus::Pending && self.status != OrderStatus::Paying {
            return Err(self.invalid_state("pending or paying"));
        }
        self.status = OrderStatus::Expired;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// 过期订单重新拉起支付
    pub fn reissue(&mut self) -> DomainResult<()> {
        if self.status != OrderStatus::Expired {
            return Err(self.invalid_state("expired"));
        }
        self.status = OrderStatus::Paying;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// 记录网关支付凭据
    pub fn set_pay_payload(&mut self, payload: Value) {
        self.pay_payload = Some(payload);
        self.updated_at = Utc::now();
    }

    /// 更新商户通知状态
    pub fn set_notify_status(&mut self, status: NotifyStatus) {
        self.notify_status = status;
        self.updated_at = Utc::now();
    }

    /// 是否终态
    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }
}

/// 账务流水（只追加，不修改不删除）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceLogEntry {
    /// 流水ID
    pub id: Uuid,

    /// 账户标识（商户/供应商）
    pub account_id: String,

    /// 操作类型
    pub operation: OperationType,

    /// 带符号变动金额（分）
    pub amount_cents: i64,

    /// 变动前余额（分）
    pub balance_before: i64,

    /// 变动后余额（分）
    pub balance_after: i64,

    /// 操作者
    pub operator: String,

    /// 关联订单号
    pub order_no: Option<String>,

    /// 备注
    pub remark: Option<String>,

    /// 创建时间
    pub created_at: DateTime<Utc>,
}

impl BalanceLogEntry {
    /// 由变动前余额与带符号金额构造，balance_after 不允许外部指定
    pub fn new(
        account_id: String,
        operation: OperationType,
        amount_cents: i64,
        balance_before: i64,
        operator: String,
        order_no: Option<String>,
        remark: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            operation,
            amount_cents,
            balance_before,
            balance_after: balance_before + amount_cents,
            operator,
            order_no,
            remark,
            created_at: Utc::now(),
        }
    }
}

/// 按操作类型聚合的账务统计（只读衍生视图）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationStat {
    pub operation: OperationType,
    pub count: i64,
    pub total_cents: i64,
    pub avg_cents: f64,
}
