use crate::application::dto::{CreateOrderRequest, CreateOrderResponse, OrderQueryResponse};
use crate::application::dispatcher::EventDispatcher;
use crate::application::ledger_service::BalanceLedgerService;
use crate::application::notifier::MerchantNotifier;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::events::EventKind;
use crate::domain::payment_result::{PaymentResult, PaymentStatus};
use crate::domain::value_objects::{Money, NotifyStatus, OperationType, OrderStatus, ProviderCode};
use crate::domain::OrderRecord;
use crate::infrastructure::idempotency::{Admission, IdempotencyGuard};
use crate::infrastructure::registry::GatewayRegistry;
use crate::infrastructure::status::StatusCheckerRegistry;
use crate::ports::gateway_port::CreatePaymentParams;
use crate::ports::{BalanceRepositoryPort, OrderRepositoryPort};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 订单准入服务
///
/// 订单创建与状态流转的唯一入口：准入判重 → 网关下单 → 持久化，
/// 回调/查询对账驱动终态流转并触发结算入账。
pub struct OrderAdmissionService<R: OrderRepositoryPort, B: BalanceRepositoryPort> {
    repository: Arc<R>,
    ledger: Arc<BalanceLedgerService<B>>,
    registry: Arc<GatewayRegistry>,
    checkers: Arc<StatusCheckerRegistry>,
    guard: Arc<IdempotencyGuard>,
    dispatcher: Arc<EventDispatcher>,
    notifier: Arc<MerchantNotifier>,
}

impl<R: OrderRepositoryPort, B: BalanceRepositoryPort> OrderAdmissionService<R, B> {
    pub fn new(
        repository: Arc<R>,
        ledger: Arc<BalanceLedgerService<B>>,
        registry: Arc<GatewayRegistry>,
        checkers: Arc<StatusCheckerRegistry>,
        guard: Arc<IdempotencyGuard>,
        dispatcher: Arc<EventDispatcher>,
        notifier: Arc<MerchantNotifier>,
    ) -> Self {
        Self {
            repository,
            ledger,
            registry,
            checkers,
            guard,
            dispatcher,
            notifier,
        }
    }

    /// 创建订单
    ///
    /// 同一 (merchant_id, merchant_order_no) 的并发提交在键级锁上
    /// 串行化，后到者拿到首次结果，不会二次触达网关。
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> DomainResult<CreateOrderResponse> {
        info!(
            "creating order: {} / {}",
            request.merchant_id, request.merchant_order_no
        );

        // 1. 入参校验
        crate::domain::entities::validate_merchant_order_no(&request.merchant_order_no)?;
        let amount = Money::from_decimal_str(&request.amount)?;
        let provider = ProviderCode::parse(&request.provider)
            .ok_or_else(|| DomainError::ServiceNotFound(request.provider.clone()))?;
        if !self.registry.is_supported(provider) {
            return Err(DomainError::ServiceNotFound(provider.to_string()));
        }

        // 2. 判重准入（键级锁内，锁随许可持有到流程结束）
        let key =
            IdempotencyGuard::admission_key(&request.merchant_id, &request.merchant_order_no);
        let _permit = match self
            .guard
            .admit(&key, || async {
                self.repository
                    .find_by_merchant_order(&request.merchant_id, &request.merchant_order_no)
                    .await
            })
            .await?
        {
            Admission::Admitted(permit) => permit,
            Admission::Duplicate(existing) => {
                info!(
                    "duplicate submission: {} -> {}",
                    key, existing.platform_order_no
                );
                return Ok(CreateOrderResponse::from_order(&existing, true));
            }
            Admission::Retry => return Err(DomainError::LockTimeout(key)),
        };

        // 3. 生成平台订单号，构建领域对象
        let platform_order_no = self.guard.generate_order_no()?;
        let mut order = OrderRecord::new(
            platform_order_no,
            request.merchant_id,
            request.merchant_order_no,
            amount,
            provider,
            request.notify_url,
            request.return_url,
            request.client_ip,
            request.extra,
        )?;

        // 4. 先落库（pending）；网关失败时订单留在 pending 等补单/过期清理
        self.repository.insert(&order).await?;
        self.guard.record(&key, &order).await;
        debug!("order saved: {}", order.platform_order_no);

        // 5. 网关下单
        let adapter = self.registry.create(provider)?;
        let result = adapter
            .create_payment(CreatePaymentParams {
                order_no: order.platform_order_no.clone(),
                amount,
                return_url: order.return_url.clone(),
                client_ip: order.client_ip.clone(),
                extra: order.extra.clone(),
            })
            .await?;

        if result.status == PaymentStatus::Failed {
            warn!(
                "gateway create failed: {} -> {}",
                order.platform_order_no, result.raw
            );
            self.dispatcher.publish(EventKind::PaymentFailed, &result).await;
            return Err(DomainError::GatewayFailure(format!(
                "{}: create payment failed",
                adapter.service_name()
            )));
        }

        // 6. 进入支付中，保存支付凭据
        order.mark_paying()?;
        if !result.data.is_empty() {
            order.set_pay_payload(Value::Object(result.data.clone()));
        }
        self.repository.update(&order).await?;
        self.guard.record(&key, &order).await;

        self.dispatcher
            .publish(EventKind::PaymentProcessing, &result)
            .await;

        info!("order created: {}", order.platform_order_no);
        Ok(CreateOrderResponse::from_order(&order, false))
    }

    /// 查询订单，未终态时向网关对账
    pub async fn query_order(&self, platform_order_no: &str) -> DomainResult<OrderQueryResponse> {
        info!("querying order: {}", platform_order_no);

        let order = self
            .repository
            .find_by_platform_no(platform_order_no)
            .await?
            .ok_or_else(|| DomainError::OrderNotFound(platform_order_no.to_string()))?;

        if order.is_finished() {
            return Ok(OrderQueryResponse::from_order(&order));
        }

        let lock_key = format!("o:{}", platform_order_no);
        let Some(_lock) = self.guard.serialize(&lock_key).await else {
            return Err(DomainError::LockTimeout(lock_key));
        };

        // 锁内重读，避免与回调并发重复结算
        let mut order = self
            .repository
            .find_by_platform_no(platform_order_no)
            .await?
            .ok_or_else(|| DomainError::OrderNotFound(platform_order_no.to_string()))?;

        if !order.is_finished() {
            debug!("order not finished, querying gateway: {}", platform_order_no);
            let adapter = self.registry.create(order.provider)?;
            let result = adapter.query_status(platform_order_no).await?;
            self.settle(&mut order, &result).await?;
        }

        Ok(OrderQueryResponse::from_order(&order))
    }

    /// 处理服务商回调（验签与来源IP校验由上游完成）
    pub async fn handle_callback(&self, provider: ProviderCode, raw: Value) -> DomainResult<()> {
        let adapter = self.registry.create(provider)?;
        let result = adapter.parse_callback(raw).await?;
        info!(
            "callback received: {} -> {} ({})",
            adapter.service_name(),
            result.order_no,
            result.status
        );

        let lock_key = format!("o:{}", result.order_no);
        let Some(_lock) = self.guard.serialize(&lock_key).await else {
            return Err(DomainError::LockTimeout(lock_key));
        };

        let mut order = self
            .repository
            .find_by_platform_no(&result.order_no)
            .await?
            .ok_or_else(|| DomainError::OrderNotFound(result.order_no.clone()))?;

        if order.is_finished() {
            // 回调重放：不再流转，也不再入账
            debug!("callback replay ignored: {}", order.platform_order_no);
            return Ok(());
        }

        self.settle(&mut order, &result).await
    }

    /// 退款：success → refunded，出账带余额校验
    pub async fn refund_order(
        &self,
        platform_order_no: &str,
        operator: &str,
    ) -> DomainResult<OrderQueryResponse> {
        let lock_key = format!("o:{}", platform_order_no);
        let Some(_lock) = self.guard.serialize(&lock_key).await else {
            return Err(DomainError::LockTimeout(lock_key));
        };

        let mut order = self
            .repository
            .find_by_platform_no(platform_order_no)
            .await?
            .ok_or_else(|| DomainError::OrderNotFound(platform_order_no.to_string()))?;

        // 状态先行校验，避免出账后流转失败留下孤儿流水
        if order.status != OrderStatus::Success {
            return Err(DomainError::InvalidState {
                expected: OrderStatus::Success.to_string(),
                actual: order.status.to_string(),
            });
        }

        let event_payload = PaymentResult::new(PaymentStatus::Success, &order.platform_order_no)
            .with_amount(order.amount);

        // 先出账：余额不足则退款失败，订单保持 success
        match self
            .ledger
            .apply_delta(
                &order.merchant_id,
                -order.amount.to_cents(),
                OperationType::Debit,
                operator,
                Some(&order.platform_order_no),
                Some("refund"),
            )
            .await
        {
            Ok(_) => {}
            Err(e @ DomainError::InsufficientBalance { .. }) => {
                warn!("refund rejected: {} -> {}", order.platform_order_no, e);
                self.dispatcher
                    .publish(EventKind::RefundFailed, &event_payload)
                    .await;
                return Err(e);
            }
            Err(e) => return Err(e),
        }

        order.mark_refunded()?;
        self.repository.update(&order).await?;
        self.dispatcher
            .publish(EventKind::RefundSuccess, &event_payload)
            .await;

        info!("order refunded: {}", order.platform_order_no);
        Ok(OrderQueryResponse::from_order(&order))
    }

    /// 关闭订单（管理端）：success/failed → closed
    pub async fn close_order(&self, platform_order_no: &str) -> DomainResult<OrderQueryResponse> {
        let lock_key = format!("o:{}", platform_order_no);
        let Some(_lock) = self.guard.serialize(&lock_key).await else {
            return Err(DomainError::LockTimeout(lock_key));
        };

        let mut order = self
            .repository
            .find_by_platform_no(platform_order_no)
            .await?
            .ok_or_else(|| DomainError::OrderNotFound(platform_order_no.to_string()))?;

        order.mark_closed()?;
        self.repository.update(&order).await?;

        info!("order closed: {}", order.platform_order_no);
        Ok(OrderQueryResponse::from_order(&order))
    }

    /// 过期清理：pending/paying 超过阈值置为 expired
    pub async fn expire_stale(&self, older_than_minutes: i64) -> DomainResult<usize> {
        let cutoff = Utc::now() - chrono::Duration::minutes(older_than_minutes);
        let stale = self.repository.find_stale(cutoff).await?;

        let mut expired = 0;
        for mut order in stale {
            if order.mark_expired().is_ok() {
                self.repository.update(&order).await?;
                expired += 1;
            }
        }

        // 顺带回收过期缓存与空闲锁
        self.guard.sweep().await;

        if expired > 0 {
            info!("expired {} stale orders", expired);
        }
        Ok(expired)
    }

    /// 过期订单补单：重新拉起网关支付
    pub async fn reissue(&self, platform_order_no: &str) -> DomainResult<CreateOrderResponse> {
        let lock_key = format!("o:{}", platform_order_no);
        let Some(_lock) = self.guard.serialize(&lock_key).await else {
            return Err(DomainError::LockTimeout(lock_key));
        };

        let mut order = self
            .repository
            .find_by_platform_no(platform_order_no)
            .await?
            .ok_or_else(|| DomainError::OrderNotFound(platform_order_no.to_string()))?;

        order.reissue()?;

        let adapter = self.registry.create(order.provider)?;
        let result = adapter
            .create_payment(CreatePaymentParams {
                order_no: order.platform_order_no.clone(),
                amount: order.amount,
                return_url: order.return_url.clone(),
                client_ip: order.client_ip.clone(),
                extra: order.extra.clone(),
            })
            .await?;

        if result.status == PaymentStatus::Failed {
            warn!("reissue gateway failed: {}", order.platform_order_no);
            // 状态未持久化，订单在库内仍为 expired
            return Err(DomainError::GatewayFailure(format!(
                "{}: reissue failed",
                adapter.service_name()
            )));
        }

        if !result.data.is_empty() {
            order.set_pay_payload(Value::Object(result.data.clone()));
        }
        self.repository.update(&order).await?;
        self.dispatcher
            .publish(EventKind::PaymentProcessing, &result)
            .await;

        info!("order reissued: {}", order.platform_order_no);
        Ok(CreateOrderResponse::from_order(&order, false))
    }

    /// 按判定结果推进订单状态；支付成功路径结算入账并通知商户
    async fn settle(&self, order: &mut OrderRecord, result: &PaymentResult) -> DomainResult<()> {
        let checker = self.checkers.checker_for(order.provider);

        if checker.is_paid(result) {
            order.mark_success(result.provider_txn_id.clone())?;
            self.repository.update(order).await?;

            // 结算入账：以服务商确认的实付金额为准，缺失时回落订单金额
            let settled = match result.amount {
                Some(amount) if amount.to_cents() > 0 => {
                    if amount != order.amount {
                        warn!(
                            "settled amount mismatch: {} reported {}, order {}",
                            order.platform_order_no,
                            amount.to_cents(),
                            order.amount.to_cents()
                        );
                    }
                    amount
                }
                _ => order.amount,
            };
            self.ledger
                .apply_delta(
                    &order.merchant_id,
                    settled.to_cents(),
                    OperationType::Settlement,
                    "gateway",
                    Some(&order.platform_order_no),
                    None,
                )
                .await?;

            self.dispatcher
                .publish(EventKind::PaymentSuccess, result)
                .await;

            let delivered = self.notifier.notify(order).await;
            order.set_notify_status(if delivered {
                NotifyStatus::Sent
            } else {
                NotifyStatus::Failed
            });
            self.repository.update(order).await?;

            info!("order settled: {}", order.platform_order_no);
        } else if result.status == PaymentStatus::Failed {
            order.mark_failed()?;
            self.repository.update(order).await?;
            self.dispatcher
                .publish(EventKind::PaymentFailed, result)
                .await;
            info!("order failed: {}", order.platform_order_no);
        } else {
            debug!(
                "order state unchanged: {} ({})",
                order.platform_order_no, result.status
            );
        }

        Ok(())
    }
}
