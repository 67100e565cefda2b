#![allow(dead_code)]

use async_trait::async_trait;
use payhub_rs::application::{
    BalanceLedgerService, CreateOrderRequest, EventDispatcher, LoggingSubscriber, MerchantNotifier,
    OrderAdmissionService,
};
use payhub_rs::domain::errors::DomainResult;
use payhub_rs::domain::payment_result::PaymentResult;
use payhub_rs::domain::value_objects::ProviderCode;
use payhub_rs::infrastructure::adapters::{InMemoryBalanceRepository, InMemoryOrderRepository};
use payhub_rs::infrastructure::config::AppConfig;
use payhub_rs::infrastructure::idempotency::IdempotencyGuard;
use payhub_rs::infrastructure::registry::GatewayRegistry;
use payhub_rs::infrastructure::status::StatusCheckerRegistry;
use payhub_rs::ports::{CreatePaymentParams, PaymentGatewayPort};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 脚本化网关：记录调用次数，按配置返回结果
pub struct MockGateway {
    pub create_calls: AtomicUsize,
    pub fail_create: bool,
    pub create_delay_ms: u64,
    /// query_status 返回的 status 字段值
    pub query_script: Mutex<String>,
}

impl MockGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            create_calls: AtomicUsize::new(0),
            fail_create: false,
            create_delay_ms: 0,
            query_script: Mutex::new("pending".to_string()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            create_calls: AtomicUsize::new(0),
            fail_create: true,
            create_delay_ms: 0,
            query_script: Mutex::new("pending".to_string()),
        })
    }

    pub fn script_query(&self, status: &str) {
        *self.query_script.lock().unwrap() = status.to_string();
    }

    pub fn create_call_count(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGatewayPort for MockGateway {
    async fn create_payment(&self, params: CreatePaymentParams) -> DomainResult<PaymentResult> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.create_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.create_delay_ms)).await;
        }
        if self.fail_create {
            return Ok(PaymentResult::failed_from_error(
                &params.order_no,
                "connection refused",
            ));
        }

        let mut result = PaymentResult::processing(&params.order_no).with_amount(params.amount);
        result.insert_data("pay_url", json!("https://pay.example.com/cashier"));
        Ok(result)
    }

    async fn query_status(&self, order_no: &str) -> DomainResult<PaymentResult> {
        let status = self.query_script.lock().unwrap().clone();
        let mut result = match status.as_str() {
            "success" => PaymentResult::success(order_no),
            "failed" => PaymentResult::failed(order_no),
            _ => PaymentResult::processing(order_no),
        };
        result.insert_data("status", json!(status));
        Ok(result)
    }

    async fn parse_callback(&self, raw: Value) -> DomainResult<PaymentResult> {
        let order_no = raw["order_no"].as_str().unwrap_or_default().to_string();
        let status = raw["status"].as_str().unwrap_or_default();
        let mut result = match status {
            "success" => PaymentResult::success(&order_no),
            "failed" => PaymentResult::failed(&order_no),
            _ => PaymentResult::processing(&order_no),
        };
        result.insert_data("status", json!(status));
        if let Some(txn_id) = raw["txn_id"].as_str() {
            result = result.with_txn_id(txn_id);
        }
        if let Some(cents) = raw["amount"].as_i64() {
            result = result.with_amount(payhub_rs::domain::Money::from_cents(cents));
        }
        Ok(result.with_raw(raw))
    }

    fn service_name(&self) -> &'static str {
        "mock"
    }

    fn service_type(&self) -> &'static str {
        "test"
    }
}

pub type TestService = OrderAdmissionService<InMemoryOrderRepository, InMemoryBalanceRepository>;

pub struct TestHarness {
    pub service: Arc<TestService>,
    pub orders: Arc<InMemoryOrderRepository>,
    pub balances: Arc<InMemoryBalanceRepository>,
    pub ledger: Arc<BalanceLedgerService<InMemoryBalanceRepository>>,
    pub guard: Arc<IdempotencyGuard>,
    pub gateway: Arc<MockGateway>,
}

pub fn test_config() -> AppConfig {
    AppConfig {
        lock_wait_secs: 2,
        ttl_jitter_ratio: 0.0,
        bloom_expected_items: 10_000,
        ..AppConfig::default()
    }
}

/// 内存仓储 + 脚本化网关的完整服务装配
pub fn harness_with(config: AppConfig, gateway: Arc<MockGateway>) -> TestHarness {
    let config = Arc::new(config);

    let orders = Arc::new(InMemoryOrderRepository::new());
    let balances = Arc::new(InMemoryBalanceRepository::new());
    let ledger = Arc::new(BalanceLedgerService::new(balances.clone()));

    // 把脚本化网关注册到 wanpay 编码下，覆盖内置适配器
    let mut registry = GatewayRegistry::with_builtin(config.clone());
    let mock = gateway.clone();
    registry.register(
        ProviderCode::Wanpay,
        Box::new(move |_config: &AppConfig| -> DomainResult<Arc<dyn PaymentGatewayPort>> {
            Ok(mock.clone())
        }),
    );

    let guard = Arc::new(IdempotencyGuard::new(&config));
    let mut dispatcher = EventDispatcher::new();
    dispatcher.subscribe(Arc::new(LoggingSubscriber));

    let service = Arc::new(OrderAdmissionService::new(
        orders.clone(),
        ledger.clone(),
        Arc::new(registry),
        Arc::new(StatusCheckerRegistry::with_builtin()),
        guard.clone(),
        Arc::new(dispatcher),
        Arc::new(MerchantNotifier::new(1).expect("notifier")),
    ));

    TestHarness {
        service,
        orders,
        balances,
        ledger,
        guard,
        gateway,
    }
}

pub fn harness_with_gateway(gateway: Arc<MockGateway>) -> TestHarness {
    harness_with(test_config(), gateway)
}

pub fn harness() -> TestHarness {
    harness_with_gateway(MockGateway::new())
}

/// 标准下单请求（wanpay 走脚本化网关；通知地址指向必然拒绝的端口，
/// 避免测试触网）
pub fn create_request(merchant_order_no: &str, amount: &str) -> CreateOrderRequest {
    CreateOrderRequest {
        merchant_id: "M1001".to_string(),
        merchant_order_no: merchant_order_no.to_string(),
        amount: amount.to_string(),
        provider: "wanpay".to_string(),
        notify_url: "http://127.0.0.1:9/notify".to_string(),
        return_url: Some("https://shop.example.com/return".to_string()),
        client_ip: "203.0.113.7".to_string(),
        extra: None,
    }
}

/// 成功回调报文（脚本化网关的归一化形状）
pub fn success_callback(platform_order_no: &str, amount_cents: i64) -> Value {
    json!({
        "order_no": platform_order_no,
        "txn_id": "MOCK_TXN_001",
        "amount": amount_cents,
        "status": "success",
    })
}
