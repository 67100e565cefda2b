use payhub_rs::api::{self, AppState};
use payhub_rs::application::{
    BalanceLedgerService, EventDispatcher, LoggingSubscriber, MerchantNotifier,
    OrderAdmissionService, WebhookSubscriber,
};
use payhub_rs::infrastructure::config::AppConfig;
use payhub_rs::infrastructure::idempotency::IdempotencyGuard;
use payhub_rs::infrastructure::registry::GatewayRegistry;
use payhub_rs::infrastructure::status::StatusCheckerRegistry;
use payhub_rs::infrastructure::{MySqlBalanceRepository, MySqlOrderRepository};
use sqlx::MySqlPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    // 加载环境变量
    dotenvy::dotenv().ok();

    info!("Starting PayHub aggregation service...");

    // 创建数据库连接池
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    info!("Connecting to database...");

    let pool = Arc::new(MySqlPool::connect(&database_url).await?);
    info!("Database connected successfully");

    // 加载配置
    let config = AppConfig::from_env();
    info!(
        "Configuration loaded, callback base: {}",
        config.callback_base
    );

    // 仓储
    let order_repository = Arc::new(MySqlOrderRepository::new(pool.clone()));
    let balance_repository = Arc::new(MySqlBalanceRepository::new(pool.clone()));

    // 账务服务
    let ledger_service = Arc::new(BalanceLedgerService::new(balance_repository));

    // 网关注册表与状态判定注册表（启动时构建，之后只读共享）
    let registry = Arc::new(GatewayRegistry::with_builtin(config.clone()));
    let checkers = Arc::new(StatusCheckerRegistry::with_builtin());

    // 幂等准入守卫
    let guard = Arc::new(IdempotencyGuard::new(&config));

    // 事件分发器
    let mut dispatcher = EventDispatcher::new();
    dispatcher.subscribe(Arc::new(LoggingSubscriber));
    if let Some(webhook_url) = &config.ops_webhook_url {
        dispatcher.subscribe(Arc::new(WebhookSubscriber::new(
            webhook_url.clone(),
            config.notify_timeout_secs,
        )?));
        info!("ops webhook subscriber enabled");
    }
    let dispatcher = Arc::new(dispatcher);

    // 商户通知
    let notifier = Arc::new(MerchantNotifier::new(config.notify_timeout_secs)?);

    // 订单准入服务
    let admission_service = Arc::new(OrderAdmissionService::new(
        order_repository,
        ledger_service.clone(),
        registry,
        checkers,
        guard,
        dispatcher,
        notifier,
    ));

    // 过期订单清理任务
    let sweep_service = admission_service.clone();
    let expire_minutes = config.order_expire_minutes;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60));
        loop {
            ticker.tick().await;
            if let Err(e) = sweep_service.expire_stale(expire_minutes).await {
                error!("expiry sweep failed: {}", e);
            }
        }
    });

    // 创建应用状态
    let app_state = AppState {
        admission_service,
        ledger_service,
        config: config.clone(),
    };

    // 创建路由
    let app = api::create_router(app_state);

    // 启动服务器
    let host = std::env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("SERVER_PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("{}:{}", host, port);

    info!("Server listening on {}", addr);
    info!("Available endpoints:");
    info!("  GET  /health - Health check");
    info!("  POST /api/orders - Create order");
    info!("  GET  /api/orders/:platform_order_no - Query order");
    info!("  POST /api/orders/:platform_order_no/refund - Refund order");
    info!("  POST /api/orders/:platform_order_no/close - Close order");
    info!("  POST /api/orders/:platform_order_no/reissue - Reissue expired order");
    info!("  POST /api/callback/:provider - Provider callback");
    info!("  GET  /api/balance/:account_id - Balance query");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
