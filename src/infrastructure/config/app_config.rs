use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 单个服务商接入配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEndpoint {
    /// 服务商API基础URL
    pub base_url: String,

    /// 平台在服务商侧的商户号
    pub merchant_no: String,

    /// 签名密钥
    pub secret: String,
}

/// 应用配置
///
/// 幂等层的 TTL、抖动与锁等待都是显式配置，不允许埋成常量。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 平台对外回调根地址（通知服务商回调到 {callback_base}/api/callback/{code}）
    pub callback_base: String,

    /// 易付配置
    pub epay: ProviderEndpoint,

    /// 万付配置
    pub wanpay: ProviderEndpoint,

    /// 杉付配置
    pub sandpay: ProviderEndpoint,

    /// 订单号级锁等待上限（秒）
    pub lock_wait_secs: u64,

    /// 已存在订单缓存TTL（秒）
    pub cache_present_ttl_secs: u64,

    /// 确认不存在缓存TTL（秒）
    pub cache_absent_ttl_secs: u64,

    /// TTL随机抖动比例（0.1 表示 ±10%），防缓存雪崩
    pub ttl_jitter_ratio: f64,

    /// 布隆过滤器预期容量
    pub bloom_expected_items: usize,

    /// 布隆过滤器误判率上限
    pub bloom_fp_rate: f64,

    /// 平台订单号生成重试预算
    pub order_no_max_attempts: u32,

    /// 网关调用超时（秒）
    pub gateway_timeout_secs: u64,

    /// 商户通知超时（秒）
    pub notify_timeout_secs: u64,

    /// 运营事件Webhook地址（可选）
    pub ops_webhook_url: Option<String>,

    /// 查询接口时间戳新鲜度窗口（秒）
    pub query_freshness_secs: i64,

    /// 订单超时过期阈值（分钟）
    pub order_expire_minutes: i64,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn provider_from_env(prefix: &str, default_base: &str) -> ProviderEndpoint {
    ProviderEndpoint {
        base_url: env_or(&format!("{}_BASE_URL", prefix), default_base),
        merchant_no: std::env::var(format!("{}_MERCHANT_NO", prefix))
            .unwrap_or_else(|_| panic!("{}_MERCHANT_NO must be set", prefix)),
        secret: std::env::var(format!("{}_SECRET", prefix))
            .unwrap_or_else(|_| panic!("{}_SECRET must be set", prefix)),
    }
}

impl AppConfig {
    pub fn from_env() -> Arc<Self> {
        Arc::new(Self {
            callback_base: env_or("CALLBACK_BASE_URL", "http://localhost:3000"),
            epay: provider_from_env("EPAY", "https://api.epay.example.com"),
            wanpay: provider_from_env("WANPAY", "https://gateway.wanpay.example.com"),
            sandpay: provider_from_env("SANDPAY", "https://open.sandpay.example.com"),
            lock_wait_secs: env_parse_or("LOCK_WAIT_SECS", 30),
            cache_present_ttl_secs: env_parse_or("CACHE_PRESENT_TTL_SECS", 3600),
            cache_absent_ttl_secs: env_parse_or("CACHE_ABSENT_TTL_SECS", 300),
            ttl_jitter_ratio: env_parse_or("TTL_JITTER_RATIO", 0.1),
            bloom_expected_items: env_parse_or("BLOOM_EXPECTED_ITEMS", 1_000_000),
            bloom_fp_rate: env_parse_or("BLOOM_FP_RATE", 0.01),
            order_no_max_attempts: env_parse_or("ORDER_NO_MAX_ATTEMPTS", 10),
            gateway_timeout_secs: env_parse_or("GATEWAY_TIMEOUT_SECS", 10),
            notify_timeout_secs: env_parse_or("NOTIFY_TIMEOUT_SECS", 5),
            ops_webhook_url: std::env::var("OPS_WEBHOOK_URL").ok(),
            query_freshness_secs: env_parse_or("QUERY_FRESHNESS_SECS", 300),
            order_expire_minutes: env_parse_or("ORDER_EXPIRE_MINUTES", 30),
        })
    }
}

impl Default for AppConfig {
    /// 本地开发与测试默认值
    fn default() -> Self {
        let endpoint = |base: &str| ProviderEndpoint {
            base_url: base.to_string(),
            merchant_no: "M10086".to_string(),
            secret: "test_secret".to_string(),
        };
        Self {
            callback_base: "http://localhost:3000".to_string(),
            epay: endpoint("https://api.epay.example.com"),
            wanpay: endpoint("https://gateway.wanpay.example.com"),
            sandpay: endpoint("https://open.sandpay.example.com"),
            lock_wait_secs: 30,
            cache_present_ttl_secs: 3600,
            cache_absent_ttl_secs: 300,
            ttl_jitter_ratio: 0.1,
            bloom_expected_items: 100_000,
            bloom_fp_rate: 0.01,
            order_no_max_attempts: 10,
            gateway_timeout_secs: 10,
            notify_timeout_secs: 5,
            ops_webhook_url: None,
            query_freshness_secs: 300,
            order_expire_minutes: 30,
        }
    }
}
