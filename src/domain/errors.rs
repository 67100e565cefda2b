use thiserror::Error;

/// 领域层错误类型
#[derive(Error, Debug)]
pub enum DomainError {
    /// 验证错误（入参非法，直接返回调用方，不重试）
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 服务商未注册
    #[error("Payment service not found: {0}")]
    ServiceNotFound(String),

    /// 服务商配置错误（构建适配器失败）
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// 重复提交（幂等命中，携带首次生成的平台订单号）
    #[error("Duplicate order submission: {0}")]
    DuplicateOrder(String),

    /// 平台订单号生成重试次数耗尽
    #[error("Order number generation exhausted after {0} attempts")]
    OrderNumberExhausted(u32),

    /// 网关失败（仅用于无法收敛到结果信封的场景）
    #[error("Gateway failure: {0}")]
    GatewayFailure(String),

    /// 余额不足
    #[error("Insufficient balance: balance {balance}, requested {requested}")]
    InsufficientBalance { balance: i64, requested: i64 },

    /// 订单状态错误
    #[error("Invalid order state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },

    /// 订单未找到
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// 分布式锁等待超时（可整体重试）
    #[error("Lock acquisition timed out for key: {0}")]
    LockTimeout(String),

    /// 金额无效
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// 数据库错误
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// 序列化错误
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// HTTP请求错误
    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// 领域结果类型
pub type DomainResult<T> = Result<T, DomainError>;
