use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::value_objects::ProviderCode;
use crate::infrastructure::adapters::{EpayAdapter, SandpayAdapter, WanpayAdapter};
use crate::infrastructure::config::AppConfig;
use crate::ports::PaymentGatewayPort;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// 适配器构造函数
pub type AdapterBuilder =
    Box<dyn Fn(&AppConfig) -> DomainResult<Arc<dyn PaymentGatewayPort>> + Send + Sync>;

/// 网关适配器注册表（工厂）
///
/// 启动时注册全部内置服务商；同编码重复注册静默覆盖，供测试替换
/// 与灰度接入使用。构造完成后以 Arc 只读共享，不存在运行期隐式改动。
pub struct GatewayRegistry {
    builders: HashMap<ProviderCode, AdapterBuilder>,
    config: Arc<AppConfig>,
}

impl GatewayRegistry {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self {
            builders: HashMap::new(),
            config,
        }
    }

    /// 注册全部内置适配器
    pub fn with_builtin(config: Arc<AppConfig>) -> Self {
        let mut registry = Self::new(config);

        registry.register(
            ProviderCode::Epay,
            Box::new(|config: &AppConfig| -> DomainResult<Arc<dyn PaymentGatewayPort>> {
                let adapter = EpayAdapter::new(
                    config.epay.clone(),
                    &config.callback_base,
                    config.gateway_timeout_secs,
                )?;
                Ok(Arc::new(adapter))
            }),
        );
        registry.register(
            ProviderCode::Wanpay,
            Box::new(|config: &AppConfig| -> DomainResult<Arc<dyn PaymentGatewayPort>> {
                let adapter = WanpayAdapter::new(
                    config.wanpay.clone(),
                    &config.callback_base,
                    config.gateway_timeout_secs,
                )?;
                Ok(Arc::new(adapter))
            }),
        );
        registry.register(
            ProviderCode::Sandpay,
            Box::new(|config: &AppConfig| -> DomainResult<Arc<dyn PaymentGatewayPort>> {
                let adapter = SandpayAdapter::new(
                    config.sandpay.clone(),
                    &config.callback_base,
                    config.gateway_timeout_secs,
                )?;
                Ok(Arc::new(adapter))
            }),
        );

        info!("gateway registry initialized with {} providers", registry.builders.len());
        registry
    }

    /// 注册适配器构造函数，同编码覆盖旧注册
    pub fn register(&mut self, code: ProviderCode, builder: AdapterBuilder) {
        if self.builders.insert(code, builder).is_some() {
            debug!("gateway builder replaced: {}", code);
        }
    }

    /// 构建适配器实例
    ///
    /// 未注册编码返回 ServiceNotFound；构造失败一律归为 ConfigError，
    /// 属于配置问题，调用方不应吞掉。
    pub fn create(&self, code: ProviderCode) -> DomainResult<Arc<dyn PaymentGatewayPort>> {
        let builder = self
            .builders
            .get(&code)
            .ok_or_else(|| DomainError::ServiceNotFound(code.to_string()))?;

        builder(&self.config).map_err(|e| match e {
            DomainError::ConfigError(_) => e,
            other => DomainError::ConfigError(format!("building adapter {}: {}", code, other)),
        })
    }

    pub fn is_supported(&self, code: ProviderCode) -> bool {
        self.builders.contains_key(&code)
    }
}
