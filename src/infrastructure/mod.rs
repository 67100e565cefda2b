pub mod adapters;
pub mod config;
pub mod idempotency;
pub mod registry;
pub mod status;

pub use adapters::{
    EpayAdapter, InMemoryBalanceRepository, InMemoryOrderRepository, MySqlBalanceRepository,
    MySqlOrderRepository, SandpayAdapter, WanpayAdapter,
};
pub use config::{AppConfig, ProviderEndpoint};
pub use idempotency::{Admission, IdempotencyGuard};
pub use registry::GatewayRegistry;
pub use status::{DefaultStatusChecker, StatusChecker, StatusCheckerRegistry};
