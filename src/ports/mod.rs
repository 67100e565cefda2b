pub mod balance_repository_port;
pub mod gateway_port;
pub mod order_repository_port;

pub use balance_repository_port::BalanceRepositoryPort;
pub use gateway_port::{CreatePaymentParams, PaymentGatewayPort};
pub use order_repository_port::OrderRepositoryPort;
