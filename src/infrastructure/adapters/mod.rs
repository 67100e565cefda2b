pub mod epay_adapter;
pub mod memory_repository;
pub mod mysql_balance_repository;
pub mod mysql_order_repository;
pub mod sandpay_adapter;
pub mod sign;
pub mod wanpay_adapter;

pub use epay_adapter::EpayAdapter;
pub use memory_repository::{InMemoryBalanceRepository, InMemoryOrderRepository};
pub use mysql_balance_repository::MySqlBalanceRepository;
pub use mysql_order_repository::MySqlOrderRepository;
pub use sandpay_adapter::SandpayAdapter;
pub use wanpay_adapter::WanpayAdapter;
