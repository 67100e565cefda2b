pub mod entities;
pub mod errors;
pub mod events;
pub mod payment_result;
pub mod value_objects;

pub use entities::{BalanceLogEntry, OperationStat, OrderRecord};
pub use errors::{DomainError, DomainResult};
pub use events::EventKind;
pub use payment_result::{PaymentResult, PaymentStatus};
pub use value_objects::{Money, NotifyStatus, OperationType, OrderStatus, ProviderCode};
