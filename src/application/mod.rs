pub mod admission_service;
pub mod dispatcher;
pub mod dto;
pub mod ledger_service;
pub mod notifier;

pub use admission_service::OrderAdmissionService;
pub use dispatcher::{EventDispatcher, EventSubscriber, LoggingSubscriber, WebhookSubscriber};
pub use dto::{
    BalanceResponse, CreateOrderRequest, CreateOrderResponse, OrderQueryResponse, RefundRequest,
};
pub use ledger_service::BalanceLedgerService;
pub use notifier::MerchantNotifier;
