use super::handlers::*;
use crate::ports::{BalanceRepositoryPort, OrderRepositoryPort};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn create_router<R, B>(state: AppState<R, B>) -> Router
where
    R: OrderRepositoryPort + 'static,
    B: BalanceRepositoryPort + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .route("/api/orders", post(create_order::<R, B>))
        .route("/api/orders/:platform_order_no", get(query_order::<R, B>))
        .route(
            "/api/orders/:platform_order_no/refund",
            post(refund_order::<R, B>),
        )
        .route(
            "/api/orders/:platform_order_no/close",
            post(close_order::<R, B>),
        )
        .route(
            "/api/orders/:platform_order_no/reissue",
            post(reissue_order::<R, B>),
        )
        .route("/api/callback/:provider", post(provider_callback::<R, B>))
        .route("/api/balance/:account_id", get(query_balance::<R, B>))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
