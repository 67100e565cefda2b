mod common;

use common::{create_request, harness, success_callback};
use payhub_rs::domain::errors::DomainError;
use payhub_rs::domain::value_objects::{NotifyStatus, OperationType, OrderStatus, ProviderCode};
use payhub_rs::ports::{BalanceRepositoryPort, OrderRepositoryPort};
use serde_json::json;

#[tokio::test]
async fn test_success_callback_settles_order() {
    // 场景B：回调确认支付成功 → paying → success，结算入账
    let h = harness();

    let created = h
        .service
        .create_order(create_request("ORDER_0001", "100.00"))
        .await
        .unwrap();

    let balance_before = h.balances.balance_of("M1001").await.unwrap();
    assert_eq!(balance_before, 0);

    h.service
        .handle_callback(
            ProviderCode::Wanpay,
            success_callback(&created.platform_order_no, 10000),
        )
        .await
        .unwrap();

    let order = h
        .orders
        .find_by_platform_no(&created.platform_order_no)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status, OrderStatus::Success);
    assert_eq!(order.provider_txn_id.as_deref(), Some("MOCK_TXN_001"));
    assert!(order.paid_at.is_some());
    // 通知地址指向拒绝连接的端口，送达失败被记录
    assert_eq!(order.notify_status, NotifyStatus::Failed);

    // balance_after = balance_before + amount
    assert_eq!(h.balances.balance_of("M1001").await.unwrap(), 10000);
    let entries = h.balances.entries_of("M1001").await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].operation, OperationType::Settlement);
    assert_eq!(entries[0].balance_before, 0);
    assert_eq!(entries[0].balance_after, 10000);
    assert_eq!(entries[0].order_no.as_deref(), Some(created.platform_order_no.as_str()));
}

#[tokio::test]
async fn test_callback_replay_does_not_double_credit() {
    let h = harness();

    let created = h
        .service
        .create_order(create_request("ORDER_0001", "100.00"))
        .await
        .unwrap();

    let payload = success_callback(&created.platform_order_no, 10000);
    h.service
        .handle_callback(ProviderCode::Wanpay, payload.clone())
        .await
        .unwrap();
    // 回调重放：静默接受，不再流转也不再入账
    h.service
        .handle_callback(ProviderCode::Wanpay, payload)
        .await
        .unwrap();

    assert_eq!(h.balances.balance_of("M1001").await.unwrap(), 10000);
    assert_eq!(h.balances.entries_of("M1001").await.len(), 1);
}

#[tokio::test]
async fn test_failed_callback_marks_order_failed() {
    let h = harness();

    let created = h
        .service
        .create_order(create_request("ORDER_0001", "100.00"))
        .await
        .unwrap();

    h.service
        .handle_callback(
            ProviderCode::Wanpay,
            json!({
                "order_no": created.platform_order_no,
                "status": "failed",
            }),
        )
        .await
        .unwrap();

    let order = h
        .orders
        .find_by_platform_no(&created.platform_order_no)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status, OrderStatus::Failed);
    // 失败不入账
    assert_eq!(h.balances.balance_of("M1001").await.unwrap(), 0);
}

#[tokio::test]
async fn test_pending_callback_leaves_order_paying() {
    let h = harness();

    let created = h
        .service
        .create_order(create_request("ORDER_0001", "100.00"))
        .await
        .unwrap();

    h.service
        .handle_callback(
            ProviderCode::Wanpay,
            json!({
                "order_no": created.platform_order_no,
                "status": "pending",
            }),
        )
        .await
        .unwrap();

    let order = h
        .orders
        .find_by_platform_no(&created.platform_order_no)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status, OrderStatus::Paying);
}

#[tokio::test]
async fn test_callback_for_unknown_order() {
    let h = harness();
    let result = h
        .service
        .handle_callback(
            ProviderCode::Wanpay,
            success_callback("P00000000000000000000", 100),
        )
        .await;
    assert!(matches!(result, Err(DomainError::OrderNotFound(_))));
}

#[tokio::test]
async fn test_query_reconciliation_settles() {
    let h = harness();

    let created = h
        .service
        .create_order(create_request("ORDER_0001", "66.60"))
        .await
        .unwrap();

    // 网关侧仍在处理
    let response = h.service.query_order(&created.platform_order_no).await.unwrap();
    assert_eq!(response.status, "paying");

    // 网关侧已支付，主动查询对账收敛到 success
    h.gateway.script_query("success");
    let response = h.service.query_order(&created.platform_order_no).await.unwrap();
    assert_eq!(response.status, "success");
    assert_eq!(h.balances.balance_of("M1001").await.unwrap(), 6660);

    // 终态后查询不再触发网关与入账
    h.gateway.script_query("failed");
    let response = h.service.query_order(&created.platform_order_no).await.unwrap();
    assert_eq!(response.status, "success");
    assert_eq!(h.balances.entries_of("M1001").await.len(), 1);
}

#[tokio::test]
async fn test_refund_debits_balance() {
    let h = harness();

    let created = h
        .service
        .create_order(create_request("ORDER_0001", "100.00"))
        .await
        .unwrap();
    h.service
        .handle_callback(
            ProviderCode::Wanpay,
            success_callback(&created.platform_order_no, 10000),
        )
        .await
        .unwrap();

    let refunded = h
        .service
        .refund_order(&created.platform_order_no, "ops_admin")
        .await
        .unwrap();
    assert_eq!(refunded.status, "refunded");
    assert_eq!(h.balances.balance_of("M1001").await.unwrap(), 0);

    let entries = h.balances.entries_of("M1001").await;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].operation, OperationType::Debit);
    assert_eq!(entries[1].amount_cents, -10000);
    assert_eq!(entries[1].operator, "ops_admin");

    // 已退款订单不允许二次退款
    let result = h.service.refund_order(&created.platform_order_no, "ops_admin").await;
    assert!(matches!(result, Err(DomainError::InvalidState { .. })));
}

#[tokio::test]
async fn test_refund_insufficient_balance_keeps_order_success() {
    let h = harness();

    let created = h
        .service
        .create_order(create_request("ORDER_0001", "100.00"))
        .await
        .unwrap();
    h.service
        .handle_callback(
            ProviderCode::Wanpay,
            success_callback(&created.platform_order_no, 10000),
        )
        .await
        .unwrap();

    // 结算款已被划走，退款将余额打穿
    h.ledger
        .apply_delta("M1001", -9000, OperationType::Debit, "treasury", None, None)
        .await
        .unwrap();

    let result = h
        .service
        .refund_order(&created.platform_order_no, "ops_admin")
        .await;
    assert!(matches!(result, Err(DomainError::InsufficientBalance { .. })));

    // 订单保持 success，余额与流水不变
    let order = h
        .orders
        .find_by_platform_no(&created.platform_order_no)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status, OrderStatus::Success);
    assert_eq!(h.balances.balance_of("M1001").await.unwrap(), 1000);
    assert_eq!(h.balances.entries_of("M1001").await.len(), 2);
}

#[tokio::test]
async fn test_close_after_failure() {
    let h = harness();

    let created = h
        .service
        .create_order(create_request("ORDER_0001", "20.00"))
        .await
        .unwrap();

    // 支付中的订单不允许直接关闭
    let result = h.service.close_order(&created.platform_order_no).await;
    assert!(matches!(result, Err(DomainError::InvalidState { .. })));

    h.service
        .handle_callback(
            ProviderCode::Wanpay,
            json!({
                "order_no": created.platform_order_no,
                "status": "failed",
            }),
        )
        .await
        .unwrap();

    let closed = h.service.close_order(&created.platform_order_no).await.unwrap();
    assert_eq!(closed.status, "closed");
}

#[tokio::test]
async fn test_callback_race_with_query_settles_once() {
    let h = harness();

    let created = h
        .service
        .create_order(create_request("ORDER_0001", "100.00"))
        .await
        .unwrap();

    h.gateway.script_query("success");
    let payload = success_callback(&created.platform_order_no, 10000);

    let service_a = h.service.clone();
    let service_b = h.service.clone();
    let no_a = created.platform_order_no.clone();
    let task_a = tokio::spawn(async move { service_a.query_order(&no_a).await });
    let task_b =
        tokio::spawn(async move { service_b.handle_callback(ProviderCode::Wanpay, payload).await });

    task_a.await.unwrap().unwrap();
    task_b.await.unwrap().unwrap();

    // 并发对账与回调只结算一次
    assert_eq!(h.balances.balance_of("M1001").await.unwrap(), 10000);
    assert_eq!(h.balances.entries_of("M1001").await.len(), 1);
}
