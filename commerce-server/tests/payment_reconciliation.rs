mod common;

use std::time::Duration;

use commerce_server::ServiceError;
use commerce_server::error::Entity;
use commerce_server::gateway::IntentStatus;
use common::{TestApp, payment_input};
use shared::error::ErrorCode;
use shared::order::OrderStatus;
use shared::payment::{PaymentFilter, PaymentStatus, UpdatePaymentInput};

fn intent_of(payment: &shared::Payment) -> String {
    payment.payment_intent_id.clone().unwrap()
}

// ========== Creation ==========

#[tokio::test]
async fn test_create_gateway_payment_sends_minor_units() {
    let app = TestApp::new();
    let order = app.create_order(19.99).await;

    let payment = app.create_payment(&order, "Stripe").await;
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.currency, "usd");
    assert_eq!(payment.payment_intent_id.as_deref(), Some("pi_test_1"));
    assert_eq!(
        app.gateway.calls(),
        vec![format!("create_intent:1999:usd:{}", order.id)]
    );
    assert_eq!(
        app.state.payments.find_by_intent("pi_test_1").unwrap(),
        Some(payment)
    );
}

#[tokio::test]
async fn test_create_lowercases_given_currency() {
    let app = TestApp::new();
    let order = app.create_order(40.0).await;

    let mut input = payment_input(&order, "stripe", 40.0);
    input.currency = Some("EUR".to_string());
    let payment = app.state.payments.create(input).await.unwrap();
    assert_eq!(payment.currency, "eur");
}

#[tokio::test]
async fn test_amount_mismatch_persists_nothing() {
    let app = TestApp::new();
    let order = app.create_order(100.0).await;

    let err = app
        .state
        .payments
        .create(payment_input(&order, "stripe", 99.0))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::InvalidArgument {
            code: ErrorCode::PaymentAmountMismatch,
            ..
        }
    ));
    assert!(app.gateway.calls().is_empty());
    assert!(app.state.payments.find_by_order(&order.id).unwrap().is_empty());
}

#[tokio::test]
async fn test_amount_within_a_cent_is_accepted() {
    let app = TestApp::new();
    let order = app.create_order(0.3).await;

    let payment = app
        .state
        .payments
        .create(payment_input(&order, "cash", 0.1 + 0.2))
        .await
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert!(payment.payment_intent_id.is_none());
    assert_eq!(payment.amount, order.total);
}

#[tokio::test]
async fn test_sub_cent_gateway_amount_charges_order_total() {
    let app = TestApp::new();
    let order = app.create_order(100.0).await;

    let payment = app
        .state
        .payments
        .create(payment_input(&order, "stripe", 100.004))
        .await
        .unwrap();
    assert_eq!(payment.amount, 100.0);
    assert_eq!(app.payment(&payment.id).amount, order.total);
    assert_eq!(
        app.gateway.calls(),
        vec![format!("create_intent:10000:usd:{}", order.id)]
    );
}

#[tokio::test]
async fn test_intent_failure_persists_nothing() {
    let app = TestApp::new();
    let order = app.create_order(100.0).await;
    app.gateway.script().fail_create = Some("Your card was declined".to_string());

    let err = app
        .state
        .payments
        .create(payment_input(&order, "stripe", 100.0))
        .await
        .unwrap_err();
    match err {
        ServiceError::InvalidArgument { code, message } => {
            assert_eq!(code, ErrorCode::PaymentIntentFailed);
            assert_eq!(
                message,
                "Failed to create payment intent: Your card was declined"
            );
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(
        app.state
            .payments
            .find_all(&PaymentFilter::default())
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_create_for_missing_order() {
    let app = TestApp::new();
    let order = app.create_order(10.0).await;
    let mut input = payment_input(&order, "stripe", 10.0);
    input.order_id = "missing".to_string();

    let err = app.state.payments.create(input).await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::NotFound {
            entity: Entity::Order,
            ..
        }
    ));
}

// ========== Processing ==========

#[tokio::test]
async fn test_process_requires_action_keeps_everything_pending() {
    let app = TestApp::new();
    let (order, payment) = app
        .gateway_payment(100.0, IntentStatus::RequiresAction)
        .await;

    let err = app.state.payments.process(&payment.id).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Payment requires further action: requires_action"
    );
    assert_eq!(app.payment(&payment.id).status, PaymentStatus::Pending);
    assert_eq!(app.order(&order.id).status, OrderStatus::Pending);
}

#[tokio::test]
async fn test_process_succeeded_settles_and_syncs_order() {
    let app = TestApp::new();
    let (order, payment) = app.gateway_payment(100.0, IntentStatus::Succeeded).await;
    let intent_id = intent_of(&payment);

    let paid = app.state.payments.process(&payment.id).await.unwrap();
    assert_eq!(paid.status, PaymentStatus::Paid);
    assert_eq!(paid.transaction_id.as_deref(), Some(intent_id.as_str()));
    assert_eq!(
        paid.receipt_url,
        Some(format!("https://pay.example/receipts/{intent_id}"))
    );
    assert!(paid.paid_at.is_some());

    let order = app.order(&order.id);
    assert_eq!(order.status, OrderStatus::Processing);
    assert_eq!(order.payment.status, PaymentStatus::Paid);
}

#[tokio::test]
async fn test_process_paid_leaves_advanced_order_alone() {
    let app = TestApp::new();
    let (order, payment) = app.gateway_payment(60.0, IntentStatus::Succeeded).await;
    app.state.orders.process(&order.id).unwrap();
    app.state.orders.ship(&order.id, None).unwrap();

    app.state.payments.process(&payment.id).await.unwrap();
    let order = app.order(&order.id);
    assert_eq!(order.status, OrderStatus::Shipped);
    assert_eq!(order.payment.status, PaymentStatus::Paid);
}

#[tokio::test]
async fn test_process_still_processing_is_not_a_failure() {
    let app = TestApp::new();
    let (_, payment) = app.gateway_payment(20.0, IntentStatus::Processing).await;

    let err = app.state.payments.process(&payment.id).await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::InvalidState {
            entity: Entity::Payment,
            ..
        }
    ));
    assert_eq!(app.payment(&payment.id).status, PaymentStatus::Pending);
}

#[tokio::test]
async fn test_process_canceled_intent_fails_payment() {
    let app = TestApp::new();
    let (order, payment) = app.gateway_payment(20.0, IntentStatus::Canceled).await;

    let failed = app.state.payments.process(&payment.id).await.unwrap();
    assert_eq!(failed.status, PaymentStatus::Failed);
    assert_eq!(failed.failure_message.as_deref(), Some("Payment was canceled"));
    assert!(failed.failed_at.is_some());
    assert_eq!(app.order(&order.id).status, OrderStatus::Pending);
}

#[tokio::test]
async fn test_process_unknown_intent_status_uses_gateway_error() {
    let app = TestApp::new();
    let (_, payment) = app
        .gateway_payment(20.0, IntentStatus::Other("blocked".to_string()))
        .await;

    let failed = app.state.payments.process(&payment.id).await.unwrap();
    assert_eq!(failed.status, PaymentStatus::Failed);
    assert_eq!(
        failed.failure_message.as_deref(),
        Some("Unexpected payment status: blocked")
    );
}

#[tokio::test]
async fn test_process_gateway_error_is_recorded() {
    let app = TestApp::new();
    let (order, payment) = app.gateway_payment(20.0, IntentStatus::Succeeded).await;
    app.gateway.script().fail_get = Some("API temporarily unavailable".to_string());

    let failed = app.state.payments.process(&payment.id).await.unwrap();
    assert_eq!(failed.status, PaymentStatus::Failed);
    assert_eq!(
        failed.failure_message.as_deref(),
        Some("API temporarily unavailable")
    );
    assert_eq!(app.order(&order.id).status, OrderStatus::Pending);
}

#[tokio::test]
async fn test_process_gateway_timeout_is_recorded() {
    let app = TestApp::with_timeout(Duration::from_millis(50));
    let (_, payment) = app.gateway_payment(20.0, IntentStatus::Succeeded).await;
    app.gateway.script().delay = Some(Duration::from_millis(500));

    let failed = app.state.payments.process(&payment.id).await.unwrap();
    assert_eq!(failed.status, PaymentStatus::Failed);
    assert!(
        failed
            .failure_message
            .as_deref()
            .is_some_and(|m| m.contains("timed out")),
        "{:?}",
        failed.failure_message
    );
}

#[tokio::test]
async fn test_process_manual_payment_settles_without_gateway() {
    let app = TestApp::new();
    let order = app.create_order(35.0).await;
    let payment = app.create_payment(&order, "cash").await;

    let paid = app.state.payments.process(&payment.id).await.unwrap();
    assert_eq!(paid.status, PaymentStatus::Paid);
    assert!(
        paid.transaction_id
            .as_deref()
            .is_some_and(|tx| tx.starts_with("tx_"))
    );
    assert!(app.gateway.calls().is_empty());
    assert_eq!(app.order(&order.id).status, OrderStatus::Processing);
}

#[tokio::test]
async fn test_process_twice_is_rejected() {
    let app = TestApp::new();
    let (_, payment) = app.gateway_payment(20.0, IntentStatus::Succeeded).await;
    app.state.payments.process(&payment.id).await.unwrap();

    let err = app.state.payments.process(&payment.id).await.unwrap_err();
    assert_eq!(err.to_string(), "Cannot process a payment with status paid");
}

// ========== Confirmation ==========

#[tokio::test]
async fn test_confirm_settles_from_confirmed_intent() {
    let app = TestApp::new();
    let order = app.create_order(45.0).await;
    let payment = app.create_payment(&order, "stripe").await;

    let paid = app
        .state
        .payments
        .confirm(&payment.id, "pm_card_visa")
        .await
        .unwrap();
    assert_eq!(paid.status, PaymentStatus::Paid);
    assert!(
        app.gateway
            .calls()
            .contains(&format!("confirm_intent:{}:pm_card_visa", intent_of(&payment)))
    );
    assert_eq!(app.order(&order.id).status, OrderStatus::Processing);
}

#[tokio::test]
async fn test_confirm_needing_action_stays_pending() {
    let app = TestApp::new();
    let order = app.create_order(45.0).await;
    let payment = app.create_payment(&order, "stripe").await;
    app.gateway.script().confirm_status = Some(IntentStatus::RequiresAction);

    let err = app
        .state
        .payments
        .confirm(&payment.id, "pm_card_threeDSecure2Required")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidState { .. }));
    assert_eq!(app.payment(&payment.id).status, PaymentStatus::Pending);
}

#[tokio::test]
async fn test_confirm_gateway_error_is_recorded() {
    let app = TestApp::new();
    let order = app.create_order(45.0).await;
    let payment = app.create_payment(&order, "stripe").await;
    app.gateway.script().fail_confirm = Some("Your card has insufficient funds.".to_string());

    let failed = app
        .state
        .payments
        .confirm(&payment.id, "pm_card_chargeDeclined")
        .await
        .unwrap();
    assert_eq!(failed.status, PaymentStatus::Failed);
    assert_eq!(
        failed.failure_message.as_deref(),
        Some("Your card has insufficient funds.")
    );
}

#[tokio::test]
async fn test_confirm_rejects_manual_method() {
    let app = TestApp::new();
    let order = app.create_order(45.0).await;
    let payment = app.create_payment(&order, "bank_transfer").await;

    let err = app
        .state
        .payments
        .confirm(&payment.id, "pm_card_visa")
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Cannot confirm payment. Method is not stripe: bank_transfer"
    );
    assert!(app.gateway.calls().is_empty());
}

// ========== Refunds ==========

#[tokio::test]
async fn test_refund_exceeding_amount_is_rejected() {
    let app = TestApp::new();
    let (order, payment) = app.gateway_payment(50.0, IntentStatus::Succeeded).await;
    app.state.payments.process(&payment.id).await.unwrap();

    let err = app
        .state
        .payments
        .refund(&payment.id, Some(60.0))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Refund amount cannot exceed payment amount");
    assert_eq!(app.payment(&payment.id).status, PaymentStatus::Paid);
    assert_eq!(app.order(&order.id).status, OrderStatus::Processing);
    assert!(!app.gateway.calls().iter().any(|c| c.starts_with("refund:")));
}

#[tokio::test]
async fn test_full_refund_cancels_order() {
    let app = TestApp::new();
    let (order, payment) = app.gateway_payment(50.0, IntentStatus::Succeeded).await;
    app.state.payments.process(&payment.id).await.unwrap();

    let refunded = app.state.payments.refund(&payment.id, None).await.unwrap();
    assert_eq!(refunded.status, PaymentStatus::Refunded);
    assert!(
        app.gateway
            .calls()
            .contains(&format!("refund:{}:None", intent_of(&payment)))
    );

    let order = app.order(&order.id);
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert_eq!(order.payment.status, PaymentStatus::Refunded);
}

#[tokio::test]
async fn test_partial_refund_sends_minor_units() {
    let app = TestApp::new();
    let (_, payment) = app.gateway_payment(50.0, IntentStatus::Succeeded).await;
    app.state.payments.process(&payment.id).await.unwrap();

    let refunded = app
        .state
        .payments
        .refund(&payment.id, Some(20.5))
        .await
        .unwrap();
    assert_eq!(refunded.status, PaymentStatus::Refunded);
    assert_eq!(refunded.amount, 50.0);
    assert!(
        app.gateway
            .calls()
            .contains(&format!("refund:{}:Some(2050)", intent_of(&payment)))
    );
}

#[tokio::test]
async fn test_zero_refund_amount_refunds_in_full() {
    let app = TestApp::new();
    let (order, payment) = app.gateway_payment(50.0, IntentStatus::Succeeded).await;
    app.state.payments.process(&payment.id).await.unwrap();

    let refunded = app
        .state
        .payments
        .refund(&payment.id, Some(0.0))
        .await
        .unwrap();
    assert_eq!(refunded.status, PaymentStatus::Refunded);
    let calls = app.gateway.calls();
    assert!(calls.contains(&format!("refund:{}:None", intent_of(&payment))));
    assert!(!calls.iter().any(|c| c.ends_with(":Some(0)")));
    assert_eq!(app.order(&order.id).status, OrderStatus::Cancelled);
}

#[tokio::test]
async fn test_refund_gateway_failure_marks_failed() {
    let app = TestApp::new();
    let (order, payment) = app.gateway_payment(50.0, IntentStatus::Succeeded).await;
    app.state.payments.process(&payment.id).await.unwrap();
    app.gateway.script().fail_refund = Some("Charge already refunded".to_string());

    let failed = app.state.payments.refund(&payment.id, None).await.unwrap();
    assert_eq!(failed.status, PaymentStatus::Failed);
    assert_eq!(
        failed.failure_message.as_deref(),
        Some("Refund failed: Charge already refunded")
    );
    assert_eq!(app.order(&order.id).status, OrderStatus::Processing);
}

#[tokio::test]
async fn test_refund_requires_paid() {
    let app = TestApp::new();
    let (_, payment) = app.gateway_payment(50.0, IntentStatus::Succeeded).await;

    let err = app
        .state
        .payments
        .refund(&payment.id, None)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Cannot refund payment that is not paid");
}

// ========== Cancellation ==========

#[tokio::test]
async fn test_cancel_pending_payment_cancels_order() {
    let app = TestApp::new();
    let order = app.create_order(12.0).await;
    let payment = app.create_payment(&order, "stripe").await;

    let cancelled = app.state.payments.cancel(&payment.id).await.unwrap();
    assert_eq!(cancelled.status, PaymentStatus::Cancelled);
    assert!(
        app.gateway
            .calls()
            .contains(&format!("cancel_intent:{}", intent_of(&payment)))
    );

    let order = app.order(&order.id);
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert_eq!(order.payment.status, PaymentStatus::Cancelled);
}

#[tokio::test]
async fn test_cancel_gateway_failure_is_recorded() {
    let app = TestApp::new();
    let order = app.create_order(12.0).await;
    let payment = app.create_payment(&order, "stripe").await;
    app.gateway.script().fail_cancel = Some("Intent already succeeded".to_string());

    let failed = app.state.payments.cancel(&payment.id).await.unwrap();
    assert_eq!(failed.status, PaymentStatus::Failed);
    assert_eq!(
        failed.failure_message.as_deref(),
        Some("Failed to cancel payment intent: Intent already succeeded")
    );
    assert_eq!(app.order(&order.id).status, OrderStatus::Pending);
}

// ========== Administration ==========

#[tokio::test]
async fn test_admin_update_to_refunded_syncs_order() {
    let app = TestApp::new();
    let order = app.create_order(12.0).await;
    let payment = app.create_payment(&order, "cash").await;

    let updated = app
        .state
        .payments
        .update(
            &payment.id,
            UpdatePaymentInput {
                status: Some(PaymentStatus::Paid),
                transaction_id: Some("manual-42".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    assert!(updated.paid_at.is_some());
    assert_eq!(app.order(&order.id).status, OrderStatus::Processing);

    app.state
        .payments
        .update(
            &payment.id,
            UpdatePaymentInput {
                status: Some(PaymentStatus::Refunded),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(app.order(&order.id).status, OrderStatus::Cancelled);
}

#[tokio::test]
async fn test_remove_payment() {
    let app = TestApp::new();
    let order = app.create_order(12.0).await;
    let payment = app.create_payment(&order, "stripe").await;

    assert!(app.state.payments.remove(&payment.id).unwrap());
    assert!(!app.state.payments.remove(&payment.id).unwrap());
    assert_eq!(
        app.state
            .payments
            .find_by_intent(&intent_of(&payment))
            .unwrap(),
        None
    );
}
