//! Shared fixtures: scripted gateway, temp database, order/payment helpers
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use commerce_server::AppState;
use commerce_server::gateway::{
    GatewayError, IntentMetadata, IntentStatus, PaymentGateway, PaymentIntent, Refund,
    WebhookEvent, WebhookEventData, sign_payload,
};
use commerce_server::payments::PaymentSettings;
use commerce_server::state::WebhookSettings;
use commerce_server::storage::CommerceStorage;
use serde_json::{Value, json};
use shared::Address;
use shared::order::{CreateOrderInput, Order, OrderItem, ShippingInfo};
use shared::payment::{CreatePaymentInput, Payment};
use tempfile::TempDir;

pub const WEBHOOK_SECRET: &str = "whsec_integration_test";
pub const ADDRESS_ID: &str = "addr-home";

/// Mutable script driving [`ScriptedGateway`]
#[derive(Default)]
pub struct GatewayScript {
    /// Current view of every intent the gateway knows
    pub intents: HashMap<String, PaymentIntent>,
    /// Status returned by `confirm_intent` (succeeded when unset)
    pub confirm_status: Option<IntentStatus>,
    pub fail_create: Option<String>,
    pub fail_get: Option<String>,
    pub fail_confirm: Option<String>,
    pub fail_cancel: Option<String>,
    pub fail_refund: Option<String>,
    /// Delay applied to every call before answering
    pub delay: Option<Duration>,
    /// Call log, e.g. `refund:pi_test_1:Some(5000)`
    pub calls: Vec<String>,
    created: u32,
}

/// In-process gateway answering from a script
#[derive(Default)]
pub struct ScriptedGateway {
    script: Mutex<GatewayScript>,
}

fn api_error(message: &str) -> GatewayError {
    GatewayError::Api {
        status: 402,
        message: message.to_string(),
    }
}

impl ScriptedGateway {
    pub fn script(&self) -> MutexGuard<'_, GatewayScript> {
        self.script.lock().unwrap()
    }

    pub fn set_status(&self, intent_id: &str, status: IntentStatus) {
        let mut script = self.script();
        let intent = script
            .intents
            .get_mut(intent_id)
            .expect("intent created by this gateway");
        intent.status = status;
        if intent.status == IntentStatus::Succeeded {
            intent.receipt_url = Some(format!("https://pay.example/receipts/{intent_id}"));
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.script().calls.clone()
    }

    async fn pause(&self) {
        let delay = self.script().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn create_intent(
        &self,
        amount: i64,
        currency: &str,
        metadata: &IntentMetadata,
    ) -> Result<PaymentIntent, GatewayError> {
        self.pause().await;
        let mut script = self.script();
        script
            .calls
            .push(format!("create_intent:{amount}:{currency}:{}", metadata.order_id));
        if let Some(message) = &script.fail_create {
            return Err(api_error(message));
        }
        script.created += 1;
        let intent = PaymentIntent {
            id: format!("pi_test_{}", script.created),
            status: IntentStatus::RequiresPaymentMethod,
            amount,
            currency: currency.to_string(),
            receipt_url: None,
            last_error: None,
        };
        script.intents.insert(intent.id.clone(), intent.clone());
        Ok(intent)
    }

    async fn get_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        self.pause().await;
        let mut script = self.script();
        script.calls.push(format!("get_intent:{intent_id}"));
        if let Some(message) = &script.fail_get {
            return Err(api_error(message));
        }
        script
            .intents
            .get(intent_id)
            .cloned()
            .ok_or_else(|| api_error("No such payment_intent"))
    }

    async fn confirm_intent(
        &self,
        intent_id: &str,
        payment_method: &str,
    ) -> Result<PaymentIntent, GatewayError> {
        self.pause().await;
        let mut script = self.script();
        script
            .calls
            .push(format!("confirm_intent:{intent_id}:{payment_method}"));
        if let Some(message) = &script.fail_confirm {
            return Err(api_error(message));
        }
        let status = script
            .confirm_status
            .clone()
            .unwrap_or(IntentStatus::Succeeded);
        let intent = script
            .intents
            .get_mut(intent_id)
            .ok_or_else(|| api_error("No such payment_intent"))?;
        intent.status = status;
        if intent.status == IntentStatus::Succeeded {
            intent.receipt_url = Some(format!("https://pay.example/receipts/{intent_id}"));
        }
        Ok(intent.clone())
    }

    async fn cancel_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        self.pause().await;
        let mut script = self.script();
        script.calls.push(format!("cancel_intent:{intent_id}"));
        if let Some(message) = &script.fail_cancel {
            return Err(api_error(message));
        }
        let intent = script
            .intents
            .get_mut(intent_id)
            .ok_or_else(|| api_error("No such payment_intent"))?;
        intent.status = IntentStatus::Canceled;
        Ok(intent.clone())
    }

    async fn refund(&self, intent_id: &str, amount: Option<i64>) -> Result<Refund, GatewayError> {
        self.pause().await;
        let mut script = self.script();
        script.calls.push(format!("refund:{intent_id}:{amount:?}"));
        if let Some(message) = &script.fail_refund {
            return Err(api_error(message));
        }
        Ok(Refund {
            id: format!("re_{intent_id}"),
            status: "succeeded".to_string(),
        })
    }
}

/// Application wired over a temp database and a scripted gateway
pub struct TestApp {
    pub state: AppState,
    pub gateway: Arc<ScriptedGateway>,
    pub storage: CommerceStorage,
    _dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(2))
    }

    pub fn with_timeout(gateway_timeout: Duration) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let storage = CommerceStorage::open(dir.path().join("commerce.redb")).unwrap();
        let gateway = Arc::new(ScriptedGateway::default());
        let state = AppState::from_parts(
            storage.clone(),
            gateway.clone(),
            PaymentSettings {
                gateway_timeout,
                ..Default::default()
            },
            WebhookSettings {
                secret: WEBHOOK_SECRET.to_string(),
                tolerance_secs: 300,
            },
        );
        state
            .addresses
            .register(&Address {
                id: ADDRESS_ID.to_string(),
                user_id: "user-1".to_string(),
                street: "742 Evergreen Terrace".to_string(),
                city: "Springfield".to_string(),
                state: Some("OR".to_string()),
                postal_code: "97475".to_string(),
                country: "US".to_string(),
            })
            .unwrap();

        Self {
            state,
            gateway,
            storage,
            _dir: dir,
        }
    }

    pub async fn create_order(&self, total: f64) -> Order {
        self.state.orders.create(order_input(total)).await.unwrap()
    }

    pub async fn create_payment(&self, order: &Order, method: &str) -> Payment {
        self.state
            .payments
            .create(payment_input(order, method, order.total))
            .await
            .unwrap()
    }

    /// Order plus a PENDING gateway payment whose intent reports `status`
    pub async fn gateway_payment(&self, total: f64, status: IntentStatus) -> (Order, Payment) {
        let order = self.create_order(total).await;
        let payment = self.create_payment(&order, "stripe").await;
        self.gateway
            .set_status(payment.payment_intent_id.as_deref().unwrap(), status);
        (order, payment)
    }

    pub fn order(&self, order_id: &str) -> Order {
        self.state.orders.find_one(order_id).unwrap()
    }

    pub fn payment(&self, payment_id: &str) -> Payment {
        self.state.payments.find_one(payment_id).unwrap()
    }
}

pub fn order_input(total: f64) -> CreateOrderInput {
    CreateOrderInput {
        user_id: "user-1".to_string(),
        items: vec![OrderItem {
            product_id: "prod-desk".to_string(),
            product_name: "Standing Desk".to_string(),
            quantity: 1,
            price: total,
            variant_id: Some("oak".to_string()),
            variant_name: Some("Oak".to_string()),
            image_url: None,
        }],
        subtotal: total,
        tax: 0.0,
        total,
        payment_method: "stripe".to_string(),
        shipping: ShippingInfo {
            address: String::new(),
            tracking_number: None,
            cost: 0.0,
        },
        address_id: Some(ADDRESS_ID.to_string()),
    }
}

pub fn payment_input(order: &Order, method: &str, amount: f64) -> CreatePaymentInput {
    CreatePaymentInput {
        order_id: order.id.clone(),
        user_id: order.user_id.clone(),
        method: method.to_string(),
        amount,
        currency: None,
    }
}

/// Gateway PaymentIntent object as carried in event payloads
pub fn intent_object(intent_id: &str, status: &str) -> Value {
    json!({
        "id": intent_id,
        "object": "payment_intent",
        "amount": 10000,
        "currency": "usd",
        "status": status,
    })
}

pub fn event(event_type: &str, object: Value) -> WebhookEvent {
    WebhookEvent {
        id: format!("evt_{}", shared::util::new_id()),
        event_type: event_type.to_string(),
        created: chrono::Utc::now().timestamp(),
        data: WebhookEventData { object },
    }
}

/// Serialized event body and a valid signature header for it
pub fn signed_event(event: &WebhookEvent) -> (Vec<u8>, String) {
    let body = serde_json::to_vec(event).unwrap();
    let header = sign_payload(&body, WEBHOOK_SECRET, chrono::Utc::now().timestamp());
    (body, header)
}
