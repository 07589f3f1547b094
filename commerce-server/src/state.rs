//! Application state for commerce-server

use std::sync::Arc;

use anyhow::Context;

use crate::address::StoredAddressBook;
use crate::config::Config;
use crate::gateway::{PaymentGateway, StripeGateway};
use crate::orders::OrderManager;
use crate::payments::{PaymentManager, PaymentSettings};
use crate::storage::CommerceStorage;
use crate::webhook::WebhookHandler;

/// Webhook verification settings
#[derive(Debug, Clone)]
pub struct WebhookSettings {
    /// Endpoint signing secret
    pub secret: String,
    /// Max age of a signed timestamp, seconds
    pub tolerance_secs: i64,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Document store
    pub storage: CommerceStorage,
    /// Address collaborator
    pub addresses: StoredAddressBook,
    /// Order lifecycle
    pub orders: OrderManager,
    /// Payment reconciliation
    pub payments: PaymentManager,
    /// Gateway event dispatcher
    pub webhooks: WebhookHandler,
    /// Webhook signature settings
    pub webhook: WebhookSettings,
}

impl AppState {
    /// Open the database and connect the Stripe gateway
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let db_path = config.database_path();
        let storage = CommerceStorage::open(&db_path)
            .with_context(|| format!("opening database {}", db_path.display()))?;
        tracing::info!(path = %db_path.display(), "Database opened");

        let gateway = StripeGateway::new(
            config.stripe_secret_key.clone(),
            config.stripe_api_base.clone(),
            config.gateway_timeout,
        )
        .context("building gateway client")?;

        Ok(Self::from_parts(
            storage,
            Arc::new(gateway),
            config.payment_settings(),
            WebhookSettings {
                secret: config.stripe_webhook_secret.clone(),
                tolerance_secs: config.webhook_tolerance_secs,
            },
        ))
    }

    /// Wire the managers over an existing store and gateway
    pub fn from_parts(
        storage: CommerceStorage,
        gateway: Arc<dyn PaymentGateway>,
        settings: PaymentSettings,
        webhook: WebhookSettings,
    ) -> Self {
        let addresses = StoredAddressBook::new(storage.clone());
        let orders = OrderManager::new(storage.clone(), Arc::new(addresses.clone()));
        let payments = PaymentManager::new(storage.clone(), orders.clone(), gateway, settings);
        let webhooks = WebhookHandler::new(payments.clone());

        Self {
            storage,
            addresses,
            orders,
            payments,
            webhooks,
            webhook,
        }
    }
}
