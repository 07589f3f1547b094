//! Stripe PaymentIntents via REST API (no SDK dependency)

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use super::{GatewayError, IntentMetadata, IntentStatus, PaymentGateway, PaymentIntent, Refund};

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com/v1";

#[derive(Clone)]
pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: String,
    api_base: String,
}

impl StripeGateway {
    /// `request_timeout` bounds each HTTP round trip; callers add their own
    /// overall deadline on top.
    pub fn new(
        secret_key: impl Into<String>,
        api_base: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            client,
            secret_key: secret_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    async fn post(&self, path: &str, form: &[(&str, &str)]) -> Result<Value, GatewayError> {
        let resp = self
            .client
            .post(format!("{}{path}", self.api_base))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(form)
            .send()
            .await?;
        read_response(resp).await
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, GatewayError> {
        let resp = self
            .client
            .get(format!("{}{path}", self.api_base))
            .basic_auth(&self.secret_key, None::<&str>)
            .query(query)
            .send()
            .await?;
        read_response(resp).await
    }
}

async fn read_response(resp: reqwest::Response) -> Result<Value, GatewayError> {
    let status = resp.status();
    let body: Value = resp.json().await?;
    if !status.is_success() {
        let message = body["error"]["message"]
            .as_str()
            .map(String::from)
            .unwrap_or_else(|| format!("Stripe request failed with status {status}"));
        return Err(GatewayError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(body)
}

/// Map a PaymentIntent object to the gateway-neutral view
pub(crate) fn parse_intent(value: &Value) -> Result<PaymentIntent, GatewayError> {
    let id = value["id"]
        .as_str()
        .ok_or_else(|| GatewayError::InvalidResponse(format!("payment intent without id: {value}")))?;
    let status = value["status"].as_str().ok_or_else(|| {
        GatewayError::InvalidResponse(format!("payment intent {id} without status"))
    })?;

    // latest_charge is an object only when expanded
    let receipt_url = value["latest_charge"]["receipt_url"]
        .as_str()
        .or_else(|| value["charges"]["data"][0]["receipt_url"].as_str())
        .map(String::from);

    Ok(PaymentIntent {
        id: id.to_string(),
        status: IntentStatus::parse(status),
        amount: value["amount"].as_i64().unwrap_or_default(),
        currency: value["currency"].as_str().unwrap_or_default().to_string(),
        receipt_url,
        last_error: value["last_payment_error"]["message"]
            .as_str()
            .map(String::from),
    })
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_intent(
        &self,
        amount: i64,
        currency: &str,
        metadata: &IntentMetadata,
    ) -> Result<PaymentIntent, GatewayError> {
        let amount = amount.to_string();
        let resp = self
            .post(
                "/payment_intents",
                &[
                    ("amount", amount.as_str()),
                    ("currency", currency),
                    ("payment_method_types[]", "card"),
                    ("metadata[order_id]", metadata.order_id.as_str()),
                    ("metadata[user_id]", metadata.user_id.as_str()),
                ],
            )
            .await?;
        parse_intent(&resp)
    }

    async fn get_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        let resp = self
            .get(
                &format!("/payment_intents/{intent_id}"),
                &[("expand[]", "latest_charge")],
            )
            .await?;
        parse_intent(&resp)
    }

    async fn confirm_intent(
        &self,
        intent_id: &str,
        payment_method: &str,
    ) -> Result<PaymentIntent, GatewayError> {
        let resp = self
            .post(
                &format!("/payment_intents/{intent_id}/confirm"),
                &[
                    ("payment_method", payment_method),
                    ("expand[]", "latest_charge"),
                ],
            )
            .await?;
        parse_intent(&resp)
    }

    async fn cancel_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        let resp = self
            .post(&format!("/payment_intents/{intent_id}/cancel"), &[])
            .await?;
        parse_intent(&resp)
    }

    async fn refund(&self, intent_id: &str, amount: Option<i64>) -> Result<Refund, GatewayError> {
        let amount = amount.map(|a| a.to_string());
        let mut form = vec![("payment_intent", intent_id)];
        if let Some(amount) = amount.as_deref() {
            form.push(("amount", amount));
        }
        let resp = self.post("/refunds", &form).await?;

        let id = resp["id"]
            .as_str()
            .ok_or_else(|| GatewayError::InvalidResponse(format!("refund without id: {resp}")))?;
        Ok(Refund {
            id: id.to_string(),
            status: resp["status"].as_str().unwrap_or_default().to_string(),
        })
    }
}
