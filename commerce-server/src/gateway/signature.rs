//! Webhook signature verification (Stripe scheme)
//!
//! Header format: `t=<unix seconds>,v1=<hex hmac>[,v1=...]`. The signed
//! payload is `"{t}.{raw body}"`, keyed with the endpoint secret, HMAC-SHA256.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

use super::WebhookEvent;

/// Header carrying the webhook signature
pub const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("Invalid signature header")]
    MalformedHeader,

    #[error("Webhook signature mismatch")]
    Mismatch,

    #[error("Webhook timestamp outside tolerance")]
    TimestampOutOfTolerance,

    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

/// Verify `sig_header` against `payload` with the endpoint `secret`.
///
/// `now` is unix seconds; timestamps further than `tolerance_secs` from it
/// are rejected to limit replay.
pub fn verify_signature(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in sig_header.split(',') {
        let part = part.trim();
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = Some(t);
        } else if let Some(v) = part.strip_prefix("v1=") {
            signatures.push(v);
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(SignatureError::MalformedHeader);
    }
    let ts: i64 = timestamp
        .parse()
        .map_err(|_| SignatureError::MalformedHeader)?;

    // Constant-time comparison via hmac::verify_slice
    let matched = signatures.iter().any(|signature| {
        let Ok(sig_bytes) = hex::decode(signature) else {
            return false;
        };
        signed_mac(secret, timestamp, payload)
            .is_some_and(|mac| mac.verify_slice(&sig_bytes).is_ok())
    });
    if !matched {
        return Err(SignatureError::Mismatch);
    }

    if (now - ts).abs() > tolerance_secs {
        return Err(SignatureError::TimestampOutOfTolerance);
    }
    Ok(())
}

/// Verify the signature and parse the event
pub fn construct_event(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
    tolerance_secs: i64,
) -> Result<WebhookEvent, SignatureError> {
    let now = chrono::Utc::now().timestamp();
    verify_signature(payload, sig_header, secret, tolerance_secs, now)?;
    Ok(serde_json::from_slice(payload)?)
}

/// Produce a signature header for `payload`, as the gateway would
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let ts = timestamp.to_string();
    let signature = signed_mac(secret, &ts, payload)
        .map(|mac| hex::encode(mac.finalize().into_bytes()))
        .unwrap_or_default();
    format!("t={ts},v1={signature}")
}

fn signed_mac(secret: &str, timestamp: &str, payload: &[u8]) -> Option<Hmac<Sha256>> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Some(mac)
}
