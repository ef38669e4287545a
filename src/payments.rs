//! Payment provider client (Stripe REST API) and webhook signature checks.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

/// Webhook timestamps older than this are rejected.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    api_base: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

impl StripeClient {
    pub fn new(secret_key: String, api_base: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    pub async fn create_payment_intent(
        &self,
        amount: i64,
        currency: &str,
        customer_ref: &str,
    ) -> anyhow::Result<PaymentIntent> {
        let amount = amount.to_string();
        let params = [
            ("amount", amount.as_str()),
            ("currency", currency),
            ("automatic_payment_methods[enabled]", "true"),
            ("metadata[user_id]", customer_ref),
        ];

        let response = self
            .http
            .post(format!("{}/v1/payment_intents", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .json::<StripeErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or_else(|| "unknown error".to_string());
            anyhow::bail!("payment provider returned {status}: {message}");
        }

        Ok(response.json::<PaymentIntent>().await?)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("No signatures found matching the expected signature for payload")]
    Mismatch,
    #[error("Unable to extract timestamp and signatures from header")]
    Malformed,
    #[error("Timestamp outside the tolerance zone")]
    Expired,
}

/// Checks a `Stripe-Signature` header (`t=<unix>,v1=<hex>[,v1=<hex>...]`)
/// against the raw request body.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now_unix: i64,
) -> Result<(), SignatureError> {
    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<&str> = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
    let ts: i64 = timestamp.parse().map_err(|_| SignatureError::Malformed)?;
    if signatures.is_empty() {
        return Err(SignatureError::Malformed);
    }
    if now_unix.abs_diff(ts) > SIGNATURE_TOLERANCE_SECS.unsigned_abs() {
        return Err(SignatureError::Expired);
    }

    for candidate in signatures {
        let Ok(expected) = hex::decode(candidate) else {
            continue;
        };
        let Some(mac) = signed_payload_mac(secret, timestamp, payload) else {
            return Err(SignatureError::Mismatch);
        };
        if mac.verify_slice(&expected).is_ok() {
            return Ok(());
        }
    }
    Err(SignatureError::Mismatch)
}

/// Builds the header value a provider would send. Used by tests and local tooling.
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> Option<String> {
    let ts = timestamp.to_string();
    let mac = signed_payload_mac(secret, &ts, payload)?;
    Some(format!(
        "t={ts},v1={}",
        hex::encode(mac.finalize().into_bytes())
    ))
}

fn signed_payload_mac(secret: &str, timestamp: &str, payload: &[u8]) -> Option<Hmac<Sha256>> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Some(mac)
}

/// The slice of a provider event the webhook needs.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEventData {
    pub object: WebhookObject,
}

#[derive(Debug, Deserialize)]
pub struct WebhookObject {
    pub id: String,
}

pub const PAYMENT_SUCCEEDED: &str = "payment_intent.succeeded";
