use std::{collections::HashMap, time::Duration};

use anyhow::{Context, Result};
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use sha2::Sha256;
use tracing::error;

type HmacSha256 = Hmac<Sha256>;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Signed webhooks older than this are rejected.
pub const WEBHOOK_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Clone)]
pub struct StripeSettings {
    pub secret_key: String,
    pub webhook_secret: String,
    pub success_url: String,
    pub cancel_url: String,
    pub currency: String,
    pub timeout: Duration,
}

/// Minimal Stripe client built on reqwest.
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    webhook_secret: String,
    success_url: String,
    cancel_url: String,
    currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSessionHandle {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub type_: String,
    pub created: Option<i64>,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    pub payment_status: Option<String>,
    pub amount_total: Option<i64>,
    pub metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorDetails,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetails {
    #[serde(rename = "type")]
    type_: Option<String>,
    code: Option<String>,
    message: Option<String>,
    param: Option<String>,
}

#[derive(Deserialize)]
struct IdResp {
    id: String,
}

impl StripeClient {
    pub fn new(settings: StripeSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("failed to build stripe http client")?;

        Ok(Self {
            http,
            secret_key: settings.secret_key,
            webhook_secret: settings.webhook_secret,
            success_url: settings.success_url,
            cancel_url: settings.cancel_url,
            currency: settings.currency.to_lowercase(),
        })
    }

    /// On failure the error text is Stripe's own message when the body
    /// carries one, so callers can hand it to the client unchanged.
    async fn ensure_success(resp: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let request_id = resp
            .headers()
            .get("request-id")
            .or_else(|| resp.headers().get("stripe-request-id"))
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let details = serde_json::from_str::<StripeErrorEnvelope>(&body)
            .ok()
            .map(|envelope| envelope.error);

        error!(
            status = %status,
            stripe_request_id = ?request_id,
            stripe_error_type = ?details.as_ref().and_then(|d| d.type_.as_deref()),
            stripe_error_code = ?details.as_ref().and_then(|d| d.code.as_deref()),
            stripe_error_param = ?details.as_ref().and_then(|d| d.param.as_deref()),
            response_body = %body,
            context = %context,
            "stripe api request failed"
        );

        match details.and_then(|d| d.message) {
            Some(message) => anyhow::bail!(message),
            None => anyhow::bail!("Stripe API request failed: {context} (status {status})"),
        }
    }

    async fn post_form(
        &self,
        path: &str,
        body: &[(String, String)],
        context: &str,
    ) -> Result<reqwest::Response> {
        let resp = self
            .http
            .post(format!("{STRIPE_API_BASE}{path}"))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(body)
            .send()
            .await
            .with_context(|| format!("stripe {context}: request not completed"))?;

        Self::ensure_success(resp, context).await
    }

    /// https://stripe.com/docs/api/products/create
    pub async fn create_product(&self, name: &str) -> Result<String> {
        let body = vec![("name".to_string(), name.to_string())];
        let resp = self.post_form("/products", &body, "create product").await?;

        let parsed: IdResp = resp.json().await?;
        Ok(parsed.id)
    }

    /// `unit_amount` is in minor units of the configured currency.
    pub async fn create_price(&self, product_id: &str, unit_amount: i64) -> Result<String> {
        let body = vec![
            ("currency".to_string(), self.currency.clone()),
            ("unit_amount".to_string(), unit_amount.to_string()),
            ("product".to_string(), product_id.to_string()),
        ];
        let resp = self.post_form("/prices", &body, "create price").await?;

        let parsed: IdResp = resp.json().await?;
        Ok(parsed.id)
    }

    /// One-off payment session for a single unit of `price_id`.
    pub async fn create_checkout_session(
        &self,
        price_id: &str,
        metadata: HashMap<String, String>,
    ) -> Result<CheckoutSessionHandle> {
        let mut body: Vec<(String, String)> = vec![
            ("mode".to_string(), "payment".to_string()),
            ("line_items[0][price]".to_string(), price_id.to_string()),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("success_url".to_string(), self.success_url.clone()),
            ("cancel_url".to_string(), self.cancel_url.clone()),
        ];

        let mut metadata: Vec<_> = metadata.into_iter().collect();
        metadata.sort();
        for (key, value) in metadata {
            body.push((format!("metadata[{key}]"), value));
        }

        let resp = self
            .post_form("/checkout/sessions", &body, "create checkout session")
            .await?;

        #[derive(Deserialize)]
        struct CheckoutResp {
            id: String,
            url: Option<String>,
        }

        let parsed: CheckoutResp = resp.json().await?;
        let url = parsed
            .url
            .ok_or_else(|| anyhow::anyhow!("Stripe Checkout session URL is missing"))?;

        Ok(CheckoutSessionHandle { id: parsed.id, url })
    }

    pub async fn archive_product(&self, product_id: &str) -> Result<()> {
        let body = vec![("active".to_string(), "false".to_string())];
        self.post_form(&format!("/products/{product_id}"), &body, "archive product")
            .await?;
        Ok(())
    }

    pub async fn deactivate_price(&self, price_id: &str) -> Result<()> {
        let body = vec![("active".to_string(), "false".to_string())];
        self.post_form(&format!("/prices/{price_id}"), &body, "deactivate price")
            .await?;
        Ok(())
    }

    /// https://stripe.com/docs/api/checkout/sessions/expire
    pub async fn expire_checkout_session(&self, session_id: &str) -> Result<()> {
        self.post_form(
            &format!("/checkout/sessions/{session_id}/expire"),
            &[],
            "expire checkout session",
        )
        .await?;
        Ok(())
    }

    /// Verifies the webhook signature. https://stripe.com/docs/webhooks/signatures
    pub fn verify_webhook_signature(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<StripeEvent> {
        verify_signature(
            &self.webhook_secret,
            payload,
            signature_header,
            Utc::now().timestamp(),
        )?;

        let event: StripeEvent = serde_json::from_slice(payload)?;
        Ok(event)
    }

    pub fn extract_checkout_session(event: &StripeEvent) -> Option<StripeCheckoutSession> {
        serde_json::from_value(event.data.object.clone()).ok()
    }
}

fn verify_signature(secret: &str, payload: &[u8], header: &str, now: i64) -> Result<()> {
    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in header.split(',') {
        let part = part.trim();
        if let Some(rest) = part.strip_prefix("t=") {
            timestamp = Some(rest);
        } else if let Some(rest) = part.strip_prefix("v1=") {
            signatures.push(rest);
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| anyhow::anyhow!("missing timestamp in stripe-signature"))?;
    if signatures.is_empty() {
        anyhow::bail!("missing v1 in stripe-signature");
    }

    let signed_at: i64 = timestamp
        .parse()
        .context("invalid timestamp in stripe-signature")?;
    if (now - signed_at).abs() > WEBHOOK_TOLERANCE_SECS {
        anyhow::bail!("stripe-signature timestamp outside tolerance");
    }

    let mut signed_payload = Vec::with_capacity(timestamp.len() + 1 + payload.len());
    signed_payload.extend_from_slice(timestamp.as_bytes());
    signed_payload.push(b'.');
    signed_payload.extend_from_slice(payload);

    let matched = signatures.iter().any(|candidate| {
        let Ok(provided) = hex::decode(candidate) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
            return false;
        };
        mac.update(&signed_payload);
        mac.verify_slice(&provided).is_ok()
    });

    if !matched {
        anyhow::bail!("invalid webhook signature");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";

    fn sign(payload: &[u8], timestamp: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(format!("{timestamp}.").as_bytes());
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    fn client() -> StripeClient {
        StripeClient::new(StripeSettings {
            secret_key: "sk_test".to_string(),
            webhook_secret: SECRET.to_string(),
            success_url: "https://example.com/success".to_string(),
            cancel_url: "https://example.com/cancel".to_string(),
            currency: "USD".to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn accepts_valid_signature() {
        let payload = br#"{"type":"checkout.session.completed"}"#;
        let now = 1_700_000_000;
        let header = format!("t={now},v1={}", sign(payload, now));

        assert!(verify_signature(SECRET, payload, &header, now + 10).is_ok());
    }

    #[test]
    fn accepts_any_matching_v1_entry() {
        let payload = b"{}";
        let now = 1_700_000_000;
        let header = format!("t={now},v1=deadbeef,v1={}", sign(payload, now));

        assert!(verify_signature(SECRET, payload, &header, now).is_ok());
    }

    #[test]
    fn rejects_tampered_payload() {
        let now = 1_700_000_000;
        let header = format!("t={now},v1={}", sign(b"{\"a\":1}", now));

        assert!(verify_signature(SECRET, b"{\"a\":2}", &header, now).is_err());
    }

    #[test]
    fn rejects_stale_timestamp() {
        let payload = b"{}";
        let signed_at = 1_700_000_000;
        let header = format!("t={signed_at},v1={}", sign(payload, signed_at));

        let err = verify_signature(
            SECRET,
            payload,
            &header,
            signed_at + WEBHOOK_TOLERANCE_SECS + 1,
        )
        .unwrap_err();
        assert!(err.to_string().contains("tolerance"));
    }

    #[test]
    fn rejects_header_without_signature() {
        assert!(verify_signature(SECRET, b"{}", "t=1700000000", 1_700_000_000).is_err());
    }

    #[test]
    fn client_parses_signed_event() {
        let payload = br#"{"id":"evt_1","type":"checkout.session.completed","data":{"object":{"id":"cs_test_1","payment_status":"paid"}}}"#;
        let now = Utc::now().timestamp();
        let header = format!("t={now},v1={}", sign(payload, now));

        let event = client().verify_webhook_signature(payload, &header).unwrap();
        assert_eq!(event.type_, "checkout.session.completed");

        let session = StripeClient::extract_checkout_session(&event).unwrap();
        assert_eq!(session.id, "cs_test_1");
        assert_eq!(session.payment_status.as_deref(), Some("paid"));
    }
}
