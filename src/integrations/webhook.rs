//! HTTP webhook event sink.
//!
//! Delivers session events (lead captured, report sent, consultation
//! scheduled) to business-owner endpoints as signed JSON POSTs. Delivery is
//! fire-and-forget: `notify` spawns the request and returns; a failed
//! delivery is logged and never disturbs the session.
//!
//! Each request carries an `X-LiveAgent-Signature` header: the hex-encoded
//! HMAC-SHA256 of the exact request body under the endpoint's signing secret,
//! so receivers can authenticate the payload.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use super::{EventSink, WebhookEvent};

type HmacSha256 = Hmac<Sha256>;

/// Signature header name.
pub const SIGNATURE_HEADER: &str = "X-LiveAgent-Signature";

/// Per-request delivery timeout.
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// One registered webhook endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEndpoint {
    pub url: String,
    /// Event kinds this endpoint subscribes to
    pub events: Vec<WebhookEvent>,
    /// Shared secret for payload signing
    pub signing_secret: String,
}

impl WebhookEndpoint {
    fn subscribes_to(&self, event: WebhookEvent) -> bool {
        self.events.contains(&event)
    }
}

/// Compute the hex HMAC-SHA256 signature of a payload body.
pub fn sign_payload(secret: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Webhook-dispatching [`EventSink`].
pub struct WebhookSink {
    client: reqwest::Client,
    endpoints: Vec<WebhookEndpoint>,
    customer_id: String,
}

impl WebhookSink {
    pub fn new(customer_id: impl Into<String>, endpoints: Vec<WebhookEndpoint>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DELIVERY_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoints,
            customer_id: customer_id.into(),
        }
    }

    fn build_body(&self, event: WebhookEvent, payload: &serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "event": event.as_str(),
            "customer_id": self.customer_id,
            "timestamp": OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .unwrap_or_default(),
            "payload": payload,
        })
    }
}

impl EventSink for WebhookSink {
    fn notify(&self, event: WebhookEvent, payload: serde_json::Value) {
        let body = self.build_body(event, &payload);
        let Ok(raw) = serde_json::to_vec(&body) else {
            tracing::error!(%event, "Failed to serialize webhook payload");
            return;
        };

        for endpoint in self.endpoints.iter().filter(|e| e.subscribes_to(event)) {
            let client = self.client.clone();
            let url = endpoint.url.clone();
            let signature = sign_payload(&endpoint.signing_secret, &raw);
            let raw = raw.clone();

            tokio::spawn(async move {
                let result = client
                    .post(&url)
                    .header("Content-Type", "application/json")
                    .header(SIGNATURE_HEADER, signature)
                    .body(raw)
                    .send()
                    .await;
                match result {
                    Ok(response) if response.status().is_success() => {
                        tracing::debug!(%url, "Webhook delivered");
                    }
                    Ok(response) => {
                        tracing::warn!(%url, status = %response.status(), "Webhook rejected");
                    }
                    Err(e) => {
                        tracing::warn!(%url, "Webhook delivery failed: {}", e);
                    }
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_payload_is_deterministic() {
        let a = sign_payload("secret", b"{\"event\":\"lead_captured\"}");
        let b = sign_payload("secret", b"{\"event\":\"lead_captured\"}");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, sign_payload("other", b"{\"event\":\"lead_captured\"}"));
        assert_ne!(a, sign_payload("secret", b"{}"));
    }

    #[test]
    fn test_body_shape() {
        let sink = WebhookSink::new("cust_remodel_456", Vec::new());
        let body = sink.build_body(
            WebhookEvent::LeadCaptured,
            &serde_json::json!({ "name": "Ada" }),
        );
        assert_eq!(body["event"], "lead_captured");
        assert_eq!(body["customer_id"], "cust_remodel_456");
        assert_eq!(body["payload"]["name"], "Ada");
        assert!(body["timestamp"].as_str().unwrap().contains('T'));
    }

    #[tokio::test]
    async fn test_delivery_with_signature() {
        use wiremock::matchers::{header_exists, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hooks/lead"))
            .and(header_exists(SIGNATURE_HEADER))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let sink = WebhookSink::new(
            "cust_1",
            vec![WebhookEndpoint {
                url: format!("{}/hooks/lead", server.uri()),
                events: vec![WebhookEvent::LeadCaptured],
                signing_secret: "whsec_test".to_string(),
            }],
        );

        sink.notify(
            WebhookEvent::LeadCaptured,
            serde_json::json!({ "phone": "555-0100" }),
        );

        // Delivery is spawned; wait for the mock to observe it.
        for _ in 0..100 {
            if !server.received_requests().await.unwrap_or_default().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let signature = requests[0]
            .headers
            .get(SIGNATURE_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert_eq!(signature, sign_payload("whsec_test", &requests[0].body));
    }

    #[tokio::test]
    async fn test_unsubscribed_endpoint_not_notified() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let sink = WebhookSink::new(
            "cust_1",
            vec![WebhookEndpoint {
                url: server.uri(),
                events: vec![WebhookEvent::ReportSent],
                signing_secret: "s".to_string(),
            }],
        );
        sink.notify(WebhookEvent::LeadCaptured, serde_json::json!({}));
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
