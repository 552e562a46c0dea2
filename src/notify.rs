//! Order-event notification dispatch.
//!
//! Fire-and-forget: a status transition must never be rolled back or delayed
//! because a webhook is down, so dispatch happens on a spawned task and
//! failures are only logged.

use reqwest::Client;
use serde::Serialize;

use crate::models::OrderStatus;

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderEvent {
    Created,
    SlipUploaded,
    Confirmed,
    Rejected,
    Cancelled,
    Refunded,
    Rescheduled,
}

#[derive(Debug, Serialize)]
struct EventPayload {
    event: OrderEvent,
    order_id: String,
    creator_id: String,
    status: OrderStatus,
}

#[derive(Clone)]
pub struct Notifier {
    webhook_url: Option<String>,
    http_client: Client,
}

impl Notifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            webhook_url,
            http_client: Client::new(),
        }
    }

    /// No-op notifier for tests and webhook-less deployments.
    pub fn disabled() -> Self {
        Self::new(None)
    }

    pub fn order_event(
        &self,
        event: OrderEvent,
        order_id: &str,
        creator_id: &str,
        status: OrderStatus,
    ) {
        let Some(url) = self.webhook_url.clone() else {
            tracing::debug!(?event, order_id, "order event (no webhook configured)");
            return;
        };

        let payload = EventPayload {
            event,
            order_id: order_id.to_string(),
            creator_id: creator_id.to_string(),
            status,
        };
        let client = self.http_client.clone();
        let order_id = order_id.to_string();

        tokio::spawn(async move {
            let result = client
                .post(&url)
                .header("X-Sellio-Event", "order_event")
                .json(&payload)
                .send()
                .await;
            match result {
                Ok(resp) if resp.status().is_success() => {
                    tracing::debug!(order_id, "order event webhook delivered");
                }
                Ok(resp) => {
                    tracing::warn!(order_id, status = %resp.status(), "order event webhook rejected");
                }
                Err(e) => {
                    tracing::warn!(order_id, error = %e, "order event webhook failed");
                }
            }
        });
    }
}
