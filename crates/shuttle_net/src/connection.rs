//! NATS connection management.
//!
//! The simulator publishes pre-encoded event frames and answers requests on
//! wildcard subscriptions, so the wrapper only needs those two operations.

use tracing::info;

use crate::error::NetError;

/// Default NATS server URL.
pub const DEFAULT_NATS_URL: &str = "nats://localhost:4222";

/// A shared `async-nats` client. Payloads are encoded by the caller.
#[derive(Debug, Clone)]
pub struct NatsConnection {
    client: async_nats::Client,
}

impl NatsConnection {
    /// Connect to NATS at the specified URL.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Connect`] if the connection cannot be established.
    pub async fn connect_to(url: &str) -> Result<Self, NetError> {
        info!(url, "connecting to NATS");
        let client = async_nats::connect(url).await?;
        info!("NATS connection established");
        Ok(Self { client })
    }

    /// Publish a raw payload to a subject.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Publish`] if publishing fails.
    pub async fn publish_bytes(&self, subject: &str, payload: Vec<u8>) -> Result<(), NetError> {
        self.client
            .publish(subject.to_string(), payload.into())
            .await?;
        Ok(())
    }

    /// Subscribe to a subject.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Subscribe`] if the subscription fails.
    pub async fn subscribe(&self, subject: &str) -> Result<async_nats::Subscriber, NetError> {
        let sub = self.client.subscribe(subject.to_string()).await?;
        Ok(sub)
    }
}
