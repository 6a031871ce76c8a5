//! Transport boundary to the external messaging channel.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::TransportError;

/// Default address suffix expected by the messaging gateway.
pub const DEFAULT_ADDRESS_SUFFIX: &str = "@c.us";

/// How often to poll the gateway while waiting for readiness.
const READY_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// An external channel that can deliver a message to a recipient address.
///
/// Implementations are shared read-only across concurrent deliveries.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver `body` to `address`.
    async fn send(&self, address: &str, body: &str) -> Result<(), TransportError>;

    /// Fixed domain suffix appended to digits-only recipient identifiers.
    fn address_suffix(&self) -> &str;
}

/// Transport backed by an HTTP messaging gateway.
///
/// The gateway owns the authenticated session with the upstream messaging
/// network; this client only hands messages over and polls readiness.
pub struct HttpGatewayTransport {
    http: Client,
    base_url: String,
    address_suffix: String,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    address: &'a str,
    body: &'a str,
}

#[derive(Deserialize)]
struct StatusResponse {
    ready: bool,
}

impl HttpGatewayTransport {
    /// Create a transport for the given gateway base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");

        Self {
            http,
            base_url: base_url.into(),
            address_suffix: DEFAULT_ADDRESS_SUFFIX.to_string(),
        }
    }

    /// Override the address suffix appended to recipient identifiers.
    pub fn with_address_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.address_suffix = suffix.into();
        self
    }

    /// Poll the gateway until it reports ready, or give up after `timeout`.
    ///
    /// Deliveries must not start before the gateway has a session with the
    /// messaging network; the session negotiation itself happens inside the
    /// gateway.
    pub async fn wait_ready(&self, timeout: Duration) -> Result<(), TransportError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.status().await {
                Ok(true) => return Ok(()),
                Ok(false) => debug!("gateway not ready yet"),
                Err(e) => debug!(error = %e, "gateway status check failed"),
            }
            if Instant::now() + READY_POLL_INTERVAL > deadline {
                return Err(TransportError::NotReady);
            }
            sleep(READY_POLL_INTERVAL).await;
        }
    }

    async fn status(&self) -> Result<bool, TransportError> {
        let url = format!("{}/status", self.base_url);
        let response = self.http.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(TransportError::Gateway { status, message });
        }

        let status: StatusResponse = response.json().await?;
        Ok(status.ready)
    }
}

#[async_trait]
impl Transport for HttpGatewayTransport {
    async fn send(&self, address: &str, body: &str) -> Result<(), TransportError> {
        let url = format!("{}/send", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&SendRequest { address, body })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(TransportError::Gateway { status, message });
        }

        Ok(())
    }

    fn address_suffix(&self) -> &str {
        &self.address_suffix
    }
}
