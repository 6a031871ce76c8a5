//! Message delivery with bounded retries.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, info};

use herald_scheduler::Contact;

use crate::Transport;

/// Maximum number of delivery attempts per recipient.
const MAX_RETRIES: u32 = 3;

/// Base delay between attempts; attempt N is followed by N times this.
const RETRY_DELAY: Duration = Duration::from_secs(60);

/// Delivers messages through a transport, retrying failures.
///
/// Attempts within one delivery are strictly sequential; the backoff sleep
/// suspends only this delivery's task, never other recipients' triggers.
pub struct MessageSender {
    transport: Arc<dyn Transport>,
    max_retries: u32,
    retry_delay: Duration,
}

impl MessageSender {
    /// Create a sender with the default retry policy (3 attempts, 60s base
    /// delay).
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            max_retries: MAX_RETRIES,
            retry_delay: RETRY_DELAY,
        }
    }

    /// Override the retry policy.
    pub fn with_retry_policy(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    /// Attempt to deliver `body` to a contact. Returns whether it was
    /// delivered.
    ///
    /// Up to `max_retries` sequential attempts. The delay before retry N+1
    /// grows linearly (base, 2x base, ...). Any transport error is retried;
    /// exhaustion is terminal for this recipient but never fatal to the
    /// process.
    pub async fn send_message(&self, contact: &Contact, body: &str) -> bool {
        let address = self.format_address(&contact.phone_number);

        for attempt in 1..=self.max_retries {
            info!(
                recipient = %contact.display_name(),
                attempt,
                max_attempts = self.max_retries,
                "sending message"
            );

            match self.transport.send(&address, body).await {
                Ok(()) => {
                    info!(
                        recipient = %contact.display_name(),
                        attempt,
                        "message delivered"
                    );
                    return true;
                }
                Err(e) => {
                    error!(
                        recipient = %contact.display_name(),
                        attempt,
                        max_attempts = self.max_retries,
                        error = %e,
                        "delivery attempt failed"
                    );

                    if attempt < self.max_retries {
                        // Linear backoff: base delay times the attempt number.
                        let delay = self.retry_delay * attempt;
                        info!(
                            recipient = %contact.display_name(),
                            delay_secs = delay.as_secs(),
                            "retrying after delay"
                        );
                        sleep(delay).await;
                    }
                }
            }
        }

        error!(
            recipient = %contact.display_name(),
            attempts = self.max_retries,
            "giving up on delivery"
        );
        false
    }

    /// Normalize a phone number into the transport's address form: strip
    /// everything that is not a digit, then append the fixed suffix.
    fn format_address(&self, phone_number: &str) -> String {
        let digits: String = phone_number.chars().filter(char::is_ascii_digit).collect();
        format!("{digits}{}", self.transport.address_suffix())
    }
}
