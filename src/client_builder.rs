//! Feed client builder.
//!
//! Provides a fluent builder API for configuring a [`FeedClient`] with an
//! explicit transport and pump bound.

use std::sync::Arc;
use std::time::Duration;

use crate::{
    // ---
    Credentials,
    FeedClient,
    Result,
    TransportBuilder,
    TransportPtr,
    DEFAULT_PUMP_TIMEOUT,
};

/// Node id given to the transport when the builder creates one itself.
const DEFAULT_NODE_ID: &str = "adafruit-io";

/// Builder for creating feed clients.
///
/// # Examples
///
/// ## Default transport
/// ```no_run
/// use adafruit_io_mqtt::FeedClientBuilder;
///
/// # async fn example() -> adafruit_io_mqtt::Result<()> {
/// let client = FeedClientBuilder::new("my-aio-key").build().await?;
/// # Ok(())
/// # }
/// ```
///
/// ## Explicit transport and pump bound
/// ```
/// use adafruit_io_mqtt::{FeedClientBuilder, TransportBuilder};
/// use std::time::Duration;
///
/// # async fn example() -> adafruit_io_mqtt::Result<()> {
/// let transport = TransportBuilder::new()
///     .node_id("greenhouse")
///     .transport_type("memory")
///     .build()
///     .await?;
///
/// let client = FeedClientBuilder::new("my-aio-key")
///     .transport(transport)
///     .pump_timeout(Duration::from_millis(250))
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct FeedClientBuilder {
    // ---
    key: Arc<str>,
    transport: Option<TransportPtr>,
    pump_timeout: Option<Duration>,
}

impl FeedClientBuilder {
    /// Create a new builder for the account owning `key`.
    pub fn new(key: impl Into<Arc<str>>) -> Self {
        // ---
        Self {
            key: key.into(),
            transport: None,
            pump_timeout: None,
        }
    }

    /// Use an existing transport.
    ///
    /// Default: whatever [`TransportBuilder`] selects from the enabled
    /// features, with node id `adafruit-io`.
    pub fn transport(mut self, transport: TransportPtr) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set the bound [`FeedClient::pump`] waits for an event.
    ///
    /// Default: 1s.
    pub fn pump_timeout(mut self, timeout: Duration) -> Self {
        self.pump_timeout = Some(timeout);
        self
    }

    /// Build the client (consumes self).
    ///
    /// # Errors
    ///
    /// Fails only when no transport was given and creating the default one
    /// fails.
    pub async fn build(self) -> Result<FeedClient> {
        // ---
        let transport = match self.transport {
            Some(transport) => transport,
            None => {
                TransportBuilder::new()
                    .node_id(DEFAULT_NODE_ID)
                    .build()
                    .await?
            }
        };

        let pump_timeout = self.pump_timeout.unwrap_or(DEFAULT_PUMP_TIMEOUT);

        Ok(FeedClient::with_pump_timeout(
            Credentials::new(self.key),
            transport,
            pump_timeout,
        ))
    }
}
