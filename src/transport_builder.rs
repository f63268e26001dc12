//! Transport builder for creating transport instances.
//!
//! Provides a fluent builder API for picking and constructing the MQTT engine
//! behind a feed client.

use std::sync::Arc;

use crate::{
    // ---
    create_memory_transport,
    create_memory_transport_with_hub,
    create_rumqttc_transport,
    FeedError,
    MemoryHub,
    Result,
    TransportConfig,
    TransportPtr,
};

/// Builder for creating transport instances.
///
/// # Examples
///
/// ## Broker-backed transport
/// ```no_run
/// use adafruit_io_mqtt::TransportBuilder;
///
/// # async fn example() -> adafruit_io_mqtt::Result<()> {
/// let transport = TransportBuilder::new()
///     .node_id("weather-station")
///     .transport_type("rumqttc")
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
///
/// ## In-memory transport on a private hub
/// ```
/// use adafruit_io_mqtt::{MemoryHub, TransportBuilder};
///
/// # async fn example() -> adafruit_io_mqtt::Result<()> {
/// let hub = MemoryHub::new();
/// let transport = TransportBuilder::new()
///     .node_id("test-node")
///     .memory_hub(hub.clone())
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct TransportBuilder {
    node_id: Option<String>,
    transport_type: Option<String>,
    hub: Option<Arc<MemoryHub>>,
}

impl TransportBuilder {
    /// Create a new transport builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the node ID (required).
    ///
    /// Shows up in every log line the transport writes and names the node on
    /// a [`MemoryHub`].
    pub fn node_id(mut self, id: impl Into<String>) -> Self {
        self.node_id = Some(id.into());
        self
    }

    /// Set explicit transport type.
    ///
    /// Valid values: `"memory"`, `"rumqttc"`
    ///
    /// If not specified, uses feature-flag driven selection.
    pub fn transport_type(mut self, flag: impl Into<String>) -> Self {
        self.transport_type = Some(flag.into());
        self
    }

    /// Attach the transport to a specific in-memory hub.
    ///
    /// Implies the memory transport when no type is set explicitly.
    pub fn memory_hub(mut self, hub: Arc<MemoryHub>) -> Self {
        self.hub = Some(hub);
        self
    }

    /// Build the transport (consumes self).
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - `node_id` is missing
    /// - a hub was given together with a non-memory transport type
    /// - the transport type is unknown or not compiled in
    pub async fn build(self) -> Result<TransportPtr> {
        // ---
        let node_id = self
            .node_id
            .ok_or_else(|| FeedError::MissingConfig("node_id".into()))?;

        let config = TransportConfig {
            node_id,
            transport_type: self.transport_type.clone(),
        };

        // Dispatch to the appropriate transport factory.
        //
        // When transport_type is explicit, use it directly.
        // When None, a hub means memory; otherwise rumqttc if compiled in,
        // with memory as the unconditional fallback.
        match (self.transport_type.as_deref(), self.hub) {
            (Some("memory") | None, Some(hub)) => {
                create_memory_transport_with_hub(config, hub).await
            }
            (Some(other), Some(_)) => Err(FeedError::Transport(format!(
                "a memory hub cannot be used with transport_type {other}"
            ))),
            (Some("memory"), None) => create_memory_transport(config).await,
            (Some("rumqttc"), None) => create_rumqttc_transport(config).await,
            (Some(other), None) => Err(FeedError::Transport(format!(
                "unrecognized transport_type: {other}, valid values: memory, rumqttc"
            ))),
            (None, None) => {
                if let Ok(t) = create_rumqttc_transport(config.clone()).await {
                    return Ok(t);
                }
                create_memory_transport(config).await
            }
        }
    }
}
