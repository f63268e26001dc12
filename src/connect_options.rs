//! Connection settings for the Adafruit IO MQTT service.
//!
//! Host, port and keep-alive are fixed by the service. Everything else a
//! caller may want to tune on the MQTT session lives in [`ConnectOptions`]
//! and is forwarded untouched to the transport on connect.

use std::time::Duration;

use crate::ClientId;

/// Host name of the Adafruit IO MQTT service.
pub const SERVICE_HOST: &str = "io.adafruit.com";

/// Plain-TCP MQTT port of the service.
pub const SERVICE_PORT: u16 = 1883;

/// Keep-alive interval negotiated on every connect.
pub const KEEP_ALIVE: Duration = Duration::from_secs(3600);

/// Bound used by [`FeedClient::pump`](crate::FeedClient::pump) unless the
/// builder overrides it.
pub const DEFAULT_PUMP_TIMEOUT: Duration = Duration::from_secs(1);

/// Transport-specific options forwarded on connect.
///
/// # Example
///
/// ```
/// use adafruit_io_mqtt::ConnectOptions;
///
/// let options = ConnectOptions::default()
///     .with_client_id("greenhouse-01")
///     .with_clean_session(false)
///     .with_max_packet_size(64 * 1024);
///
/// assert_eq!(options.client_id.as_ref().map(|id| id.as_str()), Some("greenhouse-01"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    // ---
    /// MQTT client identifier. A random 23-character id starting with `aio` is used when `None`.
    pub client_id: Option<ClientId>,

    /// Ask the broker to discard any previous session state.
    pub clean_session: bool,

    /// Largest packet accepted or sent, in bytes. `None` keeps the engine
    /// default.
    pub max_packet_size: Option<usize>,

    /// Depth of the queue between client handles and the MQTT engine.
    pub request_channel_capacity: usize,
}

impl Default for ConnectOptions {
    /// Defaults matching a fresh, clean MQTT 3.1.1 session.
    ///
    /// - `client_id`: generated
    /// - `clean_session`: true
    /// - `max_packet_size`: engine default
    /// - `request_channel_capacity`: 10
    fn default() -> Self {
        Self {
            client_id: None,
            clean_session: true,
            max_packet_size: None,
            request_channel_capacity: 10,
        }
    }
}

impl ConnectOptions {
    /// Use an explicit client identifier.
    pub fn with_client_id(mut self, id: impl Into<ClientId>) -> Self {
        self.client_id = Some(id.into());
        self
    }

    /// Set the clean session flag.
    pub fn with_clean_session(mut self, clean: bool) -> Self {
        self.clean_session = clean;
        self
    }

    /// Cap incoming and outgoing packet size.
    pub fn with_max_packet_size(mut self, bytes: usize) -> Self {
        self.max_packet_size = Some(bytes);
        self
    }

    /// Set the request queue depth.
    pub fn with_request_channel_capacity(mut self, capacity: usize) -> Self {
        self.request_channel_capacity = capacity.max(1);
        self
    }

    /// The configured client id, or a freshly generated one.
    pub fn resolve_client_id(&self) -> ClientId {
        self.client_id.clone().unwrap_or_else(ClientId::generate)
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_defaults() {
        // ---
        let options = ConnectOptions::default();
        assert!(options.client_id.is_none());
        assert!(options.clean_session);
        assert_eq!(options.max_packet_size, None);
        assert_eq!(options.request_channel_capacity, 10);
    }

    #[test]
    fn test_resolve_client_id() {
        // ---
        let fixed = ConnectOptions::default().with_client_id("node-7");
        assert_eq!(fixed.resolve_client_id().as_str(), "node-7");

        let generated = ConnectOptions::default();
        assert!(generated.resolve_client_id().as_str().starts_with("aio"));
    }

    #[test]
    fn test_channel_capacity_never_zero() {
        // ---
        let options = ConnectOptions::default().with_request_channel_capacity(0);
        assert_eq!(options.request_channel_capacity, 1);
    }
}
