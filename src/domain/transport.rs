// src/domain/transport.rs

//! Transport domain abstractions.
//!
//! This module defines the contract between the feed client and whatever MQTT
//! engine moves bytes for it. The client never talks to a broker library
//! directly: it hands a [`ConnectParams`] to [`Transport::connect`], pushes
//! topics and payloads through [`Transport::subscribe`] and
//! [`Transport::publish`], and pulls [`TransportEvent`]s out of
//! [`Transport::poll`].
//!
//! The three event kinds mirror the callbacks a classic MQTT client exposes:
//! connection acknowledged (with a reason code), session ended (with a reason
//! code) and message received (topic plus raw payload).
//!
//! Concrete implementations of this interface live under `src/transport/`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::{ConnectOptions, Credentials, Result};

/// Raw reason code reported by the transport on connect or disconnect.
///
/// Zero always means success. On connect, non-zero values follow the
/// MQTT 3.1.1 CONNACK return codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReasonCode(pub u8);

impl ReasonCode {
    /// Connection accepted / clean disconnect.
    pub const SUCCESS: ReasonCode = ReasonCode(0);

    /// The broker does not speak the requested protocol level.
    pub const BAD_PROTOCOL_VERSION: ReasonCode = ReasonCode(1);

    /// The client identifier was rejected.
    pub const BAD_CLIENT_ID: ReasonCode = ReasonCode(2);

    /// The MQTT service is unavailable.
    pub const SERVER_UNAVAILABLE: ReasonCode = ReasonCode(3);

    /// The access key was not accepted.
    pub const BAD_CREDENTIALS: ReasonCode = ReasonCode(4);

    /// The account may not connect.
    pub const NOT_AUTHORIZED: ReasonCode = ReasonCode(5);

    /// The network connection dropped underneath the session.
    pub const CONNECTION_LOST: ReasonCode = ReasonCode(7);

    /// Returns `true` for the success code.
    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }

    /// Human readable meaning of a connect reason code.
    pub fn description(self) -> &'static str {
        match self.0 {
            0 => "connection accepted",
            1 => "connection refused, incorrect protocol version",
            2 => "connection refused, invalid client identifier",
            3 => "connection refused, server unavailable",
            4 => "connection refused, bad username or password",
            5 => "connection refused, not authorised",
            _ => "currently unused",
        }
    }
}

impl From<u8> for ReasonCode {
    fn from(value: u8) -> Self {
        ReasonCode(value)
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A topic messages are published to.
///
/// Addresses are immutable, cheap to clone, and safe to share across threads.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Address(pub Arc<str>);

impl<T> From<T> for Address
where
    T: Into<Arc<str>>,
{
    fn from(value: T) -> Self {
        // ---
        Address(value.into())
    }
}

/// A topic filter messages are received from.
///
/// Feed topics never contain wildcards, so matching is exact string equality
/// in the in-memory transport and whatever the broker does otherwise.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Subscription(pub Arc<str>);

impl From<Address> for Subscription {
    fn from(address: Address) -> Self {
        // ---
        Subscription(address.0)
    }
}

impl<T> From<T> for Subscription
where
    T: Into<Arc<str>>,
{
    fn from(value: T) -> Self {
        // ---
        Subscription(value.into())
    }
}

/// Something the transport reports back to the client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    // ---
    /// The broker answered a connect attempt.
    Connected(ReasonCode),

    /// The session ended. Zero means the client asked for it.
    Disconnected(ReasonCode),

    /// A message arrived on a subscribed topic.
    Message { topic: Arc<str>, payload: Bytes },
}

/// Everything a transport needs to open a session.
#[derive(Clone, Debug)]
pub struct ConnectParams {
    // ---
    /// Broker host name.
    pub host: String,

    /// Broker TCP port.
    pub port: u16,

    /// Keep-alive interval negotiated with the broker.
    pub keep_alive: Duration,

    /// Authentication; the key is the username, the password is empty.
    pub credentials: Credentials,

    /// Caller supplied, transport specific options.
    pub options: ConnectOptions,
}

/// Shared base state for all transport implementations.
///
/// Each concrete transport embeds this as a field named `base`:
///
/// ```ignore
/// struct MqttTransport {
///     base: TransportBase,
///     // ... mqtt specific fields
/// }
///
/// impl Transport for MqttTransport {
///     fn base(&self) -> &TransportBase { &self.base }
/// }
/// ```
#[derive(Clone, Debug)]
pub struct TransportBase {
    /// Identifier used in log lines.
    pub transport_id: String,
}

impl From<&TransportConfig> for TransportBase {
    fn from(config: &TransportConfig) -> Self {
        // ---
        Self {
            transport_id: config.node_id.clone(),
        }
    }
}

/// Configuration for creating a transport instance.
///
/// Passed to transport factory functions (`create_*_transport()`).
#[derive(Clone, Debug)]
pub struct TransportConfig {
    /// Node ID for this transport instance, used for logging.
    pub node_id: String,
    /// Optional transport type override (`"rumqttc"` or `"memory"`).
    /// If `None`, uses feature-flag driven selection.
    pub transport_type: Option<String>,
}

/// Transport abstraction.
///
/// A `Transport` is the MQTT engine behind a feed client. Framing, QoS
/// handshakes, keep-alive and socket I/O all live behind this trait.
///
/// Implementations must ensure that:
/// - `connect()` only *starts* a session; the outcome is reported later as a
///   [`TransportEvent::Connected`] from `poll()`.
/// - `disconnect()` eventually yields [`TransportEvent::Disconnected`] with
///   code zero.
/// - a refused or lost session is reported once and never re-established on
///   the transport's own initiative.
/// - `poll()` returns `Ok(None)` when no session is open.
///
/// The in-memory transport serves as the reference implementation of these
/// semantics.
///
/// # Notes
///
/// This trait uses `async_trait`; consumers should treat methods as normal
/// `async fn`s.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    // ---
    /// Returns a reference to the shared base state.
    fn base(&self) -> &TransportBase;

    /// Returns the transport_id of the transport.
    fn transport_id(&self) -> &str {
        &self.base().transport_id
    }

    /// Start opening a session with the broker.
    async fn connect(&self, params: ConnectParams) -> Result<()>;

    /// Ask the broker to close the current session.
    async fn disconnect(&self) -> Result<()>;

    /// Send `payload` to `address`, at most once, not retained.
    async fn publish(&self, address: Address, payload: Bytes) -> Result<()>;

    /// Ask the broker to deliver messages matching `sub`.
    async fn subscribe(&self, sub: Subscription) -> Result<()>;

    /// Wait for the next event of the current session.
    ///
    /// Returns `Ok(None)` once there is no session left to drive.
    async fn poll(&self) -> Result<Option<TransportEvent>>;
}

/// Shared transport pointer.
///
/// This is an `Arc<dyn Transport>`: `.clone()` only bumps a reference count
/// and every clone drives the same session.
pub type TransportPtr = Arc<dyn Transport>;
