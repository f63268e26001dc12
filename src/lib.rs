//! Adafruit IO feeds over MQTT
//!
//! This library is a thin client for the Adafruit IO MQTT service. It maps
//! feed ids onto the service's topic convention, authenticates with the
//! account's access key, tracks whether the session is up, and calls user
//! handlers on connect, disconnect and feed updates.
//!
//! The MQTT protocol itself (framing, QoS handshakes, keep-alive, sockets) is
//! left to the transport, by default `rumqttc`.
//!

// Import all sub modules once...
mod client;
mod domain;
mod transport;

mod client_builder;
mod connect_options;
mod transport_builder;

mod client_id;
mod error;
mod macros;

pub(crate) use macros::{log_debug, log_error, log_info, log_warn};

// Re-export main types
pub use client::{FeedClient, LifecycleHandler, MessageHandler};
pub use client_builder::FeedClientBuilder;

pub use connect_options::{
    //
    ConnectOptions,
    DEFAULT_PUMP_TIMEOUT,
    KEEP_ALIVE,
    SERVICE_HOST,
    SERVICE_PORT,
};
pub use transport_builder::TransportBuilder;

pub use client_id::{ClientId, PORTABLE_CLIENT_ID_LEN};
pub use error::{FeedError, Result};

pub use transport::{
    //
    create_memory_transport,
    create_memory_transport_with_hub,
    create_rumqttc_transport,
    MemoryHub,
    TransportOp,
};

// --- public re-exports
pub use domain::{
    //
    Address,
    ConnectParams,
    Credentials,
    FeedId,
    ReasonCode,
    Subscription,
    Transport,
    TransportBase,
    TransportConfig,
    TransportEvent,
    TransportPtr,
    FEED_TOPIC_PREFIX,
    RECEIVE_TOPIC_SUFFIX,
    SEND_TOPIC_SUFFIX,
};
