//! Transport implementations.
//!
//! This module provides concrete implementations of the domain-level
//! `Transport` trait, exposed only through constructor functions, plus the
//! runner that drives a transport's event stream for the feed client.
//!
//! Domain code must not depend on transport-specific types.

mod memory;
pub(crate) mod runner;

#[cfg(feature = "transport_rumqttc")]
mod rumqttc;

#[cfg(feature = "transport_rumqttc")]
pub use rumqttc::create_transport as create_rumqttc_transport;

/// Stand-in used when the crate is built without `transport_rumqttc`.
#[cfg(not(feature = "transport_rumqttc"))]
pub async fn create_rumqttc_transport(
    _config: crate::TransportConfig,
) -> crate::Result<crate::TransportPtr> {
    Err(crate::FeedError::Transport(
        "transport_rumqttc feature is not enabled".into(),
    ))
}

pub use memory::{
    //
    create_memory_transport,
    create_memory_transport_with_hub,
    MemoryHub,
    TransportOp,
};
