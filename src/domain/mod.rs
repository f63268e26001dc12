//! Domain layer public interface.
//!
//! This module defines the feed and transport abstractions the client is
//! written against. It is independent of any concrete MQTT library.
//!
//! All domain consumers must import symbols via this module, not by
//! referencing individual files directly.

mod feed;
mod transport;

// --- Feed domain re-exports ---

pub use feed::{
    //
    Credentials,
    FeedId,
    FEED_TOPIC_PREFIX,
    RECEIVE_TOPIC_SUFFIX,
    SEND_TOPIC_SUFFIX,
};

// --- Transport domain re-exports ---

pub use transport::{
    //
    Address,
    ConnectParams,
    ReasonCode,
    Subscription,
    Transport,
    TransportBase,
    TransportConfig,
    TransportEvent,
    TransportPtr,
};
