//! MQTT transport implementation based on rumqttc.
//!
//! This module adapts the rumqttc API to the domain-level `Transport` trait
//! without leaking MQTT library types upward.
//!
//! # Features
//!
//! - One `AsyncClient` / `EventLoop` pair per session
//! - CONNACK and connection errors reported as reason codes
//! - No automatic reconnect: a lost session stays lost
//!
//! # Usage
//!
//! Enabled by default through the `transport_rumqttc` feature:
//!
//! ```toml
//! [dependencies]
//! adafruit-io-mqtt = { version = "0.1", features = ["transport_rumqttc"] }
//! ```

mod transport;
pub use transport::create_transport;
