//! MQTT client identifiers.
//!
//! MQTT 3.1.1 (section 3.1.3.1) only obliges a broker to accept ids of 1 to
//! 23 characters drawn from `[0-9a-zA-Z]`. Anything else may be refused
//! with return code 2. Generated ids stay inside that range. Ids supplied by
//! the caller are sent verbatim, even when they fall outside it.

use std::fmt;
use uuid::Uuid;

/// Longest client id every MQTT 3.1.1 broker must accept.
pub const PORTABLE_CLIENT_ID_LEN: usize = 23;

const GENERATED_PREFIX: &str = "aio";

/// MQTT client identifier presented to the broker.
///
/// Brokers drop an existing session when a second connection shows up with
/// the same id, so every generated id is fresh.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(String);

impl ClientId {
    /// Generate `aio` followed by 20 random hex digits (80 bits), 23
    /// characters in total.
    pub fn generate() -> Self {
        // ---
        let random = Uuid::new_v4().simple().to_string();
        let take = PORTABLE_CLIENT_ID_LEN - GENERATED_PREFIX.len();

        Self(format!("{GENERATED_PREFIX}{}", &random[..take]))
    }

    /// Borrow the client id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether every MQTT 3.1.1 broker is obliged to accept this id.
    pub fn is_portable(&self) -> bool {
        // ---
        (1..=PORTABLE_CLIENT_ID_LEN).contains(&self.0.len())
            && self.0.bytes().all(|b| b.is_ascii_alphanumeric())
    }
}

impl From<String> for ClientId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ClientId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
