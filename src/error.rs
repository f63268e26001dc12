use thiserror::Error;

use crate::ReasonCode;

/// Errors surfaced by the feed client.
///
/// Every refusal the broker can report on connect collapses into
/// [`FeedError::Connection`]; the raw [`ReasonCode`] is kept for diagnostics.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// The broker refused the connection.
    ///
    /// With the rumqttc transport, code 3 (server unavailable) is also used
    /// when no CONNACK arrived at all: a DNS, TCP or TLS failure or a connect
    /// timeout on the client side. It is not always the broker's answer.
    #[error("error connecting to Adafruit IO with rc: {code} ({})", .code.description())]
    Connection { code: ReasonCode },

    /// The session ended without the client asking for it.
    #[error("unexpected disconnect with rc: {code}")]
    ConnectionLost { code: ReasonCode },

    /// The MQTT engine rejected a request.
    #[error("transport error: {0}")]
    Transport(String),

    /// A builder was missing a required field.
    #[error("missing configuration: {0}")]
    MissingConfig(String),

    /// A background loop is already driving this client.
    #[error("background loop already running")]
    AlreadyRunning,
}

impl FeedError {
    /// The reason code carried by connection errors, if any.
    pub fn reason_code(&self) -> Option<ReasonCode> {
        match self {
            FeedError::Connection { code } | FeedError::ConnectionLost { code } => Some(*code),
            _ => None,
        }
    }
}

/// Result type alias for feed client operations
pub type Result<T> = std::result::Result<T, FeedError>;
