// src/macros.rs

//
// Logging macros
//
// `logging` feature enabled  -> tracing events under the `adafruit_io` target
// `logging` feature disabled -> errors go to stderr, everything else vanishes
//

#![allow(unused_macros)]

macro_rules! log_error {
    ($($arg:tt)*) => {{
        #[cfg(feature = "logging")]
        tracing::error!(target: "adafruit_io", $($arg)*);
        #[cfg(not(feature = "logging"))]
        eprintln!($($arg)*);
    }};
}

macro_rules! log_warn {
    ($($arg:tt)*) => {{
        #[cfg(feature = "logging")]
        tracing::warn!(target: "adafruit_io", $($arg)*);
    }};
}

macro_rules! log_info {
    ($($arg:tt)*) => {{
        #[cfg(feature = "logging")]
        tracing::info!(target: "adafruit_io", $($arg)*);
    }};
}

macro_rules! log_debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "logging")]
        tracing::debug!(target: "adafruit_io", $($arg)*);
    }};
}

pub(crate) use log_debug;
pub(crate) use log_error;
pub(crate) use log_info;
pub(crate) use log_warn;
