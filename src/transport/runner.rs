//! Transport execution runner.
//!
//! This module is the glue between a [`Transport`](crate::Transport) and the
//! component that reacts to its events. It owns the three ways a feed client
//! can be driven:
//!
//! - [`run`]: keep polling until the session ends (blocking and background
//!   entry points both use it),
//! - [`run_once`]: handle at most one event within a time bound, for callers
//!   with their own scheduling loop.
//!
//! The runner does **not** retry, reconnect, or swallow errors. An error from
//! [`EventConsumer::handle_event`] stops the loop and is handed back to
//! whoever is driving it.
//!
//! ## Loop termination
//!
//! [`run`] exits when
//! - a `Disconnected` event has been handled (clean or not),
//! - the transport reports it has no session (`poll()` returns `None`),
//! - the consumer or the transport returns an error.

use std::time::Duration;

use crate::{
    // ---
    log_debug,
    Result,
    TransportEvent,
    TransportPtr,
};

/// A consumer of transport events.
///
/// Implementors expose the transport they read from and decide what each
/// event means. Returning an error from `handle_event` terminates the loop
/// that delivered the event.
pub(crate) trait EventConsumer: Send + Sync {
    /// The transport whose events this consumer handles.
    fn transport(&self) -> &TransportPtr;

    /// Handle a single event.
    fn handle_event(&self, event: TransportEvent) -> Result<()>;
}

/// Drive `consumer` until its session ends.
pub(crate) async fn run<C>(consumer: &C) -> Result<()>
where
    C: EventConsumer,
{
    // ---
    loop {
        let Some(event) = consumer.transport().poll().await? else {
            log_debug!(
                "{}: no session to drive, leaving loop",
                consumer.transport().transport_id()
            );
            return Ok(());
        };

        let session_ended = matches!(event, TransportEvent::Disconnected(_));

        consumer.handle_event(event)?;

        if session_ended {
            log_debug!(
                "{}: session ended, leaving loop",
                consumer.transport().transport_id()
            );
            return Ok(());
        }
    }
}

/// Handle at most one event, waiting no longer than `bound` for it.
///
/// Returns `Ok(true)` if an event was handled.
pub(crate) async fn run_once<C>(consumer: &C, bound: Duration) -> Result<bool>
where
    C: EventConsumer,
{
    // ---
    let polled = match tokio::time::timeout(bound, consumer.transport().poll()).await {
        Ok(polled) => polled?,
        Err(_elapsed) => return Ok(false),
    };

    match polled {
        Some(event) => {
            consumer.handle_event(event)?;
            Ok(true)
        }
        None => Ok(false),
    }
}
