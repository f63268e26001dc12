//! Adafruit IO feed client.
//!
//! [`FeedClient`] is the public face of the crate. It turns feed ids into
//! Adafruit IO topics, authenticates with the account's access key, and turns
//! the transport's connect / disconnect / message events into calls of the
//! user's handlers.
//!
//! # Driving the client
//!
//! Nothing happens on the wire until the transport's events are processed.
//! Pick one of:
//!
//! - [`FeedClient::run_blocking`]: process events on the current task until
//!   the session ends,
//! - [`FeedClient::run_background`]: the same loop on a spawned tokio task,
//! - [`FeedClient::pump`]: one bounded slice of work, for callers running
//!   their own loop.
//!
//! # Errors from event handling
//!
//! A refused connect or an unexpected disconnect is reported as
//! [`FeedError::Connection`] or [`FeedError::ConnectionLost`] by whichever of
//! the calls above processed the event. For the background loop that is the
//! `JoinHandle` returned by `run_background`.

mod callbacks;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::task::JoinHandle;

pub use callbacks::{LifecycleHandler, MessageHandler};

use crate::transport::runner::{self, EventConsumer};
use crate::{
    // ---
    log_debug,
    log_error,
    log_info,
    ConnectOptions,
    ConnectParams,
    Credentials,
    FeedError,
    FeedId,
    ReasonCode,
    Result,
    TransportEvent,
    TransportPtr,
    DEFAULT_PUMP_TIMEOUT,
    KEEP_ALIVE,
    SERVICE_HOST,
    SERVICE_PORT,
};

use callbacks::CallbackSlots;

/// Client for publishing to and subscribing on Adafruit IO feeds.
///
/// Cloning is cheap and every clone drives the same session and shares the
/// same handlers and connection state.
///
/// # Example
///
/// ```no_run
/// use adafruit_io_mqtt::{ConnectOptions, FeedClient, FeedClientBuilder};
///
/// # async fn example() -> adafruit_io_mqtt::Result<()> {
/// let client = FeedClientBuilder::new("my-aio-key").build().await?;
///
/// client.on_connect(|client: &FeedClient| {
///     let client = client.clone();
///     tokio::spawn(async move { client.subscribe("door").await });
/// });
/// client.on_message(|_client: &FeedClient, feed, payload: &[u8]| {
///     println!("{feed} = {}", String::from_utf8_lossy(payload));
/// });
///
/// client.connect(ConnectOptions::default()).await?;
/// client.run_blocking().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct FeedClient {
    inner: Arc<Inner>,
}

struct Inner {
    // ---
    credentials: Credentials,
    transport: TransportPtr,
    pump_timeout: Duration,

    // mirrored from transport events only
    connected: AtomicBool,
    background: AtomicBool,

    callbacks: CallbackSlots,
}

/// Marks the background loop slot taken for as long as it lives.
struct BackgroundSlot(Arc<Inner>);

impl Drop for BackgroundSlot {
    fn drop(&mut self) {
        self.0.background.store(false, Ordering::SeqCst);
    }
}

impl FeedClient {
    // ---

    /// Create a client for the account owning `key` on top of `transport`.
    ///
    /// No I/O is performed.
    pub fn new(key: impl Into<Arc<str>>, transport: TransportPtr) -> Self {
        // ---
        Self::with_pump_timeout(Credentials::new(key), transport, DEFAULT_PUMP_TIMEOUT)
    }

    pub(crate) fn with_pump_timeout(
        credentials: Credentials,
        transport: TransportPtr,
        pump_timeout: Duration,
    ) -> Self {
        // ---
        Self {
            inner: Arc::new(Inner {
                credentials,
                transport,
                pump_timeout,
                connected: AtomicBool::new(false),
                background: AtomicBool::new(false),
                callbacks: CallbackSlots::default(),
            }),
        }
    }

    fn transport_id(&self) -> &str {
        self.inner.transport.transport_id()
    }

    /// Set the handler called once the broker accepts a connect.
    pub fn on_connect<F>(&self, handler: F)
    where
        F: Fn(&FeedClient) + Send + Sync + 'static,
    {
        self.inner.callbacks.set_connect(Some(Arc::new(handler)));
    }

    /// Set the handler called after a clean disconnect.
    pub fn on_disconnect<F>(&self, handler: F)
    where
        F: Fn(&FeedClient) + Send + Sync + 'static,
    {
        self.inner.callbacks.set_disconnect(Some(Arc::new(handler)));
    }

    /// Set the handler called with the feed id and payload of every feed
    /// update received.
    pub fn on_message<F>(&self, handler: F)
    where
        F: Fn(&FeedClient, &FeedId, &[u8]) + Send + Sync + 'static,
    {
        self.inner.callbacks.set_message(Some(Arc::new(handler)));
    }

    /// Remove the connect handler.
    pub fn clear_on_connect(&self) {
        self.inner.callbacks.set_connect(None);
    }

    /// Remove the disconnect handler.
    pub fn clear_on_disconnect(&self) {
        self.inner.callbacks.set_disconnect(None);
    }

    /// Remove the message handler.
    pub fn clear_on_message(&self) {
        self.inner.callbacks.set_message(None);
    }

    /// Open a session with Adafruit IO.
    ///
    /// Does nothing when already connected. Otherwise asks the transport to
    /// connect to `io.adafruit.com:1883` with a one hour keep-alive, using the
    /// access key as username and forwarding `options`.
    ///
    /// The outcome arrives later as a connect event; a refusal is reported as
    /// [`FeedError::Connection`] by the loop that processes it.
    pub async fn connect(&self, options: ConnectOptions) -> Result<()> {
        // ---
        if self.is_connected() {
            log_debug!("{}: already connected, skipping connect", self.transport_id());
            return Ok(());
        }

        let params = ConnectParams {
            host: SERVICE_HOST.to_string(),
            port: SERVICE_PORT,
            keep_alive: KEEP_ALIVE,
            credentials: self.inner.credentials.clone(),
            options,
        };

        log_info!(
            "{}: connecting to {SERVICE_HOST}:{SERVICE_PORT}",
            self.transport_id()
        );
        self.inner.transport.connect(params).await
    }

    /// Whether the broker has accepted the session and it has not ended
    /// since. Never touches the transport.
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    /// Ask the broker to close the session. Does nothing when not connected.
    pub async fn disconnect(&self) -> Result<()> {
        // ---
        if !self.is_connected() {
            log_debug!("{}: not connected, skipping disconnect", self.transport_id());
            return Ok(());
        }

        self.inner.transport.disconnect().await
    }

    /// Process events on the current task until the session ends.
    ///
    /// Returns once a disconnect has been handled, or immediately if there is
    /// no session to drive (i.e. `connect` was never called).
    pub async fn run_blocking(&self) -> Result<()> {
        // ---
        runner::run(self).await
    }

    /// Process events on a spawned tokio task and return at once.
    ///
    /// The task's result carries the error that stopped it, if any. Only one
    /// background loop may be alive per client; a second call while one runs
    /// fails with [`FeedError::AlreadyRunning`]. The slot frees once the task
    /// is gone, whether it returned, panicked in a handler or was aborted.
    pub fn run_background(&self) -> Result<JoinHandle<Result<()>>> {
        // ---
        if self.inner.background.swap(true, Ordering::SeqCst) {
            return Err(FeedError::AlreadyRunning);
        }

        let client = self.clone();
        let slot = BackgroundSlot(Arc::clone(&self.inner));

        Ok(tokio::spawn(async move {
            // frees the slot whenever the task is dropped
            let _slot = slot;

            let result = runner::run(&client).await;

            if let Err(_err) = &result {
                log_error!("{}: background loop stopped: {_err}", client.transport_id());
            }
            result
        }))
    }

    /// Handle at most one event, waiting up to the client's default bound.
    ///
    /// Returns `Ok(true)` when an event was processed.
    pub async fn pump(&self) -> Result<bool> {
        self.pump_for(self.inner.pump_timeout).await
    }

    /// Handle at most one event, waiting up to `timeout` for it.
    ///
    /// The bound may be shorter than the MQTT handshake; the transport keeps
    /// connecting between pumps.
    pub async fn pump_for(&self, timeout: Duration) -> Result<bool> {
        // ---
        runner::run_once(self, timeout).await
    }

    /// Ask for updates of `feed_id` to be delivered to the message handler.
    pub async fn subscribe(&self, feed_id: impl Into<FeedId>) -> Result<()> {
        // ---
        let feed = feed_id.into();
        log_debug!("{}: subscribing to feed {feed}", self.transport_id());

        self.inner.transport.subscribe(feed.receive_topic()).await
    }

    /// Send `value` as the new value of `feed_id`.
    ///
    /// Fire-and-forget: no confirmation of delivery is returned.
    pub async fn publish(&self, feed_id: impl Into<FeedId>, value: impl Into<Bytes>) -> Result<()> {
        // ---
        let feed = feed_id.into();
        let payload = value.into();
        log_debug!(
            "{}: publishing {} bytes to feed {feed}",
            self.transport_id(),
            payload.len()
        );

        self.inner
            .transport
            .publish(feed.send_topic(), payload)
            .await
    }

    fn handle_connect(&self, code: ReasonCode) -> Result<()> {
        // ---
        log_debug!("{}: connect event, rc {code}", self.transport_id());

        if !code.is_success() {
            log_error!(
                "{}: error connecting to Adafruit IO with rc {code}: {}",
                self.transport_id(),
                code.description()
            );
            return Err(FeedError::Connection { code });
        }

        self.inner.connected.store(true, Ordering::SeqCst);

        if let Some(handler) = self.inner.callbacks.connect() {
            handler(self);
        }
        Ok(())
    }

    fn handle_disconnect(&self, code: ReasonCode) -> Result<()> {
        // ---
        log_debug!("{}: disconnect event, rc {code}", self.transport_id());

        self.inner.connected.store(false, Ordering::SeqCst);

        if !code.is_success() {
            log_error!("{}: unexpected disconnect with rc {code}", self.transport_id());
            return Err(FeedError::ConnectionLost { code });
        }

        if let Some(handler) = self.inner.callbacks.disconnect() {
            handler(self);
        }
        Ok(())
    }

    fn handle_message(&self, topic: &str, payload: &[u8]) {
        // ---
        let Some(handler) = self.inner.callbacks.message() else {
            return;
        };

        let Some(feed) = FeedId::from_receive_topic(topic) else {
            log_debug!(
                "{}: dropping message on unexpected topic {topic}",
                self.transport_id()
            );
            return;
        };

        handler(self, &feed, payload);
    }
}

impl EventConsumer for FeedClient {
    // ---
    fn transport(&self) -> &TransportPtr {
        &self.inner.transport
    }

    fn handle_event(&self, event: TransportEvent) -> Result<()> {
        // ---
        match event {
            TransportEvent::Connected(code) => self.handle_connect(code),
            TransportEvent::Disconnected(code) => self.handle_disconnect(code),
            TransportEvent::Message { topic, payload } => {
                self.handle_message(&topic, &payload);
                Ok(())
            }
        }
    }
}

impl fmt::Debug for FeedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedClient")
            .field("transport", &self.transport_id())
            .field("connected", &self.is_connected())
            .field("credentials", &self.inner.credentials)
            .finish()
    }
}
