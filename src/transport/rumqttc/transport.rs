//! MQTT transport implementation using `rumqttc`.
//!
//! This module provides an implementation of the `Transport` trait backed by
//! a real broker connection.
//!
//! ## Concurrency model
//!
//! - `connect()` builds a fresh `AsyncClient` / `EventLoop` pair for every
//!   session and hands the `EventLoop` to a driver task, in the manner of an
//!   actor. The driver polls it and forwards the events that matter over a
//!   channel.
//! - `poll()` only receives from that channel. Dropping a `poll()` future,
//!   e.g. when a pump bound elapses, never interrupts the MQTT handshake.
//! - `publish()`, `subscribe()` and `disconnect()` go through a clone of the
//!   `AsyncClient`, which only enqueues requests for the event loop.
//!
//! ## Session lifecycle
//!
//! rumqttc reconnects on the next `poll()` after any connection error. The
//! feed client promises no automatic reconnect, so the driver stops and drops
//! the event loop as soon as a session is refused, lost or cleanly closed.
//! `poll()` then reports `Ok(None)` until the next `connect()`.
//!
//! | rumqttc                                   | reported as                        |
//! |-------------------------------------------|------------------------------------|
//! | `ConnAck` / `ConnectionRefused(code)`     | `Connected(code)`                  |
//! | any error before the first `ConnAck`      | `Connected(3)`, server unavailable |
//! | outgoing `DISCONNECT`                     | `Disconnected(0)`                  |
//! | any error after the `ConnAck`             | `Disconnected(7)`, connection lost |
//! | incoming `PUBLISH`                        | `Message { topic, payload }`       |

use rumqttc::{
    //
    AsyncClient,
    ConnectReturnCode,
    ConnectionError,
    Event,
    EventLoop,
    MqttOptions,
    Outgoing,
    Packet,
    QoS,
};

use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{
    //
    log_debug,
    log_error,
    log_info,
    log_warn,
    Address,
    ConnectParams,
    FeedError,
    ReasonCode,
    Result,
    Subscription,
    Transport,
    TransportBase,
    TransportConfig,
    TransportEvent,
    TransportPtr,
};

/// One broker session as seen from `poll()`.
struct Session {
    // ---
    steps: mpsc::UnboundedReceiver<Step>,
    driver: JoinHandle<()>,
}

impl Drop for Session {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

/// Outcome of driving the event loop to the next reportable packet.
struct Step {
    // ---
    event: TransportEvent,
    session_over: bool,
}

/// MQTT-based implementation of the `Transport` trait.
///
/// Represents at most one broker session at a time.
pub struct RumqttcTransport {
    // ---
    base: TransportBase,
    client: Mutex<Option<AsyncClient>>,
    session: tokio::sync::Mutex<Option<Session>>,
}

/// Acquire mutex guard, ignoring poisoning
fn lock_ignore_poison<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl RumqttcTransport {
    // ---

    /// Creates an idle rumqttc transport. No connection is made until
    /// `connect()` is called.
    pub fn create(config: &TransportConfig) -> TransportPtr {
        // ---
        Arc::new(Self {
            base: TransportBase::from(config),
            client: Mutex::new(None),
            session: tokio::sync::Mutex::new(None),
        })
    }

    fn client(&self) -> Result<AsyncClient> {
        // ---
        lock_ignore_poison(&self.client)
            .clone()
            .ok_or_else(|| FeedError::Transport("no broker session".into()))
    }
}

/// Runs one session's event loop until the session is over or nobody is
/// listening any more.
async fn drive(transport_id: String, mut event_loop: EventLoop, steps: mpsc::UnboundedSender<Step>) {
    // ---
    let mut acked = false;

    loop {
        let step = next_step(&transport_id, &mut event_loop, &mut acked).await;
        let session_over = step.session_over;

        if steps.send(step).is_err() || session_over {
            break;
        }
    }

    log_debug!("{transport_id}: session driver stopped");
}

/// Pulls events off the event loop until one of them matters to the feed
/// client.
async fn next_step(transport_id: &str, event_loop: &mut EventLoop, acked: &mut bool) -> Step {
    // ---
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                let code = return_code(connack.code);
                if code.is_success() {
                    log_info!("{transport_id}: connected to broker");
                    *acked = true;
                } else {
                    log_error!("{transport_id}: connection refused: {:?}", connack.code);
                }
                return Step {
                    event: TransportEvent::Connected(code),
                    session_over: !code.is_success(),
                };
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                return Step {
                    event: TransportEvent::Message {
                        topic: Arc::from(publish.topic.as_str()),
                        payload: publish.payload,
                    },
                    session_over: false,
                };
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                log_info!("{transport_id}: disconnected from broker");
                return Step {
                    event: TransportEvent::Disconnected(ReasonCode::SUCCESS),
                    session_over: true,
                };
            }
            Ok(_event) => {
                // PingResp, SubAck, outgoing publishes and the like
                log_debug!("{transport_id}: mqtt event (ignored): {:?}", _event);
            }
            Err(ConnectionError::ConnectionRefused(code)) => {
                log_error!("{transport_id}: connection refused: {code:?}");
                return Step {
                    event: TransportEvent::Connected(return_code(code)),
                    session_over: true,
                };
            }
            Err(err) if !*acked => {
                // no CONNACK yet: the failure is on this side of the wire
                log_error!("{transport_id}: could not reach broker: {err}");
                return Step {
                    event: TransportEvent::Connected(ReasonCode::SERVER_UNAVAILABLE),
                    session_over: true,
                };
            }
            Err(err) => {
                log_error!("{transport_id}: broker connection lost: {err}");
                return Step {
                    event: TransportEvent::Disconnected(ReasonCode::CONNECTION_LOST),
                    session_over: true,
                };
            }
        }
    }
}

#[async_trait::async_trait]
impl Transport for RumqttcTransport {
    // ---

    fn base(&self) -> &TransportBase {
        &self.base
    }

    async fn connect(&self, params: ConnectParams) -> Result<()> {
        // ---
        let capacity = params.options.request_channel_capacity;
        let (client, event_loop) = AsyncClient::new(mqtt_options(&params), capacity);

        log_debug!(
            "{}: opening session with {}:{}",
            self.transport_id(),
            params.host,
            params.port
        );

        let (steps_tx, steps_rx) = mpsc::unbounded_channel();
        let driver = tokio::spawn(drive(self.transport_id().to_string(), event_loop, steps_tx));

        // client and session swap under the same lock
        let mut session = self.session.lock().await;
        *session = Some(Session {
            steps: steps_rx,
            driver,
        });
        *lock_ignore_poison(&self.client) = Some(client);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        // ---
        log_debug!("{}: disconnecting mqtt client", self.transport_id());

        self.client()?.disconnect().await.map_err(|err| {
            log_error!("{}: mqtt disconnect failed: {err}", self.transport_id());
            FeedError::Transport(err.to_string())
        })
    }

    async fn publish(&self, address: Address, payload: Bytes) -> Result<()> {
        // ---
        let topic = address.0.as_ref();

        self.client()?
            .publish(topic, QoS::AtMostOnce, false, payload.to_vec())
            .await
            .map_err(|err| {
                log_error!(
                    "{}: publish failed for topic {topic}: {err}",
                    self.transport_id()
                );
                FeedError::Transport(err.to_string())
            })
    }

    async fn subscribe(&self, sub: Subscription) -> Result<()> {
        // ---
        let topic = sub.0.as_ref();

        self.client()?
            .subscribe(topic, QoS::AtMostOnce)
            .await
            .map_err(|err| {
                log_error!(
                    "{}: subscribe failed for topic {topic}: {err}",
                    self.transport_id()
                );
                FeedError::Transport(err.to_string())
            })?;

        log_info!("{}: subscribed to topic {topic}", self.transport_id());
        Ok(())
    }

    async fn poll(&self) -> Result<Option<TransportEvent>> {
        // ---
        let mut guard = self.session.lock().await;

        let received = match guard.as_mut() {
            Some(session) => session.steps.recv().await,
            None => return Ok(None),
        };

        let Some(step) = received else {
            // driver gone without reporting the end of its session
            *guard = None;
            *lock_ignore_poison(&self.client) = None;
            return Ok(None);
        };

        if step.session_over {
            // no reconnect: forget the session entirely
            *guard = None;
            *lock_ignore_poison(&self.client) = None;
        }

        Ok(Some(step.event))
    }
}

/// Maps a CONNACK return code onto its raw MQTT 3.1.1 value.
fn return_code(code: ConnectReturnCode) -> ReasonCode {
    // ---
    match code {
        ConnectReturnCode::Success => ReasonCode::SUCCESS,
        ConnectReturnCode::RefusedProtocolVersion => ReasonCode::BAD_PROTOCOL_VERSION,
        ConnectReturnCode::BadClientId => ReasonCode::BAD_CLIENT_ID,
        ConnectReturnCode::ServiceUnavailable => ReasonCode::SERVER_UNAVAILABLE,
        ConnectReturnCode::BadUserNamePassword => ReasonCode::BAD_CREDENTIALS,
        ConnectReturnCode::NotAuthorized => ReasonCode::NOT_AUTHORIZED,
    }
}

/// Translates connect parameters into rumqttc options.
///
/// The access key is the username; the password is left empty.
fn mqtt_options(params: &ConnectParams) -> MqttOptions {
    // ---
    let client_id = params.options.resolve_client_id();
    if !client_id.is_portable() {
        log_warn!("client id {client_id} is outside the MQTT 3.1.1 portable range, broker may refuse it");
    }

    let mut mqtt_options = MqttOptions::new(client_id.as_str(), params.host.as_str(), params.port);
    mqtt_options.set_keep_alive(params.keep_alive);
    mqtt_options.set_credentials(params.credentials.username(), "");
    mqtt_options.set_clean_session(params.options.clean_session);

    if let Some(max) = params.options.max_packet_size {
        mqtt_options.set_max_packet_size(max, max);
    }

    mqtt_options
}

/// Creates an idle rumqttc-based MQTT transport.
///
/// # Errors
///
/// Currently infallible, always returns `Ok`. The broker address is only
/// known at connect time.
pub async fn create_transport(config: TransportConfig) -> Result<TransportPtr> {
    // ---
    Ok(RumqttcTransport::create(&config))
}
