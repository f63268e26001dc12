//! In-memory transport implementation.
//!
//! This module provides a pure in-process implementation of the domain-level
//! `Transport` trait. It is intended primarily for testing, demos, and as a
//! reference for transport semantics.
//!
//! ## Reference Semantics
//!
//! A [`MemoryHub`] plays the part of the broker. Every transport created on a
//! hub is one client connection, identified by its node id. The hub:
//!
//! - answers `connect()` with a `Connected` event carrying the hub's connack
//!   code, unless the hub was created with [`MemoryHub::manual`];
//! - answers `disconnect()` with a clean `Disconnected(0)` event;
//! - loops a publish on `api/feeds/{id}/streams/send.json` back to every node
//!   subscribed to `api/feeds/{id}/streams/receive.json`, the way the service
//!   echoes a new feed value to its subscribers. Publishes on any other topic
//!   are delivered to exact-match subscribers;
//! - records every operation so tests can assert on what the client asked for;
//! - lets tests inject arbitrary events with [`MemoryHub::emit`].
//!
//! ## Non-Goals
//!
//! This transport does not attempt to emulate the failure modes, persistence,
//! or delivery guarantees of a real broker.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use tokio::sync::{mpsc, Mutex, RwLock};

use crate::{
    // ---
    log_debug,
    log_warn,
    Address,
    ConnectParams,
    FeedError,
    FeedId,
    ReasonCode,
    Result,
    Subscription,
    Transport,
    TransportBase,
    TransportConfig,
    TransportEvent,
    TransportPtr,
};

/// One request a client made of the simulated broker.
#[derive(Clone, Debug)]
pub enum TransportOp {
    // ---
    Connect(ConnectParams),
    Disconnect,
    Subscribe(Subscription),
    Publish { address: Address, payload: Bytes },
}

struct Node {
    // ---
    events: mpsc::UnboundedSender<TransportEvent>,
    subscriptions: HashSet<Subscription>,
    operations: Vec<TransportOp>,
}

/// Shared message bus for the in-memory transport.
///
/// Simulates the Adafruit IO broker within a single process. All transports
/// that share a `MemoryHub` see each other's publishes.
///
/// # Usage in tests
///
/// ```
/// # use adafruit_io_mqtt::{MemoryHub, ReasonCode, TransportConfig, TransportEvent};
/// # async fn example() -> adafruit_io_mqtt::Result<()> {
/// let hub = MemoryHub::manual();
/// let config = TransportConfig { node_id: "sensor".into(), transport_type: None };
/// let transport = adafruit_io_mqtt::create_memory_transport_with_hub(config, hub.clone()).await?;
///
/// // nothing is acknowledged until the test says so
/// hub.emit("sensor", TransportEvent::Connected(ReasonCode::SUCCESS)).await;
/// # Ok(())
/// # }
/// ```
pub struct MemoryHub {
    // ---
    connack: Option<ReasonCode>,
    nodes: RwLock<HashMap<String, Node>>,
}

impl MemoryHub {
    /// Create a hub that accepts every connect.
    pub fn new() -> Arc<Self> {
        // ---
        Self::with_connack(ReasonCode::SUCCESS)
    }

    /// Create a hub that answers every connect with `code`.
    pub fn with_connack(code: ReasonCode) -> Arc<Self> {
        // ---
        Arc::new(Self {
            connack: Some(code),
            nodes: RwLock::new(HashMap::new()),
        })
    }

    /// Create a hub that never answers a connect on its own.
    ///
    /// Connect outcomes must be injected with [`MemoryHub::emit`].
    pub fn manual() -> Arc<Self> {
        // ---
        Arc::new(Self {
            connack: None,
            nodes: RwLock::new(HashMap::new()),
        })
    }

    /// Inject an event into the session of `node_id`.
    ///
    /// Returns `false` when no transport with that id exists on this hub.
    pub async fn emit(&self, node_id: &str, event: TransportEvent) -> bool {
        // ---
        let nodes = self.nodes.read().await;

        match nodes.get(node_id) {
            Some(node) => node.events.send(event).is_ok(),
            None => {
                log_warn!("memory hub has no node {node_id}, dropping {event:?}");
                false
            }
        }
    }

    /// Every operation `node_id` has performed so far, oldest first.
    pub async fn operations(&self, node_id: &str) -> Vec<TransportOp> {
        // ---
        let nodes = self.nodes.read().await;
        nodes
            .get(node_id)
            .map(|node| node.operations.clone())
            .unwrap_or_default()
    }

    /// Topics `node_id` is currently subscribed to.
    pub async fn subscriptions(&self, node_id: &str) -> HashSet<Subscription> {
        // ---
        let nodes = self.nodes.read().await;
        nodes
            .get(node_id)
            .map(|node| node.subscriptions.clone())
            .unwrap_or_default()
    }

    async fn register(&self, node_id: &str, events: mpsc::UnboundedSender<TransportEvent>) {
        // ---
        log_debug!("{node_id}: register with memory hub");

        let mut nodes = self.nodes.write().await;
        nodes.insert(
            node_id.to_string(),
            Node {
                events,
                subscriptions: HashSet::new(),
                operations: Vec::new(),
            },
        );
    }

    async fn record(&self, node_id: &str, op: TransportOp) -> Result<()> {
        // ---
        let mut nodes = self.nodes.write().await;
        let node = nodes
            .get_mut(node_id)
            .ok_or_else(|| FeedError::Transport(format!("{node_id}: not registered with hub")))?;
        node.operations.push(op);
        Ok(())
    }

    async fn connect(&self, node_id: &str, params: ConnectParams) -> Result<()> {
        // ---
        self.record(node_id, TransportOp::Connect(params)).await?;

        if let Some(code) = self.connack {
            log_debug!("{node_id}: memory hub acknowledges connect with rc {code}");
            self.emit(node_id, TransportEvent::Connected(code)).await;
        }
        Ok(())
    }

    async fn disconnect(&self, node_id: &str) -> Result<()> {
        // ---
        self.record(node_id, TransportOp::Disconnect).await?;

        let mut nodes = self.nodes.write().await;
        if let Some(node) = nodes.get_mut(node_id) {
            node.subscriptions.clear();
            let _ = node
                .events
                .send(TransportEvent::Disconnected(ReasonCode::SUCCESS));
        }
        Ok(())
    }

    async fn subscribe(&self, node_id: &str, sub: Subscription) -> Result<()> {
        // ---
        log_debug!("{node_id}: subscribe to {sub:?}");

        self.record(node_id, TransportOp::Subscribe(sub.clone()))
            .await?;

        let mut nodes = self.nodes.write().await;
        if let Some(node) = nodes.get_mut(node_id) {
            node.subscriptions.insert(sub);
        }
        Ok(())
    }

    async fn publish(&self, node_id: &str, address: Address, payload: Bytes) -> Result<()> {
        // ---
        self.record(
            node_id,
            TransportOp::Publish {
                address: address.clone(),
                payload: payload.clone(),
            },
        )
        .await?;

        // a feed update comes back out on the feed's receive topic
        let target = match FeedId::from_send_topic(&address.0) {
            Some(feed) => feed.receive_topic(),
            None => Subscription::from(address),
        };

        let nodes = self.nodes.read().await;
        for (_id, node) in nodes.iter() {
            if node.subscriptions.contains(&target) {
                log_debug!("{node_id}: deliver {target:?} to {_id}");

                // Ignore send failures; a closed channel means the
                // transport was dropped.
                let _ = node.events.send(TransportEvent::Message {
                    topic: target.0.clone(),
                    payload: payload.clone(),
                });
            }
        }

        Ok(())
    }
}

/// Process-global hub used by [`create_memory_transport`].
static GLOBAL_HUB: OnceLock<Arc<MemoryHub>> = OnceLock::new();

fn global_hub() -> Arc<MemoryHub> {
    GLOBAL_HUB.get_or_init(MemoryHub::new).clone()
}

/// In-memory transport.
///
/// One client connection to a [`MemoryHub`]. Events the hub produces for
/// this node queue up in `inbox` until `poll()` takes them.
struct MemoryTransport {
    // ---
    base: TransportBase,
    hub: Arc<MemoryHub>,
    inbox: Mutex<mpsc::UnboundedReceiver<TransportEvent>>,
    session: AtomicBool,
}

#[async_trait::async_trait]
impl Transport for MemoryTransport {
    // ---
    fn base(&self) -> &TransportBase {
        &self.base
    }

    async fn connect(&self, params: ConnectParams) -> Result<()> {
        self.session.store(true, Ordering::SeqCst);
        self.hub.connect(self.transport_id(), params).await
    }

    async fn disconnect(&self) -> Result<()> {
        self.hub.disconnect(self.transport_id()).await
    }

    /// Matching is exact string equality on the topic, after the
    /// send-to-receive rewrite for feed topics.
    async fn publish(&self, address: Address, payload: Bytes) -> Result<()> {
        self.hub.publish(self.transport_id(), address, payload).await
    }

    async fn subscribe(&self, sub: Subscription) -> Result<()> {
        self.hub.subscribe(self.transport_id(), sub).await
    }

    /// Queued events are always handed out, even with no session open, so
    /// tests may inject before connecting. With an empty queue the call
    /// waits only while a session is open.
    async fn poll(&self) -> Result<Option<TransportEvent>> {
        // ---
        let mut inbox = self.inbox.lock().await;

        let event = match inbox.try_recv() {
            Ok(event) => event,
            Err(_) if !self.session.load(Ordering::SeqCst) => return Ok(None),
            Err(_) => match inbox.recv().await {
                Some(event) => event,
                None => return Ok(None),
            },
        };

        match &event {
            TransportEvent::Connected(code) if !code.is_success() => {
                self.session.store(false, Ordering::SeqCst);
            }
            TransportEvent::Disconnected(_) => {
                self.session.store(false, Ordering::SeqCst);
            }
            _ => {}
        }

        Ok(Some(event))
    }
}

/// Create a new in-memory transport on the process-global hub.
///
/// The global hub acknowledges every connect. For isolated tests, use
/// [`create_memory_transport_with_hub`].
///
/// # Errors
///
/// Currently infallible, always returns `Ok`.
pub async fn create_memory_transport(config: TransportConfig) -> Result<TransportPtr> {
    // ---
    create_memory_transport_with_hub(config, global_hub()).await
}

/// Create a new in-memory transport on the provided hub.
///
/// The transport registers under `config.node_id`; a second transport with
/// the same id replaces the first on that hub.
///
/// # Errors
///
/// Currently infallible, always returns `Ok`.
pub async fn create_memory_transport_with_hub(
    config: TransportConfig,
    hub: Arc<MemoryHub>,
) -> Result<TransportPtr> {
    // ---
    log_debug!("{}: create memory transport", config.node_id);

    let (tx, rx) = mpsc::unbounded_channel();
    hub.register(&config.node_id, tx).await;

    let transport = MemoryTransport {
        base: TransportBase::from(&config),
        hub,
        inbox: Mutex::new(rx),
        session: AtomicBool::new(false),
    };

    Ok(Arc::new(transport))
}
