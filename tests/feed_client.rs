// tests/feed_client.rs

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::{sleep, timeout};

use adafruit_io_mqtt::{
    // ---
    ConnectOptions,
    FeedClient,
    FeedClientBuilder,
    FeedError,
    MemoryHub,
    ReasonCode,
    TransportBuilder,
    TransportEvent,
    TransportOp,
};

type Received = Arc<Mutex<Vec<(String, Vec<u8>)>>>;

fn init_logging() {
    // ---
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn client_on(hub: &Arc<MemoryHub>, node: &str) -> FeedClient {
    // ---
    let transport = TransportBuilder::new()
        .node_id(node)
        .memory_hub(hub.clone())
        .build()
        .await
        .expect("failed to create memory transport");

    FeedClientBuilder::new("abc123")
        .transport(transport)
        .pump_timeout(Duration::from_millis(50))
        .build()
        .await
        .expect("failed to build client")
}

fn count_calls(counter: &Arc<AtomicUsize>) -> impl Fn(&FeedClient) + Send + Sync + 'static {
    let counter = Arc::clone(counter);
    move |_client: &FeedClient| {
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

fn collect_messages(client: &FeedClient) -> Received {
    // ---
    let received: Received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);

    client.on_message(move |_client, feed, payload| {
        sink.lock()
            .unwrap()
            .push((feed.to_string(), payload.to_vec()));
    });
    received
}

async fn connected_client(hub: &Arc<MemoryHub>, node: &str) -> FeedClient {
    // ---
    let client = client_on(hub, node).await;
    client.connect(ConnectOptions::default()).await.unwrap();
    assert!(client.pump().await.unwrap(), "no connack queued");
    assert!(client.is_connected());
    client
}

async fn wait_until(what: &str, cond: impl Fn() -> bool) {
    // ---
    timeout(Duration::from_secs(2), async {
        while !cond() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {what}"));
}

#[tokio::test]
async fn connect_ack_marks_connected_and_fires_on_connect_once() {
    // ---
    init_logging();

    let hub = MemoryHub::manual();
    let client = client_on(&hub, "scenario").await;

    let connects = Arc::new(AtomicUsize::new(0));
    client.on_connect(count_calls(&connects));

    assert!(!client.is_connected());
    client.connect(ConnectOptions::default()).await.unwrap();

    // no connect event yet
    assert!(!client.is_connected());
    assert!(!client.pump().await.unwrap());
    assert!(!client.is_connected());

    hub.emit("scenario", TransportEvent::Connected(ReasonCode::SUCCESS))
        .await;
    assert!(client.pump().await.unwrap());

    assert!(client.is_connected());
    assert_eq!(connects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn connect_uses_fixed_service_parameters_and_key() {
    // ---
    let hub = MemoryHub::manual();
    let client = client_on(&hub, "params").await;

    client
        .connect(ConnectOptions::default().with_client_id("params-1"))
        .await
        .unwrap();

    let ops = hub.operations("params").await;
    match ops.as_slice() {
        [TransportOp::Connect(params)] => {
            assert_eq!(params.host, "io.adafruit.com");
            assert_eq!(params.port, 1883);
            assert_eq!(params.keep_alive, Duration::from_secs(3600));
            assert_eq!(params.credentials.username(), "abc123");
            assert_eq!(
                params.options.client_id.as_ref().map(|id| id.as_str()),
                Some("params-1")
            );
        }
        other => panic!("unexpected operations: {other:?}"),
    }
}

#[tokio::test]
async fn connect_while_connected_is_a_no_op() {
    // ---
    let hub = MemoryHub::new();
    let client = connected_client(&hub, "connect-twice").await;

    client.connect(ConnectOptions::default()).await.unwrap();

    let connects = hub
        .operations("connect-twice")
        .await
        .into_iter()
        .filter(|op| matches!(op, TransportOp::Connect(_)))
        .count();
    assert_eq!(connects, 1);
}

#[tokio::test]
async fn disconnect_while_not_connected_is_a_no_op() {
    // ---
    let hub = MemoryHub::new();
    let client = client_on(&hub, "idle").await;

    client.disconnect().await.unwrap();

    assert!(hub.operations("idle").await.is_empty());
    assert!(!client.is_connected());
}

#[tokio::test]
async fn refused_connect_reports_code_and_stays_disconnected() {
    // ---
    let hub = MemoryHub::manual();
    let client = client_on(&hub, "refused").await;

    let connects = Arc::new(AtomicUsize::new(0));
    client.on_connect(count_calls(&connects));

    client.connect(ConnectOptions::default()).await.unwrap();
    hub.emit("refused", TransportEvent::Connected(ReasonCode(3)))
        .await;

    let err = client.pump().await.unwrap_err();
    assert_eq!(
        err,
        FeedError::Connection {
            code: ReasonCode(3)
        }
    );
    assert_eq!(err.reason_code(), Some(ReasonCode(3)));
    assert!(!client.is_connected());
    assert_eq!(connects.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unexpected_disconnect_reports_code_and_clears_state() {
    // ---
    let hub = MemoryHub::new();
    let client = connected_client(&hub, "lost").await;

    let disconnects = Arc::new(AtomicUsize::new(0));
    client.on_disconnect(count_calls(&disconnects));

    hub.emit("lost", TransportEvent::Disconnected(ReasonCode(7)))
        .await;

    let err = client.pump().await.unwrap_err();
    assert_eq!(
        err,
        FeedError::ConnectionLost {
            code: ReasonCode(7)
        }
    );
    assert!(!client.is_connected());
    assert_eq!(disconnects.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn clean_disconnect_ends_run_blocking_and_fires_on_disconnect() {
    // ---
    let hub = MemoryHub::new();
    let client = connected_client(&hub, "clean").await;

    let disconnects = Arc::new(AtomicUsize::new(0));
    client.on_disconnect(count_calls(&disconnects));

    client.disconnect().await.unwrap();

    timeout(Duration::from_secs(1), client.run_blocking())
        .await
        .expect("run_blocking did not return")
        .unwrap();

    assert!(!client.is_connected());
    assert_eq!(disconnects.load(Ordering::SeqCst), 1);
    assert!(matches!(
        hub.operations("clean").await.last(),
        Some(TransportOp::Disconnect)
    ));
}

#[tokio::test]
async fn run_blocking_without_session_returns_immediately() {
    // ---
    let hub = MemoryHub::new();
    let client = client_on(&hub, "never-connected").await;

    timeout(Duration::from_millis(200), client.run_blocking())
        .await
        .expect("run_blocking should not wait without a session")
        .unwrap();
}

#[tokio::test]
async fn publish_sends_value_unmodified_to_send_topic() {
    // ---
    let hub = MemoryHub::new();
    let client = connected_client(&hub, "publisher").await;

    client.publish("kitchen.temp", "21.5").await.unwrap();
    client
        .publish("raw", vec![0u8, 159, 146, 150])
        .await
        .unwrap();

    let published: Vec<(String, Vec<u8>)> = hub
        .operations("publisher")
        .await
        .into_iter()
        .filter_map(|op| match op {
            TransportOp::Publish { address, payload } => {
                Some((address.0.to_string(), payload.to_vec()))
            }
            _ => None,
        })
        .collect();

    assert_eq!(
        published,
        vec![
            (
                "api/feeds/kitchen.temp/streams/send.json".to_string(),
                b"21.5".to_vec()
            ),
            (
                "api/feeds/raw/streams/send.json".to_string(),
                vec![0u8, 159, 146, 150]
            ),
        ]
    );
}

#[tokio::test]
async fn subscribed_feed_update_reaches_on_message() {
    // ---
    let hub = MemoryHub::new();
    let client = connected_client(&hub, "subscriber").await;
    let received = collect_messages(&client);

    client.subscribe("door").await.unwrap();
    assert!(hub
        .subscriptions("subscriber")
        .await
        .iter()
        .any(|sub| sub.0.as_ref() == "api/feeds/door/streams/receive.json"));

    client.publish("door", "open").await.unwrap();
    assert!(client.pump().await.unwrap());

    assert_eq!(
        *received.lock().unwrap(),
        vec![("door".to_string(), b"open".to_vec())]
    );
}

#[tokio::test]
async fn empty_feed_id_round_trips() {
    // ---
    let hub = MemoryHub::new();
    let client = connected_client(&hub, "empty-feed").await;
    let received = collect_messages(&client);

    client.subscribe("").await.unwrap();
    client.publish("", "v").await.unwrap();
    assert!(client.pump().await.unwrap());

    hub.emit(
        "empty-feed",
        TransportEvent::Message {
            topic: Arc::from("api/feeds//streams/receive.json"),
            payload: bytes::Bytes::from_static(b"w"),
        },
    )
    .await;
    assert!(client.pump().await.unwrap());

    assert_eq!(
        *received.lock().unwrap(),
        vec![
            (String::new(), b"v".to_vec()),
            (String::new(), b"w".to_vec())
        ]
    );
}

#[tokio::test]
async fn messages_on_foreign_topics_are_dropped() {
    // ---
    let hub = MemoryHub::new();
    let client = connected_client(&hub, "foreign").await;
    let received = collect_messages(&client);

    for topic in [
        "other/topic",
        "api/feeds/door/streams/send.json",
    ] {
        hub.emit(
            "foreign",
            TransportEvent::Message {
                topic: Arc::from(topic),
                payload: bytes::Bytes::from_static(b"x"),
            },
        )
        .await;
        assert!(client.pump().await.unwrap(), "event for {topic} not handled");
    }

    assert!(received.lock().unwrap().is_empty());
    assert!(client.is_connected());
}

#[tokio::test]
async fn replacing_and_clearing_message_handler() {
    // ---
    let hub = MemoryHub::new();
    let client = connected_client(&hub, "slots").await;

    let first = collect_messages(&client);
    let second = collect_messages(&client);

    let update = || TransportEvent::Message {
        topic: Arc::from("api/feeds/lamp/streams/receive.json"),
        payload: bytes::Bytes::from_static(b"ON"),
    };

    hub.emit("slots", update()).await;
    client.pump().await.unwrap();

    assert!(first.lock().unwrap().is_empty());
    assert_eq!(second.lock().unwrap().len(), 1);

    client.clear_on_message();
    hub.emit("slots", update()).await;
    client.pump().await.unwrap();

    assert_eq!(second.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn clients_do_not_share_connection_state() {
    // ---
    let hub = MemoryHub::new();
    let left = connected_client(&hub, "left").await;
    let right = client_on(&hub, "right").await;

    assert!(left.is_connected());
    assert!(!right.is_connected());

    // updates published by one client reach the other's subscription
    right.connect(ConnectOptions::default()).await.unwrap();
    right.pump().await.unwrap();
    let received = collect_messages(&right);
    right.subscribe("shared").await.unwrap();

    left.publish("shared", "42").await.unwrap();
    assert!(right.pump().await.unwrap());

    assert_eq!(
        *received.lock().unwrap(),
        vec![("shared".to_string(), b"42".to_vec())]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn background_loop_delivers_and_finishes_on_disconnect() {
    // ---
    init_logging();

    let hub = MemoryHub::new();
    let client = client_on(&hub, "background").await;
    let received = collect_messages(&client);

    // subscribe from inside the connect handler, the usual pattern
    client.on_connect(|client: &FeedClient| {
        let client = client.clone();
        tokio::spawn(async move { client.subscribe("weather").await });
    });

    client.connect(ConnectOptions::default()).await.unwrap();
    let handle = client.run_background().unwrap();

    assert!(matches!(
        client.run_background(),
        Err(FeedError::AlreadyRunning)
    ));

    wait_until("connection", || client.is_connected()).await;

    let subscribed = {
        let hub = hub.clone();
        move || {
            let hub = hub.clone();
            async move { !hub.subscriptions("background").await.is_empty() }
        }
    };
    timeout(Duration::from_secs(2), async {
        while !subscribed().await {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("subscription never arrived");

    client.publish("weather", "sunny").await.unwrap();
    wait_until("message", || !received.lock().unwrap().is_empty()).await;

    client.disconnect().await.unwrap();
    timeout(Duration::from_secs(1), handle)
        .await
        .expect("background loop did not finish")
        .expect("background task panicked")
        .unwrap();

    assert!(!client.is_connected());
    assert_eq!(
        *received.lock().unwrap(),
        vec![("weather".to_string(), b"sunny".to_vec())]
    );

    // the slot is free again once the loop has finished
    let again = client.run_background().unwrap();
    again.await.unwrap().unwrap();
}

#[tokio::test]
async fn background_loop_reports_refusal_through_join_handle() {
    // ---
    let hub = MemoryHub::with_connack(ReasonCode::BAD_CREDENTIALS);
    let client = client_on(&hub, "bad-key").await;

    client.connect(ConnectOptions::default()).await.unwrap();
    let handle = client.run_background().unwrap();

    let result = timeout(Duration::from_secs(1), handle)
        .await
        .expect("background loop did not finish")
        .expect("background task panicked");

    assert_eq!(
        result,
        Err(FeedError::Connection {
            code: ReasonCode(4)
        })
    );
    assert!(!client.is_connected());
}

#[tokio::test]
async fn background_slot_frees_after_handler_panic() {
    // ---
    let hub = MemoryHub::new();
    let client = client_on(&hub, "panicky").await;

    client.on_connect(|_client: &FeedClient| panic!("connect handler failed"));

    client.connect(ConnectOptions::default()).await.unwrap();
    let handle = client.run_background().unwrap();

    let joined = timeout(Duration::from_secs(1), handle)
        .await
        .expect("background loop did not finish");
    assert!(joined.unwrap_err().is_panic());

    client.clear_on_connect();
    assert!(client.is_connected());
    client.disconnect().await.unwrap();

    let again = client
        .run_background()
        .expect("slot still taken after panic");
    timeout(Duration::from_secs(1), again)
        .await
        .expect("second loop did not finish")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn background_slot_frees_after_abort() {
    // ---
    let hub = MemoryHub::manual();
    let client = client_on(&hub, "aborted").await;

    // the session stays open with nothing to read, so the loop parks
    client.connect(ConnectOptions::default()).await.unwrap();
    let handle = client.run_background().unwrap();
    sleep(Duration::from_millis(20)).await;

    handle.abort();
    let joined = timeout(Duration::from_secs(1), handle)
        .await
        .expect("aborted loop did not finish");
    assert!(joined.unwrap_err().is_cancelled());

    let again = client
        .run_background()
        .expect("slot still taken after abort");
    again.abort();
}
