//! Feed round trip using the in-memory transport.
//!
//! A single client subscribes to a feed from its connect handler, publishes a
//! few values and prints the updates the hub echoes back. No network needed.
//!
//! Run with: cargo run --example feed_memory

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::panic_in_result_fn
)]

use std::time::Duration;

use adafruit_io_mqtt::{
    ConnectOptions, FeedClient, FeedClientBuilder, MemoryHub, Result, TransportBuilder,
};
use tokio::sync::mpsc;
use tracing_subscriber::{fmt as tracing_format, EnvFilter};

const FEED: &str = "greenhouse.temperature";

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    tracing_format()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_line_number(true)
        .init();

    let transport = TransportBuilder::new()
        .node_id("greenhouse")
        .memory_hub(MemoryHub::new())
        .build()
        .await?;

    let client = FeedClientBuilder::new("demo-key")
        .transport(transport)
        .build()
        .await?;

    let (ready_tx, mut ready_rx) = mpsc::unbounded_channel();
    let (update_tx, mut update_rx) = mpsc::unbounded_channel();

    client.on_connect(move |client: &FeedClient| {
        println!("connected, subscribing to {FEED}");
        let client = client.clone();
        let ready_tx = ready_tx.clone();
        tokio::spawn(async move {
            match client.subscribe(FEED).await {
                Ok(()) => {
                    let _ = ready_tx.send(());
                }
                Err(err) => eprintln!("subscribe failed: {err}"),
            }
        });
    });

    client.on_message(move |_client, feed, payload| {
        let _ = update_tx.send((feed.to_string(), String::from_utf8_lossy(payload).into_owned()));
    });

    client.on_disconnect(|_client: &FeedClient| println!("disconnected"));

    client.connect(ConnectOptions::default()).await?;
    let background = client.run_background()?;

    ready_rx.recv().await.expect("connect handler dropped");

    for value in ["21.5", "22.0", "22.4"] {
        client.publish(FEED, value).await?;

        let (feed, payload) = tokio::time::timeout(Duration::from_secs(1), update_rx.recv())
            .await
            .expect("no echo from hub")
            .expect("message handler dropped");
        println!("{feed} -> {payload}");
    }

    client.disconnect().await?;
    background.await.expect("background loop panicked")?;

    Ok(())
}
