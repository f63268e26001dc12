//! Talk to the real Adafruit IO service over rumqttc.
//!
//! Subscribes to a feed, publishes a value to it and prints every update
//! until interrupted with Ctrl-C.
//!
//! Run with:
//!
//! ```text
//! AIO_KEY=<your key> cargo run --example feed_rumqttc --features transport_rumqttc -- my-feed
//! ```

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::panic_in_result_fn
)]

use adafruit_io_mqtt::{
    ConnectOptions, FeedClient, FeedClientBuilder, FeedError, Result, TransportBuilder,
};
use tracing_subscriber::{fmt as tracing_format, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    tracing_format()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_line_number(true)
        .init();

    let key = std::env::var("AIO_KEY")
        .map_err(|_| FeedError::MissingConfig("AIO_KEY environment variable".into()))?;
    let feed = std::env::args().nth(1).unwrap_or_else(|| "demo".to_string());

    let transport = TransportBuilder::new()
        .node_id("feed-demo")
        .transport_type("rumqttc")
        .build()
        .await?;

    let client = FeedClientBuilder::new(key)
        .transport(transport)
        .build()
        .await?;

    let subscribe_to = feed.clone();
    client.on_connect(move |client: &FeedClient| {
        println!("connected to Adafruit IO");
        let client = client.clone();
        let feed = subscribe_to.clone();
        tokio::spawn(async move {
            if let Err(err) = client.subscribe(feed.as_str()).await {
                eprintln!("subscribe failed: {err}");
                return;
            }
            if let Err(err) = client.publish(feed.as_str(), "hello from rust").await {
                eprintln!("publish failed: {err}");
            }
        });
    });

    client.on_message(|_client, feed, payload| {
        println!("{feed} -> {}", String::from_utf8_lossy(payload));
    });

    client.on_disconnect(|_client: &FeedClient| println!("disconnected"));

    client.connect(ConnectOptions::default()).await?;
    let background = client.run_background()?;

    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen for ctrl-c");

    client.disconnect().await?;
    background.await.expect("background loop panicked")?;

    Ok(())
}
