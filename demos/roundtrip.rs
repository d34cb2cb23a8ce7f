// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! Publishes a few messages to a local broker and prints them back.
//!
//! Start a broker first, e.g. `docker run --rm -p 5672:5672 rabbitmq:3`, then
//! `cargo run --example roundtrip`.

use rmq_client::{client::RabbitMQ, errors::AmqpError, logging, queue::QueueDefinition};
use tokio::sync::mpsc::unbounded_channel;
use tracing::{info, warn};

const MESSAGES: &[&str] = &["hello", "from", "rmq-client"];

#[tokio::main]
async fn main() -> Result<(), AmqpError> {
    if logging::setup("debug", false).is_err() {
        warn!("logging already initialized");
    }

    let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/config");

    let mut rmq = RabbitMQ::load(format!("{}/rabbitmq.json", dir))?;
    let queue = QueueDefinition::load(format!("{}/queue.json", dir))?;

    rmq.connect().await?;
    rmq.init_queue(&queue).await?;

    let (tx, mut rx) = unbounded_channel();
    let listener = rmq.receive(tx).await?;

    for msg in MESSAGES {
        rmq.send(msg).await?;
    }

    for _ in MESSAGES {
        match rx.recv().await {
            Some(body) => info!(body = body, "received"),
            None => break,
        }
    }

    rmq.disconnect().await?;
    // the subscription ends with the channel
    let _ = listener.await;

    Ok(())
}
