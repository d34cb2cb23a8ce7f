// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # RabbitMQ Message Forwarding
//!
//! Received message bodies are decoded as text and pushed onto a caller
//! supplied unbounded channel. Deliveries are consumed in auto-ack mode, so
//! nothing is acknowledged here and nothing is retried.

use crate::otel;
use futures_util::{Stream, StreamExt};
use lapin::{message::Delivery, protocol::basic::AMQPProperties, Consumer};
use opentelemetry::{
    global,
    trace::{Span, Status},
};
use std::{borrow::Cow, fmt::Display};
use tokio::{sync::mpsc::UnboundedSender, task::JoinHandle};
use tracing::{debug, error, warn};

const CONSUMER_SPAN_NAME: &str = "amqp receive";

/// A message handed over by the broker subscription.
pub trait IncomingMessage {
    fn data(&self) -> &[u8];
    fn properties(&self) -> &AMQPProperties;
}

impl IncomingMessage for Delivery {
    fn data(&self) -> &[u8] {
        &self.data
    }

    fn properties(&self) -> &AMQPProperties {
        &self.properties
    }
}

/// Decodes a message body as text, replacing invalid UTF-8 sequences.
pub fn decode_body(data: &[u8]) -> String {
    String::from_utf8_lossy(data).into_owned()
}

/// Forwards every message of `stream` to `sender` until the stream ends,
/// yields an error, or the receiving side is dropped.
pub async fn forward<S, M, E>(mut stream: S, sender: UnboundedSender<String>)
where
    S: Stream<Item = Result<M, E>> + Unpin,
    M: IncomingMessage,
    E: Display,
{
    let tracer = global::tracer("amqp consumer");

    while let Some(result) = stream.next().await {
        let msg = match result {
            Ok(msg) => msg,
            Err(err) => {
                error!(error = err.to_string(), "subscription failure, stop forwarding");
                break;
            }
        };

        let (_ctx, mut span) = otel::new_span(msg.properties(), &tracer, CONSUMER_SPAN_NAME);

        let body = decode_body(msg.data());
        debug!(body = body, "message received");

        if sender.send(body).is_err() {
            warn!("receiver dropped, stop forwarding");
            span.set_status(Status::Error {
                description: Cow::from("receiver dropped"),
            });
            break;
        }

        span.set_status(Status::Ok);
    }

    debug!("forwarding finished");
}

/// Runs [`forward`] for a broker subscription on a background task.
pub fn spawn_forwarder(consumer: Consumer, sender: UnboundedSender<String>) -> JoinHandle<()> {
    tokio::spawn(forward(consumer, sender))
}
