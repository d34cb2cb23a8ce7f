// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # RabbitMQ Message Publisher
//!
//! Publishes text payloads to a queue through the default exchange. Every
//! publish is bounded by [`PUBLISH_TIMEOUT`] and the broker confirmation is
//! not tracked.

use crate::{errors::AmqpError, otel::HeaderPropagator};
use async_trait::async_trait;
use lapin::{
    options::BasicPublishOptions,
    types::{AMQPValue, FieldTable, ShortString},
    BasicProperties, Channel,
};
#[cfg(test)]
use mockall::automock;
use opentelemetry::{global, Context};
use std::{collections::BTreeMap, sync::Arc, time::Duration};
use tracing::{debug, error};
use uuid::Uuid;

/// Content type of every published message
pub const TEXT_CONTENT_TYPE: &str = "text/plain";

/// Deadline for a single publish
pub const PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

/// Name of the default (direct) exchange, which routes by queue name
const DEFAULT_EXCHANGE: &str = "";

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publishes `payload` to `queue`.
    async fn publish(&self, ctx: &Context, queue: &str, payload: &[u8]) -> Result<(), AmqpError>;
}

/// Publisher bound to one broker channel.
pub struct RabbitMQPublisher {
    channel: Arc<Channel>,
}

impl RabbitMQPublisher {
    pub fn new(channel: Arc<Channel>) -> Arc<RabbitMQPublisher> {
        Arc::new(RabbitMQPublisher { channel })
    }
}

#[async_trait]
impl Publisher for RabbitMQPublisher {
    async fn publish(&self, ctx: &Context, queue: &str, payload: &[u8]) -> Result<(), AmqpError> {
        let mut btree = BTreeMap::<ShortString, AMQPValue>::default();

        global::get_text_map_propagator(|propagator| {
            propagator.inject_context(ctx, &mut HeaderPropagator::new(&mut btree))
        });

        let publishing = self.channel.basic_publish(
            DEFAULT_EXCHANGE,
            queue,
            publish_options(),
            payload,
            publish_properties(btree),
        );

        match tokio::time::timeout(PUBLISH_TIMEOUT, publishing).await {
            Err(_) => {
                error!(queue = queue, "publish deadline exceeded");
                Err(AmqpError::PublishTimeout)
            }
            Ok(Err(err)) => {
                error!(error = err.to_string(), "error publishing message");
                Err(AmqpError::PublishingError)
            }
            Ok(Ok(_)) => {
                debug!(queue = queue, size = payload.len(), "message published");
                Ok(())
            }
        }
    }
}

/// Neither mandatory routing nor immediate delivery is requested.
fn publish_options() -> BasicPublishOptions {
    BasicPublishOptions {
        immediate: false,
        mandatory: false,
    }
}

/// Text content type, a fresh v4 message id and the propagated headers.
fn publish_properties(headers: BTreeMap<ShortString, AMQPValue>) -> BasicProperties {
    BasicProperties::default()
        .with_content_type(ShortString::from(TEXT_CONTENT_TYPE))
        .with_message_id(ShortString::from(Uuid::new_v4().to_string()))
        .with_headers(FieldTable::from(headers))
}
