// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # RabbitMQ Client
//!
//! `RabbitMQ` ties the pieces together: it owns the connection settings, the
//! connection and channel opened from them, the declared queue and the
//! publisher bound to the channel.
//!
//! ```no_run
//! # async fn run() -> Result<(), rmq_client::errors::AmqpError> {
//! use rmq_client::{client::RabbitMQ, queue::QueueDefinition};
//!
//! let mut rmq = RabbitMQ::load("rabbitmq.json")?;
//! rmq.connect().await?;
//! rmq.init_queue(&QueueDefinition::load("queue.json")?).await?;
//!
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//! rmq.receive(tx).await?;
//! rmq.send("hello").await?;
//! let _received = rx.recv().await;
//! # Ok(())
//! # }
//! ```

use crate::{
    channel::new_amqp_channel,
    config::RabbitMQConfigs,
    consumer::spawn_forwarder,
    errors::AmqpError,
    publisher::{Publisher, RabbitMQPublisher},
    queue::QueueDefinition,
};
use lapin::{options::BasicConsumeOptions, types::FieldTable, Channel, Connection};
use opentelemetry::Context;
use std::{path::Path, sync::Arc};
use tokio::{sync::mpsc::UnboundedSender, task::JoinHandle};
use tracing::{debug, error, info, warn};

const REPLY_SUCCESS: u16 = 200;
const REPLY_TEXT: &str = "OK";
/// Empty tag lets the broker generate one
const GENERATED_CONSUMER_TAG: &str = "";

pub struct RabbitMQ {
    cfg: RabbitMQConfigs,
    connection: Option<Arc<Connection>>,
    channel: Option<Arc<Channel>>,
    publisher: Option<Arc<dyn Publisher>>,
    queue: Option<String>,
}

impl RabbitMQ {
    pub fn new(cfg: RabbitMQConfigs) -> RabbitMQ {
        RabbitMQ {
            cfg,
            connection: None,
            channel: None,
            publisher: None,
            queue: None,
        }
    }

    /// Creates a client from a JSON settings file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<RabbitMQ, AmqpError> {
        Ok(RabbitMQ::new(RabbitMQConfigs::load(path)?))
    }

    pub fn configs(&self) -> &RabbitMQConfigs {
        &self.cfg
    }

    pub fn connection(&self) -> Option<Arc<Connection>> {
        self.connection.clone()
    }

    pub fn channel(&self) -> Option<Arc<Channel>> {
        self.channel.clone()
    }

    /// Name of the declared queue, as returned by the broker.
    pub fn queue_name(&self) -> Option<&str> {
        self.queue.as_deref()
    }

    pub fn is_connected(&self) -> bool {
        match (&self.connection, &self.channel) {
            (Some(conn), Some(channel)) => {
                conn.status().connected() && channel.status().connected()
            }
            _ => false,
        }
    }

    /// Connects to the broker and opens the channel.
    ///
    /// On a connected client the previous channel and connection are closed
    /// once the new ones are open. The declared queue name is kept, so `send`
    /// and `receive` keep targeting it; an exclusive or auto-deleted queue
    /// must be declared again with `init_queue`.
    pub async fn connect(&mut self) -> Result<(), AmqpError> {
        info!(endpoint = self.cfg.endpoint(), "connecting to rabbitmq");

        let (conn, channel) = new_amqp_channel(&self.cfg).await?;
        let publisher = RabbitMQPublisher::new(channel.clone());

        let previous = self.replace_link(Some((conn, channel)), publisher);
        close_replaced(previous).await;

        Ok(())
    }

    /// Stores a new connection, channel and publisher and hands back the
    /// previous connection and channel. The declared queue is left untouched.
    fn replace_link(
        &mut self,
        link: Option<(Arc<Connection>, Arc<Channel>)>,
        publisher: Arc<dyn Publisher>,
    ) -> Option<(Arc<Connection>, Arc<Channel>)> {
        let previous = match (self.connection.take(), self.channel.take()) {
            (Some(conn), Some(channel)) => Some((conn, channel)),
            _ => None,
        };

        if let Some((conn, channel)) = link {
            self.connection = Some(conn);
            self.channel = Some(channel);
        }
        self.publisher = Some(publisher);

        previous
    }

    /// Closes the channel, then the connection.
    pub async fn disconnect(&mut self) -> Result<(), AmqpError> {
        info!(endpoint = self.cfg.endpoint(), "disconnecting from rabbitmq");

        let (Some(conn), Some(channel)) = (&self.connection, &self.channel) else {
            return Err(AmqpError::NotConnected);
        };

        if let Err(err) = channel.close(REPLY_SUCCESS, REPLY_TEXT).await {
            error!(error = err.to_string(), "failure to close the channel");
            return Err(AmqpError::CloseChannelError);
        }

        if let Err(err) = conn.close(REPLY_SUCCESS, REPLY_TEXT).await {
            error!(error = err.to_string(), "failure to close the connection");
            return Err(AmqpError::CloseConnectionError);
        }

        self.publisher = None;
        self.channel = None;
        self.connection = None;
        self.queue = None;

        Ok(())
    }

    /// Declares the queue used by `send` and `receive`.
    ///
    /// The queue is declared without extra arguments. An empty name asks the
    /// broker to generate one; the generated name is the one kept.
    pub async fn init_queue(&mut self, def: &QueueDefinition) -> Result<(), AmqpError> {
        let channel = self.channel.as_ref().ok_or(AmqpError::NotConnected)?;

        debug!("creating queue: {}", def.name());

        let queue = match channel
            .queue_declare(def.name(), def.declare_options(), FieldTable::default())
            .await
        {
            Err(err) => {
                error!(
                    error = err.to_string(),
                    name = def.name(),
                    "a problem occurred while declaring the queue"
                );
                Err(AmqpError::DeclareQueueError(def.name().to_owned()))
            }
            Ok(q) => Ok(q),
        }?;

        debug!("queue: {} was created", queue.name());
        self.queue = Some(queue.name().as_str().to_owned());

        Ok(())
    }

    /// Publishes `message` to the declared queue.
    pub async fn send(&self, message: &str) -> Result<(), AmqpError> {
        let publisher = self.publisher.as_ref().ok_or(AmqpError::NotConnected)?;
        let queue = self.queue.as_deref().ok_or(AmqpError::QueueNotDeclared)?;

        publisher
            .publish(&Context::current(), queue, message.as_bytes())
            .await
    }

    /// Subscribes to the declared queue and forwards every received body,
    /// decoded as text, to `sender` from a background task.
    ///
    /// Each call starts one more listener. The returned handle completes when
    /// the subscription ends or `sender`'s receiver is dropped.
    pub async fn receive(&self, sender: UnboundedSender<String>) -> Result<JoinHandle<()>, AmqpError> {
        let channel = self.channel.as_ref().ok_or(AmqpError::NotConnected)?;
        let queue = self.queue.as_deref().ok_or(AmqpError::QueueNotDeclared)?;

        let consumer = match channel
            .basic_consume(
                queue,
                GENERATED_CONSUMER_TAG,
                consume_options(),
                FieldTable::default(),
            )
            .await
        {
            Err(err) => {
                error!(error = err.to_string(), "error to create the consumer");
                Err(AmqpError::BindingConsumerError(queue.to_owned()))
            }
            Ok(c) => Ok(c),
        }?;

        debug!(queue = queue, "consumer created");

        Ok(spawn_forwarder(consumer, sender))
    }
}

/// Deliveries are auto-acknowledged by the broker.
fn consume_options() -> BasicConsumeOptions {
    BasicConsumeOptions {
        no_local: false,
        no_ack: true,
        exclusive: false,
        nowait: false,
    }
}

/// Closes a replaced channel and connection that are still open. Failures
/// are logged and otherwise ignored.
async fn close_replaced(previous: Option<(Arc<Connection>, Arc<Channel>)>) {
    let Some((conn, channel)) = previous else {
        return;
    };

    if !conn.status().connected() {
        return;
    }

    warn!("replacing a live connection, closing the previous one");

    if channel.status().connected() {
        if let Err(err) = channel.close(REPLY_SUCCESS, REPLY_TEXT).await {
            warn!(error = err.to_string(), "failure to close the replaced channel");
        }
    }

    if let Err(err) = conn.close(REPLY_SUCCESS, REPLY_TEXT).await {
        warn!(error = err.to_string(), "failure to close the replaced connection");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::MockPublisher;
    use tokio::sync::mpsc::unbounded_channel;

    fn configs() -> RabbitMQConfigs {
        RabbitMQConfigs {
            username: "guest".to_owned(),
            password: "Z3Vlc3Q=".to_owned(),
            address: "localhost".to_owned(),
            port: "5672".to_owned(),
        }
    }

    #[test]
    fn new_client_is_disconnected() {
        let rmq = RabbitMQ::new(configs());

        assert!(!rmq.is_connected());
        assert!(rmq.connection().is_none());
        assert!(rmq.channel().is_none());
        assert!(rmq.queue_name().is_none());
        assert_eq!(rmq.configs().endpoint(), "localhost:5672");
    }

    #[test]
    fn load_from_file() {
        let path = crate::config::tests::write_temp(
            r#"{"username":"guest","password":"Z3Vlc3Q=","address":"localhost","port":"5672"}"#,
        );

        let rmq = RabbitMQ::load(&path).unwrap();
        std::fs::remove_file(path).unwrap();

        assert_eq!(rmq.configs().username, "guest");
    }

    #[tokio::test]
    async fn operations_require_connection() {
        let mut rmq = RabbitMQ::new(configs());
        let (tx, _rx) = unbounded_channel();

        assert_eq!(
            rmq.init_queue(&QueueDefinition::new("events")).await,
            Err(AmqpError::NotConnected)
        );
        assert_eq!(rmq.send("hello").await, Err(AmqpError::NotConnected));
        assert_eq!(rmq.receive(tx).await.err(), Some(AmqpError::NotConnected));
        assert_eq!(rmq.disconnect().await, Err(AmqpError::NotConnected));
    }

    #[tokio::test]
    async fn send_requires_declared_queue() {
        let mut rmq = RabbitMQ::new(configs());
        let mut publisher = MockPublisher::new();
        publisher.expect_publish().never();
        rmq.publisher = Some(Arc::new(publisher));

        assert_eq!(rmq.send("hello").await, Err(AmqpError::QueueNotDeclared));
    }

    #[tokio::test]
    async fn send_publishes_text_to_declared_queue() {
        let mut rmq = RabbitMQ::new(configs());
        let mut publisher = MockPublisher::new();
        publisher
            .expect_publish()
            .withf(|_, queue, payload| queue == "events" && payload == "héllo".as_bytes())
            .times(1)
            .returning(|_, _, _| Ok(()));
        rmq.publisher = Some(Arc::new(publisher));
        rmq.queue = Some("events".to_owned());

        assert_eq!(rmq.send("héllo").await, Ok(()));
    }

    #[tokio::test]
    async fn send_returns_publisher_error() {
        let mut rmq = RabbitMQ::new(configs());
        let mut publisher = MockPublisher::new();
        publisher
            .expect_publish()
            .times(1)
            .returning(|_, _, _| Err(AmqpError::PublishTimeout));
        rmq.publisher = Some(Arc::new(publisher));
        rmq.queue = Some("events".to_owned());

        assert_eq!(rmq.send("hello").await, Err(AmqpError::PublishTimeout));
    }

    #[tokio::test]
    async fn replacing_link_keeps_declared_queue() {
        let mut rmq = RabbitMQ::new(configs());
        let mut stale = MockPublisher::new();
        stale.expect_publish().never();
        rmq.publisher = Some(Arc::new(stale));
        rmq.queue = Some("events".to_owned());

        let mut fresh = MockPublisher::new();
        fresh
            .expect_publish()
            .withf(|_, queue, payload| queue == "events" && payload == b"again")
            .times(1)
            .returning(|_, _, _| Ok(()));

        let previous = rmq.replace_link(None, Arc::new(fresh));

        assert!(previous.is_none());
        assert_eq!(rmq.queue_name(), Some("events"));
        assert_eq!(rmq.send("again").await, Ok(()));
    }

    #[tokio::test]
    async fn close_replaced_without_previous_link() {
        close_replaced(None).await;
    }

    #[test]
    fn consume_with_auto_ack_and_generated_tag() {
        let opts = consume_options();

        assert_eq!(GENERATED_CONSUMER_TAG, "");
        assert!(opts.no_ack);
        assert!(!opts.no_local);
        assert!(!opts.exclusive);
        assert!(!opts.nowait);
    }
}
