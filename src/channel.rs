// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # AMQP Channel Management
//!
//! This module establishes the connection to the RabbitMQ server and opens the
//! single channel every other operation is issued on.

use crate::{config::RabbitMQConfigs, errors::AmqpError};
use lapin::{types::LongString, Channel, Connection, ConnectionProperties};
use std::sync::Arc;
use tracing::{debug, error};

/// Creates a new AMQP connection and one channel on it.
///
/// The connection is named after this crate so it can be identified in the
/// broker's management UI.
///
/// # Parameters
/// * `cfg` - Connection settings (address, port and credentials)
///
/// # Returns
/// * `Result<(Arc<Connection>, Arc<Channel>), AmqpError>` -
///   A tuple containing the connection and channel on success, or an error on failure.
pub async fn new_amqp_channel(
    cfg: &RabbitMQConfigs,
) -> Result<(Arc<Connection>, Arc<Channel>), AmqpError> {
    let uri = cfg.uri()?;

    debug!(endpoint = cfg.endpoint(), "creating amqp connection...");
    let options = ConnectionProperties::default()
        .with_connection_name(LongString::from(env!("CARGO_PKG_NAME")));

    let conn = match Connection::connect_uri(uri, options).await {
        Ok(c) => Ok(c),
        Err(err) => {
            error!(error = err.to_string(), "failure to connect");
            Err(AmqpError::ConnectionError {})
        }
    }?;
    debug!("amqp connected");

    debug!("creating amqp channel...");
    match conn.create_channel().await {
        Ok(c) => {
            debug!("channel created");
            Ok((Arc::new(conn), Arc::new(c)))
        }
        Err(err) => {
            error!(error = err.to_string(), "error to create the channel");
            Err(AmqpError::ChannelError {})
        }
    }
}
