// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Queue Definition
//!
//! The queue is described by a flat JSON document:
//!
//! ```json
//! {
//!     "name": "events",
//!     "durable": true,
//!     "autodelete": false,
//!     "exclusiv": false,
//!     "nowait": false
//! }
//! ```
//!
//! Missing flags default to `false`.

use crate::{config::load_json, errors::AmqpError};
use lapin::options::QueueDeclareOptions;
use serde::Deserialize;
use std::path::Path;

/// Definition of a RabbitMQ queue and the flags it is declared with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QueueDefinition {
    pub(crate) name: String,
    pub(crate) durable: bool,
    #[serde(rename = "autodelete")]
    pub(crate) delete: bool,
    #[serde(rename = "exclusiv", alias = "exclusive")]
    pub(crate) exclusive: bool,
    #[serde(rename = "nowait")]
    pub(crate) no_wait: bool,
}

impl QueueDefinition {
    /// Creates a new queue definition with the given name and every flag unset.
    pub fn new(name: &str) -> QueueDefinition {
        QueueDefinition {
            name: name.to_owned(),
            durable: false,
            delete: false,
            exclusive: false,
            no_wait: false,
        }
    }

    /// Loads a queue definition from a JSON file.
    ///
    /// # Errors
    /// * `AmqpError::ReadConfigError` if the file cannot be read
    /// * `AmqpError::ParseConfigError` if the content is not a valid queue document
    pub fn load<P: AsRef<Path>>(path: P) -> Result<QueueDefinition, AmqpError> {
        load_json(path, "queue")
    }

    /// Makes the queue durable, persisting across broker restarts.
    pub fn durable(mut self) -> Self {
        self.durable = true;
        self
    }

    /// Sets the queue to auto-delete when its last consumer is gone.
    pub fn delete(mut self) -> Self {
        self.delete = true;
        self
    }

    /// Makes the queue exclusive to the connection.
    ///
    /// Exclusive queues are deleted when the connection closes.
    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    /// Declares without waiting for the broker's answer.
    pub fn no_wait(mut self) -> Self {
        self.no_wait = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_durable(&self) -> bool {
        self.durable
    }

    pub fn is_auto_delete(&self) -> bool {
        self.delete
    }

    pub fn is_exclusive(&self) -> bool {
        self.exclusive
    }

    pub fn is_no_wait(&self) -> bool {
        self.no_wait
    }

    pub(crate) fn declare_options(&self) -> QueueDeclareOptions {
        QueueDeclareOptions {
            passive: false,
            durable: self.durable,
            exclusive: self.exclusive,
            auto_delete: self.delete,
            nowait: self.no_wait,
        }
    }
}
