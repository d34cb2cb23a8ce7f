// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Error Types
//!
//! `AmqpError` covers every failure the wrapper can report: reading the JSON
//! configuration, talking to the broker and handling the declared queue.
//! `LoggingError` is returned by the tracing subscriber setup.

use thiserror::Error;

/// Represents errors that can occur while configuring or using the broker client.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AmqpError {
    /// The configuration file could not be read
    #[error("failure to read config file `{0}`")]
    ReadConfigError(String),

    /// The configuration file is not valid JSON for the expected record
    #[error("failure to parse config file `{0}`")]
    ParseConfigError(String),

    /// The configured password is not base64 encoded UTF-8
    #[error("failure to decode the configured password")]
    InvalidPassword,

    /// The configured port is not a valid TCP port
    #[error("invalid port `{0}`")]
    InvalidPort(String),

    /// Error establishing a connection to the RabbitMQ server
    #[error("failure to connect")]
    ConnectionError,

    /// Error creating a channel from an established connection
    #[error("failure to create a channel")]
    ChannelError,

    /// An operation needing a channel was called before `connect`
    #[error("not connected")]
    NotConnected,

    /// Error declaring a queue with the given name
    #[error("failure to declare a queue `{0}`")]
    DeclareQueueError(String),

    /// An operation needing a queue was called before `init_queue`
    #[error("no queue declared")]
    QueueNotDeclared,

    /// Error publishing a message
    #[error("failure to publish")]
    PublishingError,

    /// Publishing did not complete within the deadline
    #[error("publish deadline exceeded")]
    PublishTimeout,

    /// Error binding a consumer to a queue
    #[error("failure to declare consumer `{0}`")]
    BindingConsumerError(String),

    /// Error closing the channel
    #[error("failure to close the channel")]
    CloseChannelError,

    /// Error closing the connection
    #[error("failure to close the connection")]
    CloseConnectionError,
}

/// Errors raised while installing the log subscriber
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LoggingError {
    /// The global subscriber could not be set
    #[error("logging internal error")]
    InternalError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_errors_display() {
        assert_eq!(
            AmqpError::CloseChannelError.to_string(),
            "failure to close the channel"
        );
        assert_eq!(
            AmqpError::CloseConnectionError.to_string(),
            "failure to close the connection"
        );
        assert_eq!(LoggingError::InternalError.to_string(), "logging internal error");
    }
}
