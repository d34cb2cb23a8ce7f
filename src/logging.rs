// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Logging Setup
//!
//! Installs the global `tracing` subscriber: a pretty human readable layer, or
//! a JSON layer for log shipping, filtered by the configured level.

use crate::errors::LoggingError;
use tracing::warn;
use tracing_subscriber::{
    filter::{LevelFilter, Targets},
    fmt::{
        format::{Format, Pretty},
        Layer,
    },
    layer::SubscriberExt,
};

/// Installs the global subscriber.
///
/// # Parameters
/// * `level` - `debug`, `info`, `warn`, `error` or `trace`; anything else disables logging
/// * `json` - emit one JSON object per event instead of the pretty format
///
/// # Errors
/// `LoggingError::InternalError` when a global subscriber is already installed
pub fn setup(level: &str, json: bool) -> Result<(), LoggingError> {
    let level_filter = get_log_level_filter(level);

    let target_filters = Targets::new()
        .with_default(level_filter)
        .with_target("lapin", LevelFilter::WARN)
        .with_target("amq_protocol", LevelFilter::WARN)
        .with_target("pinky_swear", LevelFilter::WARN);

    let mut fmt_pretty: Option<Layer<_, Pretty, Format<Pretty>>> = None;
    let mut fmt_json = None;

    if json {
        fmt_json = Some(Layer::new().json());
    } else {
        fmt_pretty = Some(Layer::new().pretty());
    }

    match tracing::subscriber::set_global_default(
        tracing_subscriber::registry()
            .with(fmt_json)
            .with(fmt_pretty)
            .with(target_filters),
    ) {
        Err(err) => {
            warn!(error = err.to_string(), "failure to set tracing subscribe");
            Err(LoggingError::InternalError {})
        }
        _ => Ok(()),
    }
}

fn get_log_level_filter(level: &str) -> LevelFilter {
    match level {
        "debug" | "Debug" | "DEBUG" => LevelFilter::DEBUG,
        "info" | "Info" | "INFO" => LevelFilter::INFO,
        "warn" | "Warn" | "WARN" => LevelFilter::WARN,
        "error" | "Error" | "ERROR" => LevelFilter::ERROR,
        "trace" | "Trace" | "TRACE" => LevelFilter::TRACE,
        _ => LevelFilter::OFF,
    }
}
