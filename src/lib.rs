// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

mod otel;

pub mod channel;
pub mod client;
pub mod config;
pub mod consumer;
pub mod errors;
pub mod logging;
pub mod publisher;
pub mod queue;
