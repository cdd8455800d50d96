//! Dockwatch - Docker API usage metering proxy
//!
//! Core library for the transparent relay, traffic inspection, and metrics
//! emission.

pub mod config;
pub mod endpoint;
pub mod http;
pub mod metrics;
pub mod proxy;
pub mod server;
