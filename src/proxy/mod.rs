//! Transparent relay functionality
//!
//! This module implements the core relay logic: one session per accepted
//! connection, pumping bytes both ways while the inspection layer watches.

pub mod session;

pub use session::Session;
