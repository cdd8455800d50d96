//! Listener and accept loop.

pub mod listener;
