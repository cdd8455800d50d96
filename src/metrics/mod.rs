//! Usage metering.
//!
//! Sessions record events through a bounded channel; a single reporter task
//! drains them into the InfluxDB sink so the relay path never waits on the
//! metrics backend.

pub mod influx;
pub mod recorder;

pub use influx::InfluxSink;
pub use recorder::{Recorder, UsageEvent, report_loop};
