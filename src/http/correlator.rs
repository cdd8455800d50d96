use tracing::debug;

use crate::http::exchange::ExchangeState;
use crate::http::head::first_line;
use crate::metrics::recorder::UsageEvent;

/// Watches the target-to-client byte stream for the status line answering a
/// classified request.
pub struct ResponseCorrelator {
    conn: u64,
}

impl ResponseCorrelator {
    pub fn new(conn: u64) -> Self {
        Self { conn }
    }

    /// Inspects one relayed chunk and returns an event when the chunk opens
    /// a successful response to a classified request.
    ///
    /// Every chunk that looks like a response head settles the pending
    /// classification, success or not; stale state never survives past the
    /// next status line. Chunks that do not open with `HTTP` are body or
    /// stream payload and leave the state alone.
    pub fn inspect(&self, chunk: &[u8], state: &mut ExchangeState) -> Option<UsageEvent> {
        if !chunk.starts_with(b"HTTP") {
            return None;
        }

        let line = first_line(chunk);
        debug!(conn = self.conn, "HTTP Response: {}", String::from_utf8_lossy(line));

        let (action, image) = state.take();
        let action = action?;

        let status = parse_status(line)?;
        if !(200..300).contains(&status) {
            return None;
        }

        debug!(conn = self.conn, "Status Code: {}", status);
        Some(UsageEvent::new(action, image))
    }
}

/// Status code of a response line. `None` for anything without a numeric
/// second token, however short or garbled.
fn parse_status(line: &[u8]) -> Option<u16> {
    let line = std::str::from_utf8(line).ok()?;
    let mut parts = line.split_whitespace();
    let _version = parts.next()?;
    parts.next()?.parse().ok()
}
