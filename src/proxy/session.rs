//! Per-connection relay engine.
//!
//! Each accepted connection becomes one session: a dial to the target and
//! two pump tasks moving bytes in opposite directions. Chunks are inspected
//! before they are forwarded, and forwarded exactly as they arrived.

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::endpoint::{Endpoint, ProxyStream};
use crate::http::correlator::ResponseCorrelator;
use crate::http::exchange::ExchangeState;
use crate::http::sniffer::RequestSniffer;
use crate::metrics::recorder::Recorder;

/// Read size for both relay directions.
const BUFFER_SIZE: usize = 4096;

/// One proxied client connection.
pub struct Session {
    id: u64,
    peer: Option<String>,
    target: Endpoint,
    recorder: Recorder,
}

impl Session {
    pub fn new(id: u64, peer: Option<String>, target: Endpoint, recorder: Recorder) -> Self {
        Self {
            id,
            peer,
            target,
            recorder,
        }
    }

    /// Relays bytes between `client` and the target until either side goes
    /// away. The client-to-target direction is sniffed for meterable calls,
    /// the reverse direction for the statuses that answer them.
    pub async fn run(self, client: ProxyStream) {
        let target = match self.target.connect().await {
            Ok(stream) => stream,
            Err(e) => {
                error!(conn = self.id, "Failed to connect to target: {}", e);
                return;
            }
        };

        let state = Arc::new(Mutex::new(ExchangeState::new()));

        let (client_read, client_write) = tokio::io::split(client);
        let (target_read, target_write) = tokio::io::split(target);

        let mut pumps = JoinSet::new();

        // Client -> target, watching requests
        {
            let state = Arc::clone(&state);
            let id = self.id;
            pumps.spawn(async move {
                let mut from = client_read;
                let mut to = target_write;
                let mut sniffer = RequestSniffer::new(id);
                let mut buf = vec![0u8; BUFFER_SIZE];

                loop {
                    let n = match from.read(&mut buf).await {
                        Ok(0) => {
                            let _ = to.shutdown().await; // pass EOF on to the target
                            break;
                        }
                        Ok(n) => n,
                        Err(e) => {
                            debug!(conn = id, "Error reading from client: {}", e);
                            break;
                        }
                    };

                    {
                        let mut state = state.lock().await;
                        sniffer.inspect(&buf[..n], &mut state);
                    }

                    if let Err(e) = to.write_all(&buf[..n]).await {
                        debug!(conn = id, "Error writing to target: {}", e);
                        break;
                    }
                }
            });
        }

        // Target -> client, watching responses
        {
            let state = Arc::clone(&state);
            let recorder = self.recorder.clone();
            let id = self.id;
            pumps.spawn(async move {
                let mut from = target_read;
                let mut to = client_write;
                let correlator = ResponseCorrelator::new(id);
                let mut buf = vec![0u8; BUFFER_SIZE];

                loop {
                    let n = match from.read(&mut buf).await {
                        Ok(0) => {
                            let _ = to.shutdown().await; // pass EOF on to the client
                            break;
                        }
                        Ok(n) => n,
                        Err(e) => {
                            debug!(conn = id, "Error reading from target: {}", e);
                            break;
                        }
                    };

                    let event = {
                        let mut state = state.lock().await;
                        correlator.inspect(&buf[..n], &mut state)
                    };
                    if let Some(event) = event {
                        recorder.record(event);
                    }

                    if let Err(e) = to.write_all(&buf[..n]).await {
                        debug!(conn = id, "Error writing to client: {}", e);
                        break;
                    }
                }
            });
        }

        // First pump to finish ends the session; dropping the set aborts
        // the other and closes both streams.
        let _ = pumps.join_next().await;

        match &self.peer {
            Some(addr) => debug!(conn = self.id, "Connection from {} closed", addr),
            None => debug!(conn = self.id, "Connection closed"),
        }
    }
}
