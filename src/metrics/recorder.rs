use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::http::exchange::ApiAction;
use crate::metrics::influx::InfluxSink;

/// Events waiting for the reporter before new ones are dropped.
pub const QUEUE_DEPTH: usize = 256;

/// A metered Docker API call on its way to the sink.
#[derive(Debug, Clone)]
pub struct UsageEvent {
    pub action: ApiAction,
    pub image: String,
    pub at: DateTime<Utc>,
}

impl UsageEvent {
    /// Stamps the event with the current time.
    pub fn new(action: ApiAction, image: String) -> Self {
        Self {
            action,
            image,
            at: Utc::now(),
        }
    }

    /// Measurement the event lands in.
    pub fn measurement(&self) -> &'static str {
        match self.action {
            ApiAction::ContainerCreate => "docker_container_create",
            ApiAction::ImagePull => "docker_image_pull",
        }
    }
}

/// Hands events from relay sessions to the reporter task.
///
/// Relay pumps must never stall on the sink, so the hand-off is a bounded
/// channel and a full queue drops the event instead of blocking the proxy
/// path.
#[derive(Clone)]
pub struct Recorder {
    tx: mpsc::Sender<UsageEvent>,
}

impl Recorder {
    /// Creates a recorder and the receiving end `report_loop` drains.
    pub fn channel() -> (Self, mpsc::Receiver<UsageEvent>) {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        (Self { tx }, rx)
    }

    /// Queues one event without blocking.
    pub fn record(&self, event: UsageEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(
                    measurement = event.measurement(),
                    "Metrics queue full, dropping event"
                );
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                warn!(
                    measurement = event.measurement(),
                    "Metrics reporter gone, dropping event"
                );
            }
        }
    }
}

/// Drains recorded events into the sink. A failed write is logged and the
/// loop keeps going; metering never takes the proxy down.
pub async fn report_loop(sink: InfluxSink, mut events: mpsc::Receiver<UsageEvent>) {
    while let Some(event) = events.recv().await {
        match event.action {
            ApiAction::ContainerCreate => info!("Container creation: {}", event.image),
            ApiAction::ImagePull => info!("Image pull: {}", event.image),
        }

        if let Err(e) = sink.write(&event).await {
            error!("Failed to write point: {}", e);
        }
    }
}
