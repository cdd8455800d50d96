/// Docker Engine API calls the proxy meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiAction {
    ContainerCreate,
    ImagePull,
}

/// Classification carried from a request to the response that answers it.
///
/// One exchange is in flight per session at a time: the request sniffer
/// records what the client asked for, and the response correlator consumes
/// it when the answering status line comes back. Sessions share one instance
/// between both relay directions behind a mutex.
#[derive(Debug, Default)]
pub struct ExchangeState {
    pending: Option<ApiAction>,
    image: String,
}

impl ExchangeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the call now in flight. A classification the target never
    /// answered is discarded along with its image.
    pub fn expect(&mut self, action: ApiAction) {
        self.pending = Some(action);
        self.image.clear();
    }

    /// Stores the image named by the classified request.
    pub fn set_image(&mut self, image: String) {
        self.image = image;
    }

    pub fn pending(&self) -> Option<ApiAction> {
        self.pending
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    /// Consumes the classification. Both fields are cleared no matter what,
    /// so a later response can never observe stale state.
    pub fn take(&mut self) -> (Option<ApiAction>, String) {
        let action = self.pending.take();
        let image = std::mem::take(&mut self.image);
        (action, image)
    }
}
