use bytes::BytesMut;
use serde::Deserialize;
use tracing::debug;

use crate::http::exchange::{ApiAction, ExchangeState};
use crate::http::head::{RequestHead, first_line, parse_request_head};

/// Upper bound on buffered create-container bytes. A request that declares
/// more than this, or whose declared length never arrives, is relayed
/// without image extraction.
const MAX_ACCUMULATION: usize = 1024 * 1024;

const CONTAINER_CREATE_SUFFIX: &str = "/containers/create";
const IMAGE_CREATE_SUFFIX: &str = "/images/create";

/// Create-container body, reduced to the one field the proxy reports on.
#[derive(Deserialize)]
struct ContainerConfig {
    #[serde(rename = "Image", default)]
    image: String,
}

/// Watches the client-to-target byte stream for meterable API calls.
///
/// A request is only classified when its head opens a single read; Docker
/// clients write the head in one segment, so in practice every call is seen.
/// A head split across reads passes through unclassified rather than
/// stalling the relay. Bodies, by contrast, may arrive in any number of
/// fragments.
pub struct RequestSniffer {
    conn: u64,
    buf: BytesMut,
    collecting: bool,
    header_len: usize,
    declared_len: usize,
}

impl RequestSniffer {
    pub fn new(conn: u64) -> Self {
        Self {
            conn,
            buf: BytesMut::new(),
            collecting: false,
            header_len: 0,
            declared_len: 0,
        }
    }

    /// Inspects one relayed chunk. The chunk itself is never altered; this
    /// only updates the shared exchange state.
    pub fn inspect(&mut self, chunk: &[u8], state: &mut ExchangeState) {
        let line = first_line(chunk);

        if is_request_line(line) {
            debug!(conn = self.conn, "Request: {}", String::from_utf8_lossy(line));
        }

        if line.starts_with(b"POST") {
            if let Ok((head, header_len)) = parse_request_head(chunk) {
                self.classify(&head, header_len, state);
            }
        }

        if self.collecting {
            self.accumulate(chunk, state);
        }
    }

    fn classify(&mut self, head: &RequestHead, header_len: usize, state: &mut ExchangeState) {
        let path = head.path();

        if path.ends_with(CONTAINER_CREATE_SUFFIX) {
            debug!(conn = self.conn, "Detected container creation request");
            state.expect(ApiAction::ContainerCreate);
            self.begin_collect(header_len, head.content_length());
        } else if path.ends_with(IMAGE_CREATE_SUFFIX) {
            let image = image_from_query(head.query().unwrap_or(""));
            debug!(conn = self.conn, "Detected image pull request: {}", image);
            state.expect(ApiAction::ImagePull);
            state.set_image(image);
            self.stop_collect();
        }
    }

    fn begin_collect(&mut self, header_len: usize, declared_len: usize) {
        if declared_len > MAX_ACCUMULATION {
            debug!(
                conn = self.conn,
                declared = declared_len,
                "Request body too large to inspect, skipping image extraction"
            );
            self.stop_collect();
            return;
        }

        self.buf.clear();
        self.collecting = true;
        self.header_len = header_len;
        self.declared_len = declared_len;
    }

    fn stop_collect(&mut self) {
        self.buf.clear();
        self.collecting = false;
        self.header_len = 0;
        self.declared_len = 0;
    }

    fn accumulate(&mut self, chunk: &[u8], state: &mut ExchangeState) {
        self.buf.extend_from_slice(chunk);

        // Complete request: head plus the declared number of body bytes
        let total = self.header_len + self.declared_len;
        if self.buf.len() >= total {
            let image = image_from_body(&self.buf[self.header_len..total]);
            state.set_image(image);
            self.stop_collect();
            return;
        }

        if self.buf.len() > MAX_ACCUMULATION {
            debug!(
                conn = self.conn,
                "Buffered request exceeded inspection limit, skipping image extraction"
            );
            self.stop_collect();
        }
    }
}

fn is_request_line(line: &[u8]) -> bool {
    const METHODS: [&[u8]; 5] = [b"GET", b"POST", b"PUT", b"DELETE", b"HEAD"];
    METHODS.iter().any(|method| line.starts_with(method))
}

/// Image named by a pull request, rebuilt as `name:tag` from the query
/// string the way the daemon itself reads it. Either half may be empty.
fn image_from_query(query: &str) -> String {
    let mut image = None;
    let mut tag = None;

    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        if key == "fromImage" && image.is_none() {
            image = Some(value.into_owned());
        } else if key == "tag" && tag.is_none() {
            tag = Some(value.into_owned());
        }
    }

    format!("{}:{}", image.unwrap_or_default(), tag.unwrap_or_default())
}

/// Image named by a create-container body. Empty when the body is not the
/// JSON document it should be.
fn image_from_body(body: &[u8]) -> String {
    serde_json::from_slice::<ContainerConfig>(body)
        .map(|config| config.image)
        .unwrap_or_default()
}
