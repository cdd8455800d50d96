//! InfluxDB v2 write-endpoint client.
//!
//! Points travel as line protocol in a plain HTTP/1.1 POST, one connection
//! per write. Only `http://` URLs are supported.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::config::InfluxConfig;
use crate::metrics::recorder::UsageEvent;

/// Cap on buffered response headers from the sink.
const MAX_RESPONSE_HEADERS: usize = 64 * 1024;

/// A sink that accepts and then stalls must not park the reporter task.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Writes usage events to an InfluxDB-compatible endpoint.
pub struct InfluxSink {
    addr: String,
    host_header: String,
    write_path: String,
    token: String,
}

impl InfluxSink {
    /// Builds a sink from the configured base URL. Fails up front on a URL
    /// the writer could never talk to.
    pub fn new(config: InfluxConfig) -> Result<Self> {
        let url = url::Url::parse(&config.url)
            .with_context(|| format!("Invalid InfluxDB URL: {}", config.url))?;

        if url.scheme() != "http" {
            bail!("Unsupported InfluxDB URL scheme: {}", url.scheme());
        }

        let host = url.host_str().context("InfluxDB URL missing host")?;
        let port = url.port().unwrap_or(80);

        let mut query = url::form_urlencoded::Serializer::new(String::new());
        query.append_pair("org", &config.org);
        query.append_pair("bucket", &config.bucket);
        query.append_pair("precision", "ms");

        let write_path = format!(
            "{}/api/v2/write?{}",
            url.path().trim_end_matches('/'),
            query.finish(),
        );

        let host_header = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        Ok(Self {
            addr: format!("{}:{}", host, port),
            host_header,
            write_path,
            token: config.token,
        })
    }

    /// Writes one event as a point.
    pub async fn write(&self, event: &UsageEvent) -> Result<()> {
        let body = line_protocol(event);
        let request = self.build_write_request(&body);

        let mut stream = timeout(CONNECT_TIMEOUT, TcpStream::connect(&self.addr))
            .await
            .context("Connection timeout")?
            .with_context(|| format!("Failed to connect to InfluxDB at {}", self.addr))?;

        let status = timeout(REQUEST_TIMEOUT, send_and_read_status(&mut stream, &request))
            .await
            .context("Request timeout")??;

        if !(200..300).contains(&status) {
            bail!("InfluxDB write returned status {}", status);
        }

        Ok(())
    }

    /// Build the HTTP request bytes carrying `body` to the write endpoint.
    fn build_write_request(&self, body: &str) -> Vec<u8> {
        let mut buffer = Vec::new();

        buffer.extend_from_slice(
            format!("POST {} HTTP/1.1\r\n", self.write_path).as_bytes(),
        );
        buffer.extend_from_slice(format!("Host: {}\r\n", self.host_header).as_bytes());
        if !self.token.is_empty() {
            buffer.extend_from_slice(
                format!("Authorization: Token {}\r\n", self.token).as_bytes(),
            );
        }
        buffer.extend_from_slice(b"Content-Type: text/plain; charset=utf-8\r\n");
        buffer.extend_from_slice(format!("Content-Length: {}\r\n", body.len()).as_bytes());
        buffer.extend_from_slice(b"Connection: close\r\n");
        buffer.extend_from_slice(b"\r\n");
        buffer.extend_from_slice(body.as_bytes());

        buffer
    }
}

/// Sends the request and reads back the response status.
async fn send_and_read_status(stream: &mut TcpStream, request: &[u8]) -> Result<u16> {
    stream.write_all(request).await?;
    stream.flush().await?;
    read_status(stream).await
}

/// Renders an event as a v2 line-protocol point with millisecond precision.
///
/// An empty image omits the tag; line protocol has no way to write an empty
/// tag value.
pub fn line_protocol(event: &UsageEvent) -> String {
    let mut line = String::from(event.measurement());

    if !event.image.is_empty() {
        line.push_str(",image=");
        line.push_str(&escape_tag_value(&event.image));
    }

    line.push_str(" count=1i ");
    line.push_str(&event.at.timestamp_millis().to_string());
    line.push('\n');

    line
}

/// Tag values escape the three characters line protocol reserves.
fn escape_tag_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ',' | '=' | ' ') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Reads the response head from the sink and returns its status code.
async fn read_status(stream: &mut TcpStream) -> Result<u16> {
    let mut buffer = BytesMut::with_capacity(1024);

    loop {
        let n = stream.read_buf(&mut buffer).await?;

        if n == 0 {
            bail!("Connection closed before response status received");
        }

        // Check if we've received complete headers (look for \r\n\r\n)
        if let Some(headers_end) = buffer
            .windows(4)
            .position(|window| window == b"\r\n\r\n")
        {
            let headers_str = std::str::from_utf8(&buffer[..headers_end])
                .context("Invalid UTF-8 in response headers")?;

            let status_line = headers_str.lines().next().context("Empty response")?;
            let parts: Vec<&str> = status_line.splitn(3, ' ').collect();

            if parts.len() < 2 {
                bail!("Invalid status line: {}", status_line);
            }

            return parts[1].parse().context("Invalid status code");
        }

        // Prevent unbounded header growth
        if buffer.len() > MAX_RESPONSE_HEADERS {
            bail!("Response headers too large");
        }
    }
}
