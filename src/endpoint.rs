use std::fmt;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use anyhow::Context as _;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpListener, TcpStream, UnixListener, UnixStream};

/// An address the proxy listens on or forwards to.
///
/// Addresses prefixed with `unix:` name a socket path; everything else is
/// handed to the TCP stack verbatim, so `host:port` works the way it does
/// for any TCP tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Tcp(String),
    Unix(PathBuf),
}

impl Endpoint {
    /// Resolves an address string into its transport. Never fails; anything
    /// that is not a `unix:` path is treated as a TCP address.
    pub fn parse(addr: &str) -> Self {
        match addr.strip_prefix("unix:") {
            Some(path) => Endpoint::Unix(PathBuf::from(path)),
            None => Endpoint::Tcp(addr.to_string()),
        }
    }

    /// Binds a listener on this endpoint.
    pub async fn bind(&self) -> anyhow::Result<ProxyListener> {
        match self {
            Endpoint::Tcp(addr) => {
                let listener = TcpListener::bind(addr)
                    .await
                    .with_context(|| format!("Failed to bind {}", addr))?;
                Ok(ProxyListener::Tcp(listener))
            }
            Endpoint::Unix(path) => {
                // A previous run may have left its socket file behind
                let _ = std::fs::remove_file(path);
                let listener = UnixListener::bind(path)
                    .with_context(|| format!("Failed to bind {}", path.display()))?;
                Ok(ProxyListener::Unix(listener))
            }
        }
    }

    /// Dials this endpoint.
    pub async fn connect(&self) -> std::io::Result<ProxyStream> {
        match self {
            Endpoint::Tcp(addr) => Ok(ProxyStream::Tcp(TcpStream::connect(addr).await?)),
            Endpoint::Unix(path) => Ok(ProxyStream::Unix(UnixStream::connect(path).await?)),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp(addr) => write!(f, "tcp://{}", addr),
            Endpoint::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}

/// A bound listener on either transport.
pub enum ProxyListener {
    Tcp(TcpListener),
    Unix(UnixListener),
}

impl ProxyListener {
    /// Accepts the next inbound connection, along with the peer address for
    /// the connection logs. Unix peers are usually unnamed and yield `None`.
    pub async fn accept(&self) -> std::io::Result<(ProxyStream, Option<String>)> {
        match self {
            ProxyListener::Tcp(listener) => {
                let (stream, peer) = listener.accept().await?;
                Ok((ProxyStream::Tcp(stream), Some(peer.to_string())))
            }
            ProxyListener::Unix(listener) => {
                let (stream, peer) = listener.accept().await?;
                let peer = peer.as_pathname().map(|path| path.display().to_string());
                Ok((ProxyStream::Unix(stream), peer))
            }
        }
    }
}

/// A connected stream on either transport.
///
/// Implements the async I/O traits by delegation so relay code never cares
/// which transport a session runs over.
pub enum ProxyStream {
    Tcp(TcpStream),
    Unix(UnixStream),
}

impl AsyncRead for ProxyStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            ProxyStream::Tcp(stream) => Pin::new(stream).poll_read(cx, buf),
            ProxyStream::Unix(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for ProxyStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            ProxyStream::Tcp(stream) => Pin::new(stream).poll_write(cx, buf),
            ProxyStream::Unix(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            ProxyStream::Tcp(stream) => Pin::new(stream).poll_flush(cx),
            ProxyStream::Unix(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            ProxyStream::Tcp(stream) => Pin::new(stream).poll_shutdown(cx),
            ProxyStream::Unix(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}
