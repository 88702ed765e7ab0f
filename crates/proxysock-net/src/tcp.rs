//! Accept-time PROXY protocol handling for TCP listeners.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, warn};

use proxysock_core::constants::{FIXED_HEADER_LEN, SIGNATURE};
use proxysock_core::{DecodeError, ProxyHeader, Transport};

use crate::metrics::{NoopMetrics, ProxyMetrics};
use crate::trust::TrustPredicate;

/// One accepted connection, with any v2 preamble already consumed.
#[derive(Debug)]
pub struct AcceptedConn {
    /// The connection, positioned at the first application byte.
    pub stream: TcpStream,
    /// Who actually connected (the balancer, for proxied connections).
    pub peer_addr: SocketAddr,
    /// The real client when a PROXY/Stream header carried one, otherwise the
    /// peer itself.
    pub client_addr: SocketAddr,
    /// The decoded header, when a preamble was present.
    pub header: Option<ProxyHeader>,
}

/// TCP listener that reads a PROXY protocol v2 preamble off each accepted
/// connection before handing it to the application.
///
/// Connections from untrusted peers, and connections that do not open with
/// the v2 signature, are handed over untouched.
pub struct ProxyTcpListener {
    listener: TcpListener,
    metrics: Arc<dyn ProxyMetrics>,
    trust: Option<TrustPredicate>,
}

/// Configures and binds a [`ProxyTcpListener`].
pub struct ProxyTcpListenerBuilder {
    bind_addr: SocketAddr,
    metrics: Arc<dyn ProxyMetrics>,
    trust: Option<TrustPredicate>,
}

impl ProxyTcpListenerBuilder {
    pub fn metrics(mut self, metrics: Arc<dyn ProxyMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Restrict preamble handling to peers this predicate accepts.
    pub fn trust(mut self, trust: TrustPredicate) -> Self {
        self.trust = Some(trust);
        self
    }

    pub async fn bind(self) -> io::Result<ProxyTcpListener> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        debug!(
            "proxy tcp listener bound to {}",
            listener.local_addr().unwrap_or(self.bind_addr)
        );
        Ok(ProxyTcpListener {
            listener,
            metrics: self.metrics,
            trust: self.trust,
        })
    }
}

impl ProxyTcpListener {
    pub fn builder(bind_addr: SocketAddr) -> ProxyTcpListenerBuilder {
        ProxyTcpListenerBuilder {
            bind_addr,
            metrics: Arc::new(NoopMetrics),
            trust: None,
        }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept the next connection and consume its preamble, if any.
    ///
    /// A header that matches the signature but then fails to decode is
    /// unrecoverable on a stream (the bytes are already consumed), so it
    /// surfaces as an [`io::ErrorKind::InvalidData`] error for that
    /// connection; the listener itself stays usable.
    pub async fn accept(&self) -> io::Result<AcceptedConn> {
        let (mut stream, peer_addr) = self.listener.accept().await?;
        debug!("accepted connection from {peer_addr}");

        if let Some(trust) = &self.trust {
            if !trust(peer_addr) {
                self.metrics.on_untrusted_proxy(peer_addr);
                return Ok(AcceptedConn {
                    stream,
                    peer_addr,
                    client_addr: peer_addr,
                    header: None,
                });
            }
        }

        // A relaying balancer writes the whole preamble up front, so one
        // peek is enough to tell it apart from application traffic.
        let mut probe = [0u8; SIGNATURE.len()];
        let n = stream.peek(&mut probe).await?;
        if n < SIGNATURE.len() || probe != SIGNATURE {
            return Ok(AcceptedConn {
                stream,
                peer_addr,
                client_addr: peer_addr,
                header: None,
            });
        }

        let header = self.read_header(&mut stream, peer_addr).await?;
        self.metrics.on_header_parsed(&header);

        let mut client_addr = peer_addr;
        if header.is_local() {
            self.metrics.on_local(peer_addr);
        }
        if header.is_proxy() && header.transport() == Transport::Stream {
            if let Some(client) = header.source() {
                self.metrics.on_trusted_proxy(peer_addr);
                client_addr = client;
            }
        }

        Ok(AcceptedConn {
            stream,
            peer_addr,
            client_addr,
            header: Some(header),
        })
    }

    /// Consume exactly one header from the stream.
    ///
    /// The fixed prefix is read first; if the decoder asks for more (a PROXY
    /// command with a variable region), exactly that much is read and the
    /// decode retried. LOCAL headers never consume past the fixed prefix,
    /// leaving any immediately-following application bytes on the stream.
    /// A peer that hangs up mid-header surfaces as the read's
    /// `UnexpectedEof`.
    async fn read_header(
        &self,
        stream: &mut TcpStream,
        peer_addr: SocketAddr,
    ) -> io::Result<ProxyHeader> {
        let mut fixed = [0u8; FIXED_HEADER_LEN];
        stream.read_exact(&mut fixed).await?;

        let needed = match ProxyHeader::parse(&fixed) {
            Ok(header) => return Ok(header),
            Err(DecodeError::InsufficientData { min, .. }) => min,
            Err(e) => return Err(self.decode_failure(peer_addr, e)),
        };

        let mut full = vec![0u8; needed];
        full[..FIXED_HEADER_LEN].copy_from_slice(&fixed);
        stream.read_exact(&mut full[FIXED_HEADER_LEN..]).await?;

        ProxyHeader::parse(&full)
            .map_err(|e| self.decode_failure(peer_addr, e))
    }

    fn decode_failure(&self, peer_addr: SocketAddr, cause: DecodeError) -> io::Error {
        warn!("proxy header parse error from {peer_addr}: {cause}");
        self.metrics.on_parse_error(&cause);
        io::Error::new(io::ErrorKind::InvalidData, cause)
    }
}
