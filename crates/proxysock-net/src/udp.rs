//! The stateful UDP datagram pipeline.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tracing::{debug, trace, warn};

use proxysock_cache::AddressCache;
use proxysock_core::{ProxyHeader, Transport};

use crate::metrics::{NoopMetrics, ProxyMetrics};
use crate::trust::TrustPredicate;

/// Outcome of [`ProxyUdpSocket::send_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The datagram went out; carries the byte count the socket reported.
    Sent(usize),
    /// No balancer mapping existed for the destination, so the datagram was
    /// dropped. Not an error: the client is unreachable except through its
    /// balancer, and that path is unknown.
    Dropped,
}

/// A UDP socket that transparently interoperates with PROXY protocol v2
/// balancers.
///
/// On receive, a v2 preamble from a trusted sender is stripped, the apparent
/// source becomes the real client, and the client→balancer mapping is
/// recorded. On send, the destination is rewritten to the recorded balancer
/// (or the datagram is dropped when no mapping exists). Traffic from
/// untrusted senders, and anything that does not decode, is delivered
/// verbatim, so the socket still serves ordinary UDP peers.
///
/// The value is immutable once built; `recv_from` and `send_to` run on the
/// caller's task and may be invoked concurrently.
///
/// ```no_run
/// use std::sync::Arc;
/// use proxysock_cache::ConcurrentAddressCache;
/// use proxysock_net::{ProxyUdpSocket, SendOutcome, trust_subnets};
///
/// # async fn serve() -> std::io::Result<()> {
/// let socket = ProxyUdpSocket::builder("0.0.0.0:7000".parse().unwrap())
///     .cache(Arc::new(ConcurrentAddressCache::new()))
///     .trust(trust_subnets(["10.0.0.0/8".parse().unwrap()]))
///     .bind()
///     .await?;
///
/// let mut buf = [0u8; 2048];
/// loop {
///     let (payload, client) = socket.recv_from(&mut buf).await?;
///     let reply = payload.to_vec();
///     if let SendOutcome::Dropped = socket.send_to(&reply, client).await? {
///         // never saw this client through a balancer
///     }
/// }
/// # }
/// ```
pub struct ProxyUdpSocket {
    socket: UdpSocket,
    cache: Option<Arc<dyn AddressCache>>,
    metrics: Arc<dyn ProxyMetrics>,
    trust: Option<TrustPredicate>,
}

/// Configures and binds a [`ProxyUdpSocket`].
pub struct ProxyUdpSocketBuilder {
    bind_addr: SocketAddr,
    cache: Option<Arc<dyn AddressCache>>,
    metrics: Arc<dyn ProxyMetrics>,
    trust: Option<TrustPredicate>,
}

impl ProxyUdpSocketBuilder {
    /// Reverse mapping cache consulted on send and fed on receive.
    ///
    /// Without a cache, sends go to their stated destination unchanged and
    /// receives skip the mapping step.
    pub fn cache(mut self, cache: Arc<dyn AddressCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn metrics(mut self, metrics: Arc<dyn ProxyMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Restrict PROXY protocol handling to senders this predicate accepts;
    /// everyone else's datagrams are delivered verbatim.
    pub fn trust(mut self, trust: TrustPredicate) -> Self {
        self.trust = Some(trust);
        self
    }

    pub async fn bind(self) -> io::Result<ProxyUdpSocket> {
        let socket = UdpSocket::bind(self.bind_addr).await?;
        debug!(
            "proxy udp socket bound to {}",
            socket.local_addr().unwrap_or(self.bind_addr)
        );
        Ok(ProxyUdpSocket {
            socket,
            cache: self.cache,
            metrics: self.metrics,
            trust: self.trust,
        })
    }
}

impl ProxyUdpSocket {
    pub fn builder(bind_addr: SocketAddr) -> ProxyUdpSocketBuilder {
        ProxyUdpSocketBuilder {
            bind_addr,
            cache: None,
            metrics: Arc::new(NoopMetrics),
            trust: None,
        }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Receive one datagram into `buf`.
    ///
    /// Returns the application payload window of `buf` and the datagram's
    /// apparent source: the real client when a trusted, well-formed
    /// PROXY/DGRAM preamble was present, the sender otherwise. The buffer is
    /// borrowed only for the duration of the call.
    pub async fn recv_from<'a>(&self, buf: &'a mut [u8]) -> io::Result<(&'a [u8], SocketAddr)> {
        let (len, balancer) = self.socket.recv_from(buf).await?;
        let datagram = &buf[..len];

        if let Some(trust) = &self.trust {
            if !trust(balancer) {
                debug!("untrusted sender {balancer}; delivering original datagram");
                self.metrics.on_untrusted_proxy(balancer);
                return Ok((datagram, balancer));
            }
        }

        let header = match ProxyHeader::parse(datagram) {
            Ok(header) => header,
            Err(e) => {
                warn!("proxy header parse error from {balancer}: {e}; delivering original datagram");
                self.metrics.on_parse_error(&e);
                return Ok((datagram, balancer));
            }
        };
        self.metrics.on_header_parsed(&header);

        let mut source = balancer;
        if header.is_local() {
            self.metrics.on_local(balancer);
        }
        if header.is_proxy() && header.transport() == Transport::Dgram {
            // Source may still be absent (UNSPEC or UNIX block); then the
            // datagram keeps the balancer as its apparent source.
            if let Some(client) = header.source() {
                self.metrics.on_trusted_proxy(balancer);
                if let Some(cache) = &self.cache {
                    cache.put(client, balancer);
                }
                source = client;
            }
        }

        trace!(
            "stripping {} header bytes of {len} received from {balancer}",
            header.header_len()
        );
        Ok((&datagram[header.header_len()..], source))
    }

    /// Send `payload` to the client at `client`, routed through its balancer.
    ///
    /// With a cache configured, the destination is rewritten to the balancer
    /// recorded for `client`; if none is recorded the datagram is dropped
    /// ([`SendOutcome::Dropped`]). Without a cache the payload goes straight
    /// to `client`.
    pub async fn send_to(&self, payload: &[u8], client: SocketAddr) -> io::Result<SendOutcome> {
        let Some(cache) = &self.cache else {
            let n = self.socket.send_to(payload, client).await?;
            return Ok(SendOutcome::Sent(n));
        };

        match cache.get(client) {
            Some(balancer) => {
                self.metrics.on_cache_hit(client);
                trace!("redirecting reply for {client} through {balancer}");
                let n = self.socket.send_to(payload, balancer).await?;
                Ok(SendOutcome::Sent(n))
            }
            None => {
                warn!("no balancer mapping for {client}; dropping reply");
                self.metrics.on_cache_miss(client);
                Ok(SendOutcome::Dropped)
            }
        }
    }
}
