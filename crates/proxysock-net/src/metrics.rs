//! Observability callbacks for the socket pipelines.

use std::net::SocketAddr;

use proxysock_core::{DecodeError, ProxyHeader};

/// Passive listener invoked at each pipeline decision point.
///
/// Every callback defaults to a no-op, so implementations override only what
/// they count. Implementations must be thread-safe; the pipelines call them
/// while holding no locks, on whatever task drove the I/O.
pub trait ProxyMetrics: Send + Sync {
    /// A well-formed header was decoded from an incoming packet or stream.
    fn on_header_parsed(&self, _header: &ProxyHeader) {}

    /// Decoding failed; the original data was delivered unmodified.
    fn on_parse_error(&self, _cause: &DecodeError) {}

    /// A reply was redirected through the balancer mapped for `client`.
    fn on_cache_hit(&self, _client: SocketAddr) {}

    /// No balancer is mapped for `client`; the reply was dropped.
    fn on_cache_miss(&self, _client: SocketAddr) {}

    /// A trusted sender delivered a PROXY header carrying a client address.
    fn on_trusted_proxy(&self, _balancer: SocketAddr) {}

    /// The trust predicate rejected a sender; its data bypassed decoding.
    fn on_untrusted_proxy(&self, _balancer: SocketAddr) {}

    /// A LOCAL header (balancer-originated traffic, e.g. a health check).
    fn on_local(&self, _balancer: SocketAddr) {}
}

/// The default listener: counts nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl ProxyMetrics for NoopMetrics {}
