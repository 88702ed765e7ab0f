//! Cache that retains nothing.

use std::net::SocketAddr;

use crate::AddressCache;

/// Retains no mappings at all.
///
/// Useful to keep a pipeline's drop-on-miss reply policy while refusing to
/// hold per-client state, e.g. on receive-only listeners.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAddressCache;

impl AddressCache for NoopAddressCache {
    fn put(&self, _client: SocketAddr, _balancer: SocketAddr) {}

    fn get(&self, _client: SocketAddr) -> Option<SocketAddr> {
        None
    }

    fn invalidate(&self, _client: SocketAddr) {}

    fn clear(&self) {}
}
