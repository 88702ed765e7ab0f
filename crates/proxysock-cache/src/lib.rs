//! Reverse address mapping caches.
//!
//! A receive path records which balancer relayed each client's traffic; the
//! send path consults that mapping to route replies back through the same
//! balancer. Two real implementations share the [`AddressCache`] contract:
//! an unbounded concurrent map and a bounded map with time-to-idle expiry.

use std::net::SocketAddr;

pub mod concurrent;
pub mod expiring;
pub mod noop;

pub use concurrent::ConcurrentAddressCache;
pub use expiring::ExpiringAddressCache;
pub use noop::NoopAddressCache;

/// Thread-safe mapping from a real client address to the balancer address
/// that relays its traffic.
///
/// Keys and values compare as full (address, port) tuples. A key holds at
/// most one value; `put` replaces. Every operation may be invoked
/// concurrently from any number of threads, and a `put` is visible to every
/// `get` that happens after it.
pub trait AddressCache: Send + Sync {
    /// Record `client -> balancer`, replacing any prior mapping.
    fn put(&self, client: SocketAddr, balancer: SocketAddr);

    /// The balancer currently mapped for `client`, if any.
    fn get(&self, client: SocketAddr) -> Option<SocketAddr>;

    /// Drop the mapping for `client`; no-op when absent.
    fn invalidate(&self, client: SocketAddr);

    /// Drop every mapping.
    fn clear(&self);
}
