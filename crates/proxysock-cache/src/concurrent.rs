//! Unbounded cache over a read-write-locked map.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::RwLock;

use crate::AddressCache;

/// Unbounded thread-safe cache. Entries persist until explicitly removed.
///
/// Lookups take a shared lock, so the send path scales with readers; writes
/// are brief exclusive sections. Two racing `put`s on the same key leave one
/// of the two values, never a torn mix.
#[derive(Debug, Default)]
pub struct ConcurrentAddressCache {
    map: RwLock<HashMap<SocketAddr, SocketAddr>>,
}

impl ConcurrentAddressCache {
    pub fn new() -> Self {
        ConcurrentAddressCache::default()
    }

    /// Number of live mappings.
    pub fn len(&self) -> usize {
        self.map.read().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AddressCache for ConcurrentAddressCache {
    fn put(&self, client: SocketAddr, balancer: SocketAddr) {
        self.map
            .write()
            .expect("cache lock poisoned")
            .insert(client, balancer);
    }

    fn get(&self, client: SocketAddr) -> Option<SocketAddr> {
        self.map
            .read()
            .expect("cache lock poisoned")
            .get(&client)
            .copied()
    }

    fn invalidate(&self, client: SocketAddr) {
        self.map
            .write()
            .expect("cache lock poisoned")
            .remove(&client);
    }

    fn clear(&self) {
        self.map.write().expect("cache lock poisoned").clear();
    }
}
