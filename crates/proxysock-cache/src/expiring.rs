//! Bounded cache with LRU eviction and time-to-idle expiry.

use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::AddressCache;

struct Entry {
    balancer: SocketAddr,
    last_access: Instant,
}

/// Bounded cache: at most `max_entries` mappings, each expiring after
/// `idle_ttl` without access.
///
/// A successful `get` refreshes both the idle clock and the entry's
/// least-recently-used position, so a client that keeps talking keeps its
/// return path. When an insert overflows the bound the least recently used
/// entry is evicted. Idle entries are swept lazily: an expired mapping is
/// dropped by the `get` that finds it.
///
/// A zero `idle_ttl` disables expiry; the size bound still applies.
pub struct ExpiringAddressCache {
    entries: Mutex<LruCache<SocketAddr, Entry>>,
    idle_ttl: Option<Duration>,
}

impl ExpiringAddressCache {
    pub fn new(max_entries: NonZeroUsize, idle_ttl: Duration) -> Self {
        ExpiringAddressCache {
            entries: Mutex::new(LruCache::new(max_entries)),
            idle_ttl: (!idle_ttl.is_zero()).then_some(idle_ttl),
        }
    }

    /// Number of stored mappings, counting idle entries not yet swept.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AddressCache for ExpiringAddressCache {
    fn put(&self, client: SocketAddr, balancer: SocketAddr) {
        let entry = Entry {
            balancer,
            last_access: Instant::now(),
        };
        // LruCache::push evicts the least recently used entry when full.
        self.entries
            .lock()
            .expect("cache lock poisoned")
            .push(client, entry);
    }

    fn get(&self, client: SocketAddr) -> Option<SocketAddr> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        let entry = entries.get_mut(&client)?;

        if let Some(ttl) = self.idle_ttl {
            if entry.last_access.elapsed() >= ttl {
                entries.pop(&client);
                return None;
            }
        }

        entry.last_access = Instant::now();
        Some(entry.balancer)
    }

    fn invalidate(&self, client: SocketAddr) {
        self.entries
            .lock()
            .expect("cache lock poisoned")
            .pop(&client);
    }

    fn clear(&self) {
        self.entries.lock().expect("cache lock poisoned").clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread::sleep;

    const IDLE: Duration = Duration::from_millis(200);

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn cache(max: usize, ttl: Duration) -> ExpiringAddressCache {
        ExpiringAddressCache::new(NonZeroUsize::new(max).unwrap(), ttl)
    }

    #[test]
    fn put_then_get() {
        let cache = cache(16, IDLE);
        cache.put(addr(1), addr(100));
        assert_eq!(cache.get(addr(1)), Some(addr(100)));
    }

    #[test]
    fn put_replaces_prior_value() {
        let cache = cache(16, IDLE);
        cache.put(addr(1), addr(100));
        cache.put(addr(1), addr(200));
        assert_eq!(cache.get(addr(1)), Some(addr(200)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn idle_entry_expires() {
        let cache = cache(16, IDLE);
        cache.put(addr(1), addr(100));
        sleep(IDLE + Duration::from_millis(50));
        assert_eq!(cache.get(addr(1)), None);
        // the expired entry was swept, not just hidden
        assert!(cache.is_empty());
    }

    #[test]
    fn access_refreshes_idle_clock() {
        let cache = cache(16, IDLE);
        cache.put(addr(1), addr(100));
        // keep touching the entry at intervals well under the TTL
        for _ in 0..6 {
            sleep(Duration::from_millis(50));
            assert_eq!(cache.get(addr(1)), Some(addr(100)));
        }
    }

    #[test]
    fn zero_ttl_never_expires() {
        let cache = cache(16, Duration::ZERO);
        cache.put(addr(1), addr(100));
        sleep(IDLE + Duration::from_millis(50));
        assert_eq!(cache.get(addr(1)), Some(addr(100)));
    }

    #[test]
    fn size_never_exceeds_bound() {
        let cache = cache(3, Duration::ZERO);
        for port in 1..=10 {
            cache.put(addr(port), addr(1000 + port));
            assert!(cache.len() <= 3);
        }
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn eviction_prefers_least_recently_used() {
        let cache = cache(2, Duration::ZERO);
        cache.put(addr(1), addr(100));
        cache.put(addr(2), addr(200));

        // touch 1 so 2 becomes the eviction candidate
        assert_eq!(cache.get(addr(1)), Some(addr(100)));
        cache.put(addr(3), addr(300));

        assert_eq!(cache.get(addr(1)), Some(addr(100)));
        assert_eq!(cache.get(addr(2)), None);
        assert_eq!(cache.get(addr(3)), Some(addr(300)));
    }

    #[test]
    fn invalidate_and_clear() {
        let cache = cache(16, IDLE);
        cache.put(addr(1), addr(100));
        cache.put(addr(2), addr(200));

        cache.invalidate(addr(1));
        assert_eq!(cache.get(addr(1)), None);
        cache.invalidate(addr(9));

        cache.clear();
        assert_eq!(cache.get(addr(2)), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn shared_across_threads() {
        let cache = Arc::new(cache(1024, IDLE));
        let mut handles = Vec::new();
        for thread in 0u16..4 {
            let cache = Arc::clone(&cache);
            handles.push(std::thread::spawn(move || {
                for i in 0u16..50 {
                    let client = addr(1000 + thread * 50 + i);
                    cache.put(client, addr(30000 + thread));
                    assert_eq!(cache.get(client), Some(addr(30000 + thread)));
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cache.len(), 200);
    }
}
