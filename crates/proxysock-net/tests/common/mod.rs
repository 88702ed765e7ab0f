//! Shared helpers for the pipeline integration tests.

#![allow(dead_code)] // not every test binary uses every helper

use std::net::SocketAddr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use proxysock_core::{DecodeError, ProxyHeader};
use proxysock_net::ProxyMetrics;

/// Listener that records every callback for later assertions.
#[derive(Debug, Default)]
pub struct RecordingMetrics {
    pub headers_parsed: AtomicUsize,
    pub parse_errors: AtomicUsize,
    pub cache_hits: Mutex<Vec<SocketAddr>>,
    pub cache_misses: Mutex<Vec<SocketAddr>>,
    pub trusted: Mutex<Vec<SocketAddr>>,
    pub untrusted: Mutex<Vec<SocketAddr>>,
    pub locals: Mutex<Vec<SocketAddr>>,
}

impl RecordingMetrics {
    pub fn headers_parsed(&self) -> usize {
        self.headers_parsed.load(Ordering::SeqCst)
    }

    pub fn parse_errors(&self) -> usize {
        self.parse_errors.load(Ordering::SeqCst)
    }

    pub fn cache_hits(&self) -> Vec<SocketAddr> {
        self.cache_hits.lock().unwrap().clone()
    }

    pub fn cache_misses(&self) -> Vec<SocketAddr> {
        self.cache_misses.lock().unwrap().clone()
    }

    pub fn trusted(&self) -> Vec<SocketAddr> {
        self.trusted.lock().unwrap().clone()
    }

    pub fn untrusted(&self) -> Vec<SocketAddr> {
        self.untrusted.lock().unwrap().clone()
    }

    pub fn locals(&self) -> Vec<SocketAddr> {
        self.locals.lock().unwrap().clone()
    }
}

impl ProxyMetrics for RecordingMetrics {
    fn on_header_parsed(&self, _header: &ProxyHeader) {
        self.headers_parsed.fetch_add(1, Ordering::SeqCst);
    }

    fn on_parse_error(&self, _cause: &DecodeError) {
        self.parse_errors.fetch_add(1, Ordering::SeqCst);
    }

    fn on_cache_hit(&self, client: SocketAddr) {
        self.cache_hits.lock().unwrap().push(client);
    }

    fn on_cache_miss(&self, client: SocketAddr) {
        self.cache_misses.lock().unwrap().push(client);
    }

    fn on_trusted_proxy(&self, balancer: SocketAddr) {
        self.trusted.lock().unwrap().push(balancer);
    }

    fn on_untrusted_proxy(&self, balancer: SocketAddr) {
        self.untrusted.lock().unwrap().push(balancer);
    }

    fn on_local(&self, balancer: SocketAddr) {
        self.locals.lock().unwrap().push(balancer);
    }
}
