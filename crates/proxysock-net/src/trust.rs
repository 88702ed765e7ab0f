//! Trust predicates deciding which senders may speak PROXY protocol.

use std::net::SocketAddr;
use std::sync::Arc;

use proxysock_core::Subnet;

/// A pure, thread-safe function from sender address to "may this peer speak
/// PROXY protocol v2 to us".
pub type TrustPredicate = Arc<dyn Fn(SocketAddr) -> bool + Send + Sync>;

/// Trust any sender whose address falls in one of `subnets`.
///
/// ```
/// use proxysock_net::trust_subnets;
///
/// let trust = trust_subnets(["10.0.0.0/8".parse().unwrap()]);
/// assert!(trust("10.1.2.3:4040".parse().unwrap()));
/// assert!(!trust("192.168.0.1:4040".parse().unwrap()));
/// ```
pub fn trust_subnets(subnets: impl IntoIterator<Item = Subnet>) -> TrustPredicate {
    let subnets: Vec<Subnet> = subnets.into_iter().collect();
    Arc::new(move |addr| subnets.iter().any(|s| s.matches(addr)))
}

/// Trust every sender. For tests and closed networks.
pub fn trust_all() -> TrustPredicate {
    Arc::new(|_| true)
}
