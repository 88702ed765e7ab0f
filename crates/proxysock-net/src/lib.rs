//! Socket pipelines that interoperate with PROXY protocol v2 balancers.
//!
//! [`ProxyUdpSocket`] wraps a UDP socket: received datagrams have their v2
//! preamble stripped and their apparent source rewritten to the real client,
//! while replies are routed back through the balancer recorded for that
//! client. [`ProxyTcpListener`] performs the same preamble handling once per
//! accepted connection.
//!
//! Both are built by builders and immutable afterwards; the per-packet path
//! reads plain fields and takes no locks of its own.

pub mod metrics;
pub mod tcp;
pub mod trust;
pub mod udp;

pub use metrics::{NoopMetrics, ProxyMetrics};
pub use tcp::{AcceptedConn, ProxyTcpListener};
pub use trust::{TrustPredicate, trust_all, trust_subnets};
pub use udp::{ProxyUdpSocket, SendOutcome};
