//! PROXY protocol v2 wire model, decoder and encoder.
//!
//! This crate defines the header value type, the zero-allocation decoder, the
//! builder-style encoder, and the CIDR subnet matcher used to construct trust
//! predicates. It performs no I/O; the datagram and stream pipelines live in
//! `proxysock-net`.

pub mod constants;
pub mod decode;
pub mod encode;
pub mod error;
pub mod header;
pub mod subnet;

pub use constants::{AddressFamily, Command, Transport};
pub use decode::TlvPolicy;
pub use encode::HeaderBuilder;
pub use error::{DecodeError, EncodeError, SubnetParseError};
pub use header::{ProxyHeader, Tlv};
pub use subnet::Subnet;
