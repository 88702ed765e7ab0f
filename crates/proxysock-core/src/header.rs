//! The decoded header value type.

use std::net::SocketAddr;

use crate::constants::{AddressFamily, Command, Transport};

/// One decoded PROXY protocol v2 header.
///
/// Immutable after decode. `source` and `destination` are both present or
/// both absent: present only for PROXY commands carrying an Inet4/Inet6
/// address block, absent for LOCAL, UNSPEC and UNIX.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyHeader {
    pub(crate) command: Command,
    pub(crate) family: AddressFamily,
    pub(crate) transport: Transport,
    pub(crate) source: Option<SocketAddr>,
    pub(crate) destination: Option<SocketAddr>,
    pub(crate) tlvs: Vec<Tlv>,
    pub(crate) header_len: usize,
}

impl ProxyHeader {
    pub fn command(&self) -> Command {
        self.command
    }

    pub fn family(&self) -> AddressFamily {
        self.family
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    /// The real client address as reported by the proxy, when one was carried.
    pub fn source(&self) -> Option<SocketAddr> {
        self.source
    }

    /// The address the client originally targeted, when one was carried.
    pub fn destination(&self) -> Option<SocketAddr> {
        self.destination
    }

    /// TLVs in wire order. Empty unless TLV parsing was requested.
    pub fn tlvs(&self) -> &[Tlv] {
        &self.tlvs
    }

    /// Total bytes the header occupies on the wire, including the fixed
    /// 16-byte prefix. Always ≥ 16.
    pub fn header_len(&self) -> usize {
        self.header_len
    }

    pub fn is_local(&self) -> bool {
        self.command == Command::Local
    }

    pub fn is_proxy(&self) -> bool {
        self.command == Command::Proxy
    }
}

/// A raw Type-Length-Value record from the header's TLV region.
///
/// Values are surfaced as opaque bytes; interpreting well-known TLV types is
/// left to the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tlv {
    kind: u8,
    value: Vec<u8>,
}

impl Tlv {
    pub fn new(kind: u8, value: impl Into<Vec<u8>>) -> Self {
        Tlv {
            kind,
            value: value.into(),
        }
    }

    pub fn kind(&self) -> u8 {
        self.kind
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }
}
