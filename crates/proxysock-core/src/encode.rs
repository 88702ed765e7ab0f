//! Wire encoding of PROXY protocol v2 headers.

use std::net::{IpAddr, SocketAddr};

use crate::constants::{
    AddressFamily, Command, FIXED_HEADER_LEN, IPV4_ADDR_BLOCK_LEN, IPV6_ADDR_BLOCK_LEN, SIGNATURE,
    TLV_HEADER_LEN, Transport, VERSION,
};
use crate::error::EncodeError;
use crate::header::Tlv;

/// Builder producing a valid v2 header as a fresh byte buffer.
///
/// Defaults to PROXY / Inet4 / Stream with zeroed addresses, matching what a
/// relaying balancer most commonly emits.
///
/// ```
/// use proxysock_core::{AddressFamily, HeaderBuilder, Transport};
///
/// let bytes = HeaderBuilder::new()
///     .family(AddressFamily::Inet4)
///     .transport(Transport::Dgram)
///     .source("127.0.0.1:12345".parse().unwrap())
///     .destination("127.0.0.2:443".parse().unwrap())
///     .build()
///     .unwrap();
/// assert_eq!(bytes.len(), 28);
/// ```
#[derive(Debug, Clone)]
pub struct HeaderBuilder {
    command: Command,
    family: AddressFamily,
    transport: Transport,
    source: Option<SocketAddr>,
    destination: Option<SocketAddr>,
    tlvs: Vec<Tlv>,
}

impl Default for HeaderBuilder {
    fn default() -> Self {
        HeaderBuilder::new()
    }
}

impl HeaderBuilder {
    pub fn new() -> Self {
        HeaderBuilder {
            command: Command::Proxy,
            family: AddressFamily::Inet4,
            transport: Transport::Stream,
            source: None,
            destination: None,
            tlvs: Vec::new(),
        }
    }

    pub fn command(mut self, command: Command) -> Self {
        self.command = command;
        self
    }

    pub fn family(mut self, family: AddressFamily) -> Self {
        self.family = family;
        self
    }

    pub fn transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    pub fn source(mut self, addr: SocketAddr) -> Self {
        self.source = Some(addr);
        self
    }

    pub fn destination(mut self, addr: SocketAddr) -> Self {
        self.destination = Some(addr);
        self
    }

    /// Append one TLV; records are emitted in the order added.
    pub fn tlv(mut self, kind: u8, value: &[u8]) -> Self {
        self.tlvs.push(Tlv::new(kind, value));
        self
    }

    /// Serialize to wire bytes.
    ///
    /// The only rejected input is an Inet4 family paired with an IPv6 source
    /// or destination; everything else the builder accepts is encodable.
    /// An Inet6 family widens IPv4 addresses to their IPv4-mapped form.
    pub fn build(&self) -> Result<Vec<u8>, EncodeError> {
        let ver_cmd = (VERSION << 4) | self.command.nibble();
        let fam_proto = (self.family.nibble() << 4) | self.transport.nibble();

        let addr_block = self.address_block()?;
        let tlv_bytes = self.tlv_bytes();
        let variable_len = addr_block.len() + tlv_bytes.len();

        let mut out = Vec::with_capacity(FIXED_HEADER_LEN + variable_len);
        out.extend_from_slice(&SIGNATURE);
        out.push(ver_cmd);
        out.push(fam_proto);
        out.extend_from_slice(&(variable_len as u16).to_be_bytes());
        out.extend_from_slice(&addr_block);
        out.extend_from_slice(&tlv_bytes);
        Ok(out)
    }

    fn address_block(&self) -> Result<Vec<u8>, EncodeError> {
        // LOCAL headers carry nothing after the fixed prefix, regardless of
        // what was supplied. Address blocks exist only for Inet families on a
        // concrete transport.
        if self.command == Command::Local {
            return Ok(Vec::new());
        }
        match (self.family, self.transport) {
            (AddressFamily::Inet4, Transport::Stream | Transport::Dgram) => {
                let mut b = Vec::with_capacity(IPV4_ADDR_BLOCK_LEN);
                b.extend_from_slice(&ipv4_octets(self.source)?);
                b.extend_from_slice(&ipv4_octets(self.destination)?);
                b.extend_from_slice(&port_of(self.source).to_be_bytes());
                b.extend_from_slice(&port_of(self.destination).to_be_bytes());
                Ok(b)
            }
            (AddressFamily::Inet6, Transport::Stream | Transport::Dgram) => {
                let mut b = Vec::with_capacity(IPV6_ADDR_BLOCK_LEN);
                b.extend_from_slice(&ipv6_octets(self.source));
                b.extend_from_slice(&ipv6_octets(self.destination));
                b.extend_from_slice(&port_of(self.source).to_be_bytes());
                b.extend_from_slice(&port_of(self.destination).to_be_bytes());
                Ok(b)
            }
            _ => Ok(Vec::new()),
        }
    }

    fn tlv_bytes(&self) -> Vec<u8> {
        let total: usize = self
            .tlvs
            .iter()
            .map(|t| TLV_HEADER_LEN + t.value().len())
            .sum();
        let mut buf = Vec::with_capacity(total);
        for t in &self.tlvs {
            buf.push(t.kind());
            buf.extend_from_slice(&(t.value().len() as u16).to_be_bytes());
            buf.extend_from_slice(t.value());
        }
        buf
    }
}

fn port_of(addr: Option<SocketAddr>) -> u16 {
    addr.map(|a| a.port()).unwrap_or(0)
}

fn ipv4_octets(addr: Option<SocketAddr>) -> Result<[u8; 4], EncodeError> {
    match addr.map(|a| a.ip()) {
        None => Ok([0u8; 4]),
        Some(IpAddr::V4(ip)) => Ok(ip.octets()),
        Some(IpAddr::V6(_)) => Err(EncodeError::AddressFamilyMismatch),
    }
}

fn ipv6_octets(addr: Option<SocketAddr>) -> [u8; 16] {
    match addr.map(|a| a.ip()) {
        None => [0u8; 16],
        Some(IpAddr::V6(ip)) => ip.octets(),
        // ::ffff:a.b.c.d
        Some(IpAddr::V4(ip)) => ip.to_ipv6_mapped().octets(),
    }
}
