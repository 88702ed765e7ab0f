//! Wire decoding of PROXY protocol v2 headers.
//!
//! The decoder is a pure function over a byte window: no allocation happens
//! unless TLV parsing is requested, and no state is shared between calls, so
//! it is safe to invoke from any number of threads.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use crate::constants::{
    AddressFamily, Command, FIXED_HEADER_LEN, IPV4_ADDR_BLOCK_LEN, IPV6_ADDR_BLOCK_LEN, SIGNATURE,
    TLV_HEADER_LEN, Transport, UNIX_ADDR_BLOCK_LEN, VERSION,
};
use crate::error::DecodeError;
use crate::header::{ProxyHeader, Tlv};

/// How the TLV region after the address block is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlvPolicy {
    /// Skip the region entirely; the decoded header carries no TLVs.
    #[default]
    Ignore,
    /// Parse TLVs in order; stop silently at the first record whose declared
    /// length overruns the region.
    Lenient,
    /// Parse TLVs in order; a record whose declared length overruns the
    /// region fails the whole decode with [`DecodeError::TruncatedTlv`].
    Strict,
}

impl ProxyHeader {
    /// Decode a v2 header from the start of `data`. TLVs are skipped.
    ///
    /// `data` is the window to examine; bytes past the decoded
    /// [`header_len`](ProxyHeader::header_len) belong to the application.
    pub fn parse(data: &[u8]) -> Result<ProxyHeader, DecodeError> {
        ProxyHeader::parse_with(data, TlvPolicy::Ignore)
    }

    /// Decode a v2 header, handling the TLV region per `tlvs`.
    pub fn parse_with(data: &[u8], tlvs: TlvPolicy) -> Result<ProxyHeader, DecodeError> {
        if data.len() < FIXED_HEADER_LEN {
            return Err(DecodeError::InsufficientData {
                min: FIXED_HEADER_LEN,
                actual: data.len(),
            });
        }

        if data[..SIGNATURE.len()] != SIGNATURE {
            return Err(DecodeError::InvalidSignature);
        }

        let ver_cmd = data[12];
        let version = ver_cmd >> 4;
        if version != VERSION {
            return Err(DecodeError::InvalidVersion(version));
        }
        let command = Command::from_nibble(ver_cmd & 0x0F)?;

        // LOCAL is fully described by the fixed prefix. Whatever follows is
        // application payload, even if byte 13 or the length field is junk.
        if command == Command::Local {
            return Ok(ProxyHeader {
                command,
                family: AddressFamily::Unspec,
                transport: Transport::Unspec,
                source: None,
                destination: None,
                tlvs: Vec::new(),
                header_len: FIXED_HEADER_LEN,
            });
        }

        let fam_proto = data[13];
        let family = AddressFamily::from_nibble(fam_proto >> 4)?;
        let transport = Transport::from_nibble(fam_proto & 0x0F)?;

        let variable_len = u16::from_be_bytes([data[14], data[15]]) as usize;
        let header_len = FIXED_HEADER_LEN + variable_len;
        if header_len > data.len() {
            return Err(DecodeError::InsufficientData {
                min: header_len,
                actual: data.len(),
            });
        }

        let variable = &data[FIXED_HEADER_LEN..header_len];
        let (source, destination, addr_block_len) = parse_addresses(variable, family, transport)?;

        let tlv_region = &variable[addr_block_len..];
        let parsed_tlvs = match tlvs {
            TlvPolicy::Ignore => Vec::new(),
            TlvPolicy::Lenient => parse_tlvs(tlv_region, false)?,
            TlvPolicy::Strict => parse_tlvs(tlv_region, true)?,
        };

        Ok(ProxyHeader {
            command,
            family,
            transport,
            source,
            destination,
            tlvs: parsed_tlvs,
            header_len,
        })
    }
}

type AddressPair = (Option<SocketAddr>, Option<SocketAddr>, usize);

/// Extract the address block for the given family/transport combination.
///
/// Returns the source/destination pair and the number of bytes the block
/// occupies at the start of the variable region. Unix addresses are length
/// checked and consumed but reported absent.
fn parse_addresses(
    variable: &[u8],
    family: AddressFamily,
    transport: Transport,
) -> Result<AddressPair, DecodeError> {
    match (family, transport) {
        (AddressFamily::Inet4, Transport::Stream | Transport::Dgram) => {
            if variable.len() < IPV4_ADDR_BLOCK_LEN {
                return Err(DecodeError::TruncatedAddresses {
                    min: IPV4_ADDR_BLOCK_LEN,
                    actual: variable.len(),
                });
            }
            let src_ip: [u8; 4] = variable[0..4].try_into().expect("slice is exactly 4 bytes");
            let dst_ip: [u8; 4] = variable[4..8].try_into().expect("slice is exactly 4 bytes");
            let src_port = u16::from_be_bytes([variable[8], variable[9]]);
            let dst_port = u16::from_be_bytes([variable[10], variable[11]]);
            Ok((
                Some(SocketAddr::new(IpAddr::V4(Ipv4Addr::from(src_ip)), src_port)),
                Some(SocketAddr::new(IpAddr::V4(Ipv4Addr::from(dst_ip)), dst_port)),
                IPV4_ADDR_BLOCK_LEN,
            ))
        }
        (AddressFamily::Inet6, Transport::Stream | Transport::Dgram) => {
            if variable.len() < IPV6_ADDR_BLOCK_LEN {
                return Err(DecodeError::TruncatedAddresses {
                    min: IPV6_ADDR_BLOCK_LEN,
                    actual: variable.len(),
                });
            }
            let src_ip: [u8; 16] = variable[0..16].try_into().expect("slice is exactly 16 bytes");
            let dst_ip: [u8; 16] = variable[16..32].try_into().expect("slice is exactly 16 bytes");
            let src_port = u16::from_be_bytes([variable[32], variable[33]]);
            let dst_port = u16::from_be_bytes([variable[34], variable[35]]);
            Ok((
                Some(SocketAddr::new(IpAddr::V6(Ipv6Addr::from(src_ip)), src_port)),
                Some(SocketAddr::new(IpAddr::V6(Ipv6Addr::from(dst_ip)), dst_port)),
                IPV6_ADDR_BLOCK_LEN,
            ))
        }
        (AddressFamily::Unix, _) => {
            if variable.len() < UNIX_ADDR_BLOCK_LEN {
                return Err(DecodeError::TruncatedAddresses {
                    min: UNIX_ADDR_BLOCK_LEN,
                    actual: variable.len(),
                });
            }
            Ok((None, None, UNIX_ADDR_BLOCK_LEN))
        }
        // Unspec family, or an Inet family with an unspecified transport:
        // no address block, the whole variable region is TLVs.
        _ => Ok((None, None, 0)),
    }
}

fn parse_tlvs(region: &[u8], strict: bool) -> Result<Vec<Tlv>, DecodeError> {
    let mut tlvs = Vec::new();
    let mut pos = 0;
    while pos + TLV_HEADER_LEN <= region.len() {
        let kind = region[pos];
        let len = u16::from_be_bytes([region[pos + 1], region[pos + 2]]) as usize;
        pos += TLV_HEADER_LEN;
        if pos + len > region.len() {
            if strict {
                return Err(DecodeError::TruncatedTlv {
                    declared: len,
                    remaining: region.len() - pos,
                });
            }
            break;
        }
        tlvs.push(Tlv::new(kind, &region[pos..pos + len]));
        pos += len;
    }
    Ok(tlvs)
}
