//! Wire constants and enumerations for PROXY protocol v2.

use crate::error::DecodeError;

/// Fixed 12-byte preamble that opens every v2 header.
pub const SIGNATURE: [u8; 12] = [
    0x0D, 0x0A, 0x0D, 0x0A, 0x00, 0x0D, 0x0A, 0x51, 0x55, 0x49, 0x54, 0x0A,
];

// Wire format sizes
pub const FIXED_HEADER_LEN: usize = 16;
pub const IPV4_ADDR_BLOCK_LEN: usize = 12;
pub const IPV6_ADDR_BLOCK_LEN: usize = 36;
pub const UNIX_ADDR_BLOCK_LEN: usize = 216;
pub const TLV_HEADER_LEN: usize = 3;

/// Protocol version carried in the high nibble of byte 12.
pub const VERSION: u8 = 0x2;

/// Command nibble (low nibble of byte 12).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    /// Connection or datagram originated by the proxy itself (health checks).
    Local = 0x0,
    /// Relayed on behalf of a real client.
    Proxy = 0x1,
}

impl Command {
    pub fn from_nibble(v: u8) -> Result<Self, DecodeError> {
        match v {
            0x0 => Ok(Command::Local),
            0x1 => Ok(Command::Proxy),
            _ => Err(DecodeError::InvalidCommand(v)),
        }
    }

    pub fn nibble(self) -> u8 {
        self as u8
    }
}

/// Address family nibble (high nibble of byte 13).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AddressFamily {
    Unspec = 0x0,
    Inet4 = 0x1,
    Inet6 = 0x2,
    Unix = 0x3,
}

impl AddressFamily {
    pub fn from_nibble(v: u8) -> Result<Self, DecodeError> {
        match v {
            0x0 => Ok(AddressFamily::Unspec),
            0x1 => Ok(AddressFamily::Inet4),
            0x2 => Ok(AddressFamily::Inet6),
            0x3 => Ok(AddressFamily::Unix),
            _ => Err(DecodeError::InvalidFamily(v)),
        }
    }

    pub fn nibble(self) -> u8 {
        self as u8
    }
}

/// Transport protocol nibble (low nibble of byte 13).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Transport {
    Unspec = 0x0,
    Stream = 0x1,
    Dgram = 0x2,
}

impl Transport {
    pub fn from_nibble(v: u8) -> Result<Self, DecodeError> {
        match v {
            0x0 => Ok(Transport::Unspec),
            0x1 => Ok(Transport::Stream),
            0x2 => Ok(Transport::Dgram),
            _ => Err(DecodeError::InvalidTransport(v)),
        }
    }

    pub fn nibble(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_contains_null_byte() {
        assert_eq!(SIGNATURE.len(), 12);
        assert_eq!(SIGNATURE[4], 0x00);
    }

    #[test]
    fn nibble_round_trips() {
        for cmd in [Command::Local, Command::Proxy] {
            assert_eq!(Command::from_nibble(cmd.nibble()).unwrap(), cmd);
        }
        for fam in [
            AddressFamily::Unspec,
            AddressFamily::Inet4,
            AddressFamily::Inet6,
            AddressFamily::Unix,
        ] {
            assert_eq!(AddressFamily::from_nibble(fam.nibble()).unwrap(), fam);
        }
        for tp in [Transport::Unspec, Transport::Stream, Transport::Dgram] {
            assert_eq!(Transport::from_nibble(tp.nibble()).unwrap(), tp);
        }
    }

    #[test]
    fn out_of_range_nibbles_rejected() {
        assert!(matches!(
            Command::from_nibble(0x2),
            Err(DecodeError::InvalidCommand(0x2))
        ));
        assert!(matches!(
            AddressFamily::from_nibble(0x4),
            Err(DecodeError::InvalidFamily(0x4))
        ));
        assert!(matches!(
            Transport::from_nibble(0x3),
            Err(DecodeError::InvalidTransport(0x3))
        ));
    }
}
