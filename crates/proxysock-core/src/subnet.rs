//! CIDR subnet matching for trust predicates.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use crate::error::SubnetParseError;

/// An IPv4 or IPv6 subnet in CIDR notation.
///
/// Host bits are masked off at construction, so a non-canonical prefix such
/// as `10.1.2.3/8` normalizes to `10.0.0.0/8`. Matching looks at the address
/// only (ports are ignored) and never crosses families: an IPv4-mapped IPv6
/// address is still an IPv6 address.
///
/// ```
/// use proxysock_core::Subnet;
///
/// let lb_pool: Subnet = "10.0.0.0/8".parse().unwrap();
/// assert!(lb_pool.contains("10.20.30.40".parse().unwrap()));
/// assert!(!lb_pool.contains("192.168.0.1".parse().unwrap()));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subnet {
    network: IpAddr,
    prefix: u8,
}

impl Subnet {
    /// Build a subnet, masking host bits off `network`.
    pub fn new(network: IpAddr, prefix: u8) -> Result<Self, SubnetParseError> {
        let max = match network {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        if prefix > max {
            return Err(SubnetParseError::InvalidPrefixLength {
                prefix: prefix.to_string(),
                max,
            });
        }
        let network = match network {
            IpAddr::V4(ip) => IpAddr::V4((u32::from(ip) & mask32(prefix)).into()),
            IpAddr::V6(ip) => IpAddr::V6((u128::from(ip) & mask128(prefix)).into()),
        };
        Ok(Subnet { network, prefix })
    }

    /// The network address with host bits cleared.
    pub fn network(&self) -> IpAddr {
        self.network
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix
    }

    /// Whether `addr` falls inside this subnet. Always false across families.
    pub fn contains(&self, addr: IpAddr) -> bool {
        match (self.network, addr) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                u32::from(ip) & mask32(self.prefix) == u32::from(net)
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                u128::from(ip) & mask128(self.prefix) == u128::from(net)
            }
            _ => false,
        }
    }

    /// [`contains`](Self::contains) on the address portion of a socket
    /// address; the port plays no part.
    pub fn matches(&self, addr: SocketAddr) -> bool {
        self.contains(addr.ip())
    }
}

fn mask32(prefix: u8) -> u32 {
    // u32::MAX << 32 would overflow the shift
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix))
    }
}

fn mask128(prefix: u8) -> u128 {
    if prefix == 0 {
        0
    } else {
        u128::MAX << (128 - u32::from(prefix))
    }
}

impl FromStr for Subnet {
    type Err = SubnetParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr_part, prefix_part) = s
            .split_once('/')
            .ok_or(SubnetParseError::MissingSeparator)?;
        let network: IpAddr = addr_part
            .parse()
            .map_err(|_| SubnetParseError::InvalidAddress(addr_part.to_string()))?;
        let max = match network {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        let prefix: u8 = prefix_part
            .parse()
            .map_err(|_| SubnetParseError::InvalidPrefixLength {
                prefix: prefix_part.to_string(),
                max,
            })?;
        Subnet::new(network, prefix)
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subnet(s: &str) -> Subnet {
        s.parse().unwrap()
    }

    #[test]
    fn ipv4_membership() {
        let net = subnet("192.168.0.0/16");
        assert!(net.contains("192.168.1.1".parse().unwrap()));
        assert!(net.contains("192.168.255.254".parse().unwrap()));
        assert!(!net.contains("192.169.0.1".parse().unwrap()));
        assert!(!net.contains("10.0.0.1".parse().unwrap()));
    }

    #[test]
    fn ipv6_membership() {
        let net = subnet("2001:db8::/32");
        assert!(net.contains("2001:db8::1".parse().unwrap()));
        assert!(net.contains("2001:db8:ffff::1".parse().unwrap()));
        assert!(!net.contains("2001:db9::1".parse().unwrap()));
    }

    #[test]
    fn host_bits_masked_off() {
        let net = subnet("10.1.2.3/8");
        assert_eq!(net.network(), "10.0.0.0".parse::<IpAddr>().unwrap());
        assert!(net.contains("10.255.255.255".parse().unwrap()));
        assert_eq!(net.to_string(), "10.0.0.0/8");
    }

    #[test]
    fn zero_prefix_matches_whole_family_only() {
        let v4_any = subnet("0.0.0.0/0");
        assert!(v4_any.contains("203.0.113.77".parse().unwrap()));
        assert!(!v4_any.contains("2001:db8::1".parse().unwrap()));

        let v6_any = subnet("::/0");
        assert!(v6_any.contains("2001:db8::1".parse().unwrap()));
        assert!(!v6_any.contains("203.0.113.77".parse().unwrap()));
    }

    #[test]
    fn full_prefix_is_exact_match() {
        let net = subnet("203.0.113.7/32");
        assert!(net.contains("203.0.113.7".parse().unwrap()));
        assert!(!net.contains("203.0.113.8".parse().unwrap()));
    }

    #[test]
    fn mapped_ipv6_does_not_match_ipv4_subnet() {
        let net = subnet("10.0.0.0/8");
        assert!(!net.contains("::ffff:10.0.0.1".parse().unwrap()));
    }

    #[test]
    fn port_is_ignored() {
        let net = subnet("10.0.0.0/8");
        assert!(net.matches("10.1.1.1:1".parse().unwrap()));
        assert!(net.matches("10.1.1.1:65535".parse().unwrap()));
        assert!(!net.matches("11.1.1.1:1".parse().unwrap()));
    }

    #[test]
    fn malformed_inputs_rejected() {
        assert_eq!(
            "10.0.0.0".parse::<Subnet>(),
            Err(SubnetParseError::MissingSeparator)
        );
        assert!(matches!(
            "not.an.ip/8".parse::<Subnet>(),
            Err(SubnetParseError::InvalidAddress(_))
        ));
        assert!(matches!(
            "10.0.0.0/x".parse::<Subnet>(),
            Err(SubnetParseError::InvalidPrefixLength { .. })
        ));
        assert!(matches!(
            "10.0.0.0/33".parse::<Subnet>(),
            Err(SubnetParseError::InvalidPrefixLength { max: 32, .. })
        ));
        assert!(matches!(
            "2001:db8::/129".parse::<Subnet>(),
            Err(SubnetParseError::InvalidPrefixLength { max: 128, .. })
        ));
    }
}
