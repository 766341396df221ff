//! Address family and IP network types with strict parsing.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// IP address family.
///
/// SONiC tables spell a family two ways: by name (`ipv4`, `ipv6`) in table
/// keys and by version number (`4`, `6`) in list-valued fields such as
/// `ip_versions`. Both spellings parse into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

impl AddressFamily {
    /// Both families, IPv4 first.
    pub const ALL: [AddressFamily; 2] = [AddressFamily::Ipv4, AddressFamily::Ipv6];

    /// Returns the family name used in table keys (`ipv4` / `ipv6`).
    pub const fn as_str(&self) -> &'static str {
        match self {
            AddressFamily::Ipv4 => "ipv4",
            AddressFamily::Ipv6 => "ipv6",
        }
    }

    /// Returns the IP version number (4 or 6).
    pub const fn version(&self) -> u8 {
        match self {
            AddressFamily::Ipv4 => 4,
            AddressFamily::Ipv6 => 6,
        }
    }

    /// Returns the maximum prefix length for this family.
    pub const fn max_prefix_len(&self) -> u8 {
        match self {
            AddressFamily::Ipv4 => 32,
            AddressFamily::Ipv6 => 128,
        }
    }

    /// Parses a version number token (`"4"` or `"6"`), ignoring surrounding whitespace.
    pub fn from_version(s: &str) -> Result<Self, ParseError> {
        match s.trim() {
            "4" => Ok(AddressFamily::Ipv4),
            "6" => Ok(AddressFamily::Ipv6),
            other => Err(ParseError::InvalidIpVersion(other.to_string())),
        }
    }

    /// Returns the family of an address.
    pub const fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => AddressFamily::Ipv4,
            IpAddr::V6(_) => AddressFamily::Ipv6,
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AddressFamily {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ipv4" => Ok(AddressFamily::Ipv4),
            "ipv6" => Ok(AddressFamily::Ipv6),
            other => Err(ParseError::InvalidAddressFamily(other.to_string())),
        }
    }
}

/// An IP network in CIDR notation (e.g. `10.0.0.0/24` or `2001:db8::/32`).
///
/// Parsing is strict: host bits below the prefix length must be zero, so
/// `10.0.0.1/24` is rejected. A bare address without `/len` is a host
/// network (`/32` or `/128`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IpNetwork {
    address: IpAddr,
    prefix_len: u8,
}

impl IpNetwork {
    /// Creates a network, checking the prefix length and host bits.
    pub fn new(address: IpAddr, prefix_len: u8) -> Result<Self, ParseError> {
        let family = AddressFamily::of(&address);
        if prefix_len > family.max_prefix_len() {
            return Err(ParseError::InvalidIpPrefix(format!(
                "prefix length {} exceeds maximum {} for {}",
                prefix_len,
                family.max_prefix_len(),
                family
            )));
        }

        if !host_bits_clear(&address, prefix_len) {
            return Err(ParseError::InvalidIpPrefix(format!(
                "{}/{} has host bits set",
                address, prefix_len
            )));
        }

        Ok(IpNetwork {
            address,
            prefix_len,
        })
    }

    /// Parses `s` and requires the result to belong to `family`.
    ///
    /// `"10.0.0.0/24"` parsed for [`AddressFamily::Ipv6`] fails with
    /// [`ParseError::FamilyMismatch`].
    pub fn parse_for(family: AddressFamily, s: &str) -> Result<Self, ParseError> {
        let network: IpNetwork = s.parse()?;
        if network.family() != family {
            return Err(ParseError::FamilyMismatch {
                value: s.to_string(),
                expected: family,
            });
        }
        Ok(network)
    }

    /// Returns the network address.
    pub const fn address(&self) -> &IpAddr {
        &self.address
    }

    /// Returns the prefix length in bits.
    pub const fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Returns the address family of this network.
    pub const fn family(&self) -> AddressFamily {
        AddressFamily::of(&self.address)
    }
}

fn host_bits_clear(address: &IpAddr, prefix_len: u8) -> bool {
    match address {
        IpAddr::V4(v4) => {
            let bits = u32::from(*v4);
            let host_mask = u32::MAX.checked_shr(u32::from(prefix_len)).unwrap_or(0);
            bits & host_mask == 0
        }
        IpAddr::V6(v6) => {
            let bits = u128::from(*v6);
            let host_mask = u128::MAX.checked_shr(u32::from(prefix_len)).unwrap_or(0);
            bits & host_mask == 0
        }
    }
}

impl fmt::Display for IpNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

impl FromStr for IpNetwork {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr_str, len_str) = match s.rsplit_once('/') {
            Some((addr, len)) => (addr, Some(len)),
            None => (s, None),
        };

        let address: IpAddr = if addr_str.contains(':') {
            addr_str
                .parse::<Ipv6Addr>()
                .map(IpAddr::V6)
                .map_err(|_| ParseError::InvalidIpAddress(addr_str.to_string()))?
        } else {
            addr_str
                .parse::<Ipv4Addr>()
                .map(IpAddr::V4)
                .map_err(|_| ParseError::InvalidIpAddress(addr_str.to_string()))?
        };

        let prefix_len = match len_str {
            // u8::from_str would accept a leading '+'
            Some(len) if len.is_empty() || !len.bytes().all(|b| b.is_ascii_digit()) => {
                return Err(ParseError::InvalidIpPrefix(s.to_string()));
            }
            Some(len) => len
                .parse::<u8>()
                .map_err(|_| ParseError::InvalidIpPrefix(s.to_string()))?,
            None => AddressFamily::of(&address).max_prefix_len(),
        };

        IpNetwork::new(address, prefix_len)
    }
}

impl Serialize for IpNetwork {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for IpNetwork {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
