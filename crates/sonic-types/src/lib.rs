//! Common SONiC types for network configuration managers.
//!
//! - [`AddressFamily`]: IPv4 / IPv6 selector with both key and version spellings
//! - [`IpNetwork`]: strict CIDR network parsing bound to a family

mod ip;

pub use ip::{AddressFamily, IpNetwork};

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid IP address format: {0}")]
    InvalidIpAddress(String),

    #[error("invalid IP prefix format: {0}")]
    InvalidIpPrefix(String),

    #[error("invalid IP version: {0} (must be 4 or 6)")]
    InvalidIpVersion(String),

    #[error("invalid address family: {0} (must be ipv4 or ipv6)")]
    InvalidAddressFamily(String),

    #[error("{value} is not a valid {expected} network")]
    FamilyMismatch {
        value: String,
        expected: AddressFamily,
    },
}
