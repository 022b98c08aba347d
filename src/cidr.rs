//! CIDR block arithmetic
//!
//! Computes the inclusive `[network, broadcast]` address range of an IPv4
//! (32-bit) or IPv6 (128-bit) block. Used to group visitor addresses into
//! blocks, e.g. when throttling card testing from one network.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::error::CidrError;

/// Prefix applied by [`CidrRange::from_ip`] to IPv4 addresses.
pub const DEFAULT_IPV4_PREFIX: u8 = 20;

/// Prefix applied by [`CidrRange::from_ip`] to IPv6 addresses.
pub const DEFAULT_IPV6_PREFIX: u8 = 48;

/// Inclusive address range of one CIDR block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CidrRange {
    pub first: IpAddr,
    pub last: IpAddr,
    pub prefix: u8,
}

impl CidrRange {
    pub fn from_ipv4(address: &str, prefix: u8) -> Result<Self, CidrError> {
        let ip: Ipv4Addr = address.trim().parse().map_err(|_| CidrError::InvalidAddress {
            family: "IPv4",
            address: address.to_string(),
        })?;
        Self::for_ipv4(ip, prefix)
    }

    pub fn from_ipv6(address: &str, prefix: u8) -> Result<Self, CidrError> {
        let ip: Ipv6Addr = address.trim().parse().map_err(|_| CidrError::InvalidAddress {
            family: "IPv6",
            address: address.to_string(),
        })?;
        Self::for_ipv6(ip, prefix)
    }

    /// Default-sized block around an address of either family.
    pub fn from_ip(address: &str) -> Result<Self, CidrError> {
        match parse_ip(address)? {
            IpAddr::V4(ip) => Self::for_ipv4(ip, DEFAULT_IPV4_PREFIX),
            IpAddr::V6(ip) => Self::for_ipv6(ip, DEFAULT_IPV6_PREFIX),
        }
    }

    /// Parse slash notation, e.g. `10.0.0.0/8`.
    pub fn from_cidr(notation: &str) -> Result<Self, CidrError> {
        let (address, prefix) = notation
            .trim()
            .split_once('/')
            .ok_or_else(|| CidrError::InvalidNotation(notation.to_string()))?;
        let prefix: u8 = prefix
            .parse()
            .map_err(|_| CidrError::InvalidNotation(notation.to_string()))?;

        match parse_ip(address)? {
            IpAddr::V4(ip) => Self::for_ipv4(ip, prefix),
            IpAddr::V6(ip) => Self::for_ipv6(ip, prefix),
        }
    }

    pub fn for_ipv4(ip: Ipv4Addr, prefix: u8) -> Result<Self, CidrError> {
        check_prefix(prefix, 32)?;
        let mask = if prefix == 0 { 0 } else { u32::MAX << (32 - prefix) };
        let bits = u32::from(ip);

        Ok(Self {
            first: IpAddr::V4(Ipv4Addr::from(bits & mask)),
            last: IpAddr::V4(Ipv4Addr::from(bits | !mask)),
            prefix,
        })
    }

    pub fn for_ipv6(ip: Ipv6Addr, prefix: u8) -> Result<Self, CidrError> {
        check_prefix(prefix, 128)?;
        let mask = if prefix == 0 { 0 } else { u128::MAX << (128 - prefix) };
        let bits = u128::from(ip);

        Ok(Self {
            first: IpAddr::V6(Ipv6Addr::from(bits & mask)),
            last: IpAddr::V6(Ipv6Addr::from(bits | !mask)),
            prefix,
        })
    }

    /// Whether `ip` falls inside the block. Other families never match.
    pub fn contains(&self, ip: IpAddr) -> bool {
        match (self.first, self.last, ip) {
            (IpAddr::V4(first), IpAddr::V4(last), IpAddr::V4(ip)) => first <= ip && ip <= last,
            (IpAddr::V6(first), IpAddr::V6(last), IpAddr::V6(ip)) => first <= ip && ip <= last,
            _ => false,
        }
    }

    /// `[first, last]` in textual form. IPv6 is zero-compressed.
    pub fn to_strings(&self) -> [String; 2] {
        [self.first.to_string(), self.last.to_string()]
    }
}

impl fmt::Display for CidrRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.first, self.last)
    }
}

fn parse_ip(address: &str) -> Result<IpAddr, CidrError> {
    address.trim().parse().map_err(|_| CidrError::InvalidAddress {
        family: "IP",
        address: address.to_string(),
    })
}

fn check_prefix(prefix: u8, max: u8) -> Result<(), CidrError> {
    if prefix > max {
        return Err(CidrError::InvalidPrefix { prefix, max });
    }
    Ok(())
}
