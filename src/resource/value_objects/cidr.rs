//! IPv4 CIDR blocks.

use crate::error::{ValidationError, ValidationResult};
use std::fmt;
use std::net::Ipv4Addr;

/// A parsed `a.b.c.d/n` block.
///
/// The address part is kept as written; [`has_host_bits`](Self::has_host_bits)
/// reports whether it is the network address of the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Cidr {
    address: Ipv4Addr,
    prefix_length: u8,
}

impl Ipv4Cidr {
    /// Parse a CIDR block, reporting failures against `attribute`.
    pub fn parse(attribute: &str, value: &str) -> ValidationResult<Self> {
        let invalid = || {
            ValidationError::invalid_format(attribute, format!("'{value}' is not a valid IPv4 CIDR block"))
        };
        let (address, prefix) = value.split_once('/').ok_or_else(invalid)?;
        let address: Ipv4Addr = address.parse().map_err(|_| invalid())?;
        if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let prefix_length: u8 = prefix.parse().map_err(|_| invalid())?;
        if prefix_length > 32 {
            return Err(invalid());
        }
        Ok(Self {
            address,
            prefix_length,
        })
    }

    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    pub fn prefix_length(&self) -> u8 {
        self.prefix_length
    }

    fn mask(&self) -> u32 {
        match self.prefix_length {
            0 => 0,
            n => u32::MAX << (32 - u32::from(n)),
        }
    }

    /// First address of the block.
    pub fn network(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.address) & self.mask())
    }

    /// Whether the written address has bits set below the prefix.
    pub fn has_host_bits(&self) -> bool {
        u32::from(self.address) & !self.mask() != 0
    }

    /// Number of addresses in the block.
    pub fn total_addresses(&self) -> u64 {
        1u64 << (32 - u32::from(self.prefix_length))
    }

    /// Whether this block lies entirely inside `other`.
    pub fn is_within(&self, other: &Ipv4Cidr) -> bool {
        self.prefix_length >= other.prefix_length
            && u32::from(self.address) & other.mask() == u32::from(other.network())
    }

    /// Whether the block lies in 10/8, 172.16/12 or 192.168/16.
    pub fn is_private(&self) -> bool {
        ["10.0.0.0/8", "172.16.0.0/12", "192.168.0.0/16"]
            .iter()
            .filter_map(|range| Self::parse("", range).ok())
            .any(|range| self.is_within(&range))
    }

    /// Whether this is `0.0.0.0/0`.
    pub fn is_anywhere(&self) -> bool {
        self.prefix_length == 0
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_length)
    }
}
