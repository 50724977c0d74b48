//! Address-space classification.
//!
//! An address is private when it falls inside RFC 1918 IPv4 space or the
//! RFC 4193 unique-local IPv6 block. Everything else, including loopback and
//! link-local, classifies as public.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reserved private ranges, in evaluation order.
pub const PRIVATE_RANGES: &[&str] = &[
    "10.0.0.0/8",     // 10.0.0.0 - 10.255.255.255
    "172.16.0.0/12",  // 172.16.0.0 - 172.31.255.255
    "192.168.0.0/16", // 192.168.0.0 - 192.168.255.255
    "fd00::/8",       // fd00:: - fdff:ffff:ffff:ffff:ffff:ffff:ffff:ffff
];

#[allow(clippy::expect_used)] // Ranges are compile-time constants
static PRIVATE_NETWORKS: LazyLock<Vec<Cidr>> = LazyLock::new(|| {
    PRIVATE_RANGES
        .iter()
        .map(|range| range.parse().expect("built-in private range is a valid CIDR"))
        .collect()
});

// ── Classification ────────────────────────────────────────────────────────────

/// Result of classifying a single address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressClass {
    Private,
    Public,
}

/// Classify an address as private or public.
///
/// IPv4-mapped IPv6 addresses (`::ffff:10.0.0.1`) are classified by their
/// embedded IPv4 address.
#[must_use]
pub fn classify(ip: IpAddr) -> AddressClass {
    let ip = ip.to_canonical();
    if PRIVATE_NETWORKS.iter().any(|net| net.contains(ip)) {
        AddressClass::Private
    } else {
        AddressClass::Public
    }
}

/// Shorthand for `classify(ip) == AddressClass::Private`.
#[must_use]
pub fn is_private(ip: IpAddr) -> bool {
    classify(ip) == AddressClass::Private
}

// ── CIDR blocks ───────────────────────────────────────────────────────────────

/// Errors produced when parsing a CIDR block.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CidrParseError {
    #[error("missing prefix length in '{0}' (expected ADDRESS/PREFIX)")]
    MissingPrefix(String),

    #[error("invalid address in '{0}'")]
    InvalidAddress(String),

    #[error("invalid prefix length in '{0}'")]
    InvalidPrefix(String),

    #[error("prefix length {prefix_len} exceeds {max} in '{input}'")]
    PrefixTooLong {
        input: String,
        prefix_len: u8,
        max: u8,
    },
}

/// An IPv4 or IPv6 network in CIDR notation.
///
/// Host bits are masked on construction, so `10.1.2.3/8` equals `10.0.0.0/8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cidr {
    network: IpAddr,
    prefix_len: u8,
}

impl Cidr {
    /// Build a block from an address and prefix length.
    ///
    /// # Errors
    ///
    /// Returns [`CidrParseError::PrefixTooLong`] if the prefix exceeds the
    /// address width.
    pub fn new(addr: IpAddr, prefix_len: u8) -> Result<Self, CidrParseError> {
        let max = match addr {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        if prefix_len > max {
            return Err(CidrParseError::PrefixTooLong {
                input: format!("{addr}/{prefix_len}"),
                prefix_len,
                max,
            });
        }
        let network = match addr {
            IpAddr::V4(v4) => IpAddr::V4(Ipv4Addr::from(u32::from(v4) & v4_mask(prefix_len))),
            IpAddr::V6(v6) => IpAddr::V6(Ipv6Addr::from(u128::from(v6) & v6_mask(prefix_len))),
        };
        Ok(Self {
            network,
            prefix_len,
        })
    }

    #[must_use]
    pub fn network(&self) -> IpAddr {
        self.network
    }

    #[must_use]
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Whether `ip` lies inside this block. Address families never mix.
    #[must_use]
    pub fn contains(&self, ip: IpAddr) -> bool {
        match (self.network, ip) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                u32::from(ip) & v4_mask(self.prefix_len) == u32::from(net)
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                u128::from(ip) & v6_mask(self.prefix_len) == u128::from(net)
            }
            _ => false,
        }
    }

    /// Whether every address of `self` is also inside `other`.
    #[must_use]
    pub fn is_subnet_of(&self, other: &Cidr) -> bool {
        self.prefix_len >= other.prefix_len && other.contains(self.network)
    }
}

fn v4_mask(prefix_len: u8) -> u32 {
    if prefix_len == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix_len))
    }
}

fn v6_mask(prefix_len: u8) -> u128 {
    if prefix_len == 0 {
        0
    } else {
        u128::MAX << (128 - u32::from(prefix_len))
    }
}

impl FromStr for Cidr {
    type Err = CidrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, prefix) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| CidrParseError::MissingPrefix(s.to_string()))?;
        let addr: IpAddr = addr
            .parse()
            .map_err(|_| CidrParseError::InvalidAddress(s.to_string()))?;
        let prefix_len: u8 = prefix
            .parse()
            .map_err(|_| CidrParseError::InvalidPrefix(s.to_string()))?;
        Cidr::new(addr, prefix_len).map_err(|e| match e {
            CidrParseError::PrefixTooLong {
                prefix_len, max, ..
            } => CidrParseError::PrefixTooLong {
                input: s.to_string(),
                prefix_len,
                max,
            },
            other => other,
        })
    }
}

impl TryFrom<String> for Cidr {
    type Error = CidrParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Cidr> for String {
    fn from(cidr: Cidr) -> Self {
        cidr.to_string()
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
