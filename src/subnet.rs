use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors when parsing or constructing a subnet.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubnetError {
    #[error("invalid address: {0}")]
    InvalidAddress(#[from] std::net::AddrParseError),
    #[error("missing '/' prefix length")]
    MissingPrefix,
    #[error("invalid prefix length {0:?}")]
    InvalidPrefix(String),
    #[error("prefix length {prefix} out of range (max {max})")]
    PrefixOutOfRange { prefix: u8, max: u8 },
    #[error("child prefix /{child} does not extend parent /{parent}")]
    PrefixNotLonger { parent: u8, child: u8 },
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

/// An IPv4 network: a network address with its prefix length.
///
/// Construction is lenient: host bits in the given address are masked away,
/// so any address inside the network identifies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ipv4Subnet {
    network: Ipv4Addr,
    prefix_len: u8,
}

impl Ipv4Subnet {
    pub const MAX_PREFIX: u8 = 32;

    pub fn new(addr: Ipv4Addr, prefix_len: u8) -> Result<Self, SubnetError> {
        if prefix_len > Self::MAX_PREFIX {
            return Err(SubnetError::PrefixOutOfRange {
                prefix: prefix_len,
                max: Self::MAX_PREFIX,
            });
        }
        Ok(Self {
            network: Ipv4Addr::from(u32::from(addr) & v4_mask(prefix_len)),
            prefix_len,
        })
    }

    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    pub fn host_bits(&self) -> u8 {
        Self::MAX_PREFIX - self.prefix_len
    }

    /// Dotted-quad netmask for this subnet's prefix.
    pub fn netmask(&self) -> Ipv4Addr {
        Ipv4Addr::from(v4_mask(self.prefix_len))
    }

    /// Highest address in the subnet.
    pub fn broadcast(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.network) | !v4_mask(self.prefix_len))
    }

    /// Total addresses in the subnet, network and broadcast included.
    pub fn total_hosts(&self) -> u64 {
        1u64 << u32::from(self.host_bits())
    }

    /// Addresses assignable to hosts; zero for /31 and /32.
    pub fn usable_hosts(&self) -> u64 {
        self.total_hosts().saturating_sub(2)
    }

    /// First assignable host address, if the subnet has one.
    pub fn first_host(&self) -> Option<Ipv4Addr> {
        (self.usable_hosts() > 0).then(|| Ipv4Addr::from(u32::from(self.network) + 1))
    }

    /// Last assignable host address, if the subnet has one.
    pub fn last_host(&self) -> Option<Ipv4Addr> {
        (self.usable_hosts() > 0).then(|| Ipv4Addr::from(u32::from(self.broadcast()) - 1))
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        u32::from(addr) & v4_mask(self.prefix_len) == u32::from(self.network)
    }

    /// Iterate the assignable host addresses in ascending order.
    pub fn hosts(&self) -> Hosts {
        if self.usable_hosts() == 0 {
            return Hosts { next: 0, end: 0 };
        }
        let start = u64::from(u32::from(self.network));
        Hosts {
            next: start + 1,
            end: start + self.total_hosts() - 1, // exclusive: stops before broadcast
        }
    }
}

impl fmt::Display for Ipv4Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

impl FromStr for Ipv4Subnet {
    type Err = SubnetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, prefix) = s.split_once('/').ok_or(SubnetError::MissingPrefix)?;
        let addr: Ipv4Addr = addr.parse()?;
        let prefix_len: u8 = prefix
            .parse()
            .map_err(|_| SubnetError::InvalidPrefix(prefix.to_string()))?;
        Self::new(addr, prefix_len)
    }
}

impl Serialize for Ipv4Subnet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Ipv4Subnet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer)?
            .parse()
            .map_err(de::Error::custom)
    }
}

/// Iterator over the usable host addresses of an [`Ipv4Subnet`].
#[derive(Debug, Clone)]
pub struct Hosts {
    next: u64,
    end: u64,
}

impl Iterator for Hosts {
    type Item = Ipv4Addr;

    fn next(&mut self) -> Option<Ipv4Addr> {
        if self.next >= self.end {
            return None;
        }
        let addr = Ipv4Addr::from(self.next as u32);
        self.next += 1;
        Some(addr)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.end - self.next) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Hosts {}

/// An IPv6 network: a network address with its prefix length.
///
/// Lenient like [`Ipv4Subnet`]: host bits are masked away on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ipv6Subnet {
    network: Ipv6Addr,
    prefix_len: u8,
}

impl Ipv6Subnet {
    pub const MAX_PREFIX: u8 = 128;

    pub fn new(addr: Ipv6Addr, prefix_len: u8) -> Result<Self, SubnetError> {
        if prefix_len > Self::MAX_PREFIX {
            return Err(SubnetError::PrefixOutOfRange {
                prefix: prefix_len,
                max: Self::MAX_PREFIX,
            });
        }
        Ok(Self {
            network: Ipv6Addr::from(u128::from(addr) & v6_mask(prefix_len)),
            prefix_len,
        })
    }

    pub fn network(&self) -> Ipv6Addr {
        self.network
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    pub fn contains(&self, addr: Ipv6Addr) -> bool {
        u128::from(addr) & v6_mask(self.prefix_len) == u128::from(self.network)
    }

    /// Split into the child subnets at a longer prefix, in address order.
    ///
    /// The children tile this subnet exactly; the iterator is lazy, so a
    /// deep split (`/0` into `/64`s, say) costs nothing until consumed.
    pub fn subdivide(&self, new_prefix: u8) -> Result<Subdivisions, SubnetError> {
        if new_prefix > Self::MAX_PREFIX {
            return Err(SubnetError::PrefixOutOfRange {
                prefix: new_prefix,
                max: Self::MAX_PREFIX,
            });
        }
        if new_prefix <= self.prefix_len {
            return Err(SubnetError::PrefixNotLonger {
                parent: self.prefix_len,
                child: new_prefix,
            });
        }
        let step = 1u128 << (128 - u32::from(new_prefix));
        let start = u128::from(self.network);
        let span = !v6_mask(self.prefix_len); // host-bit portion of the parent
        Ok(Subdivisions {
            next: Some(start),
            last: start + (span - (step - 1)),
            step,
            prefix_len: new_prefix,
        })
    }
}

impl fmt::Display for Ipv6Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

impl FromStr for Ipv6Subnet {
    type Err = SubnetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, prefix) = s.split_once('/').ok_or(SubnetError::MissingPrefix)?;
        let addr: Ipv6Addr = addr.parse()?;
        let prefix_len: u8 = prefix
            .parse()
            .map_err(|_| SubnetError::InvalidPrefix(prefix.to_string()))?;
        Self::new(addr, prefix_len)
    }
}

impl Serialize for Ipv6Subnet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Ipv6Subnet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer)?
            .parse()
            .map_err(de::Error::custom)
    }
}

/// Iterator over the children produced by [`Ipv6Subnet::subdivide`].
#[derive(Debug, Clone)]
pub struct Subdivisions {
    next: Option<u128>,
    last: u128,
    step: u128,
    prefix_len: u8,
}

impl Iterator for Subdivisions {
    type Item = Ipv6Subnet;

    fn next(&mut self) -> Option<Ipv6Subnet> {
        let current = self.next?;
        // Advancing past `last` could overflow at the top of the space.
        self.next = if current == self.last {
            None
        } else {
            Some(current + self.step)
        };
        Some(Ipv6Subnet {
            network: Ipv6Addr::from(current),
            prefix_len: self.prefix_len,
        })
    }
}
