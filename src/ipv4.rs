use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::subnet::{Ipv4Subnet, SubnetError};

/// Errors for IPv4 form conversion and subnet arithmetic.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Ipv4Error {
    #[error("binary form must be 32 digits, got {0}")]
    BinaryLength(usize),
    #[error("binary form has non-binary digit {digit:?} at position {position}")]
    BinaryDigit { digit: char, position: usize },
    #[error("netmask {0} has non-contiguous set bits")]
    NonContiguousMask(Ipv4Addr),
    #[error("prefix length /{0} cannot be subnetted (valid range 1..=30)")]
    PrefixNotSubnettable(u8),
    #[error("replacement mask /{new} does not extend original mask /{original}")]
    MaskNotLonger { original: u8, new: u8 },
    #[error(transparent)]
    Subnet(#[from] SubnetError),
}

/// Parse an undotted 32-digit binary string into an address.
pub fn from_binary(bits: &str) -> Result<Ipv4Addr, Ipv4Error> {
    if bits.len() != 32 {
        return Err(Ipv4Error::BinaryLength(bits.len()));
    }
    let mut value = 0u32;
    for (position, digit) in bits.chars().enumerate() {
        value = (value << 1)
            | match digit {
                '0' => 0,
                '1' => 1,
                _ => return Err(Ipv4Error::BinaryDigit { digit, position }),
            };
    }
    Ok(Ipv4Addr::from(value))
}

/// Render an address as its undotted 32-digit binary form.
pub fn to_binary(addr: Ipv4Addr) -> String {
    format!("{:032b}", u32::from(addr))
}

/// Count of set bits in an address. For a contiguous netmask this is its
/// prefix length; see [`prefix_from_mask`] for the checked conversion.
pub fn set_bit_count(addr: Ipv4Addr) -> u32 {
    u32::from(addr).count_ones()
}

/// Dotted-quad netmask for a prefix length.
pub fn mask_from_prefix(prefix_len: u8) -> Result<Ipv4Addr, Ipv4Error> {
    Ok(Ipv4Subnet::new(Ipv4Addr::UNSPECIFIED, prefix_len)?.netmask())
}

/// Prefix length of a netmask. The set bits must be contiguous from the
/// top; a scattered mask is rejected rather than miscounted.
pub fn prefix_from_mask(mask: Ipv4Addr) -> Result<u8, Ipv4Error> {
    let bits = u32::from(mask);
    let prefix = bits.leading_ones();
    if bits.count_ones() != prefix {
        return Err(Ipv4Error::NonContiguousMask(mask));
    }
    Ok(prefix as u8)
}

/// Network address of a host under a mask (bitwise AND).
pub fn network_address(host: Ipv4Addr, mask: Ipv4Addr) -> Ipv4Addr {
    Ipv4Addr::from(u32::from(host) & u32::from(mask))
}

/// Subnets gained by borrowing `borrowed_bits` host bits. Clamped to the
/// 32-bit address space.
pub fn subnet_count(borrowed_bits: u8) -> u64 {
    1u64 << u32::from(borrowed_bits.min(32))
}

/// Usable hosts offered by `host_bits` host bits: the address count minus
/// network and broadcast, saturating at zero. Clamped like [`subnet_count`].
pub fn host_capacity(host_bits: u8) -> u64 {
    (1u64 << u32::from(host_bits.min(32))).saturating_sub(2)
}

/// One row of a borrowed-bits table: what borrowing that many host bits
/// buys in subnets and per-subnet hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowRow {
    pub borrowed_bits: u8,
    pub netmask: Ipv4Addr,
    pub subnets: u64,
    pub usable_hosts: u64,
}

/// Tabulate the subnetting options for a base network, borrowing one to
/// six host bits.
///
/// Rows stop once the extended prefix would pass /30; two usable hosts is
/// the smallest subnet worth planning around. Base prefixes outside 1..=30
/// cannot be subnetted at all and are rejected. A /30 base yields an empty
/// table.
pub fn borrow_table(base: Ipv4Subnet) -> Result<Vec<BorrowRow>, Ipv4Error> {
    let prefix = base.prefix_len();
    if !(1..=30).contains(&prefix) {
        return Err(Ipv4Error::PrefixNotSubnettable(prefix));
    }

    let mut rows = Vec::new();
    for borrowed_bits in 1..=6u8 {
        let new_prefix = prefix + borrowed_bits;
        if new_prefix > 30 {
            break;
        }
        rows.push(BorrowRow {
            borrowed_bits,
            netmask: mask_from_prefix(new_prefix)?,
            subnets: subnet_count(borrowed_bits),
            usable_hosts: host_capacity(32 - new_prefix),
        });
    }
    Ok(rows)
}

/// Where a host lands when its network is re-subnetted under a longer mask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResubnetReport {
    pub original_prefix_len: u8,
    pub new_prefix_len: u8,
    pub borrowed_bits: u8,
    pub subnets: u64,
    pub host_bits: u8,
    pub usable_hosts: u64,
    pub network: Ipv4Subnet,
    pub first_host: Option<Ipv4Addr>,
    pub last_host: Option<Ipv4Addr>,
    pub broadcast: Ipv4Addr,
}

/// Describe the subnet a host falls into when its network is carved up
/// under a longer replacement mask.
pub fn resubnet(
    host: Ipv4Addr,
    original_mask: Ipv4Addr,
    new_mask: Ipv4Addr,
) -> Result<ResubnetReport, Ipv4Error> {
    let original = prefix_from_mask(original_mask)?;
    let new = prefix_from_mask(new_mask)?;
    if new <= original {
        return Err(Ipv4Error::MaskNotLonger { original, new });
    }

    let network = Ipv4Subnet::new(host, new)?;
    Ok(ResubnetReport {
        original_prefix_len: original,
        new_prefix_len: new,
        borrowed_bits: new - original,
        subnets: subnet_count(new - original),
        host_bits: 32 - new,
        usable_hosts: host_capacity(32 - new),
        first_host: network.first_host(),
        last_host: network.last_host(),
        broadcast: network.broadcast(),
        network,
    })
}
