use std::net::Ipv6Addr;

use thiserror::Error;

use crate::subnet::{Ipv6Subnet, SubnetError};

/// Hextet of the network address stepped when deriving site subnets.
const SITE_HEXTET: usize = 3;

/// Prefix length of a derived site subnet.
pub const SITE_PREFIX_LEN: u8 = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Ipv6Error {
    #[error("invalid address: {0}")]
    InvalidAddress(#[from] std::net::AddrParseError),
    #[error("site hextet {base:#06x} + {offset} overflows 0xffff")]
    SiteHextetOverflow { base: u16, offset: u16 },
    #[error(transparent)]
    Subnet(#[from] SubnetError),
}

/// Canonical compressed form (RFC 5952) of an address in any valid textual
/// form. No CIDR suffix.
pub fn compress(text: &str) -> Result<String, Ipv6Error> {
    let addr: Ipv6Addr = text.parse()?;
    Ok(addr.to_string())
}

/// Fully exploded form: eight zero-padded, lower-case hextets.
pub fn expand(text: &str) -> Result<String, Ipv6Error> {
    let addr: Ipv6Addr = text.parse()?;
    let hextets = addr.segments().map(|hextet| format!("{hextet:04x}"));
    Ok(hextets.join(":"))
}

/// The first `count` children of `subnet` split one prefix bit deeper.
pub fn split_subnets(subnet: Ipv6Subnet, count: usize) -> Result<Vec<Ipv6Subnet>, Ipv6Error> {
    let children = subnet.subdivide(subnet.prefix_len() + 1)?;
    Ok(children.take(count).collect())
}

/// Derive `count` consecutive /64 site subnets after `start` by stepping
/// the fourth hextet of its network address.
///
/// Host bits in `start` are already masked by [`Ipv6Subnet`], so the
/// remaining hextets of each derived network stay zero. Stepping past
/// 0xffff is an error; a count of zero yields an empty list.
pub fn derive_site_subnets(start: Ipv6Subnet, count: u16) -> Result<Vec<Ipv6Subnet>, Ipv6Error> {
    let mut hextets = start.network().segments();
    let base = hextets[SITE_HEXTET];

    let mut derived = Vec::with_capacity(usize::from(count));
    for offset in 1..=count {
        let site = u16::try_from(u32::from(base) + u32::from(offset))
            .map_err(|_| Ipv6Error::SiteHextetOverflow { base, offset })?;
        hextets[SITE_HEXTET] = site;
        derived.push(Ipv6Subnet::new(Ipv6Addr::from(hextets), SITE_PREFIX_LEN)?);
    }
    Ok(derived)
}
