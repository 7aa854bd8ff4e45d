//! ccna core addressing model.
//!
//! This crate encodes the IPv4/IPv6 addressing entities and planning
//! operations used in classroom-style network design: CIDR subnet records,
//! binary and mask form conversions, borrowed-bits subnet tables, VLSM
//! allocation, and IPv6 site-prefix derivation. It is intentionally light
//! on I/O: just enough structure to compute plans and enforce addressing
//! invariants.

pub mod ipv4;
pub mod ipv6;
pub mod subnet;
pub mod vlsm;

pub use ipv4::{borrow_table, resubnet, BorrowRow, Ipv4Error, ResubnetReport};
pub use ipv6::{compress, derive_site_subnets, expand, split_subnets, Ipv6Error};
pub use subnet::{Hosts, Ipv4Subnet, Ipv6Subnet, Subdivisions, SubnetError};
pub use vlsm::{plan_subnets, SubnetPlan, VlsmError};
