use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ipv4::host_capacity;
use crate::subnet::{Ipv4Subnet, SubnetError};

/// One allocated subnet in a VLSM plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetPlan {
    pub subnet: Ipv4Addr,
    pub prefix_len: u8,
    pub network: Ipv4Subnet,
    pub first_host: Ipv4Addr,
    pub last_host: Ipv4Addr,
    pub broadcast: Ipv4Addr,
    pub total_hosts: u64,
    pub usable_hosts: u64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VlsmError {
    #[error("a requirement of zero hosts cannot be allocated")]
    ZeroHosts,
    #[error("no IPv4 subnet holds {0} usable hosts")]
    TooManyHosts(u32),
    #[error("{required} hosts need a /{needed} subnet, which does not fit in {base}")]
    DoesNotFit {
        required: u32,
        needed: u8,
        base: Ipv4Subnet,
    },
    #[error(transparent)]
    Subnet(#[from] SubnetError),
}

/// Host bits of the smallest subnet whose usable-host count covers
/// `required`, never below the two host bits of a /30.
fn host_bits_for(required: u32) -> Result<u8, VlsmError> {
    if required == 0 {
        return Err(VlsmError::ZeroHosts);
    }
    if u64::from(required) > host_capacity(32) {
        return Err(VlsmError::TooManyHosts(required));
    }
    // Smallest power of two holding the hosts plus network and broadcast.
    let bits = (u64::from(required) + 2).next_power_of_two().trailing_zeros() as u8;
    Ok(bits.max(2))
}

/// Allocate one subnet per host requirement inside `base`.
///
/// Requirements are placed largest-first from the start of `base`;
/// descending size keeps every allocation naturally aligned to its own
/// boundary, so the plan packs with no padding. Plans are returned in
/// allocation order. An empty requirement list yields an empty plan.
pub fn plan_subnets(base: Ipv4Subnet, required_hosts: &[u32]) -> Result<Vec<SubnetPlan>, VlsmError> {
    let mut requirements = required_hosts.to_vec();
    requirements.sort_unstable_by(|a, b| b.cmp(a));

    let base_start = u64::from(u32::from(base.network()));
    let base_end = base_start + base.total_hosts(); // exclusive
    let mut cursor = base_start;
    let mut plans = Vec::with_capacity(requirements.len());

    for required in requirements {
        let host_bits = host_bits_for(required)?;
        let prefix_len = 32 - host_bits;
        let size = 1u64 << u32::from(host_bits);
        if prefix_len < base.prefix_len() || cursor + size > base_end {
            return Err(VlsmError::DoesNotFit {
                required,
                needed: prefix_len,
                base,
            });
        }

        let network = Ipv4Subnet::new(Ipv4Addr::from(cursor as u32), prefix_len)?;
        plans.push(SubnetPlan {
            subnet: network.network(),
            prefix_len,
            network,
            first_host: Ipv4Addr::from((cursor + 1) as u32),
            last_host: Ipv4Addr::from((cursor + size - 2) as u32),
            broadcast: Ipv4Addr::from((cursor + size - 1) as u32),
            total_hosts: size,
            usable_hosts: size - 2,
        });
        cursor += size;
    }
    Ok(plans)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    fn base(s: &str) -> Ipv4Subnet {
        s.parse().unwrap()
    }

    #[track_caller]
    fn assert_plan(
        plan: &SubnetPlan,
        subnet: &str,
        prefix_len: u8,
        first: &str,
        last: &str,
        broadcast: &str,
        total: u64,
        usable: u64,
    ) {
        assert_eq!(plan.subnet, addr(subnet));
        assert_eq!(plan.prefix_len, prefix_len);
        assert_eq!(plan.network.to_string(), format!("{subnet}/{prefix_len}"));
        assert_eq!(plan.first_host, addr(first));
        assert_eq!(plan.last_host, addr(last));
        assert_eq!(plan.broadcast, addr(broadcast));
        assert_eq!(plan.total_hosts, total);
        assert_eq!(plan.usable_hosts, usable);
    }

    #[test]
    fn plans_descending_requirements() {
        let plans = plan_subnets(base("192.168.1.0/24"), &[50, 20, 10]).unwrap();
        assert_eq!(plans.len(), 3);
        assert_plan(
            &plans[0],
            "192.168.1.0",
            26,
            "192.168.1.1",
            "192.168.1.62",
            "192.168.1.63",
            64,
            62,
        );
        assert_plan(
            &plans[1],
            "192.168.1.64",
            27,
            "192.168.1.65",
            "192.168.1.94",
            "192.168.1.95",
            32,
            30,
        );
        assert_plan(
            &plans[2],
            "192.168.1.96",
            28,
            "192.168.1.97",
            "192.168.1.110",
            "192.168.1.111",
            16,
            14,
        );
    }

    #[test]
    fn unsorted_requirements_allocate_largest_first() {
        let sorted = plan_subnets(base("192.168.1.0/24"), &[50, 20, 10]).unwrap();
        let shuffled = plan_subnets(base("192.168.1.0/24"), &[10, 50, 20]).unwrap();
        assert_eq!(sorted, shuffled);
    }

    #[test]
    fn plans_single_requirement() {
        let plans = plan_subnets(base("10.0.0.0/24"), &[100]).unwrap();
        assert_eq!(plans.len(), 1);
        assert_plan(
            &plans[0],
            "10.0.0.0",
            25,
            "10.0.0.1",
            "10.0.0.126",
            "10.0.0.127",
            128,
            126,
        );
    }

    #[test]
    fn empty_requirements_yield_empty_plan() {
        assert_eq!(plan_subnets(base("192.168.1.0/24"), &[]).unwrap(), vec![]);
    }

    #[test]
    fn rejects_requirement_larger_than_base() {
        // 10 hosts need a /28; a /30 base cannot hold one.
        let err = plan_subnets(base("192.168.1.0/30"), &[10]).unwrap_err();
        assert!(matches!(
            err,
            VlsmError::DoesNotFit {
                required: 10,
                needed: 28,
                ..
            }
        ));
    }

    #[test]
    fn rejects_overrunning_the_base() {
        // Three /26 allocations fit in a /24; five do not.
        assert!(plan_subnets(base("192.168.1.0/24"), &[50, 50, 50]).is_ok());
        let err = plan_subnets(base("192.168.1.0/24"), &[50, 50, 50, 50, 50]).unwrap_err();
        assert!(matches!(err, VlsmError::DoesNotFit { required: 50, .. }));
    }

    #[test]
    fn rejects_zero_and_oversized_requirements() {
        assert!(matches!(
            plan_subnets(base("192.168.1.0/24"), &[0]),
            Err(VlsmError::ZeroHosts)
        ));
        assert!(matches!(
            plan_subnets(base("0.0.0.0/0"), &[u32::MAX]),
            Err(VlsmError::TooManyHosts(_))
        ));
    }

    #[test]
    fn smallest_allocation_is_a_slash_30() {
        let plans = plan_subnets(base("192.168.1.0/24"), &[1, 2]).unwrap();
        assert_eq!(plans[0].prefix_len, 30);
        assert_eq!(plans[1].prefix_len, 30);
        assert_eq!(plans[1].subnet, addr("192.168.1.4"));
    }

    #[test]
    fn plan_serializes_to_report_fields() {
        let plans = plan_subnets(base("192.168.1.0/24"), &[50]).unwrap();
        let value = serde_json::to_value(&plans[0]).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "subnet": "192.168.1.0",
                "prefix_len": 26,
                "network": "192.168.1.0/26",
                "first_host": "192.168.1.1",
                "last_host": "192.168.1.62",
                "broadcast": "192.168.1.63",
                "total_hosts": 64,
                "usable_hosts": 62,
            })
        );
    }
}
