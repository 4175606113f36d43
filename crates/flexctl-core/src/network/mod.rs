//! Virtual network and subnet resolution for server injection
//!
//! A server can be placed inside a delegated subnet. Users name that subnet in
//! several ways (a subnet id, a vnet id, bare names, or nothing at all);
//! [`VnetPlan`] classifies the combination once and [`SubnetResolver`] carries it
//! out against a [`CloudResourceClient`](crate::arm::CloudResourceClient).

mod plan;
mod resolver;

pub use plan::{VnetPlan, VnetSpec};
pub use resolver::{DelegationRequirement, ResolvedSubnet, ServerPlacement, SubnetResolver};

pub const DEFAULT_VNET_ADDRESS_PREFIX: &str = "10.0.0.0/16";
pub const DEFAULT_SUBNET_PREFIX: &str = "10.0.0.0/24";

/// Subnet name used when the user did not name one
pub fn default_subnet_name(server_name: &str) -> String {
    format!("{}Subnet", server_name)
}

/// Vnet name used by automatic vnet creation
pub fn default_vnet_name(server_name: &str) -> String {
    format!("{}VNET", server_name)
}
