//! Subnet resolution: find, validate, delegate or create the subnet a server is injected into

use std::collections::BTreeSet;
use tracing::{info, warn};

use crate::arm::models::{Delegation, Subnet, VirtualNetwork};
use crate::arm::{ArmError, CloudResourceClient, ResourceId};
use crate::engine::DatabaseEngine;
use crate::error::{CoreError, Result};

use super::plan::{VnetPlan, VnetSpec};
use super::{DEFAULT_SUBNET_PREFIX, DEFAULT_VNET_ADDRESS_PREFIX, default_subnet_name, default_vnet_name};

/// The delegation a subnet must carry before a server can be injected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegationRequirement {
    pub service_name: String,
}

impl DelegationRequirement {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    pub fn for_engine(engine: DatabaseEngine) -> Self {
        Self::new(engine.delegation_service())
    }
}

/// Where the server is going
#[derive(Debug, Clone, Copy)]
pub struct ServerPlacement<'a> {
    pub server_name: &'a str,
    pub resource_group: &'a str,
    pub location: &'a str,
}

/// The subnet a server will be injected into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSubnet {
    pub resource_id: String,
    pub name: String,
    pub existing_delegations: BTreeSet<String>,
}

/// Resolves [`VnetSpec`]s against the control plane
pub struct SubnetResolver<'a, C: CloudResourceClient + ?Sized> {
    client: &'a C,
}

impl<'a, C: CloudResourceClient + ?Sized> SubnetResolver<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    /// Resolve the subnet for `placement`, creating or delegating resources as needed.
    ///
    /// Returns `Ok(None)` when no network arguments were given.
    pub async fn resolve(
        &self,
        spec: &VnetSpec,
        placement: ServerPlacement<'_>,
        delegation: &DelegationRequirement,
    ) -> Result<Option<ResolvedSubnet>> {
        let plan = VnetPlan::classify(spec)?;
        let default_subnet = default_subnet_name(placement.server_name);

        let resolved = match plan {
            VnetPlan::Neither => return Ok(None),

            VnetPlan::SubnetBareInvalid(subnet) => {
                return Err(CoreError::MalformedSubnetReference(subnet));
            }

            VnetPlan::SubnetId(id) => self.resolve_subnet_id(&id, placement, delegation).await?,

            VnetPlan::VnetId(id) => {
                warn!("You have supplied a Vnet Id. Verifying its existence...");
                let location = self.resource_group_location(&id.resource_group).await?;
                self.validate_placement(&id.resource_group, &id.subscription, &location, placement)?;
                self.ensure_delegated_subnet(
                    &id.resource_group,
                    &id.name,
                    &default_subnet,
                    &location,
                    DEFAULT_VNET_ADDRESS_PREFIX,
                    DEFAULT_SUBNET_PREFIX,
                    delegation,
                )
                .await?
            }

            VnetPlan::VnetBareName {
                vnet,
                vnet_prefix,
                subnet_prefix,
            } => {
                warn!("You have supplied a Vnet Name. Verifying its existence...");
                let resolved = self
                    .ensure_delegated_subnet(
                        placement.resource_group,
                        &vnet,
                        &default_subnet,
                        placement.location,
                        &vnet_prefix,
                        &subnet_prefix,
                        delegation,
                    )
                    .await?;

                // The name may have matched a vnet that already lived somewhere else
                let id = ResourceId::parse(&resolved.resource_id)?;
                let location = self.resource_group_location(&id.resource_group).await?;
                self.validate_placement(&id.resource_group, &id.subscription, &location, placement)?;
                resolved
            }

            VnetPlan::BothBareWithPrefix {
                vnet,
                subnet,
                vnet_prefix,
                subnet_prefix,
            } => {
                self.ensure_delegated_subnet(
                    placement.resource_group,
                    &vnet,
                    &subnet,
                    placement.location,
                    &vnet_prefix,
                    &subnet_prefix,
                    delegation,
                )
                .await?
            }

            VnetPlan::BothBareNoPrefix { vnet, subnet } => {
                self.ensure_delegated_subnet(
                    placement.resource_group,
                    &vnet,
                    &subnet,
                    placement.location,
                    DEFAULT_VNET_ADDRESS_PREFIX,
                    DEFAULT_SUBNET_PREFIX,
                    delegation,
                )
                .await?
            }
        };

        Ok(Some(resolved))
    }

    async fn resolve_subnet_id(
        &self,
        id: &ResourceId,
        placement: ServerPlacement<'_>,
        delegation: &DelegationRequirement,
    ) -> Result<ResolvedSubnet> {
        warn!("You have supplied a Subnet Id. Verifying its existence...");

        let active = self.client.subscription_id();
        if !id.subscription.eq_ignore_ascii_case(active) {
            return Err(CoreError::CrossSubscriptionMismatch {
                expected: active.to_string(),
                actual: id.subscription.clone(),
            });
        }

        let vnet_name = id.name.as_str();
        let subnet_name = id.resource_name();

        let mut found = self
            .client
            .get_subnet(&id.resource_group, vnet_name, subnet_name)
            .await?
            .map(|s| (id.resource_group.as_str(), s));

        // The id's resource group may be stale while the subnet sits next to the server
        if found.is_none() && !id.resource_group.eq_ignore_ascii_case(placement.resource_group) {
            found = self
                .client
                .get_subnet(placement.resource_group, vnet_name, subnet_name)
                .await?
                .map(|s| (placement.resource_group, s));
        }

        match found {
            Some((resource_group, subnet)) => {
                info!("Using existing subnet \"{}\"...", subnet_name);
                self.attach_delegation(resource_group, vnet_name, subnet, delegation)
                    .await
            }
            None => {
                warn!(
                    "The Subnet does not exist with the supplied subnet id. Checking the existence of the Vnet in the supplied Id..."
                );
                let location = self.resource_group_location(&id.resource_group).await?;
                self.create_vnet_and_subnet(
                    &id.resource_group,
                    vnet_name,
                    &default_subnet_name(placement.server_name),
                    &location,
                    DEFAULT_VNET_ADDRESS_PREFIX,
                    DEFAULT_SUBNET_PREFIX,
                    delegation,
                )
                .await
            }
        }
    }

    /// Reuse the named subnet (delegating it if needed) or create it, along with its vnet.
    #[allow(clippy::too_many_arguments)]
    pub async fn ensure_delegated_subnet(
        &self,
        resource_group: &str,
        vnet: &str,
        subnet: &str,
        location: &str,
        vnet_prefix: &str,
        subnet_prefix: &str,
        delegation: &DelegationRequirement,
    ) -> Result<ResolvedSubnet> {
        match self.client.get_subnet(resource_group, vnet, subnet).await? {
            Some(existing) => {
                info!(
                    "Using existing subnet \"{}\" in resource group \"{}\"",
                    subnet, resource_group
                );
                self.attach_delegation(resource_group, vnet, existing, delegation)
                    .await
            }
            None => {
                warn!("The Subnet does not exist. Checking the existence of the Vnet...");
                self.create_vnet_and_subnet(
                    resource_group,
                    vnet,
                    subnet,
                    location,
                    vnet_prefix,
                    subnet_prefix,
                    delegation,
                )
                .await
            }
        }
    }

    /// Create vnet `<server>VNET` with subnet `<server>Subnet`, both with default prefixes
    pub async fn create_vnet(
        &self,
        placement: ServerPlacement<'_>,
        delegation: &DelegationRequirement,
    ) -> Result<ResolvedSubnet> {
        let vnet_name = default_vnet_name(placement.server_name);
        let subnet_name = default_subnet_name(placement.server_name);

        warn!(
            "Creating new vnet \"{}\" in resource group \"{}\"...",
            vnet_name, placement.resource_group
        );
        self.client
            .create_virtual_network(
                placement.resource_group,
                &VirtualNetwork::new(&vnet_name, placement.location, DEFAULT_VNET_ADDRESS_PREFIX),
            )
            .await
            .map_err(|e| space_exhausted(e, &subnet_name, &vnet_name))?;

        warn!(
            "Creating new subnet \"{}\" in resource group \"{}\" and delegating it to \"{}\"...",
            subnet_name, placement.resource_group, delegation.service_name
        );
        let created = self
            .client
            .create_or_update_subnet(
                placement.resource_group,
                &vnet_name,
                &Subnet::delegated(&subnet_name, DEFAULT_SUBNET_PREFIX, &delegation.service_name),
            )
            .await
            .map_err(|e| space_exhausted(e, &subnet_name, &vnet_name))?;

        Ok(self.project(placement.resource_group, &vnet_name, &subnet_name, created))
    }

    async fn attach_delegation(
        &self,
        resource_group: &str,
        vnet: &str,
        mut subnet: Subnet,
        delegation: &DelegationRequirement,
    ) -> Result<ResolvedSubnet> {
        let subnet_name = subnet.name.clone().unwrap_or_default();

        if subnet.properties.delegations.is_empty() {
            info!(
                "Adding \"{}\" delegation to the existing subnet.",
                delegation.service_name
            );
            subnet.properties.delegations = vec![Delegation::new(&delegation.service_name)];
            let updated = self
                .client
                .create_or_update_subnet(resource_group, vnet, &subnet)
                .await
                .map_err(|e| space_exhausted(e, &subnet_name, vnet))?;
            return Ok(self.project(resource_group, vnet, &subnet_name, updated));
        }

        let conflicting = subnet
            .properties
            .delegations
            .iter()
            .any(|d| d.properties.service_name.as_deref() != Some(delegation.service_name.as_str()));
        if conflicting {
            return Err(CoreError::ConflictingDelegation {
                subnet: subnet_name,
                existing: subnet.delegation_services().join(", "),
                required: delegation.service_name.clone(),
            });
        }

        Ok(self.project(resource_group, vnet, &subnet_name, subnet))
    }

    async fn create_vnet_and_subnet(
        &self,
        resource_group: &str,
        vnet: &str,
        subnet: &str,
        location: &str,
        vnet_prefix: &str,
        subnet_prefix: &str,
        delegation: &DelegationRequirement,
    ) -> Result<ResolvedSubnet> {
        if self
            .client
            .get_virtual_network(resource_group, vnet)
            .await?
            .is_none()
        {
            info!(
                "The Vnet does not exist. Creating new vnet \"{}\" in resource group \"{}\"",
                vnet, resource_group
            );
            self.client
                .create_virtual_network(resource_group, &VirtualNetwork::new(vnet, location, vnet_prefix))
                .await
                .map_err(|e| space_exhausted(e, subnet, vnet))?;
        }

        info!(
            "Creating new subnet \"{}\" in resource group \"{}\"",
            subnet, resource_group
        );
        let created = self
            .client
            .create_or_update_subnet(
                resource_group,
                vnet,
                &Subnet::delegated(subnet, subnet_prefix, &delegation.service_name),
            )
            .await
            .map_err(|e| space_exhausted(e, subnet, vnet))?;

        Ok(self.project(resource_group, vnet, subnet, created))
    }

    async fn resource_group_location(&self, resource_group: &str) -> Result<String> {
        self.client
            .get_resource_group(resource_group)
            .await?
            .map(|rg| rg.location)
            .ok_or_else(|| {
                CoreError::Arm(ArmError::Api {
                    status: 404,
                    code: "ResourceGroupNotFound".to_string(),
                    message: format!("Resource group '{}' could not be found.", resource_group),
                })
            })
    }

    fn validate_placement(
        &self,
        resource_group: &str,
        subscription: &str,
        location: &str,
        placement: ServerPlacement<'_>,
    ) -> Result<()> {
        let same = resource_group.eq_ignore_ascii_case(placement.resource_group)
            && subscription.eq_ignore_ascii_case(self.client.subscription_id())
            && same_location(location, placement.location);

        if same {
            Ok(())
        } else {
            Err(CoreError::CrossResourceMismatch {
                detail: format!(
                    "The network is in resource group '{}' ({}), subscription '{}'; the server targets resource group '{}' ({}), subscription '{}'.",
                    resource_group,
                    location,
                    subscription,
                    placement.resource_group,
                    placement.location,
                    self.client.subscription_id()
                ),
            })
        }
    }

    fn project(&self, resource_group: &str, vnet: &str, name: &str, subnet: Subnet) -> ResolvedSubnet {
        let resource_id = subnet.id.clone().unwrap_or_else(|| {
            ResourceId::subnet(self.client.subscription_id(), resource_group, vnet, name).to_string()
        });
        ResolvedSubnet {
            resource_id,
            name: subnet.name.clone().unwrap_or_else(|| name.to_string()),
            existing_delegations: subnet.delegation_services().into_iter().collect(),
        }
    }
}

/// Location names compare without case or spaces (`East US` == `eastus`)
fn same_location(a: &str, b: &str) -> bool {
    let normalize = |s: &str| {
        s.chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect::<String>()
    };
    normalize(a) == normalize(b)
}

fn space_exhausted(err: ArmError, subnet: &str, vnet: &str) -> CoreError {
    if err.is_invalid_subnet() {
        CoreError::SubnetSpaceExhausted {
            subnet: subnet.to_string(),
            vnet: vnet.to_string(),
        }
    } else {
        CoreError::Arm(err)
    }
}
