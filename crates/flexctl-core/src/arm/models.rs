//! ARM resource shapes used by the resolver and provisioner
//!
//! Only the fields this tool reads or writes are modelled. Everything is optional
//! on the wire so partial PUT/PATCH bodies serialize cleanly.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A resource group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
}

/// A virtual network
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VirtualNetwork {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub properties: VirtualNetworkProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetworkProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_space: Option<AddressSpace>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSpace {
    #[serde(default)]
    pub address_prefixes: Vec<String>,
}

impl VirtualNetwork {
    /// A new vnet with a single address prefix
    pub fn new(name: &str, location: &str, address_prefix: &str) -> Self {
        Self {
            id: None,
            name: Some(name.to_string()),
            location: Some(location.to_string()),
            properties: VirtualNetworkProperties {
                address_space: Some(AddressSpace {
                    address_prefixes: vec![address_prefix.to_string()],
                }),
                provisioning_state: None,
            },
        }
    }

    pub fn address_prefixes(&self) -> &[String] {
        self.properties
            .address_space
            .as_ref()
            .map(|a| a.address_prefixes.as_slice())
            .unwrap_or_default()
    }
}

/// A subnet inside a virtual network
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subnet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub properties: SubnetProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_prefix: Option<String>,
    #[serde(default)]
    pub delegations: Vec<Delegation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

impl Subnet {
    /// A new subnet delegated to `service_name`
    pub fn delegated(name: &str, address_prefix: &str, service_name: &str) -> Self {
        Self {
            id: None,
            name: Some(name.to_string()),
            properties: SubnetProperties {
                address_prefix: Some(address_prefix.to_string()),
                delegations: vec![Delegation::new(service_name)],
                provisioning_state: None,
            },
        }
    }

    /// Service names of every delegation on this subnet
    pub fn delegation_services(&self) -> Vec<String> {
        self.properties
            .delegations
            .iter()
            .filter_map(|d| d.properties.service_name.clone())
            .collect()
    }
}

/// A subnet delegation to an Azure service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Delegation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub properties: DelegationProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegationProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
}

impl Delegation {
    pub fn new(service_name: &str) -> Self {
        Self {
            name: Some(service_name.to_string()),
            properties: DelegationProperties {
                service_name: Some(service_name.to_string()),
            },
        }
    }
}

/// A flexible server as returned by the database provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Server {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<Sku>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
    #[serde(default)]
    pub properties: ServerProperties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub administrator_login: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub administrator_login_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fully_qualified_domain_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_profile: Option<StorageProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_network_access: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegated_subnet_arguments: Option<DelegatedSubnetArguments>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_mode: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sku {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[serde(rename = "type")]
    pub identity_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_id: Option<String>,
}

impl Identity {
    pub fn system_assigned() -> Self {
        Self {
            identity_type: "SystemAssigned".to_string(),
            principal_id: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageProfile {
    #[serde(rename = "storageMB", default, skip_serializing_if = "Option::is_none")]
    pub storage_mb: Option<u64>,
    #[serde(
        rename = "backupRetentionDays",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub backup_retention_days: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegatedSubnetArguments {
    pub subnet_arm_resource_id: String,
}

/// PATCH body for server updates; unset fields are left untouched by the provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<Sku>,
    #[serde(default)]
    pub properties: ServerUpdateProperties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerUpdateProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub administrator_login_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_profile: Option<StorageProfile>,
}

impl ServerUpdate {
    /// True when no field would be sent
    pub fn is_empty(&self) -> bool {
        self.sku.is_none()
            && self.tags.is_none()
            && self.properties.administrator_login_password.is_none()
            && self.properties.storage_profile.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_subnet_deserializes_delegations() {
        let subnet: Subnet = serde_json::from_value(json!({
            "id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/v/subnets/sn",
            "name": "sn",
            "properties": {
                "addressPrefix": "10.0.0.0/24",
                "delegations": [
                    {"name": "d", "properties": {"serviceName": "Microsoft.DBforMySQL/flexibleServers"}}
                ],
                "provisioningState": "Succeeded"
            }
        }))
        .unwrap();

        assert_eq!(
            subnet.delegation_services(),
            vec!["Microsoft.DBforMySQL/flexibleServers".to_string()]
        );
        assert_eq!(subnet.properties.address_prefix.as_deref(), Some("10.0.0.0/24"));
    }

    #[test]
    fn test_delegated_subnet_body() {
        let subnet = Subnet::delegated("sn", "10.0.0.0/24", "Microsoft.DBforPostgreSQL/flexibleServers");
        let value = serde_json::to_value(&subnet).unwrap();
        assert_eq!(value["properties"]["addressPrefix"], "10.0.0.0/24");
        assert_eq!(
            value["properties"]["delegations"][0]["properties"]["serviceName"],
            "Microsoft.DBforPostgreSQL/flexibleServers"
        );
        assert!(value.get("id").is_none());
    }

    #[test]
    fn test_server_storage_profile_field_names() {
        let server = Server {
            properties: ServerProperties {
                storage_profile: Some(StorageProfile {
                    storage_mb: Some(10240),
                    backup_retention_days: Some(7),
                }),
                ..Default::default()
            },
            ..Default::default()
        };
        let value = serde_json::to_value(&server).unwrap();
        assert_eq!(value["properties"]["storageProfile"]["storageMB"], 10240);
        assert_eq!(value["properties"]["storageProfile"]["backupRetentionDays"], 7);
    }

    #[test]
    fn test_vnet_address_prefixes() {
        let vnet = VirtualNetwork::new("v", "eastus", "10.0.0.0/16");
        assert_eq!(vnet.address_prefixes(), &["10.0.0.0/16".to_string()]);
        assert!(VirtualNetwork::default().address_prefixes().is_empty());
    }

    #[test]
    fn test_empty_update() {
        assert!(ServerUpdate::default().is_empty());
        let update = ServerUpdate {
            tags: Some(BTreeMap::new()),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
