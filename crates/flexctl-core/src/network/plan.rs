//! Classification of user-supplied vnet/subnet arguments

use crate::arm::{ResourceId, is_bare_name};
use crate::error::{CoreError, Result};

use super::{DEFAULT_SUBNET_PREFIX, DEFAULT_VNET_ADDRESS_PREFIX};

/// Network arguments as the user supplied them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VnetSpec {
    /// Vnet resource id or bare name
    pub vnet: Option<String>,
    /// Subnet resource id or bare name
    pub subnet: Option<String>,
    pub vnet_address_prefix: Option<String>,
    pub subnet_address_prefix: Option<String>,
}

impl VnetSpec {
    /// True when neither a vnet nor a subnet was supplied
    pub fn is_empty(&self) -> bool {
        self.vnet.is_none() && self.subnet.is_none()
    }

    fn has_prefix(&self) -> bool {
        self.vnet_address_prefix.is_some() || self.subnet_address_prefix.is_some()
    }

    fn vnet_prefix_or_default(&self) -> String {
        self.vnet_address_prefix
            .clone()
            .unwrap_or_else(|| DEFAULT_VNET_ADDRESS_PREFIX.to_string())
    }

    fn subnet_prefix_or_default(&self) -> String {
        self.subnet_address_prefix
            .clone()
            .unwrap_or_else(|| DEFAULT_SUBNET_PREFIX.to_string())
    }
}

/// The single resolution strategy chosen for a [`VnetSpec`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VnetPlan {
    /// Subnet given alone as a full resource id
    SubnetId(ResourceId),
    /// Subnet given alone as something other than a resource id
    SubnetBareInvalid(String),
    /// Vnet given alone as a resource id
    VnetId(ResourceId),
    /// Vnet given alone as a bare name
    VnetBareName {
        vnet: String,
        vnet_prefix: String,
        subnet_prefix: String,
    },
    /// Both given as bare names with at least one explicit prefix
    BothBareWithPrefix {
        vnet: String,
        subnet: String,
        vnet_prefix: String,
        subnet_prefix: String,
    },
    /// Both given as bare names, default prefixes
    BothBareNoPrefix { vnet: String, subnet: String },
    /// No network arguments
    Neither,
}

impl VnetPlan {
    /// Pick the branch for `spec`, rejecting argument combinations that can never resolve
    pub fn classify(spec: &VnetSpec) -> Result<Self> {
        match (spec.vnet.as_deref(), spec.subnet.as_deref()) {
            (None, None) => Ok(VnetPlan::Neither),

            (None, Some(subnet)) => {
                if !ResourceId::is_valid(subnet) {
                    return Ok(VnetPlan::SubnetBareInvalid(subnet.to_string()));
                }
                let id = ResourceId::parse(subnet)?;
                if !id.is_subnet() {
                    return Err(CoreError::MalformedSubnetReference(subnet.to_string()));
                }
                if spec.has_prefix() {
                    return Err(CoreError::PrefixRequiresNames);
                }
                Ok(VnetPlan::SubnetId(id))
            }

            (Some(vnet), None) => {
                if ResourceId::is_valid(vnet) {
                    let id = ResourceId::parse(vnet)?;
                    if !id.is_virtual_network() {
                        return Err(CoreError::MalformedVnetReference(vnet.to_string()));
                    }
                    if spec.has_prefix() {
                        return Err(CoreError::PrefixRequiresNames);
                    }
                    Ok(VnetPlan::VnetId(id))
                } else if is_bare_name(vnet) {
                    Ok(VnetPlan::VnetBareName {
                        vnet: vnet.to_string(),
                        vnet_prefix: spec.vnet_prefix_or_default(),
                        subnet_prefix: spec.subnet_prefix_or_default(),
                    })
                } else {
                    Err(CoreError::MalformedVnetReference(vnet.to_string()))
                }
            }

            (Some(vnet), Some(subnet)) => {
                let both_bare = is_bare_name(vnet) && is_bare_name(subnet);
                match (both_bare, spec.has_prefix()) {
                    (true, true) => Ok(VnetPlan::BothBareWithPrefix {
                        vnet: vnet.to_string(),
                        subnet: subnet.to_string(),
                        vnet_prefix: spec.vnet_prefix_or_default(),
                        subnet_prefix: spec.subnet_prefix_or_default(),
                    }),
                    (true, false) => Ok(VnetPlan::BothBareNoPrefix {
                        vnet: vnet.to_string(),
                        subnet: subnet.to_string(),
                    }),
                    (false, true) => Err(CoreError::PrefixRequiresNames),
                    (false, false) => Err(CoreError::NamesRequired),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUBNET_ID: &str = "/subscriptions/sub-1/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet1/subnets/sn1";
    const VNET_ID: &str =
        "/subscriptions/sub-1/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet1";

    fn spec(vnet: Option<&str>, subnet: Option<&str>) -> VnetSpec {
        VnetSpec {
            vnet: vnet.map(str::to_string),
            subnet: subnet.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_neither() {
        assert_eq!(VnetPlan::classify(&VnetSpec::default()).unwrap(), VnetPlan::Neither);
    }

    #[test]
    fn test_subnet_id() {
        let plan = VnetPlan::classify(&spec(None, Some(SUBNET_ID))).unwrap();
        match plan {
            VnetPlan::SubnetId(id) => {
                assert_eq!(id.name, "vnet1");
                assert_eq!(id.resource_name(), "sn1");
            }
            other => panic!("unexpected plan {:?}", other),
        }
    }

    #[test]
    fn test_bare_subnet_alone() {
        let plan = VnetPlan::classify(&spec(None, Some("sn1"))).unwrap();
        assert_eq!(plan, VnetPlan::SubnetBareInvalid("sn1".to_string()));
    }

    #[test]
    fn test_vnet_id_used_as_subnet() {
        let err = VnetPlan::classify(&spec(None, Some(VNET_ID))).unwrap_err();
        assert!(matches!(err, CoreError::MalformedSubnetReference(_)));
    }

    #[test]
    fn test_vnet_id() {
        let plan = VnetPlan::classify(&spec(Some(VNET_ID), None)).unwrap();
        assert!(matches!(plan, VnetPlan::VnetId(id) if id.name == "vnet1"));
    }

    #[test]
    fn test_vnet_bare_name_uses_defaults() {
        let plan = VnetPlan::classify(&spec(Some("myvnet"), None)).unwrap();
        assert_eq!(
            plan,
            VnetPlan::VnetBareName {
                vnet: "myvnet".to_string(),
                vnet_prefix: "10.0.0.0/16".to_string(),
                subnet_prefix: "10.0.0.0/24".to_string(),
            }
        );
    }

    #[test]
    fn test_malformed_vnet() {
        let err = VnetPlan::classify(&spec(Some("rg\\myvnet"), None)).unwrap_err();
        assert!(matches!(err, CoreError::MalformedVnetReference(_)));
    }

    #[test]
    fn test_both_bare_with_partial_prefix() {
        let mut s = spec(Some("v"), Some("s"));
        s.subnet_address_prefix = Some("172.0.1.0/24".to_string());
        assert_eq!(
            VnetPlan::classify(&s).unwrap(),
            VnetPlan::BothBareWithPrefix {
                vnet: "v".to_string(),
                subnet: "s".to_string(),
                vnet_prefix: "10.0.0.0/16".to_string(),
                subnet_prefix: "172.0.1.0/24".to_string(),
            }
        );
    }

    #[test]
    fn test_both_bare_no_prefix() {
        let plan = VnetPlan::classify(&spec(Some("v"), Some("s"))).unwrap();
        assert!(matches!(plan, VnetPlan::BothBareNoPrefix { .. }));
    }

    #[test]
    fn test_prefix_with_ids_rejected() {
        let mut s = spec(Some(VNET_ID), Some("s"));
        s.vnet_address_prefix = Some("10.1.0.0/16".to_string());
        assert!(matches!(
            VnetPlan::classify(&s).unwrap_err(),
            CoreError::PrefixRequiresNames
        ));

        let mut s = spec(None, Some(SUBNET_ID));
        s.subnet_address_prefix = Some("10.1.0.0/24".to_string());
        assert!(matches!(
            VnetPlan::classify(&s).unwrap_err(),
            CoreError::PrefixRequiresNames
        ));
    }

    #[test]
    fn test_both_given_with_id_requires_names() {
        let err = VnetPlan::classify(&spec(Some(VNET_ID), Some("s"))).unwrap_err();
        assert!(matches!(err, CoreError::NamesRequired));
    }
}
