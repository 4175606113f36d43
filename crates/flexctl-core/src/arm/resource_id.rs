//! ARM resource id parsing
//!
//! Resource ids look like
//! `/subscriptions/{sub}/resourceGroups/{rg}/providers/{namespace}/{type}/{name}[/{childType}/{childName}]*`.

use std::fmt;

use crate::error::{CoreError, Result};

/// Provider namespace for virtual networks
pub const NETWORK_NAMESPACE: &str = "Microsoft.Network";

/// A parsed ARM resource id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceId {
    pub subscription: String,
    pub resource_group: String,
    pub namespace: String,
    pub resource_type: String,
    /// Name of the top-level resource (the vnet for a subnet id)
    pub name: String,
    /// Child `(type, name)` segments, outermost first
    pub children: Vec<(String, String)>,
}

impl ResourceId {
    /// Parse a resource id, matching segment keywords case-insensitively
    pub fn parse(id: &str) -> Result<Self> {
        let invalid = |reason: &str| CoreError::InvalidResourceId {
            id: id.to_string(),
            reason: reason.to_string(),
        };

        if !id.starts_with('/') {
            return Err(invalid("must start with '/'"));
        }

        let segments: Vec<&str> = id.trim_matches('/').split('/').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(invalid("contains an empty segment"));
        }
        if segments.len() < 8 {
            return Err(invalid("too few segments"));
        }

        let expect_keyword = |index: usize, keyword: &str| {
            if segments[index].eq_ignore_ascii_case(keyword) {
                Ok(())
            } else {
                Err(invalid(&format!("expected '{}' segment", keyword)))
            }
        };
        expect_keyword(0, "subscriptions")?;
        expect_keyword(2, "resourceGroups")?;
        expect_keyword(4, "providers")?;

        let rest = &segments[8..];
        if rest.len() % 2 != 0 {
            return Err(invalid("child resource type without a name"));
        }

        Ok(Self {
            subscription: segments[1].to_string(),
            resource_group: segments[3].to_string(),
            namespace: segments[5].to_string(),
            resource_type: segments[6].to_string(),
            name: segments[7].to_string(),
            children: rest
                .chunks(2)
                .map(|pair| (pair[0].to_string(), pair[1].to_string()))
                .collect(),
        })
    }

    /// Returns true if the string parses as a resource id
    pub fn is_valid(id: &str) -> bool {
        Self::parse(id).is_ok()
    }

    /// Name of the innermost resource in the chain
    pub fn resource_name(&self) -> &str {
        self.children
            .last()
            .map(|(_, name)| name.as_str())
            .unwrap_or(&self.name)
    }

    /// Build a virtual network id
    pub fn virtual_network(subscription: &str, resource_group: &str, vnet: &str) -> Self {
        Self {
            subscription: subscription.to_string(),
            resource_group: resource_group.to_string(),
            namespace: NETWORK_NAMESPACE.to_string(),
            resource_type: "virtualNetworks".to_string(),
            name: vnet.to_string(),
            children: Vec::new(),
        }
    }

    /// Build a subnet id
    pub fn subnet(subscription: &str, resource_group: &str, vnet: &str, subnet: &str) -> Self {
        let mut id = Self::virtual_network(subscription, resource_group, vnet);
        id.children
            .push(("subnets".to_string(), subnet.to_string()));
        id
    }

    /// Returns true if this id names a subnet under a virtual network
    pub fn is_subnet(&self) -> bool {
        self.namespace.eq_ignore_ascii_case(NETWORK_NAMESPACE)
            && self.resource_type.eq_ignore_ascii_case("virtualNetworks")
            && matches!(self.children.as_slice(), [(t, _)] if t.eq_ignore_ascii_case("subnets"))
    }

    /// Returns true if this id names a virtual network
    pub fn is_virtual_network(&self) -> bool {
        self.namespace.eq_ignore_ascii_case(NETWORK_NAMESPACE)
            && self.resource_type.eq_ignore_ascii_case("virtualNetworks")
            && self.children.is_empty()
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}/providers/{}/{}/{}",
            self.subscription, self.resource_group, self.namespace, self.resource_type, self.name
        )?;
        for (child_type, child_name) in &self.children {
            write!(f, "/{}/{}", child_type, child_name)?;
        }
        Ok(())
    }
}

/// Returns true if the value is a plain resource name rather than an id or path
pub fn is_bare_name(value: &str) -> bool {
    !value.is_empty() && !value.contains('/') && !value.contains('\\')
}
