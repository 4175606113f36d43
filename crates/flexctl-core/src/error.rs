//! Unified error handling for flexctl-core
//!
//! Resolver and provisioner failures each get their own variant so the CLI can
//! attach remediation hints. Control-plane faults pass through untouched.
//!
//! # Example
//!
//! ```rust
//! use flexctl_core::{ArmError, CoreError};
//!
//! let arm_err = ArmError::Api {
//!     status: 404,
//!     code: "ResourceNotFound".to_string(),
//!     message: "Server not found".to_string(),
//! };
//! let core_err: CoreError = arm_err.into();
//! assert!(core_err.is_not_found());
//! ```

use thiserror::Error;

use crate::arm::ArmError;
use crate::config::ConfigError;

/// Core error type for resolution, provisioning and polling
#[derive(Error, Debug)]
pub enum CoreError {
    /// Any other control-plane fault, surfaced with the provider's own message
    #[error(transparent)]
    Arm(#[from] ArmError),

    /// A subnet was supplied without a vnet and is not a full resource id
    #[error("Incorrectly formed Subnet id: '{0}'. A subnet supplied without --vnet must be a full resource id.")]
    MalformedSubnetReference(String),

    /// The vnet argument is neither a resource id nor a bare name
    #[error("Incorrectly formed Vnet id or Vnet name: '{0}'")]
    MalformedVnetReference(String),

    /// Supplied network resource lives in another subscription
    #[error(
        "Incorrect Usage: The subscription of the server, Vnet and Subnet should be the same (expected '{expected}', found '{actual}')."
    )]
    CrossSubscriptionMismatch { expected: String, actual: String },

    /// Supplied network resource lives in another resource group, location or subscription
    #[error(
        "Incorrect Usage: The resource group, location and subscription of the server, Vnet and Subnet should be the same. {detail}"
    )]
    CrossResourceMismatch { detail: String },

    /// The subnet is already delegated to a different service
    #[error("Can not use subnet '{subnet}' with existing delegations other than {required} (found {existing})")]
    ConflictingDelegation {
        subnet: String,
        existing: String,
        required: String,
    },

    /// Address prefixes were supplied together with resource ids
    #[error(
        "If you pass an address prefix, please consider passing a name (instead of Id) for a subnet or vnet."
    )]
    PrefixRequiresNames,

    /// Both vnet and subnet were supplied but at least one is a resource id
    #[error("If you pass both --vnet and --subnet, consider passing names instead of ids.")]
    NamesRequired,

    /// The requested subnet prefix does not fit in the vnet
    #[error(
        "Cannot add the subnet {subnet} to the vnet {vnet}. The subnet address space exceeds the available vnet address space."
    )]
    SubnetSpaceExhausted { subnet: String, vnet: String },

    /// A string that should have been a resource id could not be parsed
    #[error("Invalid resource id '{id}': {reason}")]
    InvalidResourceId { id: String, reason: String },

    /// Argument validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Lifecycle command on a server that does not exist
    #[error("The server '{name}' does not exist in resource group '{resource_group}'.")]
    ServerNotFound { name: String, resource_group: String },

    /// Configuration or local context error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Returns true if this is a control-plane "not found" fault
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            CoreError::Arm(e) => e.is_not_found(),
            CoreError::ServerNotFound { .. } => true,
            _ => false,
        }
    }

    /// Returns true if this is an authentication/authorization error
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        match self {
            CoreError::Arm(e) => e.is_unauthorized(),
            _ => false,
        }
    }

    /// Returns true if this error comes from the user's vnet/subnet arguments
    #[must_use]
    pub fn is_network_usage(&self) -> bool {
        matches!(
            self,
            CoreError::MalformedSubnetReference(_)
                | CoreError::MalformedVnetReference(_)
                | CoreError::CrossSubscriptionMismatch { .. }
                | CoreError::CrossResourceMismatch { .. }
                | CoreError::ConflictingDelegation { .. }
                | CoreError::PrefixRequiresNames
                | CoreError::NamesRequired
                | CoreError::SubnetSpaceExhausted { .. }
        )
    }

    /// Returns true if this is a timeout error
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            CoreError::Arm(e) => e.is_timeout(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_core_error_from_arm() {
        let arm_err = ArmError::Api {
            status: 404,
            code: "ResourceNotFound".to_string(),
            message: "Server not found".to_string(),
        };
        let core_err: CoreError = arm_err.into();

        assert!(core_err.is_not_found());
        assert!(!core_err.is_unauthorized());
        assert!(!core_err.is_network_usage());
    }

    #[test]
    fn test_arm_error_display_is_unchanged() {
        let arm_err = ArmError::Api {
            status: 409,
            code: "ServerBusy".to_string(),
            message: "Operation in progress".to_string(),
        };
        let expected = arm_err.to_string();
        let core_err: CoreError = arm_err.into();
        assert_eq!(core_err.to_string(), expected);
    }

    #[test]
    fn test_network_usage_errors() {
        assert!(CoreError::PrefixRequiresNames.is_network_usage());
        assert!(CoreError::NamesRequired.is_network_usage());
        assert!(
            CoreError::SubnetSpaceExhausted {
                subnet: "s".to_string(),
                vnet: "v".to_string()
            }
            .is_network_usage()
        );
        assert!(!CoreError::Validation("x".to_string()).is_network_usage());
    }

    #[test]
    fn test_space_exhausted_message_has_hint() {
        let err = CoreError::SubnetSpaceExhausted {
            subnet: "mysubnet".to_string(),
            vnet: "myvnet".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("mysubnet"));
        assert!(msg.contains("exceeds the available vnet address space"));
    }

    #[test]
    fn test_operation_timeout() {
        let err: CoreError = ArmError::OperationTimeout {
            operation: "MySQL Server Create".to_string(),
            timeout: Duration::from_secs(3600),
        }
        .into();
        assert!(err.is_timeout());
        assert!(err.to_string().contains("timed out"));
    }
}
