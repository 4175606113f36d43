//! Argument bundles for server operations and defaulting of omitted values

use std::collections::BTreeMap;
use tracing::warn;

use crate::arm::CloudResourceClient;
use crate::config::{LOCATION_KEY, RESOURCE_GROUP_KEY, SERVER_NAME_KEY, SettingsStore};
use crate::engine::DatabaseEngine;
use crate::error::{CoreError, Result};
use crate::generators::{CredentialGenerator, NameGenerator};
use crate::network::VnetSpec;

/// Region used when neither the arguments nor the local context name one
pub const DEFAULT_LOCATION: &str = "eastus";

/// Backup retention applied when none is given
pub const DEFAULT_BACKUP_RETENTION_DAYS: u32 = 7;

/// Everything `create` accepts; `None` means "fill in or default"
#[derive(Debug, Clone, Default)]
pub struct CreateServerArgs {
    pub resource_group: Option<String>,
    pub name: Option<String>,
    pub location: Option<String>,
    pub sku_name: Option<String>,
    pub tier: Option<String>,
    pub version: Option<String>,
    pub admin_user: Option<String>,
    pub admin_password: Option<String>,
    pub storage_mb: Option<u64>,
    pub backup_retention_days: Option<u32>,
    pub public_network_access: Option<String>,
    pub assign_identity: bool,
    pub tags: BTreeMap<String, String>,
    pub network: VnetSpec,
    /// Create `<name>VNET`/`<name>Subnet` when no network arguments were given
    pub vnet_auto: bool,
}

/// Fields that `update` may change; unset fields are left as they are
#[derive(Debug, Clone, Default)]
pub struct UpdateServerArgs {
    pub sku_name: Option<String>,
    pub tier: Option<String>,
    pub storage_mb: Option<u64>,
    pub backup_retention_days: Option<u32>,
    pub admin_password: Option<String>,
    pub tags: Option<BTreeMap<String, String>>,
}

/// The values `create` ends up using
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilledParameters {
    pub location: String,
    pub resource_group: String,
    pub server_name: String,
    pub admin_user: String,
    pub admin_password: String,
}

/// Fill location, resource group, server name, admin user and password.
///
/// The resource group is created in `location` when it does not exist yet.
pub async fn fill_missing_parameters<C: CloudResourceClient + ?Sized>(
    engine: DatabaseEngine,
    args: &CreateServerArgs,
    client: &C,
    names: &dyn NameGenerator,
    credentials: &dyn CredentialGenerator,
    settings: &dyn SettingsStore,
) -> Result<FilledParameters> {
    let section = engine.command_group();

    let location = args
        .location
        .clone()
        .or_else(|| settings.get(section, LOCATION_KEY))
        .unwrap_or_else(|| DEFAULT_LOCATION.to_string());

    let resource_group = args
        .resource_group
        .clone()
        .or_else(|| settings.get(section, RESOURCE_GROUP_KEY))
        .unwrap_or_else(|| names.resource_group_name());

    if client.get_resource_group(&resource_group).await?.is_none() {
        warn!(
            "Creating Resource Group '{}' in location '{}'...",
            resource_group, location
        );
        client.create_resource_group(&resource_group, &location).await?;
    }

    let server_name = args
        .name
        .clone()
        .unwrap_or_else(|| names.server_name())
        .to_lowercase();

    let admin_user = args
        .admin_user
        .clone()
        .unwrap_or_else(|| names.admin_user());

    let admin_password = args
        .admin_password
        .clone()
        .unwrap_or_else(|| credentials.password());

    Ok(FilledParameters {
        location,
        resource_group,
        server_name,
        admin_user,
        admin_password,
    })
}

/// Resource group and server name for lifecycle commands, from arguments or local context
pub fn resolve_target(
    engine: DatabaseEngine,
    resource_group: Option<&str>,
    name: Option<&str>,
    settings: &dyn SettingsStore,
) -> Result<(String, String)> {
    let section = engine.command_group();

    let resource_group = resource_group
        .map(str::to_string)
        .or_else(|| settings.get(section, RESOURCE_GROUP_KEY))
        .ok_or_else(|| {
            CoreError::Validation(
                "--resource-group is required (no resource group in local context)".to_string(),
            )
        })?;

    let name = name
        .map(str::to_string)
        .or_else(|| settings.get(section, SERVER_NAME_KEY))
        .ok_or_else(|| {
            CoreError::Validation("--name is required (no server name in local context)".to_string())
        })?;

    Ok((resource_group, name))
}
