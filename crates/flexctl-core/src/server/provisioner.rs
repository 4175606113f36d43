//! Flexible server lifecycle: create (idempotent by name), show, update, delete, power state

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::arm::CloudResourceClient;
use crate::arm::models::{
    DelegatedSubnetArguments, Identity, Server, ServerProperties, ServerUpdate,
    ServerUpdateProperties, Sku, StorageProfile,
};
use crate::config::{LOCATION_KEY, RESOURCE_GROUP_KEY, SERVER_NAME_KEY, SettingsStore};
use crate::engine::{DatabaseEngine, infer_tier};
use crate::error::{CoreError, Result};
use crate::generators::{CredentialGenerator, NameGenerator};
use crate::network::{DelegationRequirement, ResolvedSubnet, ServerPlacement, SubnetResolver};

use super::params::{
    CreateServerArgs, DEFAULT_BACKUP_RETENTION_DAYS, DEFAULT_LOCATION, FilledParameters,
    UpdateServerArgs, fill_missing_parameters, resolve_target,
};
use super::response::ServerResponse;

/// Orchestrates server operations for one engine.
///
/// Randomness and remembered settings are injected so every decision is testable.
pub struct Provisioner<'a, C: CloudResourceClient + ?Sized> {
    client: &'a C,
    engine: DatabaseEngine,
    names: &'a dyn NameGenerator,
    credentials: &'a dyn CredentialGenerator,
    settings: &'a dyn SettingsStore,
}

impl<'a, C: CloudResourceClient + ?Sized> Provisioner<'a, C> {
    pub fn new(
        client: &'a C,
        engine: DatabaseEngine,
        names: &'a dyn NameGenerator,
        credentials: &'a dyn CredentialGenerator,
        settings: &'a dyn SettingsStore,
    ) -> Self {
        Self {
            client,
            engine,
            names,
            credentials,
            settings,
        }
    }

    pub fn engine(&self) -> DatabaseEngine {
        self.engine
    }

    /// Create a server, or return the existing one with the same name.
    pub async fn create_server(&self, args: &CreateServerArgs) -> Result<ServerResponse> {
        let params = fill_missing_parameters(
            self.engine,
            args,
            self.client,
            self.names,
            self.credentials,
            self.settings,
        )
        .await?;
        let engine_name = self.engine.display_name();

        if let Some(existing) = self
            .client
            .get_server(self.engine, &params.resource_group, &params.server_name)
            .await?
        {
            warn!(
                "Found existing {} Server '{}' in group '{}'",
                engine_name, params.server_name, params.resource_group
            );
            return Ok(ServerResponse::from_server(
                &existing,
                &params.resource_group,
                args.admin_password.as_deref(),
            ));
        }

        let subnet = self.resolve_network(args, &params).await?;

        let sku_name = args
            .sku_name
            .clone()
            .unwrap_or_else(|| self.engine.default_sku().to_string());

        warn!(
            "Creating {} Server '{}' in group '{}'...",
            engine_name, params.server_name, params.resource_group
        );
        warn!(
            "Your server '{}' is using sku '{}' (Paid Tier). Please refer to {} for pricing details",
            params.server_name,
            sku_name,
            self.engine.pricing_url()
        );

        let payload = self.build_server(args, &params, sku_name, subnet.as_ref());
        let created = self
            .client
            .create_server(
                self.engine,
                &params.resource_group,
                &params.server_name,
                &payload,
            )
            .await?;

        self.remember(&params)?;

        warn!(
            "Make a note of your password. If you forget, you would have to reset your password with CLI command for reset password"
        );

        Ok(ServerResponse::from_server(
            &created,
            &params.resource_group,
            Some(&params.admin_password),
        ))
    }

    async fn resolve_network(
        &self,
        args: &CreateServerArgs,
        params: &FilledParameters,
    ) -> Result<Option<ResolvedSubnet>> {
        let resolver = SubnetResolver::new(self.client);
        let placement = ServerPlacement {
            server_name: &params.server_name,
            resource_group: &params.resource_group,
            location: &params.location,
        };
        let delegation = DelegationRequirement::for_engine(self.engine);

        if args.network.is_empty() {
            if args.vnet_auto {
                return resolver.create_vnet(placement, &delegation).await.map(Some);
            }
            return Ok(None);
        }

        resolver.resolve(&args.network, placement, &delegation).await
    }

    fn build_server(
        &self,
        args: &CreateServerArgs,
        params: &FilledParameters,
        sku_name: String,
        subnet: Option<&ResolvedSubnet>,
    ) -> Server {
        let tier = args
            .tier
            .clone()
            .unwrap_or_else(|| infer_tier(&sku_name).to_string());

        Server {
            location: Some(params.location.clone()),
            sku: Some(Sku {
                name: sku_name,
                tier: Some(tier),
            }),
            identity: args.assign_identity.then(Identity::system_assigned),
            tags: (!args.tags.is_empty()).then(|| args.tags.clone()),
            properties: ServerProperties {
                administrator_login: Some(params.admin_user.clone()),
                administrator_login_password: Some(params.admin_password.clone()),
                version: Some(
                    args.version
                        .clone()
                        .unwrap_or_else(|| self.engine.default_version().to_string()),
                ),
                storage_profile: Some(StorageProfile {
                    storage_mb: Some(args.storage_mb.unwrap_or(self.engine.default_storage_mb())),
                    backup_retention_days: Some(
                        args.backup_retention_days
                            .unwrap_or(DEFAULT_BACKUP_RETENTION_DAYS),
                    ),
                }),
                public_network_access: args.public_network_access.clone(),
                delegated_subnet_arguments: subnet.map(|s| DelegatedSubnetArguments {
                    subnet_arm_resource_id: s.resource_id.clone(),
                }),
                create_mode: Some("Default".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn remember(&self, params: &FilledParameters) -> Result<()> {
        if !self.settings.is_enabled() {
            return Ok(());
        }
        let section = self.engine.command_group();
        self.settings
            .set(section, RESOURCE_GROUP_KEY, &params.resource_group)?;
        self.settings.set(section, LOCATION_KEY, &params.location)?;
        self.settings
            .set(section, SERVER_NAME_KEY, &params.server_name)?;
        Ok(())
    }

    fn target(&self, resource_group: Option<&str>, name: Option<&str>) -> Result<(String, String)> {
        resolve_target(self.engine, resource_group, name, self.settings)
    }

    pub async fn show_server(&self, resource_group: Option<&str>, name: Option<&str>) -> Result<Server> {
        let (resource_group, name) = self.target(resource_group, name)?;
        self.client
            .get_server(self.engine, &resource_group, &name)
            .await?
            .ok_or(CoreError::ServerNotFound {
                name,
                resource_group,
            })
    }

    /// Apply the supplied changes; everything else stays as it is
    pub async fn update_server(
        &self,
        resource_group: Option<&str>,
        name: Option<&str>,
        args: &UpdateServerArgs,
    ) -> Result<Server> {
        let (resource_group, name) = self.target(resource_group, name)?;

        let storage_profile = (args.storage_mb.is_some() || args.backup_retention_days.is_some())
            .then(|| StorageProfile {
                storage_mb: args.storage_mb,
                backup_retention_days: args.backup_retention_days,
            });

        let sku = match (&args.sku_name, &args.tier) {
            (Some(sku), tier) => Some(Sku {
                name: sku.clone(),
                tier: Some(tier.clone().unwrap_or_else(|| infer_tier(sku).to_string())),
            }),
            (None, Some(tier)) => {
                // A tier change needs the sku the server already has
                let current = self.show_server(Some(&resource_group), Some(&name)).await?;
                let sku_name = current.sku.map(|s| s.name).ok_or_else(|| {
                    CoreError::Validation("--tier requires --sku-name for this server".to_string())
                })?;
                Some(Sku {
                    name: sku_name,
                    tier: Some(tier.clone()),
                })
            }
            (None, None) => None,
        };

        let update = ServerUpdate {
            sku,
            properties: ServerUpdateProperties {
                administrator_login_password: args.admin_password.clone(),
                storage_profile,
            },
            tags: args.tags.clone(),
        };

        if update.is_empty() {
            return Err(CoreError::Validation(
                "Nothing to update. Pass at least one property to change.".to_string(),
            ));
        }

        info!("Updating {} Server '{}'", self.engine.display_name(), name);
        Ok(self
            .client
            .update_server(self.engine, &resource_group, &name, &update)
            .await?)
    }

    pub async fn delete_server(&self, resource_group: Option<&str>, name: Option<&str>) -> Result<()> {
        let (resource_group, name) = self.target(resource_group, name)?;
        warn!(
            "Deleting {} Server '{}' in group '{}'...",
            self.engine.display_name(),
            name,
            resource_group
        );
        Ok(self
            .client
            .delete_server(self.engine, &resource_group, &name)
            .await?)
    }

    pub async fn start_server(&self, resource_group: Option<&str>, name: Option<&str>) -> Result<()> {
        let (resource_group, name) = self.target(resource_group, name)?;
        Ok(self
            .client
            .start_server(self.engine, &resource_group, &name)
            .await?)
    }

    pub async fn stop_server(&self, resource_group: Option<&str>, name: Option<&str>) -> Result<()> {
        let (resource_group, name) = self.target(resource_group, name)?;
        Ok(self
            .client
            .stop_server(self.engine, &resource_group, &name)
            .await?)
    }

    pub async fn restart_server(&self, resource_group: Option<&str>, name: Option<&str>) -> Result<()> {
        let (resource_group, name) = self.target(resource_group, name)?;
        Ok(self
            .client
            .restart_server(self.engine, &resource_group, &name)
            .await?)
    }

    /// Servers in a resource group, or across the subscription
    pub async fn list_servers(&self, resource_group: Option<&str>) -> Result<Vec<Server>> {
        debug!(
            "Listing {} servers in {}",
            self.engine.display_name(),
            resource_group.unwrap_or("subscription")
        );
        Ok(self.client.list_servers(self.engine, resource_group).await?)
    }

    /// Capabilities for a location (argument, local context, then the default region)
    pub async fn list_skus(&self, location: Option<&str>) -> Result<Value> {
        let location = location
            .map(str::to_string)
            .or_else(|| self.settings.get(self.engine.command_group(), LOCATION_KEY))
            .unwrap_or_else(|| DEFAULT_LOCATION.to_string());
        Ok(self.client.list_skus(self.engine, &location).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::ResourceId;
    use crate::config::MemorySettingsStore;
    use crate::generators::RandomGenerator;
    use crate::network::VnetSpec;
    use crate::server::response::MASKED_PASSWORD;
    use crate::testing::FakeCloudClient;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::BTreeMap;

    const SUB: &str = "sub-1";

    struct Fixture {
        client: FakeCloudClient,
        generator: RandomGenerator<StdRng>,
        settings: MemorySettingsStore,
    }

    impl Fixture {
        fn new(client: FakeCloudClient) -> Self {
            Self {
                client,
                generator: RandomGenerator::from_rng(StdRng::seed_from_u64(1)),
                settings: MemorySettingsStore::new(),
            }
        }

        fn provisioner(&self, engine: DatabaseEngine) -> Provisioner<'_, FakeCloudClient> {
            Provisioner::new(
                &self.client,
                engine,
                &self.generator,
                &self.generator,
                &self.settings,
            )
        }
    }

    fn args(rg: &str, name: &str) -> CreateServerArgs {
        CreateServerArgs {
            resource_group: Some(rg.to_string()),
            name: Some(name.to_string()),
            location: Some("eastus".to_string()),
            admin_user: Some("dbadmin".to_string()),
            admin_password: Some("P@ssw0rd-12345!".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_with_engine_defaults() {
        let fixture = Fixture::new(FakeCloudClient::new(SUB).with_resource_group("rg", "eastus"));

        let response = fixture
            .provisioner(DatabaseEngine::Mysql)
            .create_server(&args("rg", "srv1"))
            .await
            .unwrap();

        assert_eq!(response.host.as_deref(), Some("srv1.mysql.database.azure.com"));
        assert_eq!(response.username.as_deref(), Some("dbadmin"));
        assert_eq!(response.password, "P@ssw0rd-12345!");
        assert_eq!(response.sku_name.as_deref(), Some("Standard_B1ms"));
        assert_eq!(response.version.as_deref(), Some("5.7"));

        let stored = fixture.client.server(DatabaseEngine::Mysql, "rg", "srv1").unwrap();
        assert_eq!(stored.sku.unwrap().tier.as_deref(), Some("Burstable"));
        let storage = stored.properties.storage_profile.unwrap();
        assert_eq!(storage.storage_mb, Some(10240));
        assert_eq!(storage.backup_retention_days, Some(7));
        assert!(stored.properties.delegated_subnet_arguments.is_none());
    }

    #[tokio::test]
    async fn test_create_is_idempotent_by_name() {
        let fixture = Fixture::new(FakeCloudClient::new(SUB).with_resource_group("rg", "eastus"));
        let provisioner = fixture.provisioner(DatabaseEngine::Postgres);

        let first = provisioner.create_server(&args("rg", "pg1")).await.unwrap();
        let creates_before = fixture
            .client
            .mutations()
            .iter()
            .filter(|c| c.starts_with("create_server"))
            .count();

        let second = provisioner.create_server(&args("rg", "pg1")).await.unwrap();
        let creates_after = fixture
            .client
            .mutations()
            .iter()
            .filter(|c| c.starts_with("create_server"))
            .count();

        assert_eq!(creates_before, 1);
        assert_eq!(creates_after, 1);
        assert_eq!(first.id, second.id);
        assert_eq!(first.host, second.host);
    }

    #[tokio::test]
    async fn test_existing_server_masks_generated_password() {
        let existing = Server {
            name: Some("srv".to_string()),
            ..Default::default()
        };
        let fixture = Fixture::new(
            FakeCloudClient::new(SUB)
                .with_resource_group("rg", "eastus")
                .with_server(DatabaseEngine::Mysql, "rg", existing),
        );
        let mut create = args("rg", "srv");
        create.admin_password = None;

        let response = fixture
            .provisioner(DatabaseEngine::Mysql)
            .create_server(&create)
            .await
            .unwrap();

        assert_eq!(response.password, MASKED_PASSWORD);
        assert!(fixture.client.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_create_in_vnet_passes_subnet_id() {
        let fixture = Fixture::new(FakeCloudClient::new(SUB).with_resource_group("rg", "eastus"));
        let mut create = args("rg", "srv");
        create.network = VnetSpec {
            vnet: Some("appvnet".to_string()),
            ..Default::default()
        };

        fixture
            .provisioner(DatabaseEngine::Mysql)
            .create_server(&create)
            .await
            .unwrap();

        let stored = fixture.client.server(DatabaseEngine::Mysql, "rg", "srv").unwrap();
        assert_eq!(
            stored
                .properties
                .delegated_subnet_arguments
                .unwrap()
                .subnet_arm_resource_id,
            ResourceId::subnet(SUB, "rg", "appvnet", "srvSubnet").to_string()
        );
    }

    #[tokio::test]
    async fn test_resolution_error_aborts_before_create() {
        let fixture = Fixture::new(FakeCloudClient::new(SUB).with_resource_group("rg", "eastus"));
        let mut create = args("rg", "srv");
        create.network = VnetSpec {
            subnet: Some("just-a-name".to_string()),
            ..Default::default()
        };

        let err = fixture
            .provisioner(DatabaseEngine::Mysql)
            .create_server(&create)
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::MalformedSubnetReference(_)));
        assert!(fixture.client.server(DatabaseEngine::Mysql, "rg", "srv").is_none());
    }

    #[tokio::test]
    async fn test_vnet_auto_creates_server_network() {
        let fixture = Fixture::new(FakeCloudClient::new(SUB).with_resource_group("rg", "eastus"));
        let mut create = args("rg", "srv");
        create.vnet_auto = true;

        fixture
            .provisioner(DatabaseEngine::Postgres)
            .create_server(&create)
            .await
            .unwrap();

        assert!(fixture.client.vnet("rg", "srvVNET").is_some());
        assert!(fixture.client.subnet("rg", "srvVNET", "srvSubnet").is_some());
    }

    #[tokio::test]
    async fn test_create_remembers_parameters() {
        let fixture = Fixture::new(FakeCloudClient::new(SUB).with_resource_group("rg", "westus"));
        let mut create = args("rg", "srv");
        create.location = Some("westus".to_string());

        let provisioner = fixture.provisioner(DatabaseEngine::Mysql);
        provisioner.create_server(&create).await.unwrap();

        assert_eq!(
            fixture.settings.get("mysql", RESOURCE_GROUP_KEY).as_deref(),
            Some("rg")
        );
        assert_eq!(fixture.settings.get("mysql", SERVER_NAME_KEY).as_deref(), Some("srv"));

        // Lifecycle commands fall back to what was remembered
        let shown = provisioner.show_server(None, None).await.unwrap();
        assert_eq!(shown.name.as_deref(), Some("srv"));
    }

    #[tokio::test]
    async fn test_show_missing_server() {
        let fixture = Fixture::new(FakeCloudClient::new(SUB));
        let err = fixture
            .provisioner(DatabaseEngine::Mysql)
            .show_server(Some("rg"), Some("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ServerNotFound { .. }));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_update_preserves_unspecified_fields() {
        let fixture = Fixture::new(FakeCloudClient::new(SUB).with_resource_group("rg", "eastus"));
        let provisioner = fixture.provisioner(DatabaseEngine::Mysql);
        provisioner.create_server(&args("rg", "srv")).await.unwrap();

        let updated = provisioner
            .update_server(
                Some("rg"),
                Some("srv"),
                &UpdateServerArgs {
                    backup_retention_days: Some(14),
                    tags: Some(BTreeMap::from([("env".to_string(), "dev".to_string())])),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let storage = updated.properties.storage_profile.unwrap();
        assert_eq!(storage.backup_retention_days, Some(14));
        assert_eq!(storage.storage_mb, Some(10240));
        assert_eq!(updated.sku.unwrap().name, "Standard_B1ms");
        assert_eq!(updated.tags.unwrap()["env"], "dev");
    }

    #[tokio::test]
    async fn test_update_sku_infers_tier() {
        let fixture = Fixture::new(FakeCloudClient::new(SUB).with_resource_group("rg", "eastus"));
        let provisioner = fixture.provisioner(DatabaseEngine::Mysql);
        provisioner.create_server(&args("rg", "srv")).await.unwrap();

        let updated = provisioner
            .update_server(
                Some("rg"),
                Some("srv"),
                &UpdateServerArgs {
                    sku_name: Some("Standard_E4s_v3".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.sku.unwrap().tier.as_deref(), Some("MemoryOptimized"));
    }

    #[tokio::test]
    async fn test_empty_update_rejected() {
        let fixture = Fixture::new(FakeCloudClient::new(SUB));
        let err = fixture
            .provisioner(DatabaseEngine::Mysql)
            .update_server(Some("rg"), Some("srv"), &UpdateServerArgs::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_power_state_and_delete() {
        let fixture = Fixture::new(FakeCloudClient::new(SUB).with_resource_group("rg", "eastus"));
        let provisioner = fixture.provisioner(DatabaseEngine::Postgres);
        provisioner.create_server(&args("rg", "pg")).await.unwrap();

        provisioner.stop_server(Some("rg"), Some("pg")).await.unwrap();
        let state = fixture
            .client
            .server(DatabaseEngine::Postgres, "rg", "pg")
            .unwrap()
            .properties
            .state;
        assert_eq!(state.as_deref(), Some("Stopped"));

        provisioner.start_server(Some("rg"), Some("pg")).await.unwrap();
        provisioner.restart_server(Some("rg"), Some("pg")).await.unwrap();
        assert_eq!(provisioner.list_servers(Some("rg")).await.unwrap().len(), 1);

        provisioner.delete_server(Some("rg"), Some("pg")).await.unwrap();
        assert!(provisioner.list_servers(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_skus_uses_default_location() {
        let fixture = Fixture::new(FakeCloudClient::new(SUB));
        fixture
            .provisioner(DatabaseEngine::Mysql)
            .list_skus(None)
            .await
            .unwrap();
        assert_eq!(fixture.client.calls(), vec!["list_skus eastus".to_string()]);
    }
}
