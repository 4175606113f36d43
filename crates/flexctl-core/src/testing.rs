//! In-memory [`CloudResourceClient`] for tests
//!
//! Resources live in maps keyed by lower-cased names; every call is recorded so
//! tests can assert on what was (or was not) sent to the control plane.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use crate::arm::models::{
    Delegation, ResourceGroup, Server, ServerUpdate, Subnet, SubnetProperties, VirtualNetwork,
};
use crate::arm::{ArmError, ArmResult, CloudResourceClient, ResourceId};
use crate::engine::DatabaseEngine;

type VnetKey = (String, String);
type SubnetKey = (String, String, String);
type ServerKey = (DatabaseEngine, String, String);

#[derive(Default)]
struct State {
    resource_groups: BTreeMap<String, ResourceGroup>,
    vnets: BTreeMap<VnetKey, VirtualNetwork>,
    subnets: BTreeMap<SubnetKey, Subnet>,
    servers: BTreeMap<ServerKey, Server>,
    calls: Vec<String>,
}

/// Fake control plane
pub struct FakeCloudClient {
    subscription_id: String,
    rejected_subnet_prefixes: HashSet<String>,
    state: Mutex<State>,
}

fn key(s: &str) -> String {
    s.to_lowercase()
}

fn not_found(what: &str) -> ArmError {
    ArmError::Api {
        status: 404,
        code: "ResourceNotFound".to_string(),
        message: format!("The Resource '{}' was not found.", what),
    }
}

impl FakeCloudClient {
    pub fn new(subscription_id: &str) -> Self {
        Self {
            subscription_id: subscription_id.to_string(),
            rejected_subnet_prefixes: HashSet::new(),
            state: Mutex::new(State::default()),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: String) {
        self.state().calls.push(call);
    }

    pub fn with_resource_group(self, name: &str, location: &str) -> Self {
        let group = ResourceGroup {
            id: Some(format!(
                "/subscriptions/{}/resourceGroups/{}",
                self.subscription_id, name
            )),
            name: Some(name.to_string()),
            location: location.to_string(),
            tags: None,
        };
        self.state().resource_groups.insert(key(name), group);
        self
    }

    pub fn with_vnet(self, resource_group: &str, name: &str, location: &str, prefix: &str) -> Self {
        let mut vnet = VirtualNetwork::new(name, location, prefix);
        vnet.id = Some(ResourceId::virtual_network(&self.subscription_id, resource_group, name).to_string());
        self.state()
            .vnets
            .insert((key(resource_group), key(name)), vnet);
        self
    }

    /// Seed a subnet carrying the given delegation services (the vnet must be seeded first)
    pub fn with_subnet(
        self,
        resource_group: &str,
        vnet: &str,
        name: &str,
        prefix: &str,
        delegations: &[&str],
    ) -> Self {
        let subnet = Subnet {
            id: Some(ResourceId::subnet(&self.subscription_id, resource_group, vnet, name).to_string()),
            name: Some(name.to_string()),
            properties: SubnetProperties {
                address_prefix: Some(prefix.to_string()),
                delegations: delegations.iter().map(|s| Delegation::new(s)).collect(),
                provisioning_state: Some("Succeeded".to_string()),
            },
        };
        self.state()
            .subnets
            .insert((key(resource_group), key(vnet), key(name)), subnet);
        self
    }

    pub fn with_server(self, engine: DatabaseEngine, resource_group: &str, server: Server) -> Self {
        let name = server.name.clone().unwrap_or_default();
        self.state()
            .servers
            .insert((engine, key(resource_group), key(&name)), server);
        self
    }

    /// Subnet creations with this prefix fail the way ARM does when it does not fit the vnet
    pub fn reject_subnet_prefix(mut self, prefix: &str) -> Self {
        self.rejected_subnet_prefixes.insert(prefix.to_string());
        self
    }

    /// Every call made so far, as `"<method> <path>"`
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// Calls that would change the control plane
    pub fn mutations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| !c.starts_with("get_") && !c.starts_with("list_"))
            .collect()
    }

    pub fn resource_group(&self, name: &str) -> Option<ResourceGroup> {
        self.state().resource_groups.get(&key(name)).cloned()
    }

    pub fn vnet(&self, resource_group: &str, name: &str) -> Option<VirtualNetwork> {
        self.state()
            .vnets
            .get(&(key(resource_group), key(name)))
            .cloned()
    }

    pub fn subnet(&self, resource_group: &str, vnet: &str, name: &str) -> Option<Subnet> {
        self.state()
            .subnets
            .get(&(key(resource_group), key(vnet), key(name)))
            .cloned()
    }

    pub fn server(&self, engine: DatabaseEngine, resource_group: &str, name: &str) -> Option<Server> {
        self.state()
            .servers
            .get(&(engine, key(resource_group), key(name)))
            .cloned()
    }

    fn server_or_404(&self, engine: DatabaseEngine, resource_group: &str, name: &str) -> ArmResult<Server> {
        self.server(engine, resource_group, name)
            .ok_or_else(|| not_found(name))
    }

    fn set_state(&self, engine: DatabaseEngine, resource_group: &str, name: &str, state: &str) -> ArmResult<()> {
        let mut guard = self.state();
        let server = guard
            .servers
            .get_mut(&(engine, key(resource_group), key(name)))
            .ok_or_else(|| not_found(name))?;
        server.properties.state = Some(state.to_string());
        Ok(())
    }
}

#[async_trait]
impl CloudResourceClient for FakeCloudClient {
    fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    async fn get_resource_group(&self, name: &str) -> ArmResult<Option<ResourceGroup>> {
        self.record(format!("get_resource_group {}", name));
        Ok(self.resource_group(name))
    }

    async fn create_resource_group(&self, name: &str, location: &str) -> ArmResult<ResourceGroup> {
        self.record(format!("create_resource_group {}", name));
        let group = ResourceGroup {
            id: Some(format!(
                "/subscriptions/{}/resourceGroups/{}",
                self.subscription_id, name
            )),
            name: Some(name.to_string()),
            location: location.to_string(),
            tags: None,
        };
        self.state()
            .resource_groups
            .insert(key(name), group.clone());
        Ok(group)
    }

    async fn get_virtual_network(
        &self,
        resource_group: &str,
        vnet: &str,
    ) -> ArmResult<Option<VirtualNetwork>> {
        self.record(format!("get_virtual_network {}/{}", resource_group, vnet));
        Ok(self.vnet(resource_group, vnet))
    }

    async fn create_virtual_network(
        &self,
        resource_group: &str,
        vnet: &VirtualNetwork,
    ) -> ArmResult<VirtualNetwork> {
        let name = vnet.name.clone().unwrap_or_default();
        self.record(format!("create_virtual_network {}/{}", resource_group, name));
        if self.resource_group(resource_group).is_none() {
            return Err(ArmError::Api {
                status: 404,
                code: "ResourceGroupNotFound".to_string(),
                message: format!("Resource group '{}' could not be found.", resource_group),
            });
        }

        let mut created = vnet.clone();
        created.id = Some(ResourceId::virtual_network(&self.subscription_id, resource_group, &name).to_string());
        created.properties.provisioning_state = Some("Succeeded".to_string());
        self.state()
            .vnets
            .insert((key(resource_group), key(&name)), created.clone());
        Ok(created)
    }

    async fn get_subnet(
        &self,
        resource_group: &str,
        vnet: &str,
        subnet: &str,
    ) -> ArmResult<Option<Subnet>> {
        self.record(format!("get_subnet {}/{}/{}", resource_group, vnet, subnet));
        Ok(self.subnet(resource_group, vnet, subnet))
    }

    async fn create_or_update_subnet(
        &self,
        resource_group: &str,
        vnet: &str,
        subnet: &Subnet,
    ) -> ArmResult<Subnet> {
        let name = subnet.name.clone().unwrap_or_default();
        self.record(format!(
            "create_or_update_subnet {}/{}/{}",
            resource_group, vnet, name
        ));

        if self.vnet(resource_group, vnet).is_none() {
            return Err(not_found(vnet));
        }
        if let Some(prefix) = &subnet.properties.address_prefix
            && self.rejected_subnet_prefixes.contains(prefix)
        {
            return Err(ArmError::Api {
                status: 400,
                code: "NetcfgInvalidSubnet".to_string(),
                message: format!("Subnet '{}' is not valid in virtual network '{}'.", name, vnet),
            });
        }

        let mut stored = subnet.clone();
        stored.id = Some(ResourceId::subnet(&self.subscription_id, resource_group, vnet, &name).to_string());
        stored.properties.provisioning_state = Some("Succeeded".to_string());
        self.state()
            .subnets
            .insert((key(resource_group), key(vnet), key(&name)), stored.clone());
        Ok(stored)
    }

    async fn get_server(
        &self,
        engine: DatabaseEngine,
        resource_group: &str,
        name: &str,
    ) -> ArmResult<Option<Server>> {
        self.record(format!("get_server {}/{}", resource_group, name));
        Ok(self.server(engine, resource_group, name))
    }

    async fn create_server(
        &self,
        engine: DatabaseEngine,
        resource_group: &str,
        name: &str,
        server: &Server,
    ) -> ArmResult<Server> {
        self.record(format!("create_server {}/{}", resource_group, name));

        let mut created = server.clone();
        created.id = Some(format!(
            "/subscriptions/{}/resourceGroups/{}/providers/{}/flexibleServers/{}",
            self.subscription_id,
            resource_group,
            engine.provider_namespace(),
            name
        ));
        created.name = Some(name.to_string());
        created.properties.administrator_login_password = None;
        created.properties.state = Some("Ready".to_string());
        created.properties.fully_qualified_domain_name = Some(format!(
            "{}.{}.database.azure.com",
            name,
            engine.command_group()
        ));
        self.state()
            .servers
            .insert((engine, key(resource_group), key(name)), created.clone());
        Ok(created)
    }

    async fn update_server(
        &self,
        engine: DatabaseEngine,
        resource_group: &str,
        name: &str,
        update: &ServerUpdate,
    ) -> ArmResult<Server> {
        self.record(format!("update_server {}/{}", resource_group, name));
        let mut server = self.server_or_404(engine, resource_group, name)?;

        if let Some(sku) = &update.sku {
            server.sku = Some(sku.clone());
        }
        if let Some(tags) = &update.tags {
            server.tags = Some(tags.clone());
        }
        if let Some(profile) = &update.properties.storage_profile {
            let current = server.properties.storage_profile.get_or_insert_with(Default::default);
            if profile.storage_mb.is_some() {
                current.storage_mb = profile.storage_mb;
            }
            if profile.backup_retention_days.is_some() {
                current.backup_retention_days = profile.backup_retention_days;
            }
        }

        self.state()
            .servers
            .insert((engine, key(resource_group), key(name)), server.clone());
        Ok(server)
    }

    async fn delete_server(
        &self,
        engine: DatabaseEngine,
        resource_group: &str,
        name: &str,
    ) -> ArmResult<()> {
        self.record(format!("delete_server {}/{}", resource_group, name));
        self.state()
            .servers
            .remove(&(engine, key(resource_group), key(name)))
            .map(|_| ())
            .ok_or_else(|| not_found(name))
    }

    async fn start_server(
        &self,
        engine: DatabaseEngine,
        resource_group: &str,
        name: &str,
    ) -> ArmResult<()> {
        self.record(format!("start_server {}/{}", resource_group, name));
        self.set_state(engine, resource_group, name, "Ready")
    }

    async fn stop_server(
        &self,
        engine: DatabaseEngine,
        resource_group: &str,
        name: &str,
    ) -> ArmResult<()> {
        self.record(format!("stop_server {}/{}", resource_group, name));
        self.set_state(engine, resource_group, name, "Stopped")
    }

    async fn restart_server(
        &self,
        engine: DatabaseEngine,
        resource_group: &str,
        name: &str,
    ) -> ArmResult<()> {
        self.record(format!("restart_server {}/{}", resource_group, name));
        self.set_state(engine, resource_group, name, "Ready")
    }

    async fn list_servers(
        &self,
        engine: DatabaseEngine,
        resource_group: Option<&str>,
    ) -> ArmResult<Vec<Server>> {
        self.record(format!("list_servers {}", resource_group.unwrap_or("*")));
        let wanted = resource_group.map(key);
        Ok(self
            .state()
            .servers
            .iter()
            .filter(|((e, rg, _), _)| *e == engine && wanted.as_ref().is_none_or(|w| w == rg))
            .map(|(_, s)| s.clone())
            .collect())
    }

    async fn list_skus(&self, engine: DatabaseEngine, location: &str) -> ArmResult<Value> {
        self.record(format!("list_skus {}", location));
        Ok(json!([{
            "zone": "none",
            "supportedFlexibleServerEditions": [{
                "name": crate::engine::infer_tier(engine.default_sku()),
                "supportedServerVersions": [{
                    "name": engine.default_version(),
                    "supportedVcores": [{"name": engine.default_sku(), "vCores": 1}]
                }]
            }]
        }]))
    }
}
