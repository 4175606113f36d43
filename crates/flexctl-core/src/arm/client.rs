//! The control-plane capability used by the resolver and provisioner
//!
//! [`ArmClient`](super::ArmClient) talks to Azure Resource Manager; tests use the
//! in-memory fake from `crate::testing`.

use async_trait::async_trait;
use serde_json::Value;

use super::error::ArmError;
use super::models::{ResourceGroup, Server, ServerUpdate, Subnet, VirtualNetwork};
use crate::engine::DatabaseEngine;

/// Result type for control-plane calls
pub type ArmResult<T> = std::result::Result<T, ArmError>;

/// Management operations against network, resource group and database server resources.
///
/// `get_*` calls return `Ok(None)` when the resource does not exist. Mutations block
/// until the underlying long-running operation reaches a terminal state.
#[async_trait]
pub trait CloudResourceClient: Send + Sync {
    /// The active subscription
    fn subscription_id(&self) -> &str;

    async fn get_resource_group(&self, name: &str) -> ArmResult<Option<ResourceGroup>>;

    async fn create_resource_group(&self, name: &str, location: &str) -> ArmResult<ResourceGroup>;

    async fn get_virtual_network(
        &self,
        resource_group: &str,
        vnet: &str,
    ) -> ArmResult<Option<VirtualNetwork>>;

    async fn create_virtual_network(
        &self,
        resource_group: &str,
        vnet: &VirtualNetwork,
    ) -> ArmResult<VirtualNetwork>;

    async fn get_subnet(
        &self,
        resource_group: &str,
        vnet: &str,
        subnet: &str,
    ) -> ArmResult<Option<Subnet>>;

    async fn create_or_update_subnet(
        &self,
        resource_group: &str,
        vnet: &str,
        subnet: &Subnet,
    ) -> ArmResult<Subnet>;

    async fn get_server(
        &self,
        engine: DatabaseEngine,
        resource_group: &str,
        name: &str,
    ) -> ArmResult<Option<Server>>;

    async fn create_server(
        &self,
        engine: DatabaseEngine,
        resource_group: &str,
        name: &str,
        server: &Server,
    ) -> ArmResult<Server>;

    async fn update_server(
        &self,
        engine: DatabaseEngine,
        resource_group: &str,
        name: &str,
        update: &ServerUpdate,
    ) -> ArmResult<Server>;

    async fn delete_server(
        &self,
        engine: DatabaseEngine,
        resource_group: &str,
        name: &str,
    ) -> ArmResult<()>;

    async fn start_server(
        &self,
        engine: DatabaseEngine,
        resource_group: &str,
        name: &str,
    ) -> ArmResult<()>;

    async fn stop_server(
        &self,
        engine: DatabaseEngine,
        resource_group: &str,
        name: &str,
    ) -> ArmResult<()>;

    async fn restart_server(
        &self,
        engine: DatabaseEngine,
        resource_group: &str,
        name: &str,
    ) -> ArmResult<()>;

    /// List servers in a resource group, or in the whole subscription when `None`
    async fn list_servers(
        &self,
        engine: DatabaseEngine,
        resource_group: Option<&str>,
    ) -> ArmResult<Vec<Server>>;

    /// Provider capabilities (available skus, versions, storage) for a location
    async fn list_skus(&self, engine: DatabaseEngine, location: &str) -> ArmResult<Value>;
}
