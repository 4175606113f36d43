//! HTTP implementation of [`CloudResourceClient`] against Azure Resource Manager
//!
//! Requests carry a bearer token obtained either from a pre-issued access token or
//! from an OAuth2 client-credentials exchange. Mutations that answer with
//! `Azure-AsyncOperation`/`Location` headers are polled to completion before the
//! call returns.

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, trace};
use url::Url;

use super::client::{ArmResult, CloudResourceClient};
use super::error::ArmError;
use super::models::{ResourceGroup, Server, ServerUpdate, Subnet, VirtualNetwork};
use crate::engine::DatabaseEngine;
use crate::progress::{
    DEFAULT_OPERATION_TIMEOUT, DEFAULT_POLL_INTERVAL, PendingOperation, ProgressCallback,
    poll_operation,
};

/// Public Azure management endpoint
pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com/";

/// Microsoft identity platform authority
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com/";

/// Token scope for the management plane
pub const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";

pub const NETWORK_API_VERSION: &str = "2020-05-01";
pub const RESOURCES_API_VERSION: &str = "2020-06-01";

const USER_AGENT: &str = concat!("flexctl/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// How the client authenticates
#[derive(Clone)]
pub enum Credential {
    /// A bearer token issued elsewhere (e.g. `az account get-access-token`)
    AccessToken(String),
    /// Service principal client-credentials flow
    ClientSecret {
        tenant_id: String,
        client_id: String,
        client_secret: String,
    },
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::AccessToken(_) => f.write_str("AccessToken(***)"),
            Credential::ClientSecret {
                tenant_id,
                client_id,
                ..
            } => f
                .debug_struct("ClientSecret")
                .field("tenant_id", tenant_id)
                .field("client_id", client_id)
                .field("client_secret", &"***")
                .finish(),
        }
    }
}

/// A response captured before interpretation
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub url: String,
    pub status: u16,
    pub body: String,
    pub retry_after: Option<Duration>,
    pub async_operation: Option<String>,
    pub location: Option<String>,
}

impl RawResponse {
    fn is_error(&self) -> bool {
        self.status >= 400
    }

    fn into_error(self) -> ArmError {
        ArmError::from_response(self.status, &self.body)
    }

    fn pending(&self, name: &str) -> PendingOperation {
        // Azure-AsyncOperation may accompany 200, 201 or 202; Location only means
        // "poll here" on 202
        PendingOperation {
            name: name.to_string(),
            async_operation_url: self.async_operation.clone(),
            location_url: self
                .location
                .clone()
                .filter(|_| self.status == 202 && self.async_operation.is_none()),
            retry_after: self.retry_after,
        }
    }

    fn json<T: DeserializeOwned>(&self) -> ArmResult<T> {
        serde_json::from_str(&self.body).map_err(|e| ArmError::Decode {
            url: self.url.clone(),
            message: e.to_string(),
        })
    }
}

#[derive(Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
    #[serde(rename = "nextLink", default)]
    next_link: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Builder for [`ArmClient`]
pub struct ArmClientBuilder {
    endpoint: String,
    authority: String,
    scope: String,
    subscription_id: Option<String>,
    credential: Option<Credential>,
    poll_interval: Duration,
    operation_timeout: Duration,
    on_progress: Option<ProgressCallback>,
}

impl Default for ArmClientBuilder {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            authority: DEFAULT_AUTHORITY.to_string(),
            scope: MANAGEMENT_SCOPE.to_string(),
            subscription_id: None,
            credential: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
            on_progress: None,
        }
    }
}

impl ArmClientBuilder {
    /// Management endpoint (defaults to the public cloud)
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Identity authority used for client-credentials exchange
    pub fn authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into();
        self
    }

    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn subscription_id(mut self, subscription_id: impl Into<String>) -> Self {
        self.subscription_id = Some(subscription_id.into());
        self
    }

    pub fn credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Interval between polls when the service sends no `Retry-After`
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Ceiling for any single long-running operation
    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Receive progress events while operations are polled
    pub fn on_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    pub fn build(self) -> ArmResult<ArmClient> {
        let subscription_id = self
            .subscription_id
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ArmError::Configuration("subscription id is required".to_string()))?;
        let credential = self
            .credential
            .ok_or_else(|| ArmError::Configuration("no credential configured".to_string()))?;

        let endpoint = parse_base(&self.endpoint)?;
        let authority = parse_base(&self.authority)?;

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(ArmClient {
            http,
            endpoint,
            authority,
            scope: self.scope,
            subscription_id,
            credential,
            token: OnceCell::new(),
            poll_interval: self.poll_interval,
            operation_timeout: self.operation_timeout,
            on_progress: self.on_progress,
        })
    }
}

fn parse_base(raw: &str) -> ArmResult<Url> {
    // Url::join drops the last segment unless the base ends in '/'
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    Url::parse(&normalized)
        .map_err(|e| ArmError::Configuration(format!("invalid endpoint '{}': {}", raw, e)))
}

/// Azure Resource Manager client
pub struct ArmClient {
    http: reqwest::Client,
    endpoint: Url,
    authority: Url,
    scope: String,
    subscription_id: String,
    credential: Credential,
    token: OnceCell<String>,
    poll_interval: Duration,
    operation_timeout: Duration,
    on_progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for ArmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArmClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("subscription_id", &self.subscription_id)
            .field("credential", &self.credential)
            .finish_non_exhaustive()
    }
}

impl ArmClient {
    pub fn builder() -> ArmClientBuilder {
        ArmClientBuilder::default()
    }

    async fn bearer_token(&self) -> ArmResult<String> {
        match &self.credential {
            Credential::AccessToken(token) => Ok(token.clone()),
            Credential::ClientSecret {
                tenant_id,
                client_id,
                client_secret,
            } => self
                .token
                .get_or_try_init(|| self.exchange_client_secret(tenant_id, client_id, client_secret))
                .await
                .cloned(),
        }
    }

    async fn exchange_client_secret(
        &self,
        tenant_id: &str,
        client_id: &str,
        client_secret: &str,
    ) -> ArmResult<String> {
        let url = self
            .authority
            .join(&format!("{}/oauth2/v2.0/token", tenant_id))
            .map_err(|e| ArmError::Configuration(e.to_string()))?;

        let form = serde_urlencoded::to_string([
            ("grant_type", "client_credentials"),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("scope", self.scope.as_str()),
        ])
        .map_err(|e| ArmError::Auth(e.to_string()))?;

        debug!("Requesting management token for client {}", client_id);
        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ArmError::Auth(format!(
                "token request failed with status {}: {}",
                status.as_u16(),
                body
            )));
        }

        let token: TokenResponse =
            serde_json::from_str(&body).map_err(|e| ArmError::Auth(e.to_string()))?;
        Ok(token.access_token)
    }

    fn url(&self, path: &str, api_version: &str) -> ArmResult<String> {
        let mut url = self
            .endpoint
            .join(path.trim_start_matches('/'))
            .map_err(|e| ArmError::Configuration(format!("invalid path '{}': {}", path, e)))?;
        url.query_pairs_mut().append_pair("api-version", api_version);
        Ok(url.into())
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<Value>,
    ) -> ArmResult<RawResponse> {
        let token = self.bearer_token().await?;
        debug!("{} {}", method, url);

        let mut request = self.http.request(method, url).bearer_auth(token);
        if let Some(body) = body {
            trace!("Request body: {}", redacted(&body));
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;
        trace!("Response {}: {}", status.as_u16(), body);

        Ok(RawResponse {
            url: url.to_string(),
            status: status.as_u16(),
            body,
            retry_after: retry_after(&headers),
            async_operation: header(&headers, "azure-asyncoperation"),
            location: header(&headers, "location"),
        })
    }

    /// Authenticated GET of an absolute URL (operation status, next page links)
    pub(crate) async fn get_url(&self, url: &str) -> ArmResult<RawResponse> {
        self.send(Method::GET, url, None).await
    }

    async fn get_optional<T: DeserializeOwned>(
        &self,
        path: &str,
        api_version: &str,
    ) -> ArmResult<Option<T>> {
        let url = self.url(path, api_version)?;
        let response = self.get_url(&url).await?;

        if response.status == StatusCode::NOT_FOUND.as_u16() {
            return Ok(None);
        }
        if response.is_error() {
            let err = response.into_error();
            return if err.is_not_found() { Ok(None) } else { Err(err) };
        }
        response.json().map(Some)
    }

    async fn get_list<T: DeserializeOwned>(&self, path: &str, api_version: &str) -> ArmResult<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(self.url(path, api_version)?);

        while let Some(url) = next {
            let response = self.get_url(&url).await?;
            if response.is_error() {
                return Err(response.into_error());
            }
            let page: Page<T> = response.json()?;
            items.extend(page.value);
            next = page.next_link;
        }

        Ok(items)
    }

    /// Send a mutation and wait for its long-running operation.
    ///
    /// Returns the initial response and whether an operation had to be polled.
    async fn mutate(
        &self,
        operation: &str,
        method: Method,
        path: &str,
        api_version: &str,
        body: Option<Value>,
    ) -> ArmResult<(RawResponse, bool)> {
        let url = self.url(path, api_version)?;
        let response = self.send(method, &url, body).await?;
        if response.is_error() {
            return Err(response.into_error());
        }

        let pending = response.pending(operation);
        let polled = !pending.is_complete();
        poll_operation(
            self,
            &pending,
            self.operation_timeout,
            self.poll_interval,
            self.on_progress.as_ref(),
        )
        .await?;

        Ok((response, polled))
    }

    /// PUT/PATCH a resource, wait for completion and return its final state
    async fn upsert<B: Serialize, T: DeserializeOwned>(
        &self,
        operation: &str,
        method: Method,
        path: &str,
        api_version: &str,
        body: &B,
    ) -> ArmResult<T> {
        let body = serde_json::to_value(body).map_err(|e| ArmError::Decode {
            url: path.to_string(),
            message: e.to_string(),
        })?;
        let (response, polled) = self
            .mutate(operation, method, path, api_version, Some(body))
            .await?;

        // An unpolled 200 with a body is already the final state
        if !polled && response.status == 200 && !response.body.trim().is_empty() {
            return response.json();
        }

        self.get_optional(path, api_version)
            .await?
            .ok_or_else(|| ArmError::Decode {
                url: response.url,
                message: format!("{} completed but the resource could not be read back", operation),
            })
    }

    fn resource_group_path(&self, name: &str) -> String {
        format!("/subscriptions/{}/resourcegroups/{}", self.subscription_id, name)
    }

    fn vnet_path(&self, resource_group: &str, vnet: &str) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Network/virtualNetworks/{}",
            self.subscription_id, resource_group, vnet
        )
    }

    fn server_path(&self, engine: DatabaseEngine, resource_group: &str, name: &str) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/{}/flexibleServers/{}",
            self.subscription_id,
            resource_group,
            engine.provider_namespace(),
            name
        )
    }

    async fn server_action(
        &self,
        engine: DatabaseEngine,
        resource_group: &str,
        name: &str,
        action: &str,
    ) -> ArmResult<()> {
        let path = format!("{}/{}", self.server_path(engine, resource_group, name), action);
        let operation = format!("{} Server {}", engine.display_name(), capitalize(action));
        self.mutate(&operation, Method::POST, &path, engine.api_version(), None)
            .await
            .map(|_| ())
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    header(headers, "retry-after")
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Copy of a request body safe for trace output
fn redacted(body: &Value) -> Value {
    match body {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| {
                    if key.to_ascii_lowercase().contains("password") {
                        (key.clone(), Value::String("***".to_string()))
                    } else {
                        (key.clone(), redacted(value))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redacted).collect()),
        other => other.clone(),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[async_trait]
impl CloudResourceClient for ArmClient {
    fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    async fn get_resource_group(&self, name: &str) -> ArmResult<Option<ResourceGroup>> {
        self.get_optional(&self.resource_group_path(name), RESOURCES_API_VERSION)
            .await
    }

    async fn create_resource_group(&self, name: &str, location: &str) -> ArmResult<ResourceGroup> {
        let body = ResourceGroup {
            location: location.to_string(),
            ..Default::default()
        };
        self.upsert(
            "Resource Group Create",
            Method::PUT,
            &self.resource_group_path(name),
            RESOURCES_API_VERSION,
            &body,
        )
        .await
    }

    async fn get_virtual_network(
        &self,
        resource_group: &str,
        vnet: &str,
    ) -> ArmResult<Option<VirtualNetwork>> {
        self.get_optional(&self.vnet_path(resource_group, vnet), NETWORK_API_VERSION)
            .await
    }

    async fn create_virtual_network(
        &self,
        resource_group: &str,
        vnet: &VirtualNetwork,
    ) -> ArmResult<VirtualNetwork> {
        let name = vnet.name.as_deref().unwrap_or_default();
        self.upsert(
            "Virtual Network Create",
            Method::PUT,
            &self.vnet_path(resource_group, name),
            NETWORK_API_VERSION,
            vnet,
        )
        .await
    }

    async fn get_subnet(
        &self,
        resource_group: &str,
        vnet: &str,
        subnet: &str,
    ) -> ArmResult<Option<Subnet>> {
        let path = format!("{}/subnets/{}", self.vnet_path(resource_group, vnet), subnet);
        self.get_optional(&path, NETWORK_API_VERSION).await
    }

    async fn create_or_update_subnet(
        &self,
        resource_group: &str,
        vnet: &str,
        subnet: &Subnet,
    ) -> ArmResult<Subnet> {
        let name = subnet.name.as_deref().unwrap_or_default();
        let path = format!("{}/subnets/{}", self.vnet_path(resource_group, vnet), name);
        self.upsert("Subnet Create", Method::PUT, &path, NETWORK_API_VERSION, subnet)
            .await
    }

    async fn get_server(
        &self,
        engine: DatabaseEngine,
        resource_group: &str,
        name: &str,
    ) -> ArmResult<Option<Server>> {
        self.get_optional(
            &self.server_path(engine, resource_group, name),
            engine.api_version(),
        )
        .await
    }

    async fn create_server(
        &self,
        engine: DatabaseEngine,
        resource_group: &str,
        name: &str,
        server: &Server,
    ) -> ArmResult<Server> {
        let operation = format!("{} Server Create", engine.display_name());
        self.upsert(
            &operation,
            Method::PUT,
            &self.server_path(engine, resource_group, name),
            engine.api_version(),
            server,
        )
        .await
    }

    async fn update_server(
        &self,
        engine: DatabaseEngine,
        resource_group: &str,
        name: &str,
        update: &ServerUpdate,
    ) -> ArmResult<Server> {
        let operation = format!("{} Server Update", engine.display_name());
        self.upsert(
            &operation,
            Method::PATCH,
            &self.server_path(engine, resource_group, name),
            engine.api_version(),
            update,
        )
        .await
    }

    async fn delete_server(
        &self,
        engine: DatabaseEngine,
        resource_group: &str,
        name: &str,
    ) -> ArmResult<()> {
        let operation = format!("{} Server Delete", engine.display_name());
        self.mutate(
            &operation,
            Method::DELETE,
            &self.server_path(engine, resource_group, name),
            engine.api_version(),
            None,
        )
        .await
        .map(|_| ())
    }

    async fn start_server(
        &self,
        engine: DatabaseEngine,
        resource_group: &str,
        name: &str,
    ) -> ArmResult<()> {
        self.server_action(engine, resource_group, name, "start")
            .await
    }

    async fn stop_server(
        &self,
        engine: DatabaseEngine,
        resource_group: &str,
        name: &str,
    ) -> ArmResult<()> {
        self.server_action(engine, resource_group, name, "stop").await
    }

    async fn restart_server(
        &self,
        engine: DatabaseEngine,
        resource_group: &str,
        name: &str,
    ) -> ArmResult<()> {
        self.server_action(engine, resource_group, name, "restart")
            .await
    }

    async fn list_servers(
        &self,
        engine: DatabaseEngine,
        resource_group: Option<&str>,
    ) -> ArmResult<Vec<Server>> {
        let path = match resource_group {
            Some(rg) => format!(
                "/subscriptions/{}/resourceGroups/{}/providers/{}/flexibleServers",
                self.subscription_id,
                rg,
                engine.provider_namespace()
            ),
            None => format!(
                "/subscriptions/{}/providers/{}/flexibleServers",
                self.subscription_id,
                engine.provider_namespace()
            ),
        };
        self.get_list(&path, engine.api_version()).await
    }

    async fn list_skus(&self, engine: DatabaseEngine, location: &str) -> ArmResult<Value> {
        let path = format!(
            "/subscriptions/{}/providers/{}/locations/{}/capabilities",
            self.subscription_id,
            engine.provider_namespace(),
            location
        );
        let items: Vec<Value> = self.get_list(&path, engine.api_version()).await?;
        Ok(Value::Array(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ArmClient {
        ArmClient::builder()
            .endpoint("https://management.example.test")
            .subscription_id("sub-1")
            .credential(Credential::AccessToken("token".to_string()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_requires_subscription() {
        let result = ArmClient::builder()
            .credential(Credential::AccessToken("t".to_string()))
            .build();
        assert!(matches!(result, Err(ArmError::Configuration(_))));
    }

    #[test]
    fn test_builder_requires_credential() {
        let result = ArmClient::builder().subscription_id("sub").build();
        assert!(matches!(result, Err(ArmError::Configuration(_))));
    }

    #[test]
    fn test_url_appends_api_version() {
        let url = client()
            .url("/subscriptions/sub-1/resourcegroups/rg", RESOURCES_API_VERSION)
            .unwrap();
        assert_eq!(
            url,
            "https://management.example.test/subscriptions/sub-1/resourcegroups/rg?api-version=2020-06-01"
        );
    }

    #[test]
    fn test_server_path_uses_provider_namespace() {
        let path = client().server_path(DatabaseEngine::Postgres, "rg", "srv");
        assert_eq!(
            path,
            "/subscriptions/sub-1/resourceGroups/rg/providers/Microsoft.DBforPostgreSQL/flexibleServers/srv"
        );
    }

    #[test]
    fn test_pending_follows_operation_headers() {
        let ok = RawResponse {
            status: 200,
            async_operation: Some("https://op".to_string()),
            ..Default::default()
        };
        assert_eq!(
            ok.pending("x").async_operation_url.as_deref(),
            Some("https://op")
        );

        let created_with_location = RawResponse {
            status: 201,
            location: Some("https://resource".to_string()),
            ..Default::default()
        };
        assert!(created_with_location.pending("x").is_complete());

        let accepted = RawResponse {
            status: 202,
            location: Some("https://loc".to_string()),
            ..Default::default()
        };
        let pending = accepted.pending("x");
        assert_eq!(pending.location_url.as_deref(), Some("https://loc"));
        assert!(pending.async_operation_url.is_none());
    }

    #[test]
    fn test_credential_debug_redacts_secret() {
        let cred = Credential::ClientSecret {
            tenant_id: "t".to_string(),
            client_id: "c".to_string(),
            client_secret: "hunter2".to_string(),
        };
        assert!(!format!("{:?}", cred).contains("hunter2"));
    }

    #[test]
    fn test_redact_masks_password_fields() {
        let body = serde_json::json!({
            "location": "eastus",
            "properties": {
                "administratorLogin": "admin",
                "administratorLoginPassword": "S3cret!pass"
            }
        });
        let logged = redacted(&body).to_string();
        assert!(!logged.contains("S3cret!pass"));
        assert!(logged.contains("\"administratorLogin\":\"admin\""));
        assert!(logged.contains("eastus"));
    }

    #[test]
    fn test_client_debug_redacts_token() {
        let client = ArmClient::builder()
            .subscription_id("sub-1")
            .credential(Credential::AccessToken("eyJ0eXAi.secret".to_string()))
            .build()
            .unwrap();
        let debug = format!("{:?}", client);
        assert!(debug.contains("sub-1"));
        assert!(!debug.contains("eyJ0eXAi.secret"));
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("restart"), "Restart");
        assert_eq!(capitalize(""), "");
    }
}
