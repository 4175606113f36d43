//! Configuration management for flexctl
//!
//! Handles configuration loading from files, environment variables, and command-line arguments.
//! Configuration is stored in TOML format with support for multiple named profiles, each
//! pointing at one Azure subscription.

#[cfg(target_os = "macos")]
use directories::BaseDirs;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::credential::CredentialStore;
use super::error::{ConfigError, Result};
use crate::arm::Credential;

pub const ENV_ACCESS_TOKEN: &str = "AZURE_ACCESS_TOKEN";
pub const ENV_SUBSCRIPTION_ID: &str = "AZURE_SUBSCRIPTION_ID";
pub const ENV_TENANT_ID: &str = "AZURE_TENANT_ID";
pub const ENV_CLIENT_ID: &str = "AZURE_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "AZURE_CLIENT_SECRET";

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Profile used when `--profile` is not given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,
    /// Remember resource group, location and server name between invocations
    #[serde(default = "default_param_persist")]
    pub param_persist: bool,
    /// Map of profile name -> profile configuration
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: None,
            param_persist: default_param_persist(),
            profiles: HashMap::new(),
        }
    }
}

fn default_param_persist() -> bool {
    true
}

/// Individual profile configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Profile {
    /// Subscription all commands run against
    pub subscription_id: String,
    /// Authentication material (flattened into the profile)
    #[serde(flatten)]
    pub credentials: ProfileCredentials,
    /// Management endpoint override (sovereign clouds, test doubles)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Identity authority override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority: Option<String>,
}

/// How a profile authenticates
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum ProfileCredentials {
    ServicePrincipal {
        tenant_id: String,
        client_id: String,
        /// Plaintext or `keyring:<key>` reference
        client_secret: String,
    },
    AccessToken {
        access_token: String,
    },
}

impl Profile {
    /// Short label for listings
    pub fn auth_kind(&self) -> &'static str {
        match self.credentials {
            ProfileCredentials::ServicePrincipal { .. } => "service-principal",
            ProfileCredentials::AccessToken { .. } => "access-token",
        }
    }

    /// Returns the service principal fields if this profile uses one
    pub fn service_principal(&self) -> Option<(&str, &str, &str)> {
        match &self.credentials {
            ProfileCredentials::ServicePrincipal {
                tenant_id,
                client_id,
                client_secret,
            } => Some((tenant_id.as_str(), client_id.as_str(), client_secret.as_str())),
            _ => None,
        }
    }

    /// Resolve the credential, following keyring references and environment overrides
    pub fn resolve_credential(&self) -> Result<Credential> {
        let store = CredentialStore::new();
        match &self.credentials {
            ProfileCredentials::ServicePrincipal {
                tenant_id,
                client_id,
                client_secret,
            } => {
                let tenant_id = store
                    .get_credential(tenant_id, Some(ENV_TENANT_ID))
                    .map_err(|e| {
                        ConfigError::CredentialError(format!("Failed to resolve tenant id: {}", e))
                    })?;
                let client_id = store
                    .get_credential(client_id, Some(ENV_CLIENT_ID))
                    .map_err(|e| {
                        ConfigError::CredentialError(format!("Failed to resolve client id: {}", e))
                    })?;
                let client_secret = store
                    .get_credential(client_secret, Some(ENV_CLIENT_SECRET))
                    .map_err(|e| {
                        ConfigError::CredentialError(format!(
                            "Failed to resolve client secret: {}",
                            e
                        ))
                    })?;
                Ok(Credential::ClientSecret {
                    tenant_id,
                    client_id,
                    client_secret,
                })
            }
            ProfileCredentials::AccessToken { access_token } => store
                .get_credential(access_token, Some(ENV_ACCESS_TOKEN))
                .map(Credential::AccessToken)
                .map_err(|e| {
                    ConfigError::CredentialError(format!("Failed to resolve access token: {}", e))
                }),
        }
    }

    /// Subscription id, honouring `AZURE_SUBSCRIPTION_ID`
    pub fn resolve_subscription_id(&self) -> Result<String> {
        CredentialStore::new()
            .get_credential(&self.subscription_id, Some(ENV_SUBSCRIPTION_ID))
            .map_err(|e| {
                ConfigError::CredentialError(format!("Failed to resolve subscription id: {}", e))
            })
    }
}

/// Credentials taken entirely from the environment, without any profile
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    pub subscription_id: String,
    pub credential: Credential,
}

impl EnvCredentials {
    /// `AZURE_SUBSCRIPTION_ID` plus either `AZURE_ACCESS_TOKEN` or the
    /// `AZURE_TENANT_ID`/`AZURE_CLIENT_ID`/`AZURE_CLIENT_SECRET` triple
    pub fn from_env() -> Option<Self> {
        let subscription_id = env::var(ENV_SUBSCRIPTION_ID).ok()?;

        if let Ok(token) = env::var(ENV_ACCESS_TOKEN) {
            return Some(Self {
                subscription_id,
                credential: Credential::AccessToken(token),
            });
        }

        match (
            env::var(ENV_TENANT_ID),
            env::var(ENV_CLIENT_ID),
            env::var(ENV_CLIENT_SECRET),
        ) {
            (Ok(tenant_id), Ok(client_id), Ok(client_secret)) => Some(Self {
                subscription_id,
                credential: Credential::ClientSecret {
                    tenant_id,
                    client_id,
                    client_secret,
                },
            }),
            _ => None,
        }
    }
}

impl Config {
    /// Resolve which profile to use.
    ///
    /// Resolution order:
    /// 1. `explicit_profile` if given (must exist)
    /// 2. `default_profile` if set
    /// 3. The only profile, when exactly one exists
    pub fn resolve_profile(&self, explicit_profile: Option<&str>) -> Result<String> {
        if let Some(name) = explicit_profile {
            if !self.profiles.contains_key(name) {
                return Err(ConfigError::ProfileNotFound {
                    name: name.to_string(),
                });
            }
            return Ok(name.to_string());
        }

        if let Some(default) = &self.default_profile {
            return Ok(default.clone());
        }

        let mut names: Vec<&String> = self.profiles.keys().collect();
        match names.len() {
            0 => Err(ConfigError::NoProfiles {
                suggestion: "Use 'flexctl profile set' to create a profile, or set AZURE_SUBSCRIPTION_ID with AZURE_ACCESS_TOKEN."
                    .to_string(),
            }),
            1 => Ok(names[0].clone()),
            _ => {
                names.sort();
                Err(ConfigError::AmbiguousProfile {
                    available: names.iter().map(|n| n.as_str()).collect::<Vec<_>>().join(", "),
                })
            }
        }
    }

    /// Look up a resolved profile by name
    pub fn profile(&self, name: &str) -> Result<&Profile> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound {
                name: name.to_string(),
            })
    }

    /// Load configuration from the standard location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::LoadError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        // Expand environment variables in the config content
        let expanded_content = Self::expand_env_vars(&content);

        let config: Config = toml::from_str(&expanded_content)?;

        Ok(config)
    }

    /// Save configuration to the standard location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to_path(&config_path)
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::SaveError {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let content = toml::to_string_pretty(self)?;

        fs::write(config_path, content).map_err(|e| ConfigError::SaveError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        Ok(())
    }

    /// Set or update a profile
    pub fn set_profile(&mut self, name: String, profile: Profile) {
        self.profiles.insert(name, profile);
    }

    /// Remove a profile by name, clearing the default if it pointed there
    pub fn remove_profile(&mut self, name: &str) -> Option<Profile> {
        if self.default_profile.as_deref() == Some(name) {
            self.default_profile = None;
        }
        self.profiles.remove(name)
    }

    /// List all profiles sorted by name
    pub fn list_profiles(&self) -> Vec<(&String, &Profile)> {
        let mut profiles: Vec<_> = self.profiles.iter().collect();
        profiles.sort_by_key(|(name, _)| *name);
        profiles
    }

    /// Get the path to the configuration file
    ///
    /// On macOS, `~/.config/flexctl/config.toml` is preferred when it exists, falling back
    /// to `~/Library/Application Support/com.flexctl.flexctl/config.toml`.
    ///
    /// On Linux: ~/.config/flexctl/config.toml
    /// On Windows: %APPDATA%\flexctl\flexctl\config.toml
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Local context file, next to the configuration file
    pub fn local_context_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("local_context.toml"))
    }

    fn config_dir() -> Result<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            if let Some(base_dirs) = BaseDirs::new() {
                let linux_style = base_dirs.home_dir().join(".config").join("flexctl");
                if linux_style.exists() {
                    return Ok(linux_style);
                }
            }
        }

        let proj_dirs =
            ProjectDirs::from("com", "flexctl", "flexctl").ok_or(ConfigError::ConfigDirError)?;

        Ok(proj_dirs.config_dir().to_path_buf())
    }

    /// Expand environment variables in configuration content
    ///
    /// Supports ${VAR} and ${VAR:-default} syntax, e.g.
    /// ```toml
    /// client_secret = "${AZURE_CLIENT_SECRET}"
    /// endpoint = "${FLEXCTL_ENDPOINT:-https://management.azure.com}"
    /// ```
    fn expand_env_vars(content: &str) -> String {
        // Unset variables are left as-is so unused profiles don't fail to load
        let expanded =
            shellexpand::env_with_context_no_errors(content, |var| std::env::var(var).ok());
        expanded.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sp_profile() -> Profile {
        Profile {
            subscription_id: "sub-1".to_string(),
            credentials: ProfileCredentials::ServicePrincipal {
                tenant_id: "tenant".to_string(),
                client_id: "client".to_string(),
                client_secret: "secret".to_string(),
            },
            endpoint: None,
            authority: None,
        }
    }

    fn token_profile() -> Profile {
        Profile {
            subscription_id: "sub-2".to_string(),
            credentials: ProfileCredentials::AccessToken {
                access_token: "eyJ0eXAi".to_string(),
            },
            endpoint: Some("http://localhost:8080".to_string()),
            authority: None,
        }
    }

    #[test]
    fn test_config_serialization() {
        let mut config = Config::default();
        config.set_profile("work".to_string(), sp_profile());
        config.default_profile = Some("work".to_string());

        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();

        assert_eq!(config.default_profile, deserialized.default_profile);
        assert_eq!(config.profiles.len(), deserialized.profiles.len());
        assert!(deserialized.param_persist);
        assert_eq!(
            deserialized.profiles["work"].auth_kind(),
            "service-principal"
        );
    }

    #[test]
    fn test_access_token_profile_round_trips_untagged() {
        let content = r#"
[profiles.dev]
subscription_id = "sub-2"
access_token = "abc"
endpoint = "http://localhost:8080"
"#;
        let config: Config = toml::from_str(content).unwrap();
        let profile = &config.profiles["dev"];
        assert_eq!(profile.auth_kind(), "access-token");
        assert!(profile.service_principal().is_none());
        assert_eq!(profile.endpoint.as_deref(), Some("http://localhost:8080"));
    }

    #[test]
    fn test_param_persist_can_be_disabled() {
        let config: Config = toml::from_str("param_persist = false").unwrap();
        assert!(!config.param_persist);
    }

    #[test]
    fn test_resolve_profile_explicit() {
        let mut config = Config::default();
        config.set_profile("a".to_string(), sp_profile());
        config.set_profile("b".to_string(), token_profile());

        assert_eq!(config.resolve_profile(Some("b")).unwrap(), "b");
        assert!(matches!(
            config.resolve_profile(Some("missing")),
            Err(ConfigError::ProfileNotFound { .. })
        ));
    }

    #[test]
    fn test_resolve_profile_default_and_single() {
        let mut config = Config::default();
        assert!(matches!(
            config.resolve_profile(None),
            Err(ConfigError::NoProfiles { .. })
        ));

        config.set_profile("only".to_string(), sp_profile());
        assert_eq!(config.resolve_profile(None).unwrap(), "only");

        config.set_profile("other".to_string(), token_profile());
        assert!(matches!(
            config.resolve_profile(None),
            Err(ConfigError::AmbiguousProfile { .. })
        ));

        config.default_profile = Some("other".to_string());
        assert_eq!(config.resolve_profile(None).unwrap(), "other");
    }

    #[test]
    fn test_remove_default_profile_clears_default() {
        let mut config = Config::default();
        config.set_profile("a".to_string(), sp_profile());
        config.default_profile = Some("a".to_string());

        assert!(config.remove_profile("a").is_some());
        assert!(config.default_profile.is_none());
    }

    #[test]
    #[serial_test::serial]
    fn test_resolve_credential_plaintext() {
        unsafe {
            env::remove_var(ENV_CLIENT_SECRET);
            env::remove_var(ENV_TENANT_ID);
            env::remove_var(ENV_CLIENT_ID);
        }
        match sp_profile().resolve_credential().unwrap() {
            Credential::ClientSecret { client_secret, .. } => assert_eq!(client_secret, "secret"),
            other => panic!("unexpected credential {:?}", other),
        }
    }

    #[test]
    #[serial_test::serial]
    fn test_env_var_expansion() {
        unsafe {
            env::set_var("TEST_FLEX_SECRET", "from-env");
        }

        let content = r#"
[profiles.test]
subscription_id = "sub"
tenant_id = "t"
client_id = "c"
client_secret = "${TEST_FLEX_SECRET}"
"#;
        let expanded = Config::expand_env_vars(content);
        assert!(expanded.contains("from-env"));

        unsafe {
            env::remove_var("TEST_FLEX_SECRET");
        }
    }

    #[test]
    #[serial_test::serial]
    fn test_env_var_expansion_with_defaults() {
        unsafe {
            env::remove_var("FLEXCTL_UNSET_ENDPOINT");
        }
        let expanded =
            Config::expand_env_vars("endpoint = \"${FLEXCTL_UNSET_ENDPOINT:-https://management.azure.com}\"");
        assert!(expanded.contains("https://management.azure.com"));
    }

    #[test]
    #[serial_test::serial]
    fn test_env_credentials() {
        unsafe {
            env::remove_var(ENV_ACCESS_TOKEN);
            env::remove_var(ENV_TENANT_ID);
            env::remove_var(ENV_CLIENT_ID);
            env::remove_var(ENV_CLIENT_SECRET);
            env::set_var(ENV_SUBSCRIPTION_ID, "env-sub");
        }
        assert!(EnvCredentials::from_env().is_none());

        unsafe {
            env::set_var(ENV_ACCESS_TOKEN, "tok");
        }
        let creds = EnvCredentials::from_env().unwrap();
        assert_eq!(creds.subscription_id, "env-sub");
        assert!(matches!(creds.credential, Credential::AccessToken(t) if t == "tok"));

        unsafe {
            env::remove_var(ENV_ACCESS_TOKEN);
            env::remove_var(ENV_SUBSCRIPTION_ID);
        }
    }
}
