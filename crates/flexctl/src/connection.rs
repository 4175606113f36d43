//! Connection management for Azure Resource Manager clients

use crate::error::Result as CliResult;
use anyhow::Context;
use flexctl_core::config::{Config, EnvCredentials, FileSettingsStore};
use flexctl_core::{ArmClient, Credential, ProgressCallback};
use std::path::PathBuf;
use tracing::{debug, info, trace};

/// Connection manager for creating authenticated clients
#[derive(Clone)]
pub struct ConnectionManager {
    pub config: Config,
    pub config_path: Option<PathBuf>,
}

/// Everything needed to build a client, after profile and environment resolution
struct ResolvedConnection {
    subscription_id: String,
    credential: Credential,
    endpoint: Option<String>,
    authority: Option<String>,
}

impl ConnectionManager {
    /// Create a new connection manager with a custom config path
    pub fn with_config_path(config: Config, config_path: Option<PathBuf>) -> Self {
        Self {
            config,
            config_path,
        }
    }

    /// Save the configuration to the appropriate location
    pub fn save_config(&self) -> CliResult<()> {
        if let Some(ref path) = self.config_path {
            self.config
                .save_to_path(path)
                .context("Failed to save configuration")?;
        } else {
            self.config.save().context("Failed to save configuration")?;
        }
        Ok(())
    }

    /// Create an ARM client from profile credentials with environment variable support
    ///
    /// When --config-file is explicitly specified, a complete set of `AZURE_*` environment
    /// variables is not used in place of the profile, so isolated configs stay isolated.
    pub fn create_client(
        &self,
        profile_name: Option<&str>,
        on_progress: Option<ProgressCallback>,
    ) -> CliResult<ArmClient> {
        debug!("Creating ARM client");
        trace!("Profile name: {:?}", profile_name);

        let resolved = self.resolve(profile_name)?;
        debug!("Using subscription {}", resolved.subscription_id);

        let mut builder = ArmClient::builder()
            .subscription_id(resolved.subscription_id)
            .credential(resolved.credential);
        if let Some(endpoint) = resolved.endpoint {
            debug!("Using management endpoint override: {}", endpoint);
            builder = builder.endpoint(endpoint);
        }
        if let Some(authority) = resolved.authority {
            builder = builder.authority(authority);
        }
        if let Some(callback) = on_progress {
            builder = builder.on_progress(callback);
        }

        Ok(builder.build()?)
    }

    fn resolve(&self, profile_name: Option<&str>) -> CliResult<ResolvedConnection> {
        let use_env_vars = self.config_path.is_none();
        if !use_env_vars {
            info!("--config-file specified explicitly, ignoring environment credentials");
        }

        // An explicit --profile always wins over ambient environment credentials
        if use_env_vars
            && profile_name.is_none()
            && let Some(env) = EnvCredentials::from_env()
        {
            info!("Using Azure credentials from environment variables");
            return Ok(ResolvedConnection {
                subscription_id: env.subscription_id,
                credential: env.credential,
                endpoint: None,
                authority: None,
            });
        }

        let resolved_profile_name = self.config.resolve_profile(profile_name)?;
        info!("Using profile: {}", resolved_profile_name);
        let profile = self.config.profile(&resolved_profile_name)?;

        Ok(ResolvedConnection {
            subscription_id: profile.resolve_subscription_id()?,
            credential: profile.resolve_credential()?,
            endpoint: profile.endpoint.clone(),
            authority: profile.authority.clone(),
        })
    }

    /// Local context file: next to an explicit config file, or in the config directory
    pub fn local_context_path(&self) -> CliResult<PathBuf> {
        match &self.config_path {
            Some(path) => Ok(path.with_file_name("local_context.toml")),
            None => Ok(Config::local_context_path()?),
        }
    }

    /// Open the local context honouring the config-level `param_persist` switch
    pub fn settings_store(&self) -> CliResult<FileSettingsStore> {
        let path = self.local_context_path()?;
        trace!("Local context path: {:?}", path);
        Ok(FileSettingsStore::open(&path, self.config.param_persist)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flexctl_core::config::{Profile, ProfileCredentials};

    fn manager(dir: &tempfile::TempDir) -> ConnectionManager {
        let mut config = Config::default();
        config.set_profile(
            "dev".to_string(),
            Profile {
                subscription_id: "sub-1".to_string(),
                credentials: ProfileCredentials::AccessToken {
                    access_token: "token".to_string(),
                },
                endpoint: Some("http://127.0.0.1:9/".to_string()),
                authority: None,
            },
        );
        ConnectionManager::with_config_path(config, Some(dir.path().join("config.toml")))
    }

    #[test]
    fn test_local_context_next_to_explicit_config() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(&dir);
        assert_eq!(
            mgr.local_context_path().unwrap(),
            dir.path().join("local_context.toml")
        );
    }

    #[test]
    fn test_single_profile_builds_client() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(&dir);
        assert!(mgr.create_client(None, None).is_ok());
    }

    #[test]
    fn test_unknown_profile_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(&dir);
        let err = mgr.create_client(Some("prod"), None).unwrap_err();
        assert!(matches!(
            err,
            crate::error::FlexCtlError::ProfileNotFound { ref name } if name == "prod"
        ));
    }
}
