//! Profile management command implementations

use anyhow::Context;
use colored::Colorize;
use flexctl_core::config::{Config, CredentialStore, Profile, ProfileCredentials};
use tracing::{debug, info, trace, warn};

use crate::cli::{OutputFormat, ProfileCommands};
use crate::commands::utils::confirm_action;
use crate::connection::ConnectionManager;
use crate::error::{FlexCtlError, Result as CliResult};
use crate::output;

/// Handle profile management commands
pub fn handle_profile_command(
    profile_cmd: &ProfileCommands,
    conn_mgr: &ConnectionManager,
    output_format: OutputFormat,
) -> CliResult<()> {
    use ProfileCommands::*;

    match profile_cmd {
        List => handle_list(conn_mgr, output_format),
        Path => handle_path(conn_mgr, output_format),
        Show { name } => handle_show(conn_mgr, name, output_format),
        Set {
            name,
            subscription_id,
            tenant_id,
            client_id,
            client_secret,
            access_token,
            endpoint,
            authority,
            #[cfg(feature = "secure-storage")]
            use_keyring,
        } => {
            let request = SetRequest {
                name,
                subscription_id,
                tenant_id: tenant_id.as_deref(),
                client_id: client_id.as_deref(),
                client_secret: client_secret.as_deref(),
                access_token: access_token.as_deref(),
                endpoint: endpoint.as_deref(),
                authority: authority.as_deref(),
                #[cfg(feature = "secure-storage")]
                use_keyring: *use_keyring,
            };
            handle_set(conn_mgr, &request)
        }
        Remove { name, yes } => handle_remove(conn_mgr, name, *yes),
        Default { name } => handle_default(conn_mgr, name),
    }
}

fn config_path_display(conn_mgr: &ConnectionManager) -> Option<String> {
    conn_mgr
        .config_path
        .as_ref()
        .map(|p| p.display().to_string())
        .or_else(|| Config::config_path().ok().map(|p| p.display().to_string()))
}

/// Short preview of a secret; keyring references are shown as such
fn mask_secret(value: &str) -> String {
    if CredentialStore::is_keyring_reference(value) {
        return "(stored in keyring)".to_string();
    }
    let preview: String = value.chars().take(4).collect();
    format!("{}...", preview)
}

fn profile_json(name: &str, profile: &Profile, is_default: bool) -> serde_json::Value {
    let mut obj = serde_json::json!({
        "name": name,
        "auth": profile.auth_kind(),
        "subscription_id": profile.subscription_id,
        "is_default": is_default,
    });
    match &profile.credentials {
        ProfileCredentials::ServicePrincipal {
            tenant_id,
            client_id,
            client_secret,
        } => {
            obj["tenant_id"] = serde_json::json!(tenant_id);
            obj["client_id"] = serde_json::json!(client_id);
            obj["client_secret_preview"] = serde_json::json!(mask_secret(client_secret));
        }
        ProfileCredentials::AccessToken { access_token } => {
            obj["access_token_preview"] = serde_json::json!(mask_secret(access_token));
        }
    }
    if let Some(endpoint) = &profile.endpoint {
        obj["endpoint"] = serde_json::json!(endpoint);
    }
    if let Some(authority) = &profile.authority {
        obj["authority"] = serde_json::json!(authority);
    }
    obj
}

fn structured_format(output_format: OutputFormat) -> Option<output::OutputFormat> {
    match output_format {
        OutputFormat::Json => Some(output::OutputFormat::Json),
        OutputFormat::Yaml => Some(output::OutputFormat::Yaml),
        _ => None,
    }
}

fn handle_list(conn_mgr: &ConnectionManager, output_format: OutputFormat) -> CliResult<()> {
    debug!("Listing all configured profiles");
    let profiles = conn_mgr.config.list_profiles();
    trace!("Found {} profiles", profiles.len());
    let default_name = conn_mgr.config.default_profile.as_deref();

    if let Some(fmt) = structured_format(output_format) {
        let profile_list: Vec<serde_json::Value> = profiles
            .iter()
            .map(|(name, profile)| profile_json(name, profile, default_name == Some(name.as_str())))
            .collect();
        let output_data = serde_json::json!({
            "config_path": config_path_display(conn_mgr),
            "profiles": profile_list,
            "count": profiles.len(),
        });
        output::print_output(&output_data, fmt, None)?;
        return Ok(());
    }

    if let Some(path) = config_path_display(conn_mgr) {
        println!("Configuration file: {}", path);
        println!();
    }

    if profiles.is_empty() {
        info!("No profiles configured");
        println!("No profiles configured.");
        println!("Use 'flexctl profile set' to create a profile.");
        return Ok(());
    }

    for (name, profile) in &profiles {
        if default_name == Some(name.as_str()) {
            println!("  {} {}", name.bold().cyan(), "(default)".green());
        } else {
            println!("  {}", name.bold().cyan());
        }
        println!(
            "    {} {}  {} {}",
            "Subscription:".dimmed(),
            profile.subscription_id,
            "Auth:".dimmed(),
            profile.auth_kind()
        );
    }
    Ok(())
}

fn handle_path(conn_mgr: &ConnectionManager, output_format: OutputFormat) -> CliResult<()> {
    let path = config_path_display(conn_mgr).ok_or_else(|| {
        FlexCtlError::Configuration("Failed to determine config directory".to_string())
    })?;

    match structured_format(output_format) {
        Some(fmt) => output::print_output(serde_json::json!({ "config_path": path }), fmt, None)?,
        None => println!("{}", path),
    }
    Ok(())
}

fn handle_show(
    conn_mgr: &ConnectionManager,
    name: &str,
    output_format: OutputFormat,
) -> CliResult<()> {
    let profile = conn_mgr.config.profile(name)?;
    let is_default = conn_mgr.config.default_profile.as_deref() == Some(name);

    if let Some(fmt) = structured_format(output_format) {
        output::print_output(profile_json(name, profile, is_default), fmt, None)?;
        return Ok(());
    }

    println!("Profile: {}", name);
    if is_default {
        println!("Default: yes");
    }
    println!("Subscription: {}", profile.subscription_id);
    println!("Auth: {}", profile.auth_kind());
    match &profile.credentials {
        ProfileCredentials::ServicePrincipal {
            tenant_id,
            client_id,
            client_secret,
        } => {
            println!("Tenant ID: {}", tenant_id);
            println!("Client ID: {}", client_id);
            println!("Client Secret: {}", mask_secret(client_secret));
        }
        ProfileCredentials::AccessToken { access_token } => {
            println!("Access Token: {}", mask_secret(access_token));
        }
    }
    if let Some(endpoint) = &profile.endpoint {
        println!("Endpoint: {}", endpoint);
    }
    if let Some(authority) = &profile.authority {
        println!("Authority: {}", authority);
    }
    Ok(())
}

/// Arguments of `profile set`
struct SetRequest<'a> {
    name: &'a str,
    subscription_id: &'a str,
    tenant_id: Option<&'a str>,
    client_id: Option<&'a str>,
    client_secret: Option<&'a str>,
    access_token: Option<&'a str>,
    endpoint: Option<&'a str>,
    authority: Option<&'a str>,
    #[cfg(feature = "secure-storage")]
    use_keyring: bool,
}

impl SetRequest<'_> {
    /// Store `value` in the OS keyring when requested, returning what goes in the file
    fn stored(&self, suffix: &str, value: String) -> CliResult<String> {
        #[cfg(feature = "secure-storage")]
        if self.use_keyring {
            let reference = CredentialStore::new()
                .store_credential(&format!("{}-{}", self.name, suffix), &value)
                .with_context(|| format!("Failed to store {} in keyring", suffix))?;
            println!("{} stored securely in OS keyring", suffix);
            return Ok(reference);
        }
        #[cfg(not(feature = "secure-storage"))]
        let _ = suffix;
        Ok(value)
    }

    fn credentials(&self) -> CliResult<ProfileCredentials> {
        match (self.tenant_id, self.client_id, self.access_token) {
            (Some(tenant_id), Some(client_id), None) => {
                let secret = match self.client_secret {
                    Some(secret) => secret.to_string(),
                    None => rpassword::prompt_password("Client secret: ")
                        .context("Failed to read client secret")?,
                };
                if secret.is_empty() {
                    return Err(FlexCtlError::InvalidInput {
                        message: "Client secret must not be empty".to_string(),
                    });
                }
                Ok(ProfileCredentials::ServicePrincipal {
                    tenant_id: tenant_id.to_string(),
                    client_id: client_id.to_string(),
                    client_secret: self.stored("client-secret", secret)?,
                })
            }
            (None, None, Some(token)) => Ok(ProfileCredentials::AccessToken {
                access_token: self.stored("access-token", token.to_string())?,
            }),
            _ => Err(FlexCtlError::InvalidInput {
                message: "Provide either --tenant-id with --client-id, or --access-token"
                    .to_string(),
            }),
        }
    }
}

fn handle_set(conn_mgr: &ConnectionManager, request: &SetRequest<'_>) -> CliResult<()> {
    debug!("Setting profile: {}", request.name);

    if conn_mgr.config.profiles.contains_key(request.name) {
        println!(
            "Profile '{}' already exists and will be replaced.",
            request.name
        );
    }

    let profile = Profile {
        subscription_id: request.subscription_id.to_string(),
        credentials: request.credentials()?,
        endpoint: request.endpoint.map(str::to_string),
        authority: request.authority.map(str::to_string),
    };

    let mut mgr = conn_mgr.clone();
    mgr.config.set_profile(request.name.to_string(), profile);

    // The first profile becomes the default
    if mgr.config.default_profile.is_none() && mgr.config.profiles.len() == 1 {
        mgr.config.default_profile = Some(request.name.to_string());
        println!("Set as default profile.");
    }

    mgr.save_config()?;

    println!("Profile '{}' saved successfully.", request.name);
    if let Some(path) = config_path_display(conn_mgr) {
        println!("Configuration saved to: {}", path);
    }
    Ok(())
}

fn handle_remove(conn_mgr: &ConnectionManager, name: &str, yes: bool) -> CliResult<()> {
    debug!("Removing profile: {}", name);

    if !conn_mgr.config.profiles.contains_key(name) {
        return Err(FlexCtlError::ProfileNotFound { name: name.into() });
    }

    let is_default = conn_mgr.config.default_profile.as_deref() == Some(name);
    if is_default {
        println!("Warning: '{}' is the default profile.", name);
    }

    if !yes && !confirm_action(&format!("remove profile '{}'", name))? {
        println!("Profile removal cancelled.");
        return Ok(());
    }

    let mut mgr = conn_mgr.clone();
    if let Some(removed) = mgr.config.remove_profile(name) {
        let secret = match &removed.credentials {
            ProfileCredentials::ServicePrincipal { client_secret, .. } => client_secret,
            ProfileCredentials::AccessToken { access_token } => access_token,
        };
        if let Err(e) = CredentialStore::new().delete_credential(secret) {
            warn!("Could not remove keyring entry for '{}': {}", name, e);
        }
    }
    mgr.save_config()?;

    if is_default {
        println!("Default profile cleared.");
    }
    println!("Profile '{}' removed successfully.", name);
    Ok(())
}

fn handle_default(conn_mgr: &ConnectionManager, name: &str) -> CliResult<()> {
    debug!("Setting default profile: {}", name);
    conn_mgr.config.profile(name)?;

    let mut mgr = conn_mgr.clone();
    mgr.config.default_profile = Some(name.to_string());
    mgr.save_config()?;

    println!("Default profile set to '{}'.", name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("abcdefgh"), "abcd...");
        assert_eq!(mask_secret("ab"), "ab...");
        assert_eq!(mask_secret("keyring:dev-client-secret"), "(stored in keyring)");
    }

    #[test]
    fn test_profile_json_hides_secret() {
        let profile = Profile {
            subscription_id: "sub".to_string(),
            credentials: ProfileCredentials::ServicePrincipal {
                tenant_id: "tenant".to_string(),
                client_id: "app".to_string(),
                client_secret: "supersecretvalue".to_string(),
            },
            endpoint: None,
            authority: None,
        };
        let json = profile_json("dev", &profile, true);
        assert_eq!(json["auth"], "service-principal");
        assert_eq!(json["client_secret_preview"], "supe...");
        assert!(!json.to_string().contains("supersecretvalue"));
    }

    #[test]
    fn test_access_token_request() {
        let request = SetRequest {
            name: "ci",
            subscription_id: "sub",
            tenant_id: None,
            client_id: None,
            client_secret: None,
            access_token: Some("token"),
            endpoint: None,
            authority: None,
            #[cfg(feature = "secure-storage")]
            use_keyring: false,
        };
        assert!(matches!(
            request.credentials().unwrap(),
            ProfileCredentials::AccessToken { ref access_token } if access_token == "token"
        ));
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let request = SetRequest {
            name: "bad",
            subscription_id: "sub",
            tenant_id: None,
            client_id: None,
            client_secret: None,
            access_token: None,
            endpoint: None,
            authority: None,
            #[cfg(feature = "secure-storage")]
            use_keyring: false,
        };
        assert!(request.credentials().is_err());
    }
}
