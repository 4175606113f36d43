//! Error types for flexctl
//!
//! Defines structured error types using thiserror for better error handling and user experience.

use colored::Colorize;
use flexctl_core::config::ConfigError;
use flexctl_core::{ArmError, CoreError};
use thiserror::Error;

/// Cargo-style diagnostic formatter for CLI errors.
///
/// Produces structured output like:
/// ```text
/// error: Incorrectly formed Subnet id: 'db'.
///
///   tip: pass the subnet name together with --vnet:
///       flexctl mysql flexible-server create --vnet myvnet --subnet db
/// ```
pub struct CliDiagnostic {
    message: String,
    detail: Option<String>,
    tips: Vec<(String, Vec<String>)>,
}

impl CliDiagnostic {
    /// Start a new error diagnostic with the given message.
    pub fn error(message: &str) -> Self {
        Self {
            message: message.to_string(),
            detail: None,
            tips: Vec::new(),
        }
    }

    /// Add a detail line below the error message.
    pub fn detail(mut self, text: &str) -> Self {
        self.detail = Some(text.to_string());
        self
    }

    /// Add a tip with optional example commands.
    pub fn tip(mut self, description: &str, commands: &[&str]) -> Self {
        self.tips.push((
            description.to_string(),
            commands.iter().map(|s| s.to_string()).collect(),
        ));
        self
    }

    /// Print the diagnostic to stderr with colored formatting.
    pub fn print(&self) {
        eprint!("{}{}", "error".red().bold(), ": ".bold());
        eprintln!("{}", self.message);

        if let Some(detail) = &self.detail {
            eprintln!("  {}", detail);
        }

        for (description, commands) in &self.tips {
            eprintln!();
            eprint!("  {}{}", "tip".yellow().bold(), ": ".bold());
            eprintln!("{}", description);
            for cmd in commands {
                eprintln!("      {}", cmd);
            }
        }
    }
}

/// Main error type for the flexctl application
#[derive(Error, Debug)]
pub enum FlexCtlError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("No profile configured. Use 'flexctl profile set' to configure a profile.")]
    NoProfileConfigured,

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// Fault reported by the management API
    #[error("{message}")]
    ApiError {
        code: Option<String>,
        message: String,
    },

    #[error("{message}")]
    NotFound { message: String },

    /// Bad combination of --vnet/--subnet/prefix arguments
    #[error("{message}")]
    NetworkUsage { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Connection error: {message}")]
    ConnectionError { message: String },

    #[error("Timeout: {message}")]
    Timeout { message: String },

    #[error("Output formatting error: {message}")]
    OutputError { message: String },
}

/// Result type for flexctl operations
pub type Result<T> = std::result::Result<T, FlexCtlError>;

impl FlexCtlError {
    /// Get helpful suggestions for resolving this error
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            FlexCtlError::ProfileNotFound { name } => vec![
                "List available profiles: flexctl profile list".to_string(),
                format!(
                    "Create profile '{}': flexctl profile set {} --subscription-id <id> --access-token <token>",
                    name, name
                ),
            ],
            FlexCtlError::NoProfileConfigured => vec![
                "Create a service principal profile: flexctl profile set <name> --subscription-id <id> --tenant-id <tenant> --client-id <app>".to_string(),
                "Or export AZURE_SUBSCRIPTION_ID with AZURE_ACCESS_TOKEN".to_string(),
            ],
            FlexCtlError::AuthenticationFailed { .. } => vec![
                "Check your credentials: flexctl profile show <profile>".to_string(),
                "Verify the service principal has access to the subscription".to_string(),
            ],
            FlexCtlError::ConnectionError { .. } => vec![
                "Check network connectivity".to_string(),
                "Verify the management endpoint: flexctl profile show <profile>".to_string(),
            ],
            FlexCtlError::NotFound { .. } => vec![
                "Check the resource group and server name".to_string(),
                "List servers: flexctl <engine> flexible-server list".to_string(),
            ],
            FlexCtlError::NetworkUsage { message } if message.contains("Subnet id") => vec![
                "Pass the subnet name together with --vnet, or the full subnet resource id".to_string(),
            ],
            FlexCtlError::NetworkUsage { message } if message.contains("address space") => vec![
                "Choose a --subnet-address-prefix inside the vnet address space".to_string(),
            ],
            FlexCtlError::NetworkUsage { .. } => vec![
                "Vnet, subnet and server must share subscription, resource group and location".to_string(),
                "See examples: flexctl <engine> flexible-server create --help".to_string(),
            ],
            FlexCtlError::InvalidInput { .. } => vec![
                "Check the command syntax: flexctl <command> --help".to_string(),
            ],
            FlexCtlError::Timeout { .. } => vec![
                "The operation may still complete; check with: flexctl <engine> flexible-server show".to_string(),
            ],
            _ => vec![],
        }
    }

    /// Print a cargo-style diagnostic to stderr using colored formatting.
    pub fn print_diagnostic(&self) {
        let mut diag = CliDiagnostic::error(&format!("{}", self));

        if let FlexCtlError::ApiError {
            code: Some(code), ..
        } = self
        {
            diag = diag.detail(&format!("code: {}", code));
        }

        for suggestion in self.suggestions() {
            diag = diag.tip(&suggestion, &[]);
        }

        diag.print();
    }
}

impl From<ArmError> for FlexCtlError {
    fn from(err: ArmError) -> Self {
        if let ArmError::Auth(message) = err {
            return FlexCtlError::AuthenticationFailed { message };
        }
        if err.is_unauthorized() {
            return FlexCtlError::AuthenticationFailed {
                message: err.to_string(),
            };
        }
        if err.is_not_found() {
            return FlexCtlError::NotFound {
                message: err.to_string(),
            };
        }
        match err {
            ArmError::Http(e) => FlexCtlError::ConnectionError {
                message: e.to_string(),
            },
            ArmError::OperationTimeout { .. } => FlexCtlError::Timeout {
                message: err.to_string(),
            },
            ArmError::Configuration(message) => FlexCtlError::Configuration(message),
            other => FlexCtlError::ApiError {
                code: other.code().map(str::to_string),
                message: other.to_string(),
            },
        }
    }
}

impl From<ConfigError> for FlexCtlError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::ProfileNotFound { name } => FlexCtlError::ProfileNotFound { name },
            ConfigError::NoProfiles { .. } => FlexCtlError::NoProfileConfigured,
            other => FlexCtlError::Configuration(other.to_string()),
        }
    }
}

impl From<CoreError> for FlexCtlError {
    fn from(err: CoreError) -> Self {
        if err.is_network_usage() {
            return FlexCtlError::NetworkUsage {
                message: err.to_string(),
            };
        }
        match err {
            CoreError::Arm(e) => FlexCtlError::from(e),
            CoreError::Config(e) => FlexCtlError::from(e),
            CoreError::Validation(message) => FlexCtlError::InvalidInput { message },
            e @ CoreError::ServerNotFound { .. } => FlexCtlError::NotFound {
                message: e.to_string(),
            },
            other => FlexCtlError::InvalidInput {
                message: other.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for FlexCtlError {
    fn from(err: serde_json::Error) -> Self {
        FlexCtlError::OutputError {
            message: format!("JSON error: {}", err),
        }
    }
}

impl From<std::io::Error> for FlexCtlError {
    fn from(err: std::io::Error) -> Self {
        FlexCtlError::OutputError {
            message: format!("IO error: {}", err),
        }
    }
}

impl From<anyhow::Error> for FlexCtlError {
    fn from(err: anyhow::Error) -> Self {
        FlexCtlError::Configuration(format!("{:#}", err))
    }
}
