//! CLI structure and command definitions
//!
//! Engine commands mirror each other: `flexctl mysql flexible-server ...` and
//! `flexctl postgres flexible-server ...` accept the same arguments.

use clap::{Parser, Subcommand};

pub mod flexible_server;

pub use flexible_server::*;

/// Azure Database flexible server management CLI
#[derive(Parser, Debug)]
#[command(name = "flexctl")]
#[command(
    version,
    about = "Provision and manage Azure Database for MySQL and PostgreSQL flexible servers"
)]
#[command(long_about = "
Provision and manage Azure Database for MySQL and PostgreSQL flexible servers

Omitted arguments are generated or taken from the local context:
    flexctl mysql flexible-server create          # everything generated
    flexctl mysql flexible-server show            # last server created

EXAMPLES:
    # Set up a profile with a service principal (secret is prompted)
    flexctl profile set dev --subscription-id SUB --tenant-id TENANT --client-id APP

    # Create a PostgreSQL server inside a new delegated subnet
    flexctl postgres flexible-server create -g mygroup -n mypg --vnet myvnet --subnet mysubnet

    # Reuse an existing subnet by id
    flexctl mysql flexible-server create -g mygroup --subnet /subscriptions/.../subnets/db

    # Get JSON output for scripting
    flexctl mysql flexible-server list -o json

    # Filter output with JMESPath
    flexctl postgres flexible-server list -q '[].name'

For more help on a specific command, run:
    flexctl <command> --help
")]
pub struct Cli {
    /// Profile to use for this command
    #[arg(long, short, global = true, env = "FLEXCTL_PROFILE")]
    pub profile: Option<String>,

    /// Path to alternate configuration file
    #[arg(long, global = true, env = "FLEXCTL_CONFIG_FILE")]
    pub config_file: Option<String>,

    /// Output format
    #[arg(long, short = 'o', global = true, value_enum, default_value = "auto")]
    pub output: OutputFormat,

    /// JMESPath query to filter output
    #[arg(long, short = 'q', global = true)]
    pub query: Option<String>,

    /// Enable verbose logging
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Automatically choose format based on command and context
    Auto,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
    /// Human-readable table format
    Table,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Azure Database for MySQL
    #[command(subcommand)]
    Mysql(EngineCommands),

    /// Azure Database for PostgreSQL
    #[command(subcommand, visible_alias = "postgresql")]
    Postgres(EngineCommands),

    /// Profile management
    #[command(subcommand, visible_alias = "prof")]
    #[command(after_help = "EXAMPLES:
    # Service principal profile (secret prompted when omitted)
    flexctl profile set dev --subscription-id SUB --tenant-id TENANT --client-id APP

    # Pre-issued access token
    flexctl profile set ci --subscription-id SUB --access-token TOKEN

    # List, inspect and choose the default
    flexctl profile list
    flexctl profile show dev
    flexctl profile default dev
")]
    Profile(ProfileCommands),

    /// Remembered resource group, location and server name
    #[command(subcommand, name = "local-context", visible_alias = "lc")]
    LocalContext(LocalContextCommands),

    /// Version information
    #[command(visible_alias = "ver")]
    Version,

    /// Generate shell completions
    #[command(visible_alias = "comp")]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Commands available under each engine
#[derive(Subcommand, Debug)]
pub enum EngineCommands {
    /// Manage flexible servers
    #[command(subcommand, name = "flexible-server", visible_alias = "fs")]
    FlexibleServer(FlexibleServerCommands),
}

/// Supported shells for completion generation
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bourne Again Shell
    Bash,
    /// Z Shell
    Zsh,
    /// Friendly Interactive Shell
    Fish,
    /// PowerShell
    #[value(name = "powershell", alias = "power-shell")]
    PowerShell,
    /// Elvish
    Elvish,
}

/// Profile management commands
#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// List all configured profiles
    #[command(visible_alias = "ls")]
    List,

    /// Show the path to the configuration file
    Path,

    /// Show details of a specific profile
    #[command(visible_alias = "get")]
    Show {
        /// Profile name to show
        name: String,
    },

    /// Set or create a profile
    #[command(visible_alias = "add")]
    Set {
        /// Profile name
        name: String,

        /// Subscription the profile operates on
        #[arg(long)]
        subscription_id: String,

        /// Directory (tenant) id of the service principal
        #[arg(long, requires = "client_id", conflicts_with = "access_token")]
        tenant_id: Option<String>,

        /// Application (client) id of the service principal
        #[arg(long, requires = "tenant_id")]
        client_id: Option<String>,

        /// Client secret (prompted when omitted)
        #[arg(long, requires = "client_id")]
        client_secret: Option<String>,

        /// Pre-issued bearer token instead of a service principal
        #[arg(long)]
        access_token: Option<String>,

        /// Management endpoint override
        #[arg(long)]
        endpoint: Option<String>,

        /// Identity authority override
        #[arg(long)]
        authority: Option<String>,

        /// Store secrets in OS keyring instead of config file
        #[cfg(feature = "secure-storage")]
        #[arg(long)]
        use_keyring: bool,
    },

    /// Remove a profile
    #[command(visible_alias = "rm")]
    Remove {
        /// Profile name to remove
        name: String,

        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },

    /// Set the default profile
    Default {
        /// Profile name to use when --profile is not given
        name: String,
    },
}

/// Local context commands
#[derive(Subcommand, Debug)]
pub enum LocalContextCommands {
    /// Show remembered values
    Show,
    /// Forget every remembered value
    Clear,
    /// Start remembering values
    On,
    /// Stop reading and writing remembered values
    Off,
}
