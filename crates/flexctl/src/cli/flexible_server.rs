//! Flexible server command definitions

use clap::{Args, Subcommand};

/// Resource group and server name; both fall back to the local context
#[derive(Args, Debug, Clone)]
pub struct ServerTarget {
    /// Resource group of the server
    #[arg(long, short = 'g')]
    pub resource_group: Option<String>,

    /// Server name
    #[arg(long, short = 'n')]
    pub name: Option<String>,
}

/// Flexible server commands
#[derive(Subcommand, Debug)]
pub enum FlexibleServerCommands {
    /// Create a server (returns the existing server when the name is taken)
    #[command(after_help = "EXAMPLES:
    # Everything generated: resource group, name, admin user and password
    flexctl mysql flexible-server create

    # Inside a new or existing vnet/subnet, delegated to the engine
    flexctl postgres flexible-server create -g rg -n pg1 --vnet appvnet --subnet dbsubnet

    # Custom address space for newly created networks
    flexctl postgres flexible-server create -g rg -n pg1 --vnet appvnet --subnet dbsubnet \\
        --vnet-address-prefix 10.1.0.0/16 --subnet-address-prefix 10.1.0.0/24

    # Existing subnet by resource id
    flexctl mysql flexible-server create -g rg --subnet /subscriptions/SUB/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/v/subnets/s

    # Dedicated vnet named after the server
    flexctl mysql flexible-server create -g rg -n my1 --vnet-auto
")]
    Create(CreateArgs),

    /// Show a server
    Show(ServerTarget),

    /// Update sku, storage, backup retention, password or tags
    Update(UpdateArgs),

    /// Delete a server
    #[command(visible_alias = "rm")]
    Delete {
        #[command(flatten)]
        target: ServerTarget,

        /// Do not prompt for confirmation
        #[arg(long, short)]
        yes: bool,
    },

    /// Start a stopped server
    Start(ServerTarget),

    /// Stop a running server
    Stop(ServerTarget),

    /// Restart a server
    Restart(ServerTarget),

    /// List servers in a resource group or the whole subscription
    #[command(visible_alias = "ls")]
    List {
        /// Only servers in this resource group
        #[arg(long, short = 'g')]
        resource_group: Option<String>,
    },

    /// List available skus and versions in a location
    #[command(name = "list-skus")]
    ListSkus {
        /// Location (defaults to the local context, then eastus)
        #[arg(long, short = 'l')]
        location: Option<String>,
    },

    /// Show connection strings for common client libraries
    #[command(name = "show-connection-string")]
    ShowConnectionString {
        /// Server name (defaults to the local context)
        #[arg(long, short = 's')]
        server_name: Option<String>,

        /// Administrator login
        #[arg(long, short = 'u')]
        admin_user: Option<String>,

        /// Administrator password
        #[arg(long)]
        admin_password: Option<String>,

        /// Database name
        #[arg(long, short = 'd')]
        database_name: Option<String>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct CreateArgs {
    #[command(flatten)]
    pub target: ServerTarget,

    /// Location (defaults to the local context, then eastus)
    #[arg(long, short = 'l')]
    pub location: Option<String>,

    /// Compute sku, e.g. Standard_B1ms or Standard_D2s_v3
    #[arg(long)]
    pub sku_name: Option<String>,

    /// Pricing tier (inferred from the sku when omitted)
    #[arg(long, value_parser = ["Burstable", "GeneralPurpose", "MemoryOptimized"])]
    pub tier: Option<String>,

    /// Server major version
    #[arg(long)]
    pub version: Option<String>,

    /// Administrator login (generated when omitted)
    #[arg(long, short = 'u')]
    pub admin_user: Option<String>,

    /// Administrator password (generated when omitted)
    #[arg(long)]
    pub admin_password: Option<String>,

    /// Storage size in MB
    #[arg(long = "storage-size")]
    pub storage_mb: Option<u64>,

    /// Days to keep backups
    #[arg(long = "backup-retention")]
    pub backup_retention_days: Option<u32>,

    /// Public network access
    #[arg(long, value_parser = ["Enabled", "Disabled"])]
    pub public_network_access: Option<String>,

    /// Assign a system-managed identity
    #[arg(long)]
    pub assign_identity: bool,

    /// Tags as key=value
    #[arg(long, value_delimiter = ' ', num_args = 1..)]
    pub tags: Vec<String>,

    /// Vnet name or resource id
    #[arg(long)]
    pub vnet: Option<String>,

    /// Subnet name, or resource id when --vnet is omitted
    #[arg(long)]
    pub subnet: Option<String>,

    /// Address prefix for a newly created vnet
    #[arg(long)]
    pub vnet_address_prefix: Option<String>,

    /// Address prefix for a newly created subnet
    #[arg(long)]
    pub subnet_address_prefix: Option<String>,

    /// Create `<name>VNET` and `<name>Subnet` for the server
    #[arg(long, conflicts_with_all = ["vnet", "subnet"])]
    pub vnet_auto: bool,
}

#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub target: ServerTarget,

    /// New compute sku
    #[arg(long)]
    pub sku_name: Option<String>,

    /// New pricing tier
    #[arg(long, value_parser = ["Burstable", "GeneralPurpose", "MemoryOptimized"])]
    pub tier: Option<String>,

    /// New storage size in MB
    #[arg(long = "storage-size")]
    pub storage_mb: Option<u64>,

    /// New backup retention in days
    #[arg(long = "backup-retention")]
    pub backup_retention_days: Option<u32>,

    /// New administrator password
    #[arg(long)]
    pub admin_password: Option<String>,

    /// Replace tags with these key=value pairs
    #[arg(long, value_delimiter = ' ', num_args = 1..)]
    pub tags: Option<Vec<String>>,
}
