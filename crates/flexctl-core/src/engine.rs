//! Database engines served by flexible servers

use serde::{Deserialize, Serialize};
use std::fmt;

/// The database engine behind a flexible server
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseEngine {
    Mysql,
    Postgres,
}

impl DatabaseEngine {
    /// ARM provider namespace
    pub fn provider_namespace(&self) -> &'static str {
        match self {
            DatabaseEngine::Mysql => "Microsoft.DBforMySQL",
            DatabaseEngine::Postgres => "Microsoft.DBforPostgreSQL",
        }
    }

    /// Subnet delegation service the provider requires
    pub fn delegation_service(&self) -> &'static str {
        match self {
            DatabaseEngine::Mysql => "Microsoft.DBforMySQL/flexibleServers",
            DatabaseEngine::Postgres => "Microsoft.DBforPostgreSQL/flexibleServers",
        }
    }

    pub fn api_version(&self) -> &'static str {
        match self {
            DatabaseEngine::Mysql => "2020-07-01-preview",
            DatabaseEngine::Postgres => "2020-02-14-preview",
        }
    }

    /// Human-readable name used in log messages
    pub fn display_name(&self) -> &'static str {
        match self {
            DatabaseEngine::Mysql => "MySQL",
            DatabaseEngine::Postgres => "PostgreSQL",
        }
    }

    /// Local context section name
    pub fn command_group(&self) -> &'static str {
        match self {
            DatabaseEngine::Mysql => "mysql",
            DatabaseEngine::Postgres => "postgres",
        }
    }

    pub fn default_sku(&self) -> &'static str {
        match self {
            DatabaseEngine::Mysql => "Standard_B1ms",
            DatabaseEngine::Postgres => "Standard_D2s_v3",
        }
    }

    pub fn default_version(&self) -> &'static str {
        match self {
            DatabaseEngine::Mysql => "5.7",
            DatabaseEngine::Postgres => "12",
        }
    }

    pub fn default_storage_mb(&self) -> u64 {
        match self {
            DatabaseEngine::Mysql => 10240,
            DatabaseEngine::Postgres => 131072,
        }
    }

    pub fn pricing_url(&self) -> &'static str {
        match self {
            DatabaseEngine::Mysql => "https://aka.ms/mysql-pricing",
            DatabaseEngine::Postgres => "https://aka.ms/postgres-pricing",
        }
    }
}

impl fmt::Display for DatabaseEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command_group())
    }
}

/// Infer the pricing tier from a sku name such as `Standard_B1ms` or `Standard_E4s_v3`
pub fn infer_tier(sku_name: &str) -> &'static str {
    let family = sku_name
        .split('_')
        .nth(1)
        .and_then(|size| size.chars().next())
        .map(|c| c.to_ascii_uppercase());

    match family {
        Some('B') => "Burstable",
        Some('E') => "MemoryOptimized",
        _ => "GeneralPurpose",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delegation_services() {
        assert_eq!(
            DatabaseEngine::Mysql.delegation_service(),
            "Microsoft.DBforMySQL/flexibleServers"
        );
        assert_eq!(
            DatabaseEngine::Postgres.delegation_service(),
            "Microsoft.DBforPostgreSQL/flexibleServers"
        );
    }

    #[test]
    fn test_infer_tier() {
        assert_eq!(infer_tier("Standard_B1ms"), "Burstable");
        assert_eq!(infer_tier("Standard_E4s_v3"), "MemoryOptimized");
        assert_eq!(infer_tier("Standard_D2s_v3"), "GeneralPurpose");
        assert_eq!(infer_tier("weird"), "GeneralPurpose");
    }

    #[test]
    fn test_display_is_command_group() {
        assert_eq!(DatabaseEngine::Postgres.to_string(), "postgres");
    }
}
