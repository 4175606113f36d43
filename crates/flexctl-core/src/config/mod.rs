//! Configuration, profile management and local context for flexctl
//!
// Allow nested config module - this is intentional for the config subsystem

#![allow(clippy::module_inception)]
//!
//! # Features
//!
//! - Multiple named profiles, each bound to one Azure subscription
//! - Service principal or pre-issued access token authentication
//! - Secure credential storage using OS keyring (optional)
//! - Environment variable expansion in config files
//! - Platform-specific config file locations
//! - A local context file remembering recently used resource group, location and server

pub mod config;
pub mod credential;
pub mod error;
pub mod local_context;

// Re-export main types for convenience
pub use config::{Config, EnvCredentials, Profile, ProfileCredentials};
pub use credential::{CredentialStorage, CredentialStore};
pub use error::{ConfigError, Result};
pub use local_context::{
    FileSettingsStore, LOCATION_KEY, LocalContext, MemorySettingsStore, RESOURCE_GROUP_KEY,
    SERVER_NAME_KEY, SettingsStore,
};
