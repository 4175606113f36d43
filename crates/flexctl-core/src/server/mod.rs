//! Flexible server provisioning and lifecycle

mod params;
mod provisioner;
mod response;

pub use params::{
    CreateServerArgs, DEFAULT_BACKUP_RETENTION_DAYS, DEFAULT_LOCATION, FilledParameters,
    UpdateServerArgs, fill_missing_parameters, resolve_target,
};
pub use provisioner::Provisioner;
pub use response::{MASKED_PASSWORD, ServerResponse, connection_strings, server_host};
