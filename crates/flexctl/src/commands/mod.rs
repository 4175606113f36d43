//! Command implementations

pub mod flexible_server;
pub mod local_context;
pub mod profile;
pub mod utils;
