//! Azure Resource Manager access: ids, wire models, errors and the REST client

pub mod client;
pub mod error;
pub mod models;
pub mod resource_id;
pub mod rest;

pub use client::{ArmResult, CloudResourceClient};
pub use error::ArmError;
pub use resource_id::{ResourceId, is_bare_name};
pub use rest::{ArmClient, ArmClientBuilder, Credential};
