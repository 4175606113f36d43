//! # flexctl-core
//!
//! Engine layer behind the `flexctl` CLI: everything needed to provision Azure
//! Database for MySQL and PostgreSQL flexible servers, without any terminal concerns.
//!
//! - [`arm`] - Azure Resource Manager client, resource ids and wire models
//! - [`network`] - resolves vnet/subnet arguments into a delegated subnet
//! - [`server`] - create (idempotent by name), update and lifecycle operations
//! - [`config`] - profiles, credentials and the local context file
//! - [`progress`] - long-running operation polling with progress callbacks
//!
//! The control plane sits behind [`CloudResourceClient`], so the resolver and
//! provisioner run unchanged against [`ArmClient`] or an in-memory fake.
//!
//! ```no_run
//! use flexctl_core::{ArmClient, Credential, DatabaseEngine, Provisioner};
//! use flexctl_core::config::MemorySettingsStore;
//! use flexctl_core::generators::RandomGenerator;
//! use flexctl_core::server::CreateServerArgs;
//!
//! # async fn example() -> flexctl_core::Result<()> {
//! let client = ArmClient::builder()
//!     .subscription_id("00000000-0000-0000-0000-000000000000")
//!     .credential(Credential::AccessToken("token".to_string()))
//!     .build()?;
//! let generator = RandomGenerator::new();
//! let settings = MemorySettingsStore::new();
//!
//! let provisioner = Provisioner::new(
//!     &client,
//!     DatabaseEngine::Postgres,
//!     &generator,
//!     &generator,
//!     &settings,
//! );
//! let server = provisioner.create_server(&CreateServerArgs::default()).await?;
//! println!("{}", server.host.unwrap_or_default());
//! # Ok(())
//! # }
//! ```

pub mod arm;
pub mod config;
pub mod engine;
pub mod error;
pub mod generators;
pub mod network;
pub mod progress;
pub mod server;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use arm::{ArmClient, ArmClientBuilder, ArmError, CloudResourceClient, Credential, ResourceId};
pub use engine::DatabaseEngine;
pub use error::{CoreError, Result};
pub use progress::{ProgressCallback, ProgressEvent};
pub use server::{Provisioner, ServerResponse};
