//! CircleCI provider
//!
//! Manages CircleCI contexts, context environment variables, project
//! environment variables and project checkout keys through the CircleCI REST
//! API v2, exposed to an infrastructure engine through the
//! [`ProviderService`] lifecycle.
//!
//! # Overview
//!
//! - **Identifier codec** ([`id`]): composite resource IDs such as
//!   `production/API_KEY` or `acme.my.api.deploy-key.<fingerprint>`
//! - **API client** ([`client`]): typed calls per CircleCI entity
//! - **Resources** ([`resource`]): create/read/update/delete/import, written
//!   once over the [`resource::RemoteResource`] trait
//! - **Data sources** ([`data_source`]): context and project lookups
//! - **Provider** ([`CircleCiProvider`]): schema, validation, planning and
//!   dispatch
//!
//! # Quick Start
//!
//! ```ignore
//! use circleci_provider::{init_logging, CircleCiProvider, ProviderService};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging();
//!
//!     let provider = CircleCiProvider::new();
//!     provider
//!         .configure(json!({"organization": "acme"})) // token from CIRCLECI_TOKEN
//!         .await?;
//!
//!     let state = provider
//!         .create(
//!             "circleci_context_environment_variable",
//!             json!({"context": "production", "name": "API_KEY", "value": "s3cret"}),
//!         )
//!         .await?;
//!     assert_eq!(state["id"], "production/API_KEY");
//!     Ok(())
//! }
//! ```
//!
//! # State
//!
//! Resource state is a JSON object. A resource that no longer exists reads
//! back as `null`. Environment variable values are never kept in clear text:
//! state holds `base64(sha256(value))` and plans compare against that hash.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod data_source;
pub mod error;
pub mod id;
pub mod logging;
pub mod provider;
pub mod resource;
pub mod schema;
pub mod service;
pub mod testing;
pub mod types;
pub mod validation;

// Re-export main types at crate root
pub use client::Client;
pub use config::ProviderConfig;
pub use error::{ProviderError, Result};
pub use id::{compose, decompose, IdLayout};
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::CircleCiProvider;
pub use schema::ProviderSchema;
pub use service::ProviderService;
pub use types::{AttributeChange, ImportedResource, PlanResult, ProviderMetadata};
pub use validation::{is_valid, validate, validate_result};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
