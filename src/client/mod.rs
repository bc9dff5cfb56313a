//! CircleCI API client.
//!
//! [`Client`] wraps the REST transport together with the provider-level VCS
//! type and default organization. The per-resource calls live in the
//! submodules and are all methods on [`Client`].

mod checkout_key;
mod context;
mod context_env;
mod project;
mod project_env;
pub mod rest;

pub use checkout_key::{CheckoutKey, CheckoutKeyType};
pub use context::Context;
pub use context_env::ContextEnvironmentVariable;
pub use project::{Project, VcsInfo};
pub use project_env::ProjectEnvironmentVariable;

use std::time::Duration;

use crate::config::ProviderConfig;
use crate::error::{ProviderError, Result};
use rest::RestClient;

/// Access to the CircleCI REST API for one provider configuration.
#[derive(Debug, Clone)]
pub struct Client {
    rest: RestClient,
    vcs: String,
    organization: Option<String>,
}

impl Client {
    /// Build a client from a resolved provider configuration.
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let rest = RestClient::new(
            &config.url,
            config.token.clone(),
            Duration::from_secs(config.timeout_secs),
        )?;

        Ok(Self {
            rest,
            vcs: config.vcs_type.clone(),
            organization: config.organization.clone().filter(|org| !org.is_empty()),
        })
    }

    /// The VCS type segment of slugs (`github`, `bitbucket`, `gh`, ...).
    pub fn vcs(&self) -> &str {
        &self.vcs
    }

    /// Resolve the organization for a request.
    ///
    /// A non-empty `explicit` organization (set on the resource) wins over the
    /// provider default.
    pub fn organization(&self, explicit: Option<&str>) -> Result<String> {
        explicit
            .filter(|org| !org.is_empty())
            .map(str::to_string)
            .or_else(|| self.organization.clone())
            .ok_or_else(|| ProviderError::Configuration("organization is required".to_string()))
    }

    /// The project slug `<vcs>/<organization>/<project>`.
    pub fn slug(&self, organization: &str, project: &str) -> String {
        format!("{}/{}/{}", self.vcs, organization, project)
    }

    /// The owner slug `<vcs>/<organization>`.
    pub fn owner_slug(&self, organization: &str) -> String {
        format!("{}/{}", self.vcs, organization)
    }

    pub(crate) fn rest(&self) -> &RestClient {
        &self.rest
    }
}
