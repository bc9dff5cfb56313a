//! Project lookup.

use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::Client;
use crate::error::Result;

/// A followed CircleCI project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Project slug, e.g. `gh/acme/api`.
    pub slug: String,
    /// Project name.
    pub name: String,
    /// Server-assigned project ID.
    pub id: String,
    /// Name of the owning organization.
    #[serde(default)]
    pub organization_name: String,
    /// Slug of the owning organization.
    #[serde(default)]
    pub organization_slug: String,
    /// ID of the owning organization.
    #[serde(default)]
    pub organization_id: String,
    /// Repository details.
    #[serde(default)]
    pub vcs_info: VcsInfo,
}

/// Where a project's code lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct VcsInfo {
    /// Repository URL.
    #[serde(default)]
    pub vcs_url: String,
    /// VCS provider name.
    #[serde(default)]
    pub provider: String,
    /// Default branch of the repository.
    #[serde(default)]
    pub default_branch: String,
}

impl Client {
    /// Get a project by organization and name.
    pub async fn project(&self, organization: &str, project: &str) -> Result<Project> {
        let slug = self.slug(organization, project);
        let request = self
            .rest()
            .request(Method::GET, &format!("project/{}", slug))?;
        self.rest().send_json(request).await
    }
}
