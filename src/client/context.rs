//! Contexts: named, organization-owned sets of environment variables.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::Client;
use crate::error::{ProviderError, Result};

/// A CircleCI context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    /// Server-assigned UUID.
    pub id: String,
    /// Name, unique within the owning organization.
    pub name: String,
    /// Creation timestamp.
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Serialize)]
struct CreateContext<'a> {
    name: &'a str,
    owner: ContextOwner<'a>,
}

#[derive(Serialize)]
struct ContextOwner<'a> {
    slug: &'a str,
    #[serde(rename = "type")]
    owner_type: &'a str,
}

impl Client {
    /// Get a context by its ID.
    pub async fn context(&self, id: &str) -> Result<Context> {
        let request = self.rest().request(Method::GET, &format!("context/{}", id))?;
        self.rest().send_json(request).await
    }

    /// Find a context of the provider organization by name.
    pub async fn context_by_name(&self, name: &str) -> Result<Context> {
        let organization = self.organization(None)?;
        let owner_slug = self.owner_slug(&organization);

        let contexts: Vec<Context> = self
            .rest()
            .list_all("context", &[("owner-slug", owner_slug.as_str())])
            .await?;
        debug!(count = contexts.len(), %owner_slug, "listed contexts");

        contexts
            .into_iter()
            .find(|ctx| ctx.name == name)
            .ok_or_else(|| ProviderError::NotFound(format!("context {} in {}", name, owner_slug)))
    }

    /// Get a context by ID when given a UUID, by name otherwise.
    pub async fn context_by_id_or_name(&self, id_or_name: &str) -> Result<Context> {
        if Uuid::parse_str(id_or_name).is_ok() {
            self.context(id_or_name).await
        } else {
            self.context_by_name(id_or_name).await
        }
    }

    /// Create a context owned by the provider organization.
    pub async fn create_context(&self, name: &str) -> Result<Context> {
        let organization = self.organization(None)?;
        let owner_slug = self.owner_slug(&organization);

        let request = self
            .rest()
            .request(Method::POST, "context")?
            .json(&CreateContext {
                name,
                owner: ContextOwner {
                    slug: &owner_slug,
                    owner_type: "organization",
                },
            });
        self.rest().send_json(request).await
    }

    /// Delete a context by ID.
    pub async fn delete_context(&self, id: &str) -> Result<()> {
        let request = self.rest().request(Method::DELETE, &format!("context/{}", id))?;
        self.rest().send_empty(request).await
    }
}
