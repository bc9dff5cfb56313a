//! Environment variables scoped to a context.
//!
//! Every call takes the context by name or UUID and resolves its ID first.
//! Writes are upserts: the API stores variables with `PUT`.

use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::{Client, Context};
use crate::error::{ProviderError, Result, ResultExt};

/// A variable as listed by the API. Values are never returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextEnvironmentVariable {
    /// Variable name.
    pub variable: String,
    /// Owning context ID.
    #[serde(default)]
    pub context_id: Option<String>,
    /// Creation timestamp.
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Serialize)]
struct StoreValue<'a> {
    value: &'a str,
}

impl Client {
    async fn resolve_context(&self, context: &str) -> Result<Context> {
        self.context_by_id_or_name(context)
            .await
            .context("could not find context")
    }

    /// Create or overwrite a variable in a context.
    pub async fn upsert_context_env_var(
        &self,
        context: &str,
        name: &str,
        value: &str,
    ) -> Result<ContextEnvironmentVariable> {
        let ctx = self.resolve_context(context).await?;
        let request = self
            .rest()
            .request(
                Method::PUT,
                &format!("context/{}/environment-variable/{}", ctx.id, name),
            )?
            .json(&StoreValue { value });
        self.rest().send_json(request).await
    }

    /// List all variables of a context.
    pub async fn list_context_env_vars(
        &self,
        context: &str,
    ) -> Result<Vec<ContextEnvironmentVariable>> {
        let ctx = self.resolve_context(context).await?;
        self.rest()
            .list_all(&format!("context/{}/environment-variable", ctx.id), &[])
            .await
    }

    /// Get one variable of a context; `NotFound` if the context or the
    /// variable is missing.
    pub async fn context_env_var(
        &self,
        context: &str,
        name: &str,
    ) -> Result<ContextEnvironmentVariable> {
        self.list_context_env_vars(context)
            .await?
            .into_iter()
            .find(|env| env.variable == name)
            .ok_or_else(|| {
                ProviderError::NotFound(format!(
                    "environment variable {} in context {}",
                    name, context
                ))
            })
    }

    /// Whether a context defines `name`. A missing context counts as `false`.
    pub async fn has_context_env_var(&self, context: &str, name: &str) -> Result<bool> {
        match self.context_env_var(context, name).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Delete a variable from a context.
    pub async fn delete_context_env_var(&self, context: &str, name: &str) -> Result<()> {
        let ctx = self.resolve_context(context).await?;
        let request = self.rest().request(
            Method::DELETE,
            &format!("context/{}/environment-variable/{}", ctx.id, name),
        )?;
        self.rest().send_empty(request).await
    }
}
