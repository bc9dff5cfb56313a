//! Resource lifecycle.
//!
//! Each CircleCI resource type implements [`RemoteResource`]: how to create,
//! fetch and delete its remote entity and how that entity maps onto state.
//! The create/read/update/delete/import control flow is written once in the
//! generic functions of this module, and [`Resource`] erases the type so the
//! provider can dispatch on the resource type name.

mod checkout_key;
mod context;
mod context_env_var;
mod data;
mod env_var;

pub use checkout_key::CheckoutKeyResource;
pub use context::ContextResource;
pub use context_env_var::ContextEnvironmentVariableResource;
pub use data::ResourceData;
pub use env_var::EnvironmentVariableResource;

use std::collections::HashMap;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use crate::client::Client;
use crate::error::{ProviderError, Result};
use crate::id::IdLayout;
use crate::schema::{Diagnostic, Schema};
use crate::validation;

/// `base64(sha256(value))`, the form sensitive values take in state.
pub fn hash_value(value: &str) -> String {
    STANDARD.encode(Sha256::digest(value.as_bytes()))
}

/// A resource type backed by a CircleCI API entity.
#[async_trait]
pub trait RemoteResource: Send + Sync + 'static {
    /// The entity as returned by the API.
    type Remote: Send + Sync;

    /// Type name in configuration, e.g. `circleci_context`.
    const TYPE_NAME: &'static str;

    /// Human-readable name used in error messages.
    const DESCRIPTION: &'static str;

    /// Composite ID layout. `None` means the first ID segment is used as is.
    const ID_LAYOUT: Option<IdLayout> = None;

    /// Schema of the resource block.
    fn schema(&self) -> Schema;

    /// Validate configuration beyond what the schema expresses.
    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        validation::validate(&<Self as RemoteResource>::schema(self), config)
    }

    /// Create the entity described by planned `data`.
    async fn create_remote(&self, client: &Client, data: &ResourceData) -> Result<Self::Remote>;

    /// Fetch the entity described by `data`; `NotFound` if it is gone.
    async fn fetch(&self, client: &Client, data: &ResourceData) -> Result<Self::Remote>;

    /// Change the entity in place. Resources without in-place updates keep
    /// the default, since every attribute they have forces replacement.
    async fn update_remote(
        &self,
        _client: &Client,
        _prior: &ResourceData,
        _planned: &ResourceData,
    ) -> Result<()> {
        Err(ProviderError::Unimplemented(format!(
            "{} cannot be updated in place",
            Self::TYPE_NAME
        )))
    }

    /// Delete the entity; `NotFound` if it is already gone.
    async fn delete_remote(&self, client: &Client, data: &ResourceData) -> Result<()>;

    /// The ID segments for an entity, in layout order.
    fn id_segments(&self, data: &ResourceData, remote: &Self::Remote) -> Vec<String>;

    /// Copy the entity's fields into `data`.
    fn populate(&self, _data: &mut ResourceData, _remote: &Self::Remote) {}

    /// Fill `data` from an import ID.
    fn restore_from_id(&self, data: &mut ResourceData, id: &str) -> Result<()> {
        match Self::ID_LAYOUT {
            Some(layout) => {
                for (field, value) in layout.decompose(id)? {
                    data.set(field, value);
                }
            },
            None => data.set_id(id),
        }
        Ok(())
    }
}

fn compose_id<R: RemoteResource>(
    resource: &R,
    data: &ResourceData,
    remote: &R::Remote,
) -> Result<String> {
    let segments = resource.id_segments(data, remote);
    match R::ID_LAYOUT {
        Some(layout) => layout.compose(&segments),
        None => segments.into_iter().next().ok_or_else(|| {
            ProviderError::MalformedId(format!("{} has no id segment", R::TYPE_NAME))
        }),
    }
}

/// Create the remote entity, then read it back.
#[instrument(skip_all, fields(resource = R::TYPE_NAME))]
pub async fn create<R: RemoteResource>(
    resource: &R,
    client: &Client,
    data: &mut ResourceData,
) -> Result<()> {
    let remote = resource
        .create_remote(client, data)
        .await
        .map_err(|err| err.with_context(format!("failed to create {}", R::DESCRIPTION)))?;

    let id = compose_id(resource, data, &remote)?;
    resource.populate(data, &remote);
    data.set_id(id);
    info!(id = data.get_str("id"), "created");

    read(resource, client, data).await
}

/// Refresh `data` from the remote entity, clearing the ID if it is gone.
#[instrument(skip_all, fields(resource = R::TYPE_NAME))]
pub async fn read<R: RemoteResource>(
    resource: &R,
    client: &Client,
    data: &mut ResourceData,
) -> Result<()> {
    match resource.fetch(client, data).await {
        Ok(remote) => {
            resource.populate(data, &remote);
            Ok(())
        },
        Err(err) if err.is_not_found() => {
            info!(id = data.get_str("id"), "no longer exists, removing from state");
            data.clear_id();
            Ok(())
        },
        Err(err) => Err(err.with_context(format!("failed to get {}", R::DESCRIPTION))),
    }
}

/// Apply in-place changes, then read the entity back.
#[instrument(skip_all, fields(resource = R::TYPE_NAME))]
pub async fn update<R: RemoteResource>(
    resource: &R,
    client: &Client,
    prior: &ResourceData,
    data: &mut ResourceData,
) -> Result<()> {
    if data.id().is_none() {
        if let Some(id) = prior.id() {
            data.set_id(id);
        }
    }

    resource
        .update_remote(client, prior, data)
        .await
        .map_err(|err| err.with_context(format!("failed to update {}", R::DESCRIPTION)))?;

    read(resource, client, data).await
}

/// Delete the remote entity. An entity that is already gone counts as deleted.
#[instrument(skip_all, fields(resource = R::TYPE_NAME))]
pub async fn delete<R: RemoteResource>(
    resource: &R,
    client: &Client,
    data: &mut ResourceData,
) -> Result<()> {
    match resource.delete_remote(client, data).await {
        Ok(()) => {}
        Err(err) if err.is_not_found() => debug!("already deleted"),
        Err(err) => return Err(err.with_context(format!("failed to delete {}", R::DESCRIPTION))),
    }
    data.clear_id();
    Ok(())
}

/// Build state for an existing entity from an import ID.
#[instrument(skip_all, fields(resource = R::TYPE_NAME, id = %id))]
pub async fn import<R: RemoteResource>(
    resource: &R,
    client: &Client,
    id: &str,
) -> Result<ResourceData> {
    let mut data = ResourceData::new();
    resource.restore_from_id(&mut data, id)?;

    let remote = match resource.fetch(client, &data).await {
        Ok(remote) => remote,
        Err(err) if err.is_not_found() => {
            return Err(ProviderError::NotFound(format!(
                "{} does not exist: {}",
                R::DESCRIPTION,
                id
            )))
        },
        Err(err) => return Err(err.with_context(format!("failed to import {}", R::DESCRIPTION))),
    };

    resource.populate(&mut data, &remote);
    let id = compose_id(resource, &data, &remote)?;
    data.set_id(id);
    Ok(data)
}

/// Type-erased resource, dispatched on by name.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Type name in configuration.
    fn type_name(&self) -> &'static str;

    /// Schema of the resource block.
    fn schema(&self) -> Schema;

    /// Validate resource configuration.
    fn validate(&self, config: &Value) -> Vec<Diagnostic>;

    /// Create from planned state; returns the new state.
    async fn create(&self, client: &Client, planned: Value) -> Result<Value>;

    /// Refresh state; returns `null` if the entity is gone.
    async fn read(&self, client: &Client, current: Value) -> Result<Value>;

    /// Update in place from planned state; returns the new state.
    async fn update(&self, client: &Client, prior: Value, planned: Value) -> Result<Value>;

    /// Delete the entity behind `current`.
    async fn delete(&self, client: &Client, current: Value) -> Result<()>;

    /// State for an existing entity identified by `id`.
    async fn import(&self, client: &Client, id: &str) -> Result<Value>;
}

#[async_trait]
impl<R: RemoteResource> Resource for R {
    fn type_name(&self) -> &'static str {
        R::TYPE_NAME
    }

    fn schema(&self) -> Schema {
        RemoteResource::schema(self)
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        RemoteResource::validate(self, config)
    }

    async fn create(&self, client: &Client, planned: Value) -> Result<Value> {
        let mut data = ResourceData::from_state(planned)?;
        create(self, client, &mut data).await?;
        data.hash_attributes(&RemoteResource::schema(self));
        Ok(data.into_state())
    }

    async fn read(&self, client: &Client, current: Value) -> Result<Value> {
        let mut data = ResourceData::from_state(current)?;
        read(self, client, &mut data).await?;
        Ok(data.into_state())
    }

    async fn update(&self, client: &Client, prior: Value, planned: Value) -> Result<Value> {
        let prior = ResourceData::from_state(prior)?;
        let mut data = ResourceData::from_state(planned)?;
        update(self, client, &prior, &mut data).await?;
        data.hash_attributes(&RemoteResource::schema(self));
        Ok(data.into_state())
    }

    async fn delete(&self, client: &Client, current: Value) -> Result<()> {
        let mut data = ResourceData::from_state(current)?;
        delete(self, client, &mut data).await
    }

    async fn import(&self, client: &Client, id: &str) -> Result<Value> {
        Ok(import(self, client, id).await?.into_state())
    }
}

/// Every resource type the provider manages, keyed by type name.
pub fn registry() -> HashMap<&'static str, Box<dyn Resource>> {
    let resources: Vec<Box<dyn Resource>> = vec![
        Box::new(ContextResource),
        Box::new(ContextEnvironmentVariableResource),
        Box::new(EnvironmentVariableResource),
        Box::new(CheckoutKeyResource),
    ];
    resources
        .into_iter()
        .map(|resource| (resource.type_name(), resource))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_value() {
        assert_eq!(hash_value(""), "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=");
        assert_ne!(hash_value("a"), hash_value("b"));
        assert_eq!(hash_value("a").len(), 44);
    }

    #[test]
    fn test_registry_names() {
        let registry = registry();
        let mut names: Vec<_> = registry.keys().copied().collect();
        names.sort_unstable();
        assert_eq!(
            names,
            vec![
                "circleci_checkout_key",
                "circleci_context",
                "circleci_context_environment_variable",
                "circleci_environment_variable",
            ]
        );
        for (name, resource) in &registry {
            assert_eq!(resource.type_name(), *name);
        }
    }
}
