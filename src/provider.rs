//! The CircleCI provider.
//!
//! [`CircleCiProvider`] implements [`ProviderService`] on top of the resource
//! and data source registries. `configure` builds the [`Client`] every later
//! call uses.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::client::Client;
use crate::config::ProviderConfig;
use crate::data_source::{self, DataSource};
use crate::error::{ProviderError, Result};
use crate::resource::{self, hash_value, Resource};
use crate::schema::{Attribute, Diagnostic, ProviderSchema, Schema};
use crate::service::ProviderService;
use crate::types::{AttributeChange, ImportedResource, PlanResult};
use crate::validation;

/// Manages CircleCI contexts, environment variables and checkout keys.
pub struct CircleCiProvider {
    client: RwLock<Option<Arc<Client>>>,
    resources: HashMap<&'static str, Box<dyn Resource>>,
    data_sources: HashMap<&'static str, Box<dyn DataSource>>,
}

impl Default for CircleCiProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CircleCiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircleCiProvider")
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .field("data_sources", &self.data_sources.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl CircleCiProvider {
    /// An unconfigured provider; call `configure` before anything else.
    pub fn new() -> Self {
        Self {
            client: RwLock::new(None),
            resources: resource::registry(),
            data_sources: data_source::registry(),
        }
    }

    /// A provider that is already configured with `client`.
    pub fn with_client(client: Client) -> Self {
        Self {
            client: RwLock::new(Some(Arc::new(client))),
            ..Self::new()
        }
    }

    /// Schema of the provider block.
    pub fn config_schema() -> Schema {
        Schema::v0()
            .with_attribute(
                "url",
                Attribute::optional_string()
                    .with_description("The URL of the CircleCI API (CIRCLECI_URL)"),
            )
            .with_attribute(
                "token",
                Attribute::optional_string()
                    .with_description("The CircleCI API token (CIRCLECI_TOKEN)")
                    .sensitive(),
            )
            .with_attribute(
                "vcs_type",
                Attribute::optional_string()
                    .with_description("The VCS type of the organization (CIRCLECI_VCS_TYPE)"),
            )
            .with_attribute(
                "organization",
                Attribute::optional_string()
                    .with_description("The default CircleCI organization (CIRCLECI_ORGANIZATION)"),
            )
            .with_attribute(
                "timeout_secs",
                Attribute::optional_int64().with_description("HTTP request timeout in seconds"),
            )
    }

    async fn client(&self) -> Result<Arc<Client>> {
        self.client.read().await.clone().ok_or_else(|| {
            ProviderError::Configuration("provider has not been configured".to_string())
        })
    }

    fn resource(&self, resource_type: &str) -> Result<&dyn Resource> {
        self.resources
            .get(resource_type)
            .map(|resource| resource.as_ref())
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    fn data_source(&self, data_source_type: &str) -> Result<&dyn DataSource> {
        self.data_sources
            .get(data_source_type)
            .map(|source| source.as_ref())
            .ok_or_else(|| ProviderError::UnknownResource(data_source_type.to_string()))
    }
}

/// Diff `proposed` against `prior` attribute by attribute.
///
/// Computed attributes left unset keep their prior value. Hashed attributes
/// are compared, and reported, by hash.
fn diff(schema: &Schema, prior: &Map<String, Value>, proposed: &Map<String, Value>) -> PlanResult {
    let mut planned = proposed.clone();
    let mut changes = Vec::new();
    let mut requires_replace = false;

    let mut names: Vec<&String> = schema.block.attributes.keys().collect();
    names.sort();

    for name in names {
        let attr = &schema.block.attributes[name];
        let before = prior.get(name).cloned().unwrap_or(Value::Null);
        let after = proposed.get(name).cloned().unwrap_or(Value::Null);

        if after.is_null() && attr.flags.computed {
            if !before.is_null() {
                planned.insert(name.clone(), before);
            }
            continue;
        }

        let after = match after {
            Value::String(clear) if attr.hashed => Value::String(hash_value(&clear)),
            other => other,
        };

        if before != after {
            debug!(attribute = %name, force_new = attr.force_new, "attribute changed");
            requires_replace |= attr.force_new;
            changes.push(if after.is_null() {
                AttributeChange::removed(name.clone(), before)
            } else {
                AttributeChange::modified(name.clone(), before, after)
            });
        }
    }

    if changes.is_empty() {
        return PlanResult::no_change(Value::Object(prior.clone()));
    }
    PlanResult::with_changes(Value::Object(planned), changes, requires_replace)
}

fn plan_create(schema: &Schema, proposed: &Map<String, Value>) -> PlanResult {
    let mut names: Vec<&String> = proposed.keys().collect();
    names.sort();

    let changes = names
        .into_iter()
        .filter(|name| !proposed[*name].is_null())
        .map(|name| {
            let value = match (&proposed[name], schema.attribute(name)) {
                (Value::String(clear), Some(attr)) if attr.hashed => {
                    Value::String(hash_value(clear))
                },
                (value, _) => value.clone(),
            };
            AttributeChange::added(name.clone(), value)
        })
        .collect();

    PlanResult::with_changes(Value::Object(proposed.clone()), changes, false)
}

fn as_object(value: Value, what: &str) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(ProviderError::Validation(format!(
            "expected {} to be an object, got {}",
            what, other
        ))),
    }
}

#[async_trait::async_trait]
impl ProviderService for CircleCiProvider {
    fn schema(&self) -> ProviderSchema {
        let mut schema = ProviderSchema::new().with_provider_config(Self::config_schema());
        for (name, resource) in &self.resources {
            schema = schema.with_resource(*name, resource.schema());
        }
        for (name, source) in &self.data_sources {
            schema = schema.with_data_source(*name, source.schema());
        }
        schema
    }

    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>> {
        Ok(validation::validate(&Self::config_schema(), &config))
    }

    #[instrument(skip_all, name = "provider.configure")]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>> {
        let diagnostics = validation::validate(&Self::config_schema(), &config);
        if diagnostics.iter().any(Diagnostic::is_error) {
            warn!(diagnostics = diagnostics.len(), "Configure completed with errors");
            return Ok(diagnostics);
        }

        let client = match ProviderConfig::from_value(config).and_then(|c| Client::new(&c)) {
            Ok(client) => client,
            Err(err) => {
                warn!(error = %err, "Configure failed");
                return Ok(vec![err.into()]);
            },
        };

        info!(
            url = %client.rest().base_url(),
            vcs = client.vcs(),
            "Configure completed successfully"
        );
        *self.client.write().await = Some(Arc::new(client));
        Ok(diagnostics)
    }

    async fn stop(&self) -> Result<()> {
        self.client.write().await.take();
        Ok(())
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>> {
        Ok(self.resource(resource_type)?.validate(&config))
    }

    #[instrument(skip(self, prior_state, proposed_state), name = "provider.plan")]
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
    ) -> Result<PlanResult> {
        let schema = self.resource(resource_type)?.schema();
        let proposed = as_object(proposed_state, "proposed state")?;

        let plan = match prior_state.filter(|prior| !prior.is_null()) {
            None => plan_create(&schema, &proposed),
            Some(prior) => diff(&schema, &as_object(prior, "prior state")?, &proposed),
        };
        debug!(
            changes = plan.changes.len(),
            requires_replace = plan.requires_replace,
            "Plan completed"
        );
        Ok(plan)
    }

    #[instrument(skip(self, planned_state), name = "provider.create")]
    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        resource.create(&client, planned_state).await
    }

    #[instrument(skip(self, current_state), name = "provider.read")]
    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        resource.read(&client, current_state).await
    }

    #[instrument(skip(self, prior_state, planned_state), name = "provider.update")]
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        resource.update(&client, prior_state, planned_state).await
    }

    #[instrument(skip(self, current_state), name = "provider.delete")]
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<()> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        resource.delete(&client, current_state).await
    }

    #[instrument(skip(self), name = "provider.import")]
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        let state = resource.import(&client, id).await?;
        info!("Import completed");
        Ok(vec![ImportedResource::new(resource_type, state)])
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>> {
        Ok(self.data_source(data_source_type)?.validate(&config))
    }

    #[instrument(skip(self, config), name = "provider.read_data_source")]
    async fn read_data_source(&self, data_source_type: &str, config: Value) -> Result<Value> {
        let source = self.data_source(data_source_type)?;
        let client = self.client().await?;
        source.read(&client, config).await
    }
}
