//! Read-only lookups: `circleci_context` and `circleci_project`.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tracing::instrument;

use crate::client::Client;
use crate::error::Result;
use crate::resource::ResourceData;
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::validation;

/// A data source: reads configuration, returns it with computed fields set.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Type name in configuration.
    fn type_name(&self) -> &'static str;

    /// Schema of the data source block.
    fn schema(&self) -> Schema;

    /// Validate configuration against the schema.
    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        validation::validate(&self.schema(), config)
    }

    /// Look the entity up and return `config` with computed fields set.
    async fn read(&self, client: &Client, config: Value) -> Result<Value>;
}

/// Looks a context of the provider organization up by name.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextDataSource;

#[async_trait]
impl DataSource for ContextDataSource {
    fn type_name(&self) -> &'static str {
        "circleci_context"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute(
                "name",
                Attribute::required_string().with_description("The name of the context"),
            )
            .with_attribute("id", Attribute::computed_string())
    }

    #[instrument(skip_all, fields(data_source = "circleci_context"))]
    async fn read(&self, client: &Client, config: Value) -> Result<Value> {
        let mut data = ResourceData::from_state(config)?;
        let context = client.context_by_name(data.require_str("name")?).await?;
        data.set_id(context.id);
        Ok(data.into_state())
    }
}

/// Looks a project up by organization and name.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectDataSource;

#[async_trait]
impl DataSource for ProjectDataSource {
    fn type_name(&self) -> &'static str {
        "circleci_project"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute(
                "name",
                Attribute::required_string().with_description("The name of the project"),
            )
            .with_attribute(
                "organization",
                Attribute::optional_string()
                    .with_description("The organization where the project is defined"),
            )
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("slug", Attribute::computed_string())
            .with_attribute("organization_id", Attribute::computed_string())
            .with_attribute("vcs_url", Attribute::computed_string())
            .with_attribute("default_branch", Attribute::computed_string())
    }

    #[instrument(skip_all, fields(data_source = "circleci_project"))]
    async fn read(&self, client: &Client, config: Value) -> Result<Value> {
        let mut data = ResourceData::from_state(config)?;
        let organization = client.organization(data.get_ok("organization"))?;
        let project = client
            .project(&organization, data.require_str("name")?)
            .await?;

        data.set_id(project.id);
        data.set("slug", project.slug);
        data.set("organization_id", project.organization_id);
        data.set("vcs_url", project.vcs_info.vcs_url);
        data.set("default_branch", project.vcs_info.default_branch);
        Ok(data.into_state())
    }
}

/// Every data source, keyed by type name.
pub fn registry() -> HashMap<&'static str, Box<dyn DataSource>> {
    let sources: Vec<Box<dyn DataSource>> =
        vec![Box::new(ContextDataSource), Box::new(ProjectDataSource)];
    sources
        .into_iter()
        .map(|source| (source.type_name(), source))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::client_for;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_context_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/context"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"id": "ctx-1", "name": "production"}],
                "next_page_token": null
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let state = ContextDataSource
            .read(&client, json!({"name": "production"}))
            .await
            .unwrap();
        assert_eq!(state["id"], "ctx-1");

        let err = ContextDataSource
            .read(&client, json!({"name": "staging"}))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_project_lookup_with_explicit_organization() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/project/github/other/api"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "slug": "gh/other/api",
                "name": "api",
                "id": "proj-1",
                "organization_id": "org-9",
                "vcs_info": {
                    "vcs_url": "https://github.com/other/api",
                    "provider": "GitHub",
                    "default_branch": "main"
                }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let state = ProjectDataSource
            .read(&client, json!({"name": "api", "organization": "other"}))
            .await
            .unwrap();
        assert_eq!(state["id"], "proj-1");
        assert_eq!(state["slug"], "gh/other/api");
        assert_eq!(state["default_branch"], "main");
    }

    #[test]
    fn test_registry() {
        let registry = registry();
        assert!(registry.contains_key("circleci_context"));
        assert!(registry.contains_key("circleci_project"));
        assert_eq!(registry.len(), 2);
    }
}
