use async_trait::async_trait;
use serde_json::Value;

use super::{RemoteResource, ResourceData};
use crate::client::{Client, ContextEnvironmentVariable};
use crate::error::Result;
use crate::id::IdLayout;
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::validation;

/// `circleci_context_environment_variable`, identified by `CONTEXT/NAME`.
///
/// The API stores these with `PUT`, so create overwrites an existing
/// variable and a changed value is applied in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextEnvironmentVariableResource;

impl ContextEnvironmentVariableResource {
    const LAYOUT: IdLayout = IdLayout::new('/', &["context", "name"]);

    async fn store(&self, client: &Client, data: &ResourceData) -> Result<ContextEnvironmentVariable> {
        client
            .upsert_context_env_var(
                data.require_str("context")?,
                data.require_str("name")?,
                data.get_str("value"),
            )
            .await
    }
}

#[async_trait]
impl RemoteResource for ContextEnvironmentVariableResource {
    type Remote = ContextEnvironmentVariable;

    const TYPE_NAME: &'static str = "circleci_context_environment_variable";
    const DESCRIPTION: &'static str = "context environment variable";
    const ID_LAYOUT: Option<IdLayout> = Some(Self::LAYOUT);

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute(
                "context",
                Attribute::required_string()
                    .with_description(
                        "The name or ID of the context where the environment variable is defined",
                    )
                    .with_force_new(),
            )
            .with_attribute(
                "name",
                Attribute::required_string()
                    .with_description("The name of the environment variable")
                    .with_force_new(),
            )
            .with_attribute(
                "value",
                Attribute::required_string()
                    .with_description("The value that will be set for the environment variable")
                    .hashed(),
            )
            .with_attribute("id", Attribute::computed_string())
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let mut diagnostics = validation::validate(&RemoteResource::schema(self), config);
        if let Some(name) = config.get("name").and_then(Value::as_str) {
            diagnostics.extend(validation::validate_env_var_name(name, "name"));
        }
        diagnostics
    }

    async fn create_remote(
        &self,
        client: &Client,
        data: &ResourceData,
    ) -> Result<ContextEnvironmentVariable> {
        self.store(client, data).await
    }

    async fn fetch(&self, client: &Client, data: &ResourceData) -> Result<ContextEnvironmentVariable> {
        client
            .context_env_var(data.require_str("context")?, data.require_str("name")?)
            .await
    }

    async fn update_remote(
        &self,
        client: &Client,
        _prior: &ResourceData,
        planned: &ResourceData,
    ) -> Result<()> {
        self.store(client, planned).await.map(|_| ())
    }

    async fn delete_remote(&self, client: &Client, data: &ResourceData) -> Result<()> {
        client
            .delete_context_env_var(data.require_str("context")?, data.require_str("name")?)
            .await
    }

    fn id_segments(&self, data: &ResourceData, _remote: &ContextEnvironmentVariable) -> Vec<String> {
        vec![
            data.get_str("context").to_string(),
            data.get_str("name").to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::client_for;
    use crate::resource::{self, hash_value, Resource};
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CONTEXT_ID: &str = "2e3b1c4a-5d6e-4f70-8a9b-0c1d2e3f4a5b";

    async fn server_with_variable(variables: serde_json::Value) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/context"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"id": CONTEXT_ID, "name": "production"}],
                "next_page_token": null
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/context/{}/environment-variable", CONTEXT_ID)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": variables,
                "next_page_token": null
            })))
            .mount(&server)
            .await;
        server
    }

    #[test]
    fn test_rejects_invalid_name() {
        let diagnostics = RemoteResource::validate(
            &ContextEnvironmentVariableResource,
            &json!({"context": "production", "name": "1BAD", "value": "v"}),
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("name"));
    }

    #[tokio::test]
    async fn test_create_hashes_value_in_state() {
        let server = server_with_variable(json!([{"variable": "API_KEY"}])).await;
        Mock::given(method("PUT"))
            .and(path(format!("/context/{}/environment-variable/API_KEY", CONTEXT_ID)))
            .and(body_json(json!({"value": "s3cret"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"variable": "API_KEY"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let state = ContextEnvironmentVariableResource
            .create(
                &client,
                json!({"context": "production", "name": "API_KEY", "value": "s3cret"}),
            )
            .await
            .unwrap();

        assert_eq!(state["id"], "production/API_KEY");
        assert_eq!(state["value"], hash_value("s3cret"));
    }

    #[tokio::test]
    async fn test_read_clears_id_when_variable_is_gone() {
        let server = server_with_variable(json!([])).await;
        let client = client_for(&server);

        let mut data = ResourceData::from_state(json!({
            "id": "production/API_KEY",
            "context": "production",
            "name": "API_KEY"
        }))
        .unwrap();
        resource::read(&ContextEnvironmentVariableResource, &client, &mut data)
            .await
            .unwrap();
        assert_eq!(data.id(), None);
    }

    #[tokio::test]
    async fn test_import_splits_id() {
        let server = server_with_variable(json!([{"variable": "API_KEY"}])).await;
        let client = client_for(&server);

        let data = resource::import(&ContextEnvironmentVariableResource, &client, "production/API_KEY")
            .await
            .unwrap();
        assert_eq!(data.get_str("context"), "production");
        assert_eq!(data.get_str("name"), "API_KEY");
        assert_eq!(data.id(), Some("production/API_KEY"));

        let err = resource::import(&ContextEnvironmentVariableResource, &client, "production/OTHER")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("does not exist"));

        let err = resource::import(&ContextEnvironmentVariableResource, &client, "production")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("CONTEXT/NAME"));
    }
}
