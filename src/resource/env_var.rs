use async_trait::async_trait;
use serde_json::Value;

use super::{RemoteResource, ResourceData};
use crate::client::{Client, ProjectEnvironmentVariable};
use crate::error::Result;
use crate::id::IdLayout;
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::validation;

/// `circleci_environment_variable`: a project-level variable identified by
/// `PROJECT/NAME`, in the provider organization.
///
/// Creation refuses to overwrite an existing variable. Every attribute forces
/// replacement.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvironmentVariableResource;

#[async_trait]
impl RemoteResource for EnvironmentVariableResource {
    type Remote = ProjectEnvironmentVariable;

    const TYPE_NAME: &'static str = "circleci_environment_variable";
    const DESCRIPTION: &'static str = "project environment variable";
    const ID_LAYOUT: Option<IdLayout> = Some(IdLayout::new('/', &["project", "name"]));

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute(
                "project",
                Attribute::required_string()
                    .with_description("The name of the CircleCI project to create the variable in")
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
                    .with_description("The value of the environment variable")
                    .with_force_new()
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
    ) -> Result<ProjectEnvironmentVariable> {
        let organization = client.organization(None)?;
        client
            .create_project_env_var(
                &organization,
                data.require_str("project")?,
                data.require_str("name")?,
                data.get_str("value"),
            )
            .await
    }

    async fn fetch(&self, client: &Client, data: &ResourceData) -> Result<ProjectEnvironmentVariable> {
        let organization = client.organization(None)?;
        client
            .project_env_var(
                &organization,
                data.require_str("project")?,
                data.require_str("name")?,
            )
            .await
    }

    async fn delete_remote(&self, client: &Client, data: &ResourceData) -> Result<()> {
        let organization = client.organization(None)?;
        client
            .delete_project_env_var(
                &organization,
                data.require_str("project")?,
                data.require_str("name")?,
            )
            .await
    }

    fn id_segments(&self, data: &ResourceData, _remote: &ProjectEnvironmentVariable) -> Vec<String> {
        vec![
            data.get_str("project").to_string(),
            data.get_str("name").to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::client_for;
    use crate::error::ProviderError;
    use crate::resource::{self, hash_value, Resource};
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_create_fails_when_variable_exists() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/project/github/acme/api/envvar/API_KEY"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"name": "API_KEY", "value": "xxxxcret"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut data = ResourceData::from_state(
            json!({"project": "api", "name": "API_KEY", "value": "s3cret"}),
        )
        .unwrap();
        let err = resource::create(&EnvironmentVariableResource, &client, &mut data)
            .await
            .unwrap_err();
        assert!(err.is_already_exists());
        assert_eq!(data.id(), None);
    }

    #[tokio::test]
    async fn test_dotted_project_round_trips_through_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/project/github/acme/my.project/envvar/API_KEY"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"name": "API_KEY", "value": "xxxxcret"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let data = resource::import(&EnvironmentVariableResource, &client, "my.project/API_KEY")
            .await
            .unwrap();
        assert_eq!(data.get_str("project"), "my.project");
        assert_eq!(data.id(), Some("my.project/API_KEY"));
    }

    #[tokio::test]
    async fn test_delete_tolerates_missing_variable() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/project/github/acme/api/envvar/API_KEY"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut data = ResourceData::from_state(
            json!({"id": "api/API_KEY", "project": "api", "name": "API_KEY"}),
        )
        .unwrap();
        resource::delete(&EnvironmentVariableResource, &client, &mut data)
            .await
            .unwrap();
        assert_eq!(data.id(), None);
    }

    #[tokio::test]
    async fn test_delete_reports_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/project/github/acme/api/envvar/API_KEY"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut data = ResourceData::from_state(
            json!({"id": "api/API_KEY", "project": "api", "name": "API_KEY"}),
        )
        .unwrap();
        let err = resource::delete(&EnvironmentVariableResource, &client, &mut data)
            .await
            .unwrap_err();
        assert!(err
            .to_string()
            .starts_with("failed to delete project environment variable"));
        assert_eq!(data.id(), Some("api/API_KEY"));
    }

    #[tokio::test]
    async fn test_create_composes_id_and_hashes_value() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/project/github/acme/api/envvar/API_KEY"))
            .respond_with(ResponseTemplate::new(404))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/project/github/acme/api/envvar"))
            .and(body_json(json!({"name": "API_KEY", "value": "s3cret"})))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!({"name": "API_KEY", "value": "xxxxcret"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/project/github/acme/api/envvar/API_KEY"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"name": "API_KEY", "value": "xxxxcret"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let state = EnvironmentVariableResource
            .create(
                &client,
                json!({"project": "api", "name": "API_KEY", "value": "s3cret"}),
            )
            .await
            .unwrap();
        assert_eq!(state["id"], "api/API_KEY");
        assert_eq!(state["value"], hash_value("s3cret"));
    }

    #[tokio::test]
    async fn test_read_clears_id_when_variable_is_gone() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/project/github/acme/api/envvar/API_KEY"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut data = ResourceData::from_state(
            json!({"id": "api/API_KEY", "project": "api", "name": "API_KEY"}),
        )
        .unwrap();
        resource::read(&EnvironmentVariableResource, &client, &mut data)
            .await
            .unwrap();
        assert_eq!(data.id(), None);
    }

    #[tokio::test]
    async fn test_read_keeps_id_on_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/project/github/acme/api/envvar/API_KEY"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut data = ResourceData::from_state(
            json!({"id": "api/API_KEY", "project": "api", "name": "API_KEY"}),
        )
        .unwrap();
        let err = resource::read(&EnvironmentVariableResource, &client, &mut data)
            .await
            .unwrap_err();
        assert!(err
            .to_string()
            .starts_with("failed to get project environment variable"));
        assert_eq!(data.id(), Some("api/API_KEY"));
    }

    #[tokio::test]
    async fn test_import_prefixes_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/project/github/acme/api/envvar/A"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = resource::import(&EnvironmentVariableResource, &client, "api/A")
            .await
            .unwrap_err();
        assert!(!err.is_not_found());
        assert_eq!(
            err.to_string(),
            "failed to import project environment variable: CircleCI API returned 500: boom"
        );
    }

    #[tokio::test]
    async fn test_update_is_unimplemented() {
        let server = MockServer::start().await;
        let client = client_for(&server);
        let state = json!({"id": "api/API_KEY", "project": "api", "name": "API_KEY"});

        let err = EnvironmentVariableResource
            .update(&client, state.clone(), state)
            .await
            .unwrap_err();
        assert!(matches!(err.root_cause(), ProviderError::Unimplemented(_)));
        assert!(err
            .to_string()
            .starts_with("failed to update project environment variable"));
    }
}
