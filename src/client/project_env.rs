//! Environment variables scoped to a project.
//!
//! Unlike context variables these are created with `POST`, so creation
//! checks for an existing variable and refuses to overwrite it.

use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::Client;
use crate::error::{ProviderError, Result};

/// A project variable. The API returns a masked value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectEnvironmentVariable {
    /// Variable name.
    pub name: String,
    /// Masked value, e.g. `xxxx1234`.
    #[serde(default)]
    pub value: String,
}

#[derive(Serialize)]
struct CreateVariable<'a> {
    name: &'a str,
    value: &'a str,
}

impl Client {
    /// Get one project variable.
    pub async fn project_env_var(
        &self,
        organization: &str,
        project: &str,
        name: &str,
    ) -> Result<ProjectEnvironmentVariable> {
        let slug = self.slug(organization, project);
        let request = self
            .rest()
            .request(Method::GET, &format!("project/{}/envvar/{}", slug, name))?;
        self.rest().send_json(request).await
    }

    /// List the variables of a project.
    pub async fn list_project_env_vars(
        &self,
        organization: &str,
        project: &str,
    ) -> Result<Vec<ProjectEnvironmentVariable>> {
        let slug = self.slug(organization, project);
        self.rest()
            .list_all(&format!("project/{}/envvar", slug), &[])
            .await
    }

    /// Whether a project defines `name`. Only a 404 counts as `false`.
    pub async fn has_project_env_var(
        &self,
        organization: &str,
        project: &str,
        name: &str,
    ) -> Result<bool> {
        match self.project_env_var(organization, project, name).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Create a project variable; fails with `AlreadyExists` if it is defined.
    pub async fn create_project_env_var(
        &self,
        organization: &str,
        project: &str,
        name: &str,
        value: &str,
    ) -> Result<ProjectEnvironmentVariable> {
        if self.has_project_env_var(organization, project, name).await? {
            return Err(ProviderError::AlreadyExists(format!(
                "environment variable {} already exists in project {}",
                name, project
            )));
        }

        let slug = self.slug(organization, project);
        let request = self
            .rest()
            .request(Method::POST, &format!("project/{}/envvar", slug))?
            .json(&CreateVariable { name, value });
        self.rest().send_json(request).await
    }

    /// Delete a project variable.
    pub async fn delete_project_env_var(
        &self,
        organization: &str,
        project: &str,
        name: &str,
    ) -> Result<()> {
        let slug = self.slug(organization, project);
        let request = self
            .rest()
            .request(Method::DELETE, &format!("project/{}/envvar/{}", slug, name))?;
        self.rest().send_empty(request).await
    }
}

#[cfg(test)]
mod tests {
    use crate::client::tests::client_for;
    use crate::error::ProviderError;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_create_rejects_existing_variable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/project/github/acme/api/envvar/API_KEY"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"name": "API_KEY", "value": "xxxxcret"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/project/github/acme/api/envvar"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .create_project_env_var("acme", "api", "API_KEY", "s3cret")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::AlreadyExists(_)));
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn test_create_posts_new_variable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/project/github/acme/api/envvar/API_KEY"))
            .respond_with(ResponseTemplate::new(404))
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

        let client = client_for(&server);
        let env = client
            .create_project_env_var("acme", "api", "API_KEY", "s3cret")
            .await
            .unwrap();
        assert_eq!(env.value, "xxxxcret");
    }

    #[tokio::test]
    async fn test_has_propagates_non_404_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/project/github/acme/api/envvar/API_KEY"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .has_project_env_var("acme", "api", "API_KEY")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Remote { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_list_project_env_vars() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/project/github/acme/api/envvar"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"name": "A", "value": "xxxx"}, {"name": "B", "value": "xxxx"}],
                "next_page_token": null
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let vars = client.list_project_env_vars("acme", "api").await.unwrap();
        assert_eq!(vars.len(), 2);
    }
}
