use async_trait::async_trait;

use super::{RemoteResource, ResourceData};
use crate::client::{Client, Context};
use crate::error::{ProviderError, Result};
use crate::schema::{Attribute, Schema};

/// `circleci_context`. The ID is the server-assigned UUID; import accepts
/// either the UUID or the context name.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextResource;

#[async_trait]
impl RemoteResource for ContextResource {
    type Remote = Context;

    const TYPE_NAME: &'static str = "circleci_context";
    const DESCRIPTION: &'static str = "context";

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("A CircleCI context")
            .with_attribute(
                "name",
                Attribute::required_string()
                    .with_description("The name of the context")
                    .with_force_new(),
            )
            .with_attribute("id", Attribute::computed_string())
    }

    async fn create_remote(&self, client: &Client, data: &ResourceData) -> Result<Context> {
        client.create_context(data.require_str("name")?).await
    }

    async fn fetch(&self, client: &Client, data: &ResourceData) -> Result<Context> {
        let id = data
            .id()
            .ok_or_else(|| ProviderError::NotFound("context without an id".to_string()))?;
        client.context_by_id_or_name(id).await
    }

    async fn delete_remote(&self, client: &Client, data: &ResourceData) -> Result<()> {
        match data.id() {
            Some(id) => client.delete_context(id).await,
            None => Ok(()),
        }
    }

    fn id_segments(&self, _data: &ResourceData, remote: &Context) -> Vec<String> {
        vec![remote.id.clone()]
    }

    fn populate(&self, data: &mut ResourceData, remote: &Context) {
        data.set("name", remote.name.clone());
    }
}
