use async_trait::async_trait;

use super::{RemoteResource, ResourceData};
use crate::client::{CheckoutKey, CheckoutKeyType, Client};
use crate::error::{ProviderError, Result};
use crate::id::IdLayout;
use crate::schema::{Attribute, Schema};

/// `circleci_checkout_key`, identified by
/// `ORGANIZATION.PROJECT.TYPE.FINGERPRINT`.
///
/// Project names may contain dots, so the project segment absorbs every
/// token between the organization and the key type.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckoutKeyResource;

/// A checkout key together with the organization it was resolved in.
#[derive(Debug, Clone)]
pub struct OwnedCheckoutKey {
    organization: String,
    key: CheckoutKey,
}

impl CheckoutKeyResource {
    const LAYOUT: IdLayout =
        IdLayout::new('.', &["organization", "project", "type", "fingerprint"]).absorbing(1);
}

#[async_trait]
impl RemoteResource for CheckoutKeyResource {
    type Remote = OwnedCheckoutKey;

    const TYPE_NAME: &'static str = "circleci_checkout_key";
    const DESCRIPTION: &'static str = "project checkout key";
    const ID_LAYOUT: Option<IdLayout> = Some(Self::LAYOUT);

    fn schema(&self) -> Schema {
        Schema::new(1)
            .with_attribute(
                "organization",
                Attribute::optional_string()
                    .with_description("The CircleCI organization")
                    .with_force_new()
                    .computed(),
            )
            .with_attribute(
                "project",
                Attribute::required_string()
                    .with_description("The name of the CircleCI project to create the checkout key in")
                    .with_force_new(),
            )
            .with_attribute(
                "type",
                Attribute::required_string()
                    .with_description("The type of the checkout key, \"user-key\" or \"deploy-key\"")
                    .with_force_new()
                    .with_allowed_values(CheckoutKeyType::VALUES),
            )
            .with_attribute(
                "fingerprint",
                Attribute::computed_string()
                    .with_description("The fingerprint of the checkout key")
                    .with_force_new(),
            )
            .with_attribute(
                "public_key",
                Attribute::computed_string().with_description("The public SSH key of the checkout key"),
            )
            .with_attribute(
                "preferred",
                Attribute::computed_bool()
                    .with_description("Whether CircleCI prefers this key for checkout"),
            )
            .with_attribute(
                "created_at",
                Attribute::computed_string()
                    .with_description("The date and time the checkout key was created"),
            )
            .with_attribute("id", Attribute::computed_string())
    }

    async fn create_remote(&self, client: &Client, data: &ResourceData) -> Result<OwnedCheckoutKey> {
        let organization = client.organization(data.get_ok("organization"))?;
        let key_type: CheckoutKeyType = data.require_str("type")?.parse()?;
        let key = client
            .create_checkout_key(&organization, data.require_str("project")?, key_type)
            .await?;
        Ok(OwnedCheckoutKey { organization, key })
    }

    async fn fetch(&self, client: &Client, data: &ResourceData) -> Result<OwnedCheckoutKey> {
        let organization = client.organization(data.get_ok("organization"))?;
        let key = client
            .checkout_key(
                &organization,
                data.require_str("project")?,
                data.require_str("fingerprint")?,
            )
            .await?;

        // A fingerprint of the other key type is a different key.
        if let Some(expected) = data.get_ok("type") {
            if expected != key.key_type.as_str() {
                return Err(ProviderError::NotFound(format!(
                    "checkout key {} is a {}, not a {}",
                    key.fingerprint, key.key_type, expected
                )));
            }
        }
        Ok(OwnedCheckoutKey { organization, key })
    }

    async fn delete_remote(&self, client: &Client, data: &ResourceData) -> Result<()> {
        let organization = client.organization(data.get_ok("organization"))?;
        client
            .delete_checkout_key(
                &organization,
                data.require_str("project")?,
                data.require_str("fingerprint")?,
            )
            .await
    }

    fn id_segments(&self, data: &ResourceData, remote: &OwnedCheckoutKey) -> Vec<String> {
        vec![
            remote.organization.clone(),
            data.get_str("project").to_string(),
            remote.key.key_type.to_string(),
            remote.key.fingerprint.clone(),
        ]
    }

    fn populate(&self, data: &mut ResourceData, remote: &OwnedCheckoutKey) {
        data.set("organization", remote.organization.clone());
        data.set("type", remote.key.key_type.as_str());
        data.set("fingerprint", remote.key.fingerprint.clone());
        data.set("public_key", remote.key.public_key.clone());
        data.set("preferred", remote.key.preferred);
        data.set("created_at", remote.key.created_at.clone());
    }
}
