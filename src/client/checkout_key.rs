//! Project checkout keys.

use std::fmt;
use std::str::FromStr;

use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::Client;
use crate::error::{ProviderError, Result};

/// The kind of SSH key CircleCI checks code out with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckoutKeyType {
    /// A key tied to a user account.
    UserKey,
    /// A repository deploy key.
    DeployKey,
}

impl CheckoutKeyType {
    /// Every accepted value, in wire form.
    pub const VALUES: [&'static str; 2] = ["user-key", "deploy-key"];

    /// The wire form of this key type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserKey => "user-key",
            Self::DeployKey => "deploy-key",
        }
    }
}

impl fmt::Display for CheckoutKeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckoutKeyType {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user-key" => Ok(Self::UserKey),
            "deploy-key" => Ok(Self::DeployKey),
            other => Err(ProviderError::Validation(format!(
                "checkout key type must be one of {}, got \"{}\"",
                Self::VALUES.join(", "),
                other
            ))),
        }
    }
}

/// A checkout key as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutKey {
    /// Public half of the SSH key.
    pub public_key: String,
    /// Key type.
    #[serde(rename = "type")]
    pub key_type: CheckoutKeyType,
    /// Server-assigned fingerprint, unique within the project.
    pub fingerprint: String,
    /// Whether CircleCI prefers this key for checkout.
    #[serde(default)]
    pub preferred: bool,
    /// Creation timestamp.
    #[serde(default)]
    pub created_at: String,
}

#[derive(Serialize)]
struct CreateCheckoutKey {
    #[serde(rename = "type")]
    key_type: CheckoutKeyType,
}

impl Client {
    /// Get a checkout key by fingerprint.
    pub async fn checkout_key(
        &self,
        organization: &str,
        project: &str,
        fingerprint: &str,
    ) -> Result<CheckoutKey> {
        let slug = self.slug(organization, project);
        let request = self.rest().request(
            Method::GET,
            &format!("project/{}/checkout-key/{}", slug, fingerprint),
        )?;
        self.rest().send_json(request).await
    }

    /// Whether the project has a key with this fingerprint.
    pub async fn has_checkout_key(
        &self,
        organization: &str,
        project: &str,
        fingerprint: &str,
    ) -> Result<bool> {
        match self.checkout_key(organization, project, fingerprint).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Generate a new checkout key of the given type.
    pub async fn create_checkout_key(
        &self,
        organization: &str,
        project: &str,
        key_type: CheckoutKeyType,
    ) -> Result<CheckoutKey> {
        let slug = self.slug(organization, project);
        let request = self
            .rest()
            .request(Method::POST, &format!("project/{}/checkout-key", slug))?
            .json(&CreateCheckoutKey { key_type });
        self.rest().send_json(request).await
    }

    /// Delete a checkout key by fingerprint.
    pub async fn delete_checkout_key(
        &self,
        organization: &str,
        project: &str,
        fingerprint: &str,
    ) -> Result<()> {
        let slug = self.slug(organization, project);
        let request = self.rest().request(
            Method::DELETE,
            &format!("project/{}/checkout-key/{}", slug, fingerprint),
        )?;
        self.rest().send_empty(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::client_for;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FINGERPRINT: &str = "aa:bb:cc:dd:ee:ff:00:11:22:33:44:55:66:77:88:99";

    #[test]
    fn test_key_type_parsing() {
        assert_eq!("user-key".parse::<CheckoutKeyType>().unwrap(), CheckoutKeyType::UserKey);
        assert_eq!(CheckoutKeyType::DeployKey.to_string(), "deploy-key");
        assert!("github-user-key".parse::<CheckoutKeyType>().is_err());
    }

    #[tokio::test]
    async fn test_create_checkout_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/project/github/acme/api/checkout-key"))
            .and(body_json(json!({"type": "deploy-key"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "public_key": "ssh-rsa AAAA",
                "type": "deploy-key",
                "fingerprint": FINGERPRINT,
                "preferred": true,
                "created_at": "2024-01-01T00:00:00Z"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let key = client
            .create_checkout_key("acme", "api", CheckoutKeyType::DeployKey)
            .await
            .unwrap();
        assert_eq!(key.fingerprint, FINGERPRINT);
        assert!(key.preferred);
    }

    #[tokio::test]
    async fn test_has_checkout_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/project/github/acme/api/checkout-key/{}", FINGERPRINT)))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/project/github/acme/broken/checkout-key/ff"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(!client
            .has_checkout_key("acme", "api", FINGERPRINT)
            .await
            .unwrap());
        assert!(client.has_checkout_key("acme", "broken", "ff").await.is_err());
    }
}
