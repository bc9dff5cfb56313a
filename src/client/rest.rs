//! Thin JSON-over-HTTP layer for the CircleCI v2 API.

use std::time::Duration;

use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::error::{ProviderError, Result};

/// Maximum length of a response body kept in errors and logs.
const MAX_BODY_LENGTH: usize = 200;

/// Header carrying the personal API token.
const TOKEN_HEADER: &str = "Circle-Token";

/// Truncate a response body and drop control characters.
fn sanitize_body(body: &str) -> String {
    let truncated = if body.len() > MAX_BODY_LENGTH {
        let mut end = MAX_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| c.is_control(), "")
}

/// One page of a CircleCI list endpoint.
#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Authenticated REST client rooted at the API base URL.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: Url,
    token: String,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url.as_str())
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl RestClient {
    /// Create a client for `base_url` (e.g. `https://circleci.com/api/v2/`).
    pub fn new(base_url: &str, token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ProviderError::Configuration(format!(
                "API URL {} cannot be used as a base URL",
                base_url
            )));
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("circleci-provider/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url,
            token: token.into(),
        })
    }

    /// The API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve `path` (slash-separated, relative to the base URL) to a full URL.
    ///
    /// Each segment is percent-encoded on its own.
    pub fn url(&self, path: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ProviderError::Configuration(format!("cannot append to {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(path.split('/'));
        Ok(url)
    }

    /// Start an authenticated request.
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.url(path)?;
        Ok(self
            .http
            .request(method, url)
            .header(TOKEN_HEADER, &self.token)
            .header(reqwest::header::ACCEPT, "application/json"))
    }

    /// Send a request and decode the JSON response body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let body = self.execute(request).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Send a request and discard the response body.
    pub async fn send_empty(&self, request: RequestBuilder) -> Result<()> {
        self.execute(request).await.map(|_| ())
    }

    /// Follow `next_page_token` until every item of a list endpoint is read.
    pub async fn list_all<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.request(Method::GET, path)?.query(query);
            if let Some(token) = &page_token {
                request = request.query(&[("page-token", token.as_str())]);
            }

            let page: Page<T> = self.send_json(request).await?;
            items.extend(page.items);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(items)
    }

    async fn execute(&self, request: RequestBuilder) -> Result<String> {
        let request = request.build()?;
        let method = request.method().clone();
        let path = request.url().path().to_string();
        debug!(%method, %path, "CircleCI request");

        let response = self.http.execute(request).await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(body);
        }

        let body = sanitize_body(&body);
        if status == reqwest::StatusCode::NOT_FOUND {
            debug!(%method, %path, "CircleCI returned 404");
            return Err(ProviderError::NotFound(format!("{} {}", method, path)));
        }

        warn!(%method, %path, status = status.as_u16(), body = %body, "CircleCI request failed");
        Err(ProviderError::Remote {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> RestClient {
        RestClient::new(&server.uri(), "test-token", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_sanitize_body_truncates() {
        let long = "x".repeat(500);
        let sanitized = sanitize_body(&long);
        assert!(sanitized.starts_with(&"x".repeat(200)));
        assert!(sanitized.contains("500 bytes total"));
        assert_eq!(sanitize_body("a\nb"), "ab");
    }

    #[test]
    fn test_url_joins_segments() {
        let rest =
            RestClient::new("https://circleci.com/api/v2/", "t", Duration::from_secs(1)).unwrap();
        let url = rest
            .url("project/gh/acme/my.app/checkout-key/aa:bb")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://circleci.com/api/v2/project/gh/acme/my.app/checkout-key/aa:bb"
        );
    }

    #[test]
    fn test_url_without_trailing_slash() {
        let rest =
            RestClient::new("https://circleci.com/api/v2", "t", Duration::from_secs(1)).unwrap();
        assert_eq!(
            rest.url("context/abc").unwrap().as_str(),
            "https://circleci.com/api/v2/context/abc"
        );
    }

    #[test]
    fn test_rejects_non_base_url() {
        let err = RestClient::new("mailto:ops@example.com", "t", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[test]
    fn test_debug_redacts_token() {
        let rest =
            RestClient::new("https://circleci.com/api/v2/", "secret", Duration::from_secs(1))
                .unwrap();
        let debug = format!("{:?}", rest);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[tokio::test]
    async fn test_send_json_sets_token_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/context/abc"))
            .and(header("Circle-Token", "test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "abc"})))
            .expect(1)
            .mount(&server)
            .await;

        let rest = client(&server);
        let value: serde_json::Value = rest
            .send_json(rest.request(Method::GET, "context/abc").unwrap())
            .await
            .unwrap();
        assert_eq!(value["id"], "abc");
    }

    #[tokio::test]
    async fn test_404_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/context/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not found"})))
            .mount(&server)
            .await;

        let rest = client(&server);
        let err = rest
            .send_empty(rest.request(Method::GET, "context/missing").unwrap())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_other_status_is_remote_error() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/context/abc"))
            .respond_with(ResponseTemplate::new(403).set_body_string("Permission denied"))
            .mount(&server)
            .await;

        let rest = client(&server);
        let err = rest
            .send_empty(rest.request(Method::DELETE, "context/abc").unwrap())
            .await
            .unwrap_err();
        match err {
            ProviderError::Remote { status, body } => {
                assert_eq!(status, 403);
                assert_eq!(body, "Permission denied");
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_list_all_follows_pages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/context"))
            .and(query_param("page-token", "p2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"n": 3}],
                "next_page_token": null
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/context"))
            .and(query_param("owner-slug", "gh/acme"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"n": 1}, {"n": 2}],
                "next_page_token": "p2"
            })))
            .mount(&server)
            .await;

        let rest = client(&server);
        let items: Vec<serde_json::Value> = rest
            .list_all("context", &[("owner-slug", "gh/acme")])
            .await
            .unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[2]["n"], 3);
    }
}
