//! HTTP client for the storefront REST API.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, header::ACCEPT};
use serde::de::DeserializeOwned;

use crate::api::ApiError;

/// Configuration for connecting to the storefront API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// API base URL, e.g. `"https://shop.example.com/api"`.
    pub base_url: String,

    /// Bearer token for the signed-in customer.
    pub token: Option<String>,

    /// Per-request timeout.
    pub timeout: Duration,
}

/// HTTP client implementing the storefront service traits.
#[derive(Debug, Clone)]
pub struct ApiClient {
    config: ApiConfig,
    http: Client,
}

impl ApiClient {
    /// Create a new client from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let http = Client::builder().timeout(config.timeout).build()?;

        Ok(Self { config, http })
    }

    /// The configured base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, self.url(path))
            .header(ACCEPT, "application/json");

        match &self.config.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Decode a JSON body, turning non-2xx responses into [`ApiError`]s.
    pub(crate) async fn read<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            return Err(ApiError::from_response(status, body));
        }

        Ok(response.json().await?)
    }
}
