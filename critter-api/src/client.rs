//! The HTTP client shared by fetches, identity resolution and mutations.

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use critter_types::AccessKey;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Credentials attached to a request.
#[derive(Debug, Clone, Copy)]
pub enum Auth<'a> {
    /// No credentials.
    Anonymous,
    /// Upstream session token (identity phase 1).
    Bearer(&'a str),
    /// Resource access key (everything after identity resolution).
    AccessKey(&'a AccessKey),
}

/// Thin wrapper over `reqwest::Client` bound to one API base URL.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    config: ApiConfig,
    http: Client,
}

impl ApiClient {
    /// Creates a client for the configured API.
    pub fn new(config: ApiConfig) -> ApiResult<Self> {
        if config.base_url.trim().is_empty() {
            return Err(ApiError::Config("base_url must not be empty".into()));
        }
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    /// Returns the configuration this client was built with.
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// `GET path?query`, decoding a JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        auth: Auth<'_>,
        query: &[(String, String)],
    ) -> ApiResult<T> {
        let request = self.request(Method::GET, path, auth).query(query);
        let response = self.execute(request, path).await?;
        Ok(response.json().await?)
    }

    /// Sends a JSON body with `method`, decoding a JSON response.
    pub async fn send_json<B, T>(
        &self,
        method: Method,
        path: &str,
        auth: Auth<'_>,
        body: &B,
    ) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(method, path, auth).json(body);
        let response = self.execute(request, path).await?;
        Ok(response.json().await?)
    }

    /// Sends a JSON body with `method`, ignoring any response body.
    pub async fn send_no_content<B>(
        &self,
        method: Method,
        path: &str,
        auth: Auth<'_>,
        body: &B,
    ) -> ApiResult<()>
    where
        B: Serialize + ?Sized,
    {
        let request = self.request(method, path, auth).json(body);
        self.execute(request, path).await?;
        Ok(())
    }

    fn request(&self, method: Method, path: &str, auth: Auth<'_>) -> RequestBuilder {
        let builder = self.http.request(method, self.config.endpoint(path));
        match auth {
            Auth::Anonymous => builder,
            Auth::Bearer(token) => builder.bearer_auth(token),
            Auth::AccessKey(key) => builder.header(&self.config.access_key_header, key.as_str()),
        }
    }

    async fn execute(&self, request: RequestBuilder, path: &str) -> ApiResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Network(format!("{path}: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let error = ApiError::from_response(status.as_u16(), &body);
        debug!("{} {} failed: {}", status.as_u16(), path, error);
        Err(error)
    }
}
