//! REST client for the material-processing service with token refresh

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::types::{CreateMaterialRequest, MaterialReceipt};

use super::auth::{AuthTokens, RefreshRequest, RefreshResponse, TokenStore};
use super::refresh::{RefreshCoordinator, RefreshTicket};
use super::submitter::{wait_until_settled, MaterialSubmitter};

/// Material API client.
///
/// Owns its tokens and refresh coordinator; two clients never share
/// refresh state.
pub struct MaterialClient {
    /// HTTP client
    client: Client,
    /// Base URL without trailing slash
    base_url: String,
    /// Maximum retries for retryable failures
    max_retries: u32,
    poll_interval: Duration,
    max_polls: u32,
    tokens: TokenStore,
    refresh: RefreshCoordinator,
}

impl MaterialClient {
    /// Create a new client
    pub fn new(config: &ApiConfig, tokens: Option<AuthTokens>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
            poll_interval: config.poll_interval(),
            max_polls: config.max_polls,
            tokens: TokenStore::new(tokens),
            refresh: RefreshCoordinator::new(),
        })
    }

    /// Token storage (for sign-in and sign-out)
    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// `POST /materials`
    pub async fn create_material(&self, request: &CreateMaterialRequest) -> Result<MaterialReceipt> {
        let url = format!("{}/materials", self.base_url);
        tracing::info!(
            "Submitting material '{}' with {} chunks",
            request.title,
            request.text_chunks.len()
        );

        let receipt: MaterialReceipt = self
            .execute(|client| client.post(&url).json(request))
            .await?;

        tracing::info!("Material {} accepted ({})", receipt.id, receipt.status);
        Ok(receipt)
    }

    /// `GET /materials/{id}`
    pub async fn get_material(&self, material_id: &str) -> Result<MaterialReceipt> {
        let url = format!("{}/materials/{}", self.base_url, material_id);
        self.execute(|client| client.get(&url)).await
    }

    /// Poll until the material is `ready` or `failed`, using the configured
    /// interval and poll budget
    pub async fn wait_until_settled(&self, material_id: &str) -> Result<MaterialReceipt> {
        wait_until_settled(self, material_id, self.poll_interval, self.max_polls).await
    }

    /// Send with retry, then decode the JSON body
    async fn execute<T, F>(&self, build: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn(&Client) -> RequestBuilder,
    {
        let build = &build;
        self.retry_request(|| async move {
            let response = self.send_authorized(build).await?;
            Self::parse_response(response).await
        })
        .await
    }

    /// Retry a request with exponential backoff
    async fn retry_request<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = Duration::from_millis(250 * 2u64.pow(attempt));
                    tracing::warn!(
                        "Request failed (attempt {}/{}): {}, retrying in {:?}",
                        attempt + 1,
                        self.max_retries + 1,
                        e,
                        delay
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Send with the current token; on `401` refresh once and resend
    async fn send_authorized<F>(&self, build: &F) -> Result<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let sent_token = self.tokens.access_token();
        let response = self.send_once(build, sent_token.as_deref()).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        tracing::debug!("Access token rejected, refreshing");
        let token = self.refresh_access_token(sent_token.as_deref()).await?;
        let response = self.send_once(build, Some(&token)).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!("Request still unauthorized after token refresh");
        }
        Ok(response)
    }

    async fn send_once<F>(&self, build: &F, token: Option<&str>) -> Result<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let mut request = build(&self.client);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        Ok(request.send().await?)
    }

    /// Obtain a token newer than `stale`, joining an in-flight refresh if any
    async fn refresh_access_token(&self, stale: Option<&str>) -> Result<String> {
        if let Some(current) = self.newer_token(stale) {
            return Ok(current);
        }

        match self.refresh.begin() {
            RefreshTicket::Waiter(pending) => pending.wait().await,
            RefreshTicket::Leader(lease) => {
                // A refresh may have settled between the check above and begin()
                if let Some(current) = self.newer_token(stale) {
                    lease.settle(Ok(current.clone()));
                    return Ok(current);
                }

                let outcome = self.request_new_token().await;
                lease.settle(outcome.as_ref().map(Clone::clone).map_err(ToString::to_string));
                outcome
            }
        }
    }

    fn newer_token(&self, stale: Option<&str>) -> Option<String> {
        self.tokens
            .access_token()
            .filter(|current| Some(current.as_str()) != stale)
    }

    /// `POST /auth/refresh`
    async fn request_new_token(&self) -> Result<String> {
        let refresh_token = self
            .tokens
            .refresh_token()
            .ok_or_else(|| Error::auth("no refresh token available"))?;

        let url = format!("{}/auth/refresh", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&RefreshRequest {
                refresh_token: &refresh_token,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            self.tokens.clear();
            return Err(Error::auth(format!("refresh rejected: HTTP {}", status)));
        }

        let body: RefreshResponse = serde_json::from_slice(&response.bytes().await?)?;
        let token = body.access_token.clone();
        self.tokens.apply_refresh(body);
        tracing::info!("Access token refreshed");
        Ok(token)
    }

    /// Decode a success body or turn the error body into `Error::Api`
    async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            let body = response.bytes().await?;
            return Ok(serde_json::from_slice(&body)?);
        }

        let body = response.text().await.unwrap_or_default();
        Err(Error::Api {
            status: status.as_u16(),
            message: error_message(&body).unwrap_or_else(|| format!("HTTP {}", status)),
        })
    }
}

/// Pull `message` or `error` out of a JSON error body
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(|v| v.as_str()))
        .map(str::to_string)
}

#[async_trait]
impl MaterialSubmitter for MaterialClient {
    async fn submit(&self, request: &CreateMaterialRequest) -> Result<MaterialReceipt> {
        self.create_material(request).await
    }

    async fn status(&self, material_id: &str) -> Result<MaterialReceipt> {
        self.get_material(material_id).await
    }

    fn name(&self) -> &str {
        "rest"
    }
}
