//! HTTP client implementation using reqwest

use crate::config::{redact_url, CredentialMode, RelayConfig, SecretString};
use crate::http::{parse_body, HttpExecutor, RequestOptions, UpstreamError, UpstreamReply};
use crate::providers::gemini::GenerateContentRequest;
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Maximum response size (10MB)
const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024;

/// Default user agent
const USER_AGENT: &str = concat!("askai-relay/", env!("CARGO_PKG_VERSION"));

/// Header carrying the credential in header mode
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Shared HTTP client with connection pooling
#[derive(Clone)]
pub struct HttpClient {
    /// The underlying reqwest client
    client: Arc<Client>,

    /// `generateContent` URL without the credential
    endpoint: String,

    api_key: SecretString,

    credential_mode: CredentialMode,

    /// Maximum response size to prevent OOM
    max_response_size: usize,
}

impl HttpClient {
    /// Create a client for the upstream described by `config`
    pub fn new(config: &RelayConfig) -> Result<Self, String> {
        let client = ClientBuilder::new()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(Duration::from_secs(10))
            .timeout(config.upstream_timeout())
            .user_agent(USER_AGENT)
            .gzip(true)
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client: Arc::new(client),
            endpoint: config.endpoint_url(),
            api_key: config.api_key.clone(),
            credential_mode: config.credential_mode,
            max_response_size: MAX_RESPONSE_SIZE,
        })
    }

    /// Read the body, capping its size; an unreadable body counts as empty
    async fn read_body(&self, response: reqwest::Response, options: &RequestOptions) -> String {
        if let Some(content_length) = response.content_length() {
            if content_length as usize > self.max_response_size {
                warn!(
                    "Response size {} exceeds maximum {} [request_id: {}]",
                    content_length, self.max_response_size, options.request_id
                );
                return String::new();
            }
        }

        match response.text().await {
            Ok(text) if text.len() <= self.max_response_size => text,
            Ok(text) => {
                warn!(
                    "Response size {} exceeds maximum {} [request_id: {}]",
                    text.len(),
                    self.max_response_size,
                    options.request_id
                );
                String::new()
            }
            Err(e) => {
                warn!(
                    "Failed to read response body [request_id: {}]: {}",
                    options.request_id, e
                );
                String::new()
            }
        }
    }
}

#[async_trait]
impl HttpExecutor for HttpClient {
    async fn execute_json(
        &self,
        request: &GenerateContentRequest,
        options: &RequestOptions,
    ) -> Result<UpstreamReply, UpstreamError> {
        let request_id = options.request_id;

        let req_builder = self
            .client
            .post(&self.endpoint)
            .timeout(options.timeout)
            .json(request)
            .header("X-Request-ID", request_id.to_string());

        let req_builder = match self.credential_mode {
            CredentialMode::Header => {
                req_builder.header(API_KEY_HEADER, self.api_key.expose_secret())
            }
            CredentialMode::Query => {
                req_builder.query(&[("key", self.api_key.expose_secret())])
            }
        };

        let http_request = req_builder
            .build()
            .map_err(|e| UpstreamError::from_reqwest(&e, options.timeout, request_id))?;

        debug!(
            "POST {} attempt {} [request_id: {}]",
            redact_url(http_request.url().as_str()),
            options.attempt,
            request_id
        );

        let response = self.client.execute(http_request).await.map_err(|e| {
            let err = UpstreamError::from_reqwest(&e, options.timeout, request_id);
            warn!("Upstream call failed: {}", err);
            err
        })?;

        let status = response.status().as_u16();
        let text = self.read_body(response, options).await;
        let body = parse_body(&text);

        info!(
            "Upstream responded {} on attempt {} [request_id: {}]",
            status, options.attempt, request_id
        );

        Ok(UpstreamReply { status, body })
    }
}
