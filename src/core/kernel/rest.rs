use crate::core::auth::{AuthenticatedPayload, Encoding};
use crate::core::errors::ExchangeError;
use async_trait::async_trait;
use reqwest::{Client, Method, Response};
use serde_json::Value;
use tracing::{instrument, trace};

/// REST client trait for making HTTP requests
///
/// The transport boundary: sends an already-built payload and returns the
/// parsed JSON. It never signs, retries or rewrites what it is given.
#[async_trait]
pub trait RestClient: Send + Sync {
    /// Send `payload` to `base_url + path`
    ///
    /// # Returns
    /// The response body as JSON, or `Value::Null` for an empty body
    async fn send(
        &self,
        method: Method,
        base_url: &str,
        path: &str,
        payload: &AuthenticatedPayload,
    ) -> Result<Value, ExchangeError>;
}

/// Configuration for the REST client
#[derive(Clone, Debug)]
pub struct RestClientConfig {
    /// Exchange name for logging and tracing
    pub exchange_name: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string to include in requests
    pub user_agent: String,
}

impl RestClientConfig {
    pub fn new(exchange_name: impl Into<String>) -> Self {
        Self {
            exchange_name: exchange_name.into(),
            timeout_seconds: 30,
            user_agent: "unifex/0.1".to_string(),
        }
    }
}

/// Builder for creating REST client instances
pub struct RestClientBuilder {
    config: RestClientConfig,
}

impl RestClientBuilder {
    pub fn new(config: RestClientConfig) -> Self {
        Self { config }
    }

    /// Build the REST client
    pub fn build(self) -> Result<ReqwestRest, ExchangeError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(self.config.timeout_seconds))
            .user_agent(&self.config.user_agent)
            .build()
            .map_err(|e| {
                ExchangeError::TransportError(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(ReqwestRest {
            client,
            config: self.config,
        })
    }
}

/// Implementation of `RestClient` using reqwest
#[derive(Clone)]
pub struct ReqwestRest {
    client: Client,
    config: RestClientConfig,
}

impl std::fmt::Debug for ReqwestRest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestRest")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ReqwestRest {
    pub fn new(exchange_name: impl Into<String>) -> Result<Self, ExchangeError> {
        RestClientBuilder::new(RestClientConfig::new(exchange_name)).build()
    }

    /// Handle the response and extract JSON
    #[instrument(skip(self, response), fields(exchange = %self.config.exchange_name, status = %response.status()))]
    async fn handle_response(&self, response: Response) -> Result<Value, ExchangeError> {
        let status = response.status();
        let response_text = response.text().await.map_err(|e| {
            ExchangeError::TransportError(format!("Failed to read response body: {}", e))
        })?;

        trace!("Response body: {}", response_text);

        if !status.is_success() {
            // Binance-family vendors reject with a 4xx carrying {code, msg}
            if let Ok(body) = serde_json::from_str::<Value>(&response_text) {
                if let (Some(code), Some(msg)) = (
                    body.get("code").and_then(Value::as_i64),
                    body.get("msg").and_then(Value::as_str),
                ) {
                    return Err(ExchangeError::ApiError {
                        code,
                        message: msg.to_string(),
                    });
                }
            }
            return Err(ExchangeError::TransportError(format!(
                "HTTP {}: {}",
                status.as_u16(),
                response_text
            )));
        }
        if response_text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&response_text).map_err(|e| {
            ExchangeError::MalformedResponse(format!("Failed to parse JSON response: {}", e))
        })
    }
}

#[async_trait]
impl RestClient for ReqwestRest {
    #[instrument(skip(self, payload), fields(exchange = %self.config.exchange_name, method = %method, path = %path))]
    async fn send(
        &self,
        method: Method,
        base_url: &str,
        path: &str,
        payload: &AuthenticatedPayload,
    ) -> Result<Value, ExchangeError> {
        let mut url = format!("{}{}", base_url, path);
        let wire = payload.wire();

        if payload.encoding() == Encoding::Query && !wire.is_empty() {
            url.push('?');
            url.push_str(wire);
        }

        let mut request = self.client.request(method, &url);
        for (key, value) in payload.headers() {
            request = request.header(key.as_str(), value.as_str());
        }

        match payload.encoding() {
            Encoding::Query => {}
            Encoding::Form => {
                request = request
                    .header("Content-Type", "application/x-www-form-urlencoded")
                    .body(wire.to_string());
            }
            Encoding::Json => {
                request = request
                    .header("Content-Type", "application/json")
                    .body(wire.to_string());
            }
        }

        let response = request
            .send()
            .await
            .map_err(|e| ExchangeError::TransportError(format!("Request failed: {}", e)))?;

        self.handle_response(response).await
    }
}
