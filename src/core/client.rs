use crate::core::auth::{AuthenticatedPayload, Encoding, RequestAuthenticator};
use crate::core::errors::ExchangeError;
use crate::core::kernel::RestClient;
use crate::core::types::Params;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::Method;
use serde_json::Value;
use std::num::NonZeroU32;
use tracing::{debug, instrument};

/// Transport plus authenticator plus optional client-side rate limit.
///
/// Every call is sent exactly once: nothing here retries.
pub struct ApiClient<R: RestClient> {
    exchange: &'static str,
    rest: R,
    auth: RequestAuthenticator,
    limiter: Option<DefaultDirectRateLimiter>,
}

impl<R: RestClient> std::fmt::Debug for ApiClient<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("exchange", &self.exchange)
            .field("auth", &self.auth)
            .field("rate_limited", &self.limiter.is_some())
            .finish_non_exhaustive()
    }
}

impl<R: RestClient> ApiClient<R> {
    pub fn new(exchange: &'static str, rest: R, auth: RequestAuthenticator) -> Self {
        Self {
            exchange,
            rest,
            auth,
            limiter: None,
        }
    }

    /// Cap outgoing requests per second; zero is treated as one.
    pub fn with_rate_limit(mut self, requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(nonzero!(1u32));
        self.limiter = Some(RateLimiter::direct(Quota::per_second(rps)));
        self
    }

    pub const fn exchange(&self) -> &'static str {
        self.exchange
    }

    pub fn rest(&self) -> &R {
        &self.rest
    }

    pub fn has_credentials(&self) -> bool {
        self.auth.has_credentials()
    }

    async fn throttle(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    /// Sign and send. The in-flight slot is taken before the nonce is
    /// allocated and held until the response is in.
    #[instrument(skip(self, base_url, params), fields(exchange = self.exchange, method = %method))]
    pub async fn execute_signed(
        &self,
        method: Method,
        base_url: &str,
        path: &str,
        params: Params,
        encoding: Encoding,
    ) -> Result<Value, ExchangeError> {
        let _slot = self.auth.in_flight_permit().await?;
        self.throttle().await;
        let payload = self
            .auth
            .build_payload(method.as_str(), path, &params, encoding)?;
        debug!(nonce = ?payload.nonce(), param_count = payload.params().len(), "sending signed request");
        self.rest.send(method, base_url, path, &payload).await
    }

    #[instrument(skip(self, base_url, params), fields(exchange = self.exchange, method = %method))]
    pub async fn execute_public(
        &self,
        method: Method,
        base_url: &str,
        path: &str,
        params: Params,
    ) -> Result<Value, ExchangeError> {
        let payload = AuthenticatedPayload::unsigned(params, Encoding::Query)?;
        self.throttle().await;
        self.rest.send(method, base_url, path, &payload).await
    }
}
