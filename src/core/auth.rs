//! Signed request payloads.
//!
//! Every private call goes through [`RequestAuthenticator::build_payload`]:
//! the base parameters are copied, a fresh nonce is attached, the result is
//! serialized once, and the signature is computed over exactly those bytes.

use crate::core::config::ExchangeConfig;
use crate::core::errors::ExchangeError;
use crate::core::kernel::signer::{is_sensitive_header, HmacExchangeType, HmacSigner, SigningInput};
use crate::core::kernel::Signer;
use crate::core::types::Params;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::trace;

/// Unit a nonce is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NonceStyle {
    /// Wall-clock milliseconds, bumped past the previous value on ties
    #[default]
    UnixMillis,
    UnixMicros,
    /// Plain counter starting at 1
    Counter,
}

impl NonceStyle {
    fn now(self) -> u64 {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        match self {
            Self::UnixMillis => elapsed.as_millis() as u64,
            Self::UnixMicros => elapsed.as_micros() as u64,
            Self::Counter => 0,
        }
    }
}

/// Lock-free, strictly increasing nonce source for one credential.
#[derive(Debug, Default)]
pub struct NonceGenerator {
    last: AtomicU64,
    style: NonceStyle,
}

impl NonceGenerator {
    pub fn new(style: NonceStyle) -> Self {
        Self {
            last: AtomicU64::new(0),
            style,
        }
    }

    /// Allocate the next nonce: the current clock reading, or one past the
    /// last issued value if the clock has not moved on.
    pub fn next(&self) -> u64 {
        let now = self.style.now();
        let (Ok(prev) | Err(prev)) =
            self.last
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                    Some(now.max(last + 1))
                });
        now.max(prev + 1)
    }

    pub fn last_issued(&self) -> u64 {
        self.last.load(Ordering::Acquire)
    }
}

/// How a payload travels on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// URL query string
    Query,
    /// `application/x-www-form-urlencoded` body
    Form,
    /// `application/json` body of string values
    Json,
}

impl Encoding {
    fn serialize(self, params: &Params) -> Result<String, ExchangeError> {
        match self {
            Self::Query | Self::Form => Ok(params.to_query_string()),
            Self::Json if params.is_empty() => Ok(String::new()),
            Self::Json => serde_json::to_string(&params.to_json()).map_err(|e| {
                ExchangeError::InvalidArgument(format!("payload is not serializable: {}", e))
            }),
        }
    }
}

/// A request ready for the transport. Built fresh for every call and never
/// edited afterwards.
#[derive(Clone)]
pub struct AuthenticatedPayload {
    params: Params,
    headers: Vec<(String, String)>,
    encoding: Encoding,
    wire: String,
    nonce: Option<u64>,
}

impl AuthenticatedPayload {
    /// Payload for a public endpoint: no nonce, no signature.
    pub fn unsigned(params: Params, encoding: Encoding) -> Result<Self, ExchangeError> {
        let wire = encoding.serialize(&params)?;
        Ok(Self {
            params,
            headers: Vec::new(),
            encoding,
            wire,
            nonce: None,
        })
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub const fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Exact string sent: the query string or the request body.
    pub fn wire(&self) -> &str {
        &self.wire
    }

    pub const fn nonce(&self) -> Option<u64> {
        self.nonce
    }
}

impl fmt::Debug for AuthenticatedPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<(&str, &str)> = self
            .params
            .iter()
            .map(|(k, v)| if k == "signature" { (k, "[REDACTED]") } else { (k, v) })
            .collect();
        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(k, v)| {
                if is_sensitive_header(k) {
                    (k.as_str(), "[REDACTED]")
                } else {
                    (k.as_str(), v.as_str())
                }
            })
            .collect();
        f.debug_struct("AuthenticatedPayload")
            .field("params", &params)
            .field("headers", &headers)
            .field("encoding", &self.encoding)
            .field("wire_len", &self.wire.len())
            .field("nonce", &self.nonce)
            .finish()
    }
}

/// Nonce allocation, signing and in-flight bounding for one credential set.
pub struct RequestAuthenticator {
    signer: Option<Arc<dyn Signer>>,
    nonces: NonceGenerator,
    in_flight: Semaphore,
}

impl fmt::Debug for RequestAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestAuthenticator")
            .field("has_signer", &self.signer.is_some())
            .field("last_nonce", &self.nonces.last_issued())
            .field("available_slots", &self.in_flight.available_permits())
            .finish()
    }
}

impl RequestAuthenticator {
    pub fn new(signer: Option<Arc<dyn Signer>>, style: NonceStyle, max_in_flight: usize) -> Self {
        Self {
            signer,
            nonces: NonceGenerator::new(style),
            in_flight: Semaphore::new(max_in_flight.max(1)),
        }
    }

    /// Build an HMAC authenticator from config. Missing credentials yield a
    /// public-only authenticator; malformed ones are rejected here.
    pub fn from_config(
        config: &ExchangeConfig,
        exchange_type: HmacExchangeType,
    ) -> Result<Self, ExchangeError> {
        let signer: Option<Arc<dyn Signer>> = if config.has_credentials() {
            Some(Arc::new(HmacSigner::new(
                config.api_key.clone(),
                config.secret_key.clone(),
                exchange_type,
            )?))
        } else {
            None
        };
        Ok(Self::new(
            signer,
            NonceStyle::UnixMillis,
            config.max_in_flight,
        ))
    }

    pub fn has_credentials(&self) -> bool {
        self.signer.is_some()
    }

    /// Wait for a free signed-request slot. Hold the permit from before the
    /// nonce is allocated until the response has arrived.
    pub async fn in_flight_permit(&self) -> Result<SemaphorePermit<'_>, ExchangeError> {
        self.in_flight
            .acquire()
            .await
            .map_err(|_| ExchangeError::TransportError("request slots closed".to_string()))
    }

    /// Copy `base`, attach a nonce, serialize, sign and attach the signature.
    pub fn build_payload(
        &self,
        method: &str,
        path: &str,
        base: &Params,
        encoding: Encoding,
    ) -> Result<AuthenticatedPayload, ExchangeError> {
        let signer = self.signer.as_ref().ok_or_else(|| {
            ExchangeError::AuthError("credentials are required for this call".to_string())
        })?;

        let nonce = self.nonces.next();
        let params = match signer.nonce_field() {
            Some(field) => base.clone().with(field, nonce),
            None => base.clone(),
        };
        let canonical = encoding.serialize(&params)?;

        let signature = signer.sign_request(&SigningInput {
            method,
            path,
            canonical: &canonical,
            nonce,
        })?;

        let (params, wire) = match signature.param {
            Some((name, value)) => {
                let tail = Params::new().with(name.as_str(), &value).to_query_string();
                let wire = if canonical.is_empty() {
                    tail
                } else {
                    format!("{}&{}", canonical, tail)
                };
                (params.with(name, value), wire)
            }
            None => (params, canonical),
        };

        trace!(nonce, path, "payload signed");

        Ok(AuthenticatedPayload {
            params,
            headers: signature.headers,
            encoding,
            wire,
            nonce: Some(nonce),
        })
    }
}
