use crate::core::errors::ExchangeError;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, Secret};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Everything a signature is computed over
#[derive(Debug, Clone, Copy)]
pub struct SigningInput<'a> {
    /// HTTP method (GET, POST, etc.)
    pub method: &'a str,
    /// API endpoint path
    pub path: &'a str,
    /// Exact bytes that will be sent: query/form string or JSON body
    pub canonical: &'a str,
    /// Nonce already embedded in `canonical` (or carried in a header)
    pub nonce: u64,
}

/// Output of a signer: an optional trailing parameter plus request headers
#[derive(Clone, Default)]
pub struct Signature {
    pub param: Option<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signature")
            .field("param", &self.param.as_ref().map(|(k, _)| k))
            .field("header_count", &self.headers.len())
            .finish()
    }
}

/// Signer trait for request authentication
///
/// Implementations handle the specific signing logic for each exchange's
/// requirements. Signing never suspends and never logs key material.
pub trait Signer: Send + Sync {
    fn sign_request(&self, input: &SigningInput<'_>) -> Result<Signature, ExchangeError>;

    /// Parameter name the nonce is carried under, if it travels in the payload
    fn nonce_field(&self) -> Option<&'static str>;
}

/// Supported HMAC exchange types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HmacExchangeType {
    /// HMAC over the query/form string, appended as `signature`, key in `X-MBX-APIKEY`
    Binance,
    /// HMAC over `timestamp + api_key + recv_window + payload`, all in `X-BAPI-*` headers
    Bybit { recv_window_ms: u64 },
}

/// HMAC-SHA256 signer
pub struct HmacSigner {
    api_key: Secret<String>,
    secret_key: Secret<String>,
    exchange_type: HmacExchangeType,
}

impl std::fmt::Debug for HmacSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacSigner")
            .field("exchange_type", &self.exchange_type)
            .finish_non_exhaustive()
    }
}

fn validate_key(name: &str, key: &str) -> Result<(), ExchangeError> {
    if key.is_empty() {
        return Err(ExchangeError::AuthError(format!("{} is missing", name)));
    }
    if key.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ExchangeError::AuthError(format!("{} is malformed", name)));
    }
    Ok(())
}

impl HmacSigner {
    pub fn new(
        api_key: Secret<String>,
        secret_key: Secret<String>,
        exchange_type: HmacExchangeType,
    ) -> Result<Self, ExchangeError> {
        validate_key("API key", api_key.expose_secret())?;
        validate_key("secret key", secret_key.expose_secret())?;
        Ok(Self {
            api_key,
            secret_key,
            exchange_type,
        })
    }

    fn hmac_hex(&self, message: &str) -> Result<String, ExchangeError> {
        let mut mac = HmacSha256::new_from_slice(self.secret_key.expose_secret().as_bytes())
            .map_err(|e| ExchangeError::AuthError(format!("Invalid secret key: {}", e)))?;
        mac.update(message.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

impl Signer for HmacSigner {
    fn sign_request(&self, input: &SigningInput<'_>) -> Result<Signature, ExchangeError> {
        match self.exchange_type {
            HmacExchangeType::Binance => {
                let signature = self.hmac_hex(input.canonical)?;
                Ok(Signature {
                    param: Some(("signature".to_string(), signature)),
                    headers: vec![(
                        "X-MBX-APIKEY".to_string(),
                        self.api_key.expose_secret().clone(),
                    )],
                })
            }
            HmacExchangeType::Bybit { recv_window_ms } => {
                let message = format!(
                    "{}{}{}{}",
                    input.nonce,
                    self.api_key.expose_secret(),
                    recv_window_ms,
                    input.canonical
                );
                let signature = self.hmac_hex(&message)?;
                Ok(Signature {
                    param: None,
                    headers: vec![
                        (
                            "X-BAPI-API-KEY".to_string(),
                            self.api_key.expose_secret().clone(),
                        ),
                        ("X-BAPI-TIMESTAMP".to_string(), input.nonce.to_string()),
                        ("X-BAPI-RECV-WINDOW".to_string(), recv_window_ms.to_string()),
                        ("X-BAPI-SIGN".to_string(), signature),
                    ],
                })
            }
        }
    }

    fn nonce_field(&self) -> Option<&'static str> {
        match self.exchange_type {
            HmacExchangeType::Binance => Some("timestamp"),
            HmacExchangeType::Bybit { .. } => None,
        }
    }
}

/// Header names whose values must never be printed
pub(crate) fn is_sensitive_header(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.contains("key") || lower.contains("sign") || lower == "authorization"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(s: &str) -> Secret<String> {
        Secret::new(s.to_string())
    }

    #[test]
    fn test_binance_reference_signature() {
        let signer = HmacSigner::new(
            secret("vmPUZE6mv9SD5VNHk4HlWFsOr6aKE2zvsw0MuIgwCIPy6utIco14y7Ju91duEh8A"),
            secret("NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j"),
            HmacExchangeType::Binance,
        )
        .unwrap();
        let canonical = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";
        let signature = signer
            .sign_request(&SigningInput {
                method: "POST",
                path: "/api/v3/order",
                canonical,
                nonce: 1_499_827_319_559,
            })
            .unwrap();
        let (name, value) = signature.param.unwrap();
        assert_eq!(name, "signature");
        assert_eq!(
            value,
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn test_bybit_headers() {
        let signer = HmacSigner::new(
            secret("key"),
            secret("secret"),
            HmacExchangeType::Bybit {
                recv_window_ms: 5000,
            },
        )
        .unwrap();
        let signature = signer
            .sign_request(&SigningInput {
                method: "GET",
                path: "/v5/order/realtime",
                canonical: "category=spot",
                nonce: 1_700_000_000_000,
            })
            .unwrap();
        assert!(signature.param.is_none());
        let names: Vec<&str> = signature.headers.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            names,
            ["X-BAPI-API-KEY", "X-BAPI-TIMESTAMP", "X-BAPI-RECV-WINDOW", "X-BAPI-SIGN"]
        );
        assert_eq!(signer.nonce_field(), None);
    }

    #[test]
    fn test_rejects_missing_or_malformed_keys() {
        assert!(matches!(
            HmacSigner::new(secret(""), secret("s"), HmacExchangeType::Binance),
            Err(ExchangeError::AuthError(_))
        ));
        assert!(matches!(
            HmacSigner::new(secret("k"), secret("bad secret"), HmacExchangeType::Binance),
            Err(ExchangeError::AuthError(_))
        ));
    }

    #[test]
    fn test_debug_hides_signature_value() {
        let signature = Signature {
            param: Some(("signature".to_string(), "deadbeef".to_string())),
            headers: vec![],
        };
        assert!(!format!("{:?}", signature).contains("deadbeef"));
    }
}
