use crate::core::precision::RoundingPolicy;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::env;
use std::time::Duration;

const DEFAULT_MAX_IN_FLIGHT: usize = 4;
const DEFAULT_RECV_WINDOW_MS: u64 = 5000;

#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    pub api_key: Secret<String>,
    pub secret_key: Secret<String>,
    pub testnet: bool,
    pub base_url: Option<String>,
    /// Overrides the adapter's documented price tick policy.
    pub price_rounding: Option<RoundingPolicy>,
    /// Upper bound on signed requests outstanding at once for this credential.
    pub max_in_flight: usize,
    pub requests_per_second: Option<u32>,
    /// Cached market metadata older than this is re-pulled on the next read.
    pub market_refresh: Option<Duration>,
    pub recv_window_ms: u64,
}

// Custom Serialize implementation - never expose secrets in serialization
impl Serialize for ExchangeConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("ExchangeConfig", 9)?;
        state.serialize_field("api_key", "[REDACTED]")?;
        state.serialize_field("secret_key", "[REDACTED]")?;
        state.serialize_field("testnet", &self.testnet)?;
        state.serialize_field("base_url", &self.base_url)?;
        state.serialize_field("price_rounding", &self.price_rounding)?;
        state.serialize_field("max_in_flight", &self.max_in_flight)?;
        state.serialize_field("requests_per_second", &self.requests_per_second)?;
        state.serialize_field(
            "market_refresh_secs",
            &self.market_refresh.map(|d| d.as_secs()),
        )?;
        state.serialize_field("recv_window_ms", &self.recv_window_ms)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for ExchangeConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ExchangeConfigHelper {
            api_key: String,
            secret_key: String,
            #[serde(default)]
            testnet: bool,
            base_url: Option<String>,
            price_rounding: Option<RoundingPolicy>,
            max_in_flight: Option<usize>,
            requests_per_second: Option<u32>,
            market_refresh_secs: Option<u64>,
            recv_window_ms: Option<u64>,
        }

        let helper = ExchangeConfigHelper::deserialize(deserializer)?;
        Ok(Self {
            api_key: Secret::new(helper.api_key),
            secret_key: Secret::new(helper.secret_key),
            testnet: helper.testnet,
            base_url: helper.base_url,
            price_rounding: helper.price_rounding,
            max_in_flight: helper.max_in_flight.unwrap_or(DEFAULT_MAX_IN_FLIGHT),
            requests_per_second: helper.requests_per_second,
            market_refresh: helper.market_refresh_secs.map(Duration::from_secs),
            recv_window_ms: helper.recv_window_ms.unwrap_or(DEFAULT_RECV_WINDOW_MS),
        })
    }
}

impl ExchangeConfig {
    /// Create a new configuration with API credentials
    #[must_use]
    pub fn new(api_key: String, secret_key: String) -> Self {
        Self {
            api_key: Secret::new(api_key),
            secret_key: Secret::new(secret_key),
            testnet: false,
            base_url: None,
            price_rounding: None,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            requests_per_second: None,
            market_refresh: None,
            recv_window_ms: DEFAULT_RECV_WINDOW_MS,
        }
    }

    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `{EXCHANGE}_API_KEY` (e.g., `TRBINANCE_API_KEY`)
    /// - `{EXCHANGE}_SECRET_KEY`
    /// - `{EXCHANGE}_TESTNET` (optional, defaults to false)
    /// - `{EXCHANGE}_BASE_URL` (optional)
    /// - `{EXCHANGE}_MAX_IN_FLIGHT` (optional)
    /// - `{EXCHANGE}_RATE_LIMIT` (optional, requests per second)
    pub fn from_env(exchange_prefix: &str) -> Result<Self, ConfigError> {
        let prefix = exchange_prefix.to_uppercase();
        let api_key_var = format!("{}_API_KEY", prefix);
        let secret_key_var = format!("{}_SECRET_KEY", prefix);

        let api_key = env::var(&api_key_var)
            .map_err(|_| ConfigError::MissingEnvironmentVariable(api_key_var))?;
        let secret_key = env::var(&secret_key_var)
            .map_err(|_| ConfigError::MissingEnvironmentVariable(secret_key_var))?;

        let testnet = env::var(format!("{}_TESTNET", prefix))
            .unwrap_or_else(|_| "false".to_string())
            .parse::<bool>()
            .unwrap_or(false);

        let mut config = Self::new(api_key, secret_key).testnet(testnet);
        config.base_url = env::var(format!("{}_BASE_URL", prefix)).ok();

        if let Ok(raw) = env::var(format!("{}_MAX_IN_FLIGHT", prefix)) {
            config.max_in_flight = raw.parse().map_err(|_| {
                ConfigError::InvalidConfiguration(format!("{}_MAX_IN_FLIGHT: '{}'", prefix, raw))
            })?;
        }
        if let Ok(raw) = env::var(format!("{}_RATE_LIMIT", prefix)) {
            config.requests_per_second = Some(raw.parse().map_err(|_| {
                ConfigError::InvalidConfiguration(format!("{}_RATE_LIMIT: '{}'", prefix, raw))
            })?);
        }

        Ok(config)
    }

    /// Create configuration from a `.env` file and environment variables
    ///
    /// **Security Warning**: Never commit .env files to version control!
    #[cfg(feature = "env-file")]
    pub fn from_env_file(exchange_prefix: &str) -> Result<Self, ConfigError> {
        Self::from_env_file_with_path(exchange_prefix, ".env")
    }

    /// Create configuration from a specific .env file path
    #[cfg(feature = "env-file")]
    pub fn from_env_file_with_path(
        exchange_prefix: &str,
        env_file_path: &str,
    ) -> Result<Self, ConfigError> {
        match dotenv::from_path(env_file_path) {
            Ok(()) => {}
            Err(dotenv::Error::Io(io_err)) if io_err.kind() == std::io::ErrorKind::NotFound => {
                // no file: fall through to the process environment
            }
            Err(e) => {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "Failed to load .env file '{}': {}",
                    env_file_path, e
                )));
            }
        }

        Self::from_env(exchange_prefix)
    }

    /// Create configuration for read-only operations (market data only)
    #[must_use]
    pub fn read_only() -> Self {
        Self::new(String::new(), String::new())
    }

    /// Check if this configuration has credentials for authenticated operations
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.api_key.expose_secret().is_empty() && !self.secret_key.expose_secret().is_empty()
    }

    #[must_use]
    pub const fn testnet(mut self, testnet: bool) -> Self {
        self.testnet = testnet;
        self
    }

    #[must_use]
    pub fn base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    #[must_use]
    pub const fn price_rounding(mut self, policy: RoundingPolicy) -> Self {
        self.price_rounding = Some(policy);
        self
    }

    #[must_use]
    pub fn max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    #[must_use]
    pub const fn requests_per_second(mut self, rps: u32) -> Self {
        self.requests_per_second = Some(rps);
        self
    }

    #[must_use]
    pub const fn market_refresh(mut self, max_age: Duration) -> Self {
        self.market_refresh = Some(max_age);
        self
    }

    /// Get API key (use carefully - exposes secret)
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    /// Get secret key (use carefully - exposes secret)
    pub fn secret_key(&self) -> &str {
        self.secret_key.expose_secret()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvironmentVariable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialization_redacts_secrets() {
        let config = ExchangeConfig::new("key".to_string(), "very-secret".to_string());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("very-secret"));
        assert!(json.contains("[REDACTED]"));
    }

    #[test]
    fn test_deserialize_defaults() {
        let config: ExchangeConfig = serde_json::from_str(
            r#"{"api_key":"k","secret_key":"s","price_rounding":"down","requests_per_second":5}"#,
        )
        .unwrap();
        assert!(config.has_credentials());
        assert_eq!(config.max_in_flight, 4);
        assert_eq!(config.recv_window_ms, 5000);
        assert_eq!(config.price_rounding, Some(RoundingPolicy::Down));
        assert_eq!(config.requests_per_second, Some(5));
    }

    #[test]
    fn test_read_only_has_no_credentials() {
        assert!(!ExchangeConfig::read_only().has_credentials());
    }
}
