use crate::core::auth::RequestAuthenticator;
use crate::core::client::ApiClient;
use crate::core::config::{ConfigError, ExchangeConfig};
use crate::core::errors::ExchangeError;
use crate::core::kernel::{HmacExchangeType, ReqwestRest, RestClient};
use crate::core::markets::MarketCache;
use crate::core::precision::PrecisionClamper;
use crate::exchanges::trbinance::connector::TrBinanceConnector;
use crate::exchanges::trbinance::rest::TrBinanceRest;
use crate::exchanges::trbinance::types::{PRIVATE_BASE_URL, PUBLIC_BASE_URL, WS_BASE_URL};

/// Create a TR Binance connector over the default HTTP transport
pub fn build_connector(config: ExchangeConfig) -> Result<TrBinanceConnector<ReqwestRest>, ExchangeError> {
    let rest = ReqwestRest::new("trbinance")?;
    build_connector_with_rest(config, rest)
}

/// Create a TR Binance connector over any transport.
///
/// `config.base_url` replaces the private API host.
pub fn build_connector_with_rest<R: RestClient>(
    config: ExchangeConfig,
    rest: R,
) -> Result<TrBinanceConnector<R>, ExchangeError> {
    if config.testnet {
        return Err(ConfigError::InvalidConfiguration(
            "trbinance has no testnet environment".to_string(),
        )
        .into());
    }

    let auth = RequestAuthenticator::from_config(&config, HmacExchangeType::Binance)?;
    let mut api = ApiClient::new("trbinance", rest, auth);
    if let Some(rps) = config.requests_per_second {
        api = api.with_rate_limit(rps);
    }

    let private_base = config
        .base_url
        .clone()
        .unwrap_or_else(|| PRIVATE_BASE_URL.to_string());
    let rest = TrBinanceRest::new(api, private_base, PUBLIC_BASE_URL.to_string());
    let markets = MarketCache::new("trbinance", config.market_refresh);
    let clamper = PrecisionClamper::new(config.price_rounding.unwrap_or_default());

    Ok(TrBinanceConnector::new(
        rest,
        markets,
        clamper,
        WS_BASE_URL.to_string(),
    ))
}
