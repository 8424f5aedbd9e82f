use crate::core::auth::RequestAuthenticator;
use crate::core::client::ApiClient;
use crate::core::config::ExchangeConfig;
use crate::core::errors::ExchangeError;
use crate::core::kernel::{HmacExchangeType, ReqwestRest, RestClient};
use crate::core::markets::MarketCache;
use crate::core::precision::PrecisionClamper;
use crate::exchanges::bybit::connector::BybitConnector;
use crate::exchanges::bybit::rest::BybitRest;
use crate::exchanges::bybit::types::{Category, MAINNET_BASE_URL, TESTNET_BASE_URL};

/// Create a Bybit connector for `category` over the default HTTP transport
pub fn build_connector(
    config: ExchangeConfig,
    category: Category,
) -> Result<BybitConnector<ReqwestRest>, ExchangeError> {
    let rest = ReqwestRest::new(category.exchange_name())?;
    build_connector_with_rest(config, category, rest)
}

/// Create a Bybit connector over any transport.
///
/// `config.base_url` wins over the testnet flag.
pub fn build_connector_with_rest<R: RestClient>(
    config: ExchangeConfig,
    category: Category,
    rest: R,
) -> Result<BybitConnector<R>, ExchangeError> {
    let auth = RequestAuthenticator::from_config(
        &config,
        HmacExchangeType::Bybit {
            recv_window_ms: config.recv_window_ms,
        },
    )?;
    let mut api = ApiClient::new(category.exchange_name(), rest, auth);
    if let Some(rps) = config.requests_per_second {
        api = api.with_rate_limit(rps);
    }

    let base_url = match (&config.base_url, config.testnet) {
        (Some(url), _) => url.clone(),
        (None, true) => TESTNET_BASE_URL.to_string(),
        (None, false) => MAINNET_BASE_URL.to_string(),
    };
    let rest = BybitRest::new(api, base_url, category);
    let markets = MarketCache::new(category.exchange_name(), config.market_refresh);
    let clamper = PrecisionClamper::new(config.price_rounding.unwrap_or_default());

    Ok(BybitConnector::new(rest, markets, clamper))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::ExchangeAdapter;

    #[test]
    fn test_build_per_category() {
        let spot = build_connector(ExchangeConfig::read_only(), Category::Spot).unwrap();
        assert_eq!(spot.name(), "bybit");
        let option = build_connector(ExchangeConfig::read_only(), Category::Option).unwrap();
        assert_eq!(option.name(), "bybit_option");
        assert_eq!(option.category(), Category::Option);
    }

    #[test]
    fn test_malformed_key_is_rejected() {
        let config = ExchangeConfig::new("key\n".to_string(), "secret".to_string());
        assert!(matches!(
            build_connector(config, Category::Linear),
            Err(ExchangeError::AuthError(_))
        ));
    }
}
