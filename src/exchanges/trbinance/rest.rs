use crate::core::auth::Encoding;
use crate::core::client::ApiClient;
use crate::core::errors::ExchangeError;
use crate::core::kernel::RestClient;
use crate::core::traits::MarketSource;
use crate::core::types::{Market, Params};
use crate::exchanges::trbinance::conversions::{convert_symbol, to_public_symbol};
use crate::exchanges::trbinance::types::{
    TrBinanceDepth, TrBinanceSymbolList, TrBinanceTicker, ENVELOPE,
};
use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

/// Depth limits the endpoint accepts
const DEPTH_LIMITS: [usize; 8] = [5, 10, 20, 50, 100, 500, 1000, 5000];

/// Smallest accepted limit that covers `depth`.
pub fn depth_limit(depth: usize) -> usize {
    DEPTH_LIMITS
        .iter()
        .copied()
        .find(|limit| *limit >= depth)
        .unwrap_or(DEPTH_LIMITS[DEPTH_LIMITS.len() - 1])
}

fn decode<T: DeserializeOwned>(what: &str, value: Value) -> Result<T, ExchangeError> {
    serde_json::from_value(value).map_err(|e| ExchangeError::malformed(what, e))
}

/// Typed wrapper over the TR Binance open API.
///
/// Order and account endpoints live on the private host and answer inside a
/// `{code, msg, data}` envelope; tickers come from the public v3 host.
#[derive(Debug)]
pub struct TrBinanceRest<R: RestClient> {
    api: ApiClient<R>,
    private_base: String,
    public_base: String,
}

impl<R: RestClient> TrBinanceRest<R> {
    pub fn new(api: ApiClient<R>, private_base: String, public_base: String) -> Self {
        Self {
            api,
            private_base,
            public_base,
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.api.has_credentials()
    }

    async fn signed(
        &self,
        method: Method,
        path: &str,
        params: Params,
    ) -> Result<Value, ExchangeError> {
        let encoding = if method == Method::GET {
            Encoding::Query
        } else {
            Encoding::Form
        };
        let raw = self
            .api
            .execute_signed(method, &self.private_base, path, params, encoding)
            .await?;
        ENVELOPE.open(raw)
    }

    pub async fn symbols(&self) -> Result<TrBinanceSymbolList, ExchangeError> {
        let raw = self
            .api
            .execute_public(Method::GET, &self.private_base, "/open/v1/common/symbols", Params::new())
            .await?;
        decode("symbols", ENVELOPE.open(raw)?)
    }

    /// `symbol` is in `BASE_QUOTE` form.
    pub async fn depth(&self, symbol: &str, depth: usize) -> Result<TrBinanceDepth, ExchangeError> {
        let params = Params::new()
            .with("symbol", symbol)
            .with("limit", depth_limit(depth));
        let raw = self
            .api
            .execute_public(Method::GET, &self.private_base, "/open/v1/market/depth", params)
            .await?;
        decode("depth", ENVELOPE.open(raw)?)
    }

    /// 24h ticker; this endpoint is not enveloped.
    pub async fn ticker_24hr(&self, symbol: &str) -> Result<TrBinanceTicker, ExchangeError> {
        let params = Params::new().with("symbol", to_public_symbol(symbol));
        let raw = self
            .api
            .execute_public(Method::GET, &self.public_base, "/ticker/24hr", params)
            .await?;
        decode("ticker", raw)
    }

    pub async fn place_order(&self, params: Params) -> Result<Value, ExchangeError> {
        self.signed(Method::POST, "/open/v1/orders", params).await
    }

    pub async fn cancel_order(&self, order_id: &str) -> Result<Value, ExchangeError> {
        let params = Params::new().with("orderId", order_id);
        self.signed(Method::POST, "/open/v1/orders/cancel", params)
            .await
    }

    pub async fn order_detail(&self, symbol: &str, order_id: &str) -> Result<Value, ExchangeError> {
        let params = Params::new()
            .with("symbol", symbol)
            .with("orderId", order_id);
        self.signed(Method::GET, "/open/v1/orders/detail", params)
            .await
    }

    /// `kind` is [`OPEN_ORDERS`](super::types::OPEN_ORDERS) or
    /// [`HISTORY_ORDERS`](super::types::HISTORY_ORDERS).
    pub async fn orders(&self, symbol: Option<&str>, kind: u8) -> Result<Value, ExchangeError> {
        let params = Params::new().with_opt("symbol", symbol).with("type", kind);
        self.signed(Method::GET, "/open/v1/orders", params).await
    }

    pub async fn trades(
        &self,
        symbol: &str,
        start_time_ms: Option<i64>,
    ) -> Result<Value, ExchangeError> {
        let params = Params::new()
            .with("symbol", symbol)
            .with_opt("startTime", start_time_ms);
        self.signed(Method::GET, "/open/v1/orders/trades", params)
            .await
    }
}

#[async_trait]
impl<R: RestClient> MarketSource for TrBinanceRest<R> {
    async fn fetch_markets(&self) -> Result<Vec<Market>, ExchangeError> {
        let list = self.symbols().await?.list;
        let mut markets = Vec::with_capacity(list.len());
        for raw in &list {
            match convert_symbol(raw) {
                Ok(market) => markets.push(market),
                Err(e) => warn!(symbol = %raw.symbol, error = %e, "skipping unparsable market"),
            }
        }
        Ok(markets)
    }
}
