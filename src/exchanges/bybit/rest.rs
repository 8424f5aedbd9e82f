use crate::core::auth::Encoding;
use crate::core::client::ApiClient;
use crate::core::errors::ExchangeError;
use crate::core::kernel::RestClient;
use crate::core::traits::MarketSource;
use crate::core::translate::is_empty_response;
use crate::core::types::{Market, Params};
use crate::exchanges::bybit::conversions::convert_instrument;
use crate::exchanges::bybit::types::{
    BybitInstrument, BybitInstrumentPage, BybitOrderBook, BybitTickerList, Category, ENVELOPE,
};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};

const INSTRUMENT_PAGE_SIZE: u32 = 1000;
/// Stop following cursors after this many pages
const MAX_INSTRUMENT_PAGES: usize = 50;
const EXECUTION_PAGE_SIZE: u32 = 100;
const MAX_EXECUTION_PAGES: usize = 50;

fn decode<T: DeserializeOwned>(what: &str, value: Value) -> Result<T, ExchangeError> {
    serde_json::from_value(value).map_err(|e| ExchangeError::malformed(what, e))
}

/// Which order records an order query should select.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderQuery<'a> {
    pub symbol: Option<&'a str>,
    pub order_id: Option<&'a str>,
    pub order_link_id: Option<&'a str>,
    pub settle_coin: Option<&'a str>,
}

impl OrderQuery<'_> {
    fn params(&self, category: Category) -> Params {
        Params::new()
            .with("category", category)
            .with_opt("symbol", self.symbol)
            .with_opt("orderId", self.order_id)
            .with_opt("orderLinkId", self.order_link_id)
            .with_opt("settleCoin", self.settle_coin)
    }
}

/// Typed wrapper over the Bybit V5 API for one product category.
#[derive(Debug)]
pub struct BybitRest<R: RestClient> {
    api: ApiClient<R>,
    base_url: String,
    category: Category,
}

impl<R: RestClient> BybitRest<R> {
    pub fn new(api: ApiClient<R>, base_url: String, category: Category) -> Self {
        Self {
            api,
            base_url,
            category,
        }
    }

    pub const fn category(&self) -> Category {
        self.category
    }

    pub fn has_credentials(&self) -> bool {
        self.api.has_credentials()
    }

    async fn public(&self, path: &str, params: Params) -> Result<Value, ExchangeError> {
        let raw = self
            .api
            .execute_public(Method::GET, &self.base_url, path, params)
            .await?;
        ENVELOPE.open(raw)
    }

    /// GETs sign the query string, POSTs sign the JSON body.
    async fn signed(&self, method: Method, path: &str, params: Params) -> Result<Value, ExchangeError> {
        let encoding = if method == Method::GET {
            Encoding::Query
        } else {
            Encoding::Json
        };
        let raw = self
            .api
            .execute_signed(method, &self.base_url, path, params, encoding)
            .await?;
        ENVELOPE.open(raw)
    }

    /// Every instrument in the category, following `nextPageCursor`.
    pub async fn instruments(&self) -> Result<Vec<BybitInstrument>, ExchangeError> {
        let mut instruments = Vec::new();
        let mut cursor: Option<String> = None;
        for page in 0..MAX_INSTRUMENT_PAGES {
            let params = Params::new()
                .with("category", self.category)
                .with("limit", INSTRUMENT_PAGE_SIZE)
                .with_opt("cursor", cursor.as_deref());
            let result: BybitInstrumentPage =
                decode("instruments", self.public("/v5/market/instruments-info", params).await?)?;
            debug!(page, count = result.list.len(), "instrument page");
            instruments.extend(result.list);
            if result.next_page_cursor.is_empty() {
                return Ok(instruments);
            }
            cursor = Some(result.next_page_cursor);
        }
        warn!(pages = MAX_INSTRUMENT_PAGES, "instrument listing truncated");
        Ok(instruments)
    }

    /// Ticker plus the server time of the response.
    pub async fn ticker(
        &self,
        symbol: &str,
    ) -> Result<(BybitTickerList, Option<DateTime<Utc>>), ExchangeError> {
        let params = Params::new()
            .with("category", self.category)
            .with("symbol", symbol);
        let raw = self
            .api
            .execute_public(Method::GET, &self.base_url, "/v5/market/tickers", params)
            .await?;
        let time = raw
            .get("time")
            .and_then(Value::as_i64)
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single());
        Ok((decode("tickers", ENVELOPE.open(raw)?)?, time))
    }

    pub async fn order_book(&self, symbol: &str, depth: usize) -> Result<BybitOrderBook, ExchangeError> {
        let limit = depth.clamp(1, self.category.max_depth());
        let params = Params::new()
            .with("category", self.category)
            .with("symbol", symbol)
            .with("limit", limit);
        decode("orderbook", self.public("/v5/market/orderbook", params).await?)
    }

    pub async fn create_order(&self, params: Params) -> Result<Value, ExchangeError> {
        let params = Params::new().with("category", self.category).merge(params.iter());
        self.signed(Method::POST, "/v5/order/create", params).await
    }

    pub async fn cancel_order(&self, symbol: &str, order_id: &str) -> Result<Value, ExchangeError> {
        let params = Params::new()
            .with("category", self.category)
            .with("symbol", symbol)
            .with("orderId", order_id);
        self.signed(Method::POST, "/v5/order/cancel", params).await
    }

    /// Open and recently closed orders.
    pub async fn realtime_orders(&self, query: OrderQuery<'_>) -> Result<Value, ExchangeError> {
        self.signed(Method::GET, "/v5/order/realtime", query.params(self.category))
            .await
    }

    pub async fn order_history(&self, query: OrderQuery<'_>) -> Result<Value, ExchangeError> {
        self.signed(Method::GET, "/v5/order/history", query.params(self.category))
            .await
    }

    /// Every execution page, merged under a single `list`.
    pub async fn executions(
        &self,
        symbol: Option<&str>,
        start_time_ms: Option<i64>,
    ) -> Result<Value, ExchangeError> {
        let mut executions = Vec::new();
        let mut cursor: Option<String> = None;
        for page in 0..MAX_EXECUTION_PAGES {
            let params = Params::new()
                .with("category", self.category)
                .with_opt("symbol", symbol)
                .with_opt("startTime", start_time_ms)
                .with("limit", EXECUTION_PAGE_SIZE)
                .with_opt("cursor", cursor.as_deref());
            let mut result = self.signed(Method::GET, "/v5/execution/list", params).await?;
            let next = result
                .get("nextPageCursor")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            match result.get_mut("list").map(Value::take) {
                Some(Value::Array(items)) => {
                    debug!(page, count = items.len(), "execution page");
                    executions.extend(items);
                }
                Some(Value::Null) => {}
                Some(other) => return Err(ExchangeError::malformed("list", other)),
                None if is_empty_response(&result) => {}
                None => return Err(ExchangeError::malformed("list", "missing")),
            }
            if next.is_empty() {
                return Ok(json!({ "list": executions }));
            }
            cursor = Some(next);
        }
        warn!(pages = MAX_EXECUTION_PAGES, "execution listing truncated");
        Ok(json!({ "list": executions }))
    }
}

#[async_trait]
impl<R: RestClient> MarketSource for BybitRest<R> {
    async fn fetch_markets(&self) -> Result<Vec<Market>, ExchangeError> {
        let instruments = self.instruments().await?;
        let mut markets = Vec::with_capacity(instruments.len());
        for raw in &instruments {
            match convert_instrument(raw) {
                Ok(market) => markets.push(market),
                Err(e) => warn!(symbol = %raw.symbol, error = %e, "skipping unparsable instrument"),
            }
        }
        Ok(markets)
    }
}
