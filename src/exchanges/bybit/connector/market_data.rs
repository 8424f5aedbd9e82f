use crate::core::errors::ExchangeError;
use crate::core::kernel::RestClient;
use crate::core::markets::MarketCache;
use crate::core::types::{Market, OrderBookSnapshot, Ticker};
use crate::exchanges::bybit::conversions::{convert_order_book, convert_ticker, normalize_symbol};
use crate::exchanges::bybit::rest::BybitRest;
use std::sync::Arc;
use tracing::instrument;

/// Market data operations for Bybit
pub struct MarketData<R: RestClient> {
    rest: Arc<BybitRest<R>>,
    markets: Arc<MarketCache>,
}

impl<R: RestClient> MarketData<R> {
    pub fn new(rest: Arc<BybitRest<R>>, markets: Arc<MarketCache>) -> Self {
        Self { rest, markets }
    }

    pub async fn get_markets(&self) -> Result<Vec<Arc<Market>>, ExchangeError> {
        self.markets.all(self.rest.as_ref()).await
    }

    pub async fn refresh_markets(&self) -> Result<(), ExchangeError> {
        self.markets.refresh(self.rest.as_ref()).await
    }

    #[instrument(skip(self), fields(exchange = "bybit", category = %self.rest.category()))]
    pub async fn get_ticker(&self, symbol: &str) -> Result<Ticker, ExchangeError> {
        let symbol = normalize_symbol(self.rest.category(), symbol);
        let (tickers, time) = self.rest.ticker(&symbol).await?;
        let raw = tickers
            .list
            .iter()
            .find(|ticker| ticker.symbol == symbol)
            .ok_or_else(|| ExchangeError::NotFound(format!("bybit has no ticker for {}", symbol)))?;
        convert_ticker(raw, time)
    }

    #[instrument(skip(self), fields(exchange = "bybit", category = %self.rest.category()))]
    pub async fn get_order_book(
        &self,
        symbol: &str,
        depth: usize,
    ) -> Result<OrderBookSnapshot, ExchangeError> {
        let symbol = normalize_symbol(self.rest.category(), symbol);
        let raw = self.rest.order_book(&symbol, depth).await?;
        let mut snapshot = convert_order_book(&raw)?;
        snapshot.bids.truncate(depth);
        snapshot.asks.truncate(depth);
        Ok(snapshot)
    }
}
