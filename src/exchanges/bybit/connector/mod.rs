use crate::core::errors::ExchangeError;
use crate::core::kernel::RestClient;
use crate::core::markets::MarketCache;
use crate::core::precision::PrecisionClamper;
use crate::core::traits::ExchangeAdapter;
use crate::core::types::{Market, OrderBookSnapshot, OrderRequest, OrderResult, Ticker};
use crate::exchanges::bybit::conversions::normalize_symbol;
use crate::exchanges::bybit::rest::BybitRest;
use crate::exchanges::bybit::types::Category;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub mod market_data;
pub mod trading;

pub use market_data::MarketData;
pub use trading::Trading;

/// Bybit V5 connector bound to one product category
pub struct BybitConnector<R: RestClient> {
    pub market: MarketData<R>,
    pub trading: Trading<R>,
    category: Category,
}

impl<R: RestClient> BybitConnector<R> {
    pub fn new(rest: BybitRest<R>, markets: MarketCache, clamper: PrecisionClamper) -> Self {
        let category = rest.category();
        let rest = Arc::new(rest);
        let markets = Arc::new(markets);
        Self {
            market: MarketData::new(Arc::clone(&rest), Arc::clone(&markets)),
            trading: Trading::new(rest, markets, clamper),
            category,
        }
    }

    /// Settle coin for derivative order queries made without a symbol.
    #[must_use]
    pub fn with_settle_coin(mut self, coin: impl Into<String>) -> Self {
        self.trading.set_settle_coin(coin);
        self
    }

    pub const fn category(&self) -> Category {
        self.category
    }
}

#[async_trait]
impl<R: RestClient> ExchangeAdapter for BybitConnector<R> {
    fn name(&self) -> &str {
        self.category.exchange_name()
    }

    fn normalize_symbol(&self, symbol: &str) -> String {
        normalize_symbol(self.category, symbol)
    }

    async fn get_markets(&self) -> Result<Vec<Arc<Market>>, ExchangeError> {
        self.market.get_markets().await
    }

    async fn refresh_markets(&self) -> Result<(), ExchangeError> {
        self.market.refresh_markets().await
    }

    async fn get_ticker(&self, symbol: &str) -> Result<Ticker, ExchangeError> {
        self.market.get_ticker(symbol).await
    }

    async fn get_order_book(
        &self,
        symbol: &str,
        depth: usize,
    ) -> Result<OrderBookSnapshot, ExchangeError> {
        self.market.get_order_book(symbol, depth).await
    }

    async fn place_order(&self, order: OrderRequest) -> Result<Option<OrderResult>, ExchangeError> {
        self.trading.place_order(order).await
    }

    async fn cancel_order(&self, order_id: &str, symbol: Option<&str>) -> Result<(), ExchangeError> {
        self.trading.cancel_order(order_id, symbol).await
    }

    async fn get_order(
        &self,
        order_id: &str,
        symbol: Option<&str>,
    ) -> Result<Option<OrderResult>, ExchangeError> {
        self.trading.get_order(order_id, symbol).await
    }

    async fn get_order_by_client_id(
        &self,
        client_order_id: &str,
        symbol: &str,
    ) -> Result<Option<OrderResult>, ExchangeError> {
        self.trading
            .get_order_by_client_id(client_order_id, symbol)
            .await
    }

    async fn get_open_orders(&self, symbol: Option<&str>) -> Result<Vec<OrderResult>, ExchangeError> {
        self.trading.get_open_orders(symbol).await
    }

    async fn get_completed_orders(
        &self,
        symbol: Option<&str>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<OrderResult>, ExchangeError> {
        self.trading.get_completed_orders(symbol, since).await
    }
}
