use crate::core::{
    errors::ExchangeError,
    types::{Market, OrderBookSnapshot, OrderRequest, OrderResult, Ticker},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Anything that can list an exchange's markets.
#[async_trait]
pub trait MarketSource: Send + Sync {
    async fn fetch_markets(&self) -> Result<Vec<Market>, ExchangeError>;
}

/// Anything that can produce a full order book snapshot for a market.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_snapshot(
        &self,
        symbol: &str,
        depth: usize,
    ) -> Result<OrderBookSnapshot, ExchangeError>;
}

/// The uniform trading contract every exchange implements.
///
/// Symbols may be given in any casing or separator style accepted by
/// `normalize_symbol`. `Ok(None)` and empty lists mean the exchange answered
/// with nothing; failures are always errors.
#[async_trait]
pub trait ExchangeAdapter: Send + Sync {
    /// Registry name, e.g. `trbinance`
    fn name(&self) -> &str;

    /// Exchange-native form of a caller-supplied symbol.
    fn normalize_symbol(&self, symbol: &str) -> String;

    async fn get_markets(&self) -> Result<Vec<Arc<Market>>, ExchangeError>;

    /// Re-pull market metadata now instead of waiting for a miss or expiry.
    async fn refresh_markets(&self) -> Result<(), ExchangeError>;

    async fn get_ticker(&self, symbol: &str) -> Result<Ticker, ExchangeError>;

    async fn get_order_book(
        &self,
        symbol: &str,
        depth: usize,
    ) -> Result<OrderBookSnapshot, ExchangeError>;

    /// Clamp, sign and submit. When this fails with a retryable error the
    /// order may still exist; look it up with `get_order_by_client_id`.
    async fn place_order(&self, order: OrderRequest) -> Result<Option<OrderResult>, ExchangeError>;

    async fn cancel_order(&self, order_id: &str, symbol: Option<&str>) -> Result<(), ExchangeError>;

    async fn get_order(
        &self,
        order_id: &str,
        symbol: Option<&str>,
    ) -> Result<Option<OrderResult>, ExchangeError>;

    async fn get_order_by_client_id(
        &self,
        client_order_id: &str,
        symbol: &str,
    ) -> Result<Option<OrderResult>, ExchangeError>;

    async fn get_open_orders(&self, symbol: Option<&str>) -> Result<Vec<OrderResult>, ExchangeError>;

    /// Fills, newest last. Without a symbol every known market is queried.
    async fn get_completed_orders(
        &self,
        symbol: Option<&str>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<OrderResult>, ExchangeError>;
}

#[async_trait]
impl<T: ExchangeAdapter + ?Sized> SnapshotSource for T {
    async fn fetch_snapshot(
        &self,
        symbol: &str,
        depth: usize,
    ) -> Result<OrderBookSnapshot, ExchangeError> {
        self.get_order_book(symbol, depth).await
    }
}
