use crate::core::errors::ExchangeError;
use crate::core::kernel::RestClient;
use crate::core::markets::MarketCache;
use crate::core::precision::PrecisionClamper;
use crate::core::translate::{is_empty_response, new_client_order_id};
use crate::core::types::{OrderRequest, OrderResult};
use crate::exchanges::trbinance::conversions::normalize_symbol;
use crate::exchanges::trbinance::rest::TrBinanceRest;
use crate::exchanges::trbinance::types::{DIALECT, HISTORY_ORDERS, OPEN_ORDERS};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, instrument};

const CLIENT_ID_PREFIX: &str = "ux";

/// Order operations for TR Binance
pub struct Trading<R: RestClient> {
    rest: Arc<TrBinanceRest<R>>,
    markets: Arc<MarketCache>,
    clamper: PrecisionClamper,
}

impl<R: RestClient> Trading<R> {
    pub fn new(rest: Arc<TrBinanceRest<R>>, markets: Arc<MarketCache>, clamper: PrecisionClamper) -> Self {
        Self {
            rest,
            markets,
            clamper,
        }
    }

    fn require_credentials(&self) -> Result<(), ExchangeError> {
        if self.rest.has_credentials() {
            Ok(())
        } else {
            Err(ExchangeError::AuthError(
                "trbinance: API key and secret are required for trading".to_string(),
            ))
        }
    }

    /// Normalize, clamp and fill in the client id, ready for the wire.
    async fn prepare(&self, mut order: OrderRequest) -> Result<OrderRequest, ExchangeError> {
        order.symbol = normalize_symbol(&order.symbol);
        let market = self
            .markets
            .get_market(self.rest.as_ref(), &order.symbol)
            .await?;
        if !market.active {
            return Err(ExchangeError::InvalidArgument(format!(
                "{} is not open for trading",
                market.symbol
            )));
        }

        let mut order = self.clamper.clamp_order(&market, order)?;
        if order.client_order_id.is_none() {
            order.client_order_id = Some(new_client_order_id(CLIENT_ID_PREFIX));
        }
        Ok(order)
    }

    #[instrument(skip(self, order), fields(exchange = "trbinance", symbol = %order.symbol, side = %order.side))]
    pub async fn place_order(&self, order: OrderRequest) -> Result<Option<OrderResult>, ExchangeError> {
        self.require_credentials()?;
        let order = self.prepare(order).await?;
        let params = DIALECT.to_wire(&order)?;
        debug!(client_order_id = ?order.client_order_id, "placing order");

        let data = self.rest.place_order(params).await?;
        if is_empty_response(&data) {
            return Ok(None);
        }
        DIALECT.acknowledged(&data, &order).map(Some)
    }

    #[instrument(skip(self), fields(exchange = "trbinance"))]
    pub async fn cancel_order(&self, order_id: &str, _symbol: Option<&str>) -> Result<(), ExchangeError> {
        self.require_credentials()?;
        self.rest.cancel_order(order_id).await?;
        Ok(())
    }

    /// The detail endpoint cannot look an order up without its market.
    #[instrument(skip(self), fields(exchange = "trbinance"))]
    pub async fn get_order(
        &self,
        order_id: &str,
        symbol: Option<&str>,
    ) -> Result<Option<OrderResult>, ExchangeError> {
        let symbol = symbol
            .filter(|s| !s.trim().is_empty())
            .map(normalize_symbol)
            .ok_or_else(|| {
                ExchangeError::InvalidArgument("trbinance order lookup requires a symbol".to_string())
            })?;
        self.require_credentials()?;

        let data = self.rest.order_detail(&symbol, order_id).await?;
        if is_empty_response(&data) {
            return Ok(None);
        }
        DIALECT.from_wire(&data, Some(&symbol)).map(Some)
    }

    /// Open orders first, then history.
    #[instrument(skip(self), fields(exchange = "trbinance"))]
    pub async fn get_order_by_client_id(
        &self,
        client_order_id: &str,
        symbol: &str,
    ) -> Result<Option<OrderResult>, ExchangeError> {
        self.require_credentials()?;
        let symbol = normalize_symbol(symbol);
        for kind in [OPEN_ORDERS, HISTORY_ORDERS] {
            let data = self.rest.orders(Some(&symbol), kind).await?;
            let found = DIALECT
                .orders_from_wire(&data, Some(&symbol))?
                .into_iter()
                .find(|order| order.client_order_id.as_deref() == Some(client_order_id));
            if found.is_some() {
                return Ok(found);
            }
        }
        Ok(None)
    }

    #[instrument(skip(self), fields(exchange = "trbinance"))]
    pub async fn get_open_orders(&self, symbol: Option<&str>) -> Result<Vec<OrderResult>, ExchangeError> {
        self.require_credentials()?;
        let symbol = symbol.map(normalize_symbol);
        let data = self.rest.orders(symbol.as_deref(), OPEN_ORDERS).await?;
        DIALECT.orders_from_wire(&data, symbol.as_deref())
    }

    #[instrument(skip(self), fields(exchange = "trbinance"))]
    pub async fn get_completed_orders(
        &self,
        symbol: Option<&str>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<OrderResult>, ExchangeError> {
        self.require_credentials()?;
        let start = since.map(|t| t.timestamp_millis());
        let symbols: Vec<String> = match symbol {
            Some(symbol) => vec![normalize_symbol(symbol)],
            None => self
                .markets
                .all(self.rest.as_ref())
                .await?
                .iter()
                .map(|market| market.symbol.clone())
                .collect(),
        };

        let mut fills = Vec::new();
        for symbol in &symbols {
            let data = self.rest.trades(symbol, start).await?;
            fills.extend(DIALECT.fills_from_wire(&data, Some(symbol))?);
        }
        fills.sort_by_key(|fill| fill.timestamp);
        Ok(fills)
    }
}
