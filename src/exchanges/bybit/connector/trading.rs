use crate::core::errors::ExchangeError;
use crate::core::kernel::RestClient;
use crate::core::markets::MarketCache;
use crate::core::precision::PrecisionClamper;
use crate::core::translate::{is_empty_response, new_client_order_id};
use crate::core::types::{OrderRequest, OrderResult, OrderType};
use crate::exchanges::bybit::conversions::normalize_symbol;
use crate::exchanges::bybit::rest::{BybitRest, OrderQuery};
use crate::exchanges::bybit::types::{Category, DIALECT};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, instrument};

const CLIENT_ID_PREFIX: &str = "ux";

/// Order operations for one Bybit category
pub struct Trading<R: RestClient> {
    rest: Arc<BybitRest<R>>,
    markets: Arc<MarketCache>,
    clamper: PrecisionClamper,
    settle_coin: Option<String>,
}

impl<R: RestClient> Trading<R> {
    pub fn new(rest: Arc<BybitRest<R>>, markets: Arc<MarketCache>, clamper: PrecisionClamper) -> Self {
        Self {
            rest,
            markets,
            clamper,
            settle_coin: None,
        }
    }

    pub fn set_settle_coin(&mut self, coin: impl Into<String>) {
        self.settle_coin = Some(coin.into());
    }

    fn category(&self) -> Category {
        self.rest.category()
    }

    fn normalize(&self, symbol: &str) -> String {
        normalize_symbol(self.category(), symbol)
    }

    /// Derivative order queries need a symbol or a settle coin.
    fn settle_coin_for(&self, symbol: Option<&str>) -> Option<&str> {
        match symbol {
            Some(_) => None,
            None => self
                .settle_coin
                .as_deref()
                .or(self.category().default_settle_coin()),
        }
    }

    fn require_credentials(&self) -> Result<(), ExchangeError> {
        if self.rest.has_credentials() {
            Ok(())
        } else {
            Err(ExchangeError::AuthError(
                "bybit: API key and secret are required for trading".to_string(),
            ))
        }
    }

    async fn prepare(&self, mut order: OrderRequest) -> Result<OrderRequest, ExchangeError> {
        order.symbol = self.normalize(&order.symbol);
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
        // spot market buys are otherwise sized in the quote coin
        let at_market = match order.order_type {
            OrderType::Market => true,
            OrderType::Stop => order.price.is_none(),
            OrderType::Limit => false,
        };
        if self.category() == Category::Spot && at_market {
            order
                .extra_params
                .entry("marketUnit".to_string())
                .or_insert_with(|| "baseCoin".to_string());
        }
        Ok(order)
    }

    #[instrument(skip(self, order), fields(exchange = "bybit", symbol = %order.symbol, side = %order.side))]
    pub async fn place_order(&self, order: OrderRequest) -> Result<Option<OrderResult>, ExchangeError> {
        self.require_credentials()?;
        let order = self.prepare(order).await?;
        let params = DIALECT.to_wire(&order)?;
        debug!(client_order_id = ?order.client_order_id, "placing order");

        let result = self.rest.create_order(params).await?;
        if is_empty_response(&result) {
            return Ok(None);
        }
        DIALECT.acknowledged(&result, &order).map(Some)
    }

    #[instrument(skip(self), fields(exchange = "bybit"))]
    pub async fn cancel_order(&self, order_id: &str, symbol: Option<&str>) -> Result<(), ExchangeError> {
        let symbol = symbol
            .filter(|s| !s.trim().is_empty())
            .map(|s| self.normalize(s))
            .ok_or_else(|| {
                ExchangeError::InvalidArgument("bybit cancel requires a symbol".to_string())
            })?;
        self.require_credentials()?;
        self.rest.cancel_order(&symbol, order_id).await?;
        Ok(())
    }

    /// Realtime orders first, then order history.
    async fn find_order(&self, query: OrderQuery<'_>) -> Result<Option<OrderResult>, ExchangeError> {
        let realtime = self.rest.realtime_orders(query).await?;
        if let Some(order) = DIALECT.orders_from_wire(&realtime, query.symbol)?.into_iter().next() {
            return Ok(Some(order));
        }
        let history = self.rest.order_history(query).await?;
        Ok(DIALECT.orders_from_wire(&history, query.symbol)?.into_iter().next())
    }

    #[instrument(skip(self), fields(exchange = "bybit"))]
    pub async fn get_order(
        &self,
        order_id: &str,
        symbol: Option<&str>,
    ) -> Result<Option<OrderResult>, ExchangeError> {
        self.require_credentials()?;
        let symbol = symbol.map(|s| self.normalize(s));
        self.find_order(OrderQuery {
            symbol: symbol.as_deref(),
            order_id: Some(order_id),
            settle_coin: self.settle_coin_for(symbol.as_deref()),
            ..OrderQuery::default()
        })
        .await
    }

    #[instrument(skip(self), fields(exchange = "bybit"))]
    pub async fn get_order_by_client_id(
        &self,
        client_order_id: &str,
        symbol: &str,
    ) -> Result<Option<OrderResult>, ExchangeError> {
        self.require_credentials()?;
        let symbol = self.normalize(symbol);
        self.find_order(OrderQuery {
            symbol: Some(&symbol),
            order_link_id: Some(client_order_id),
            ..OrderQuery::default()
        })
        .await
    }

    #[instrument(skip(self), fields(exchange = "bybit"))]
    pub async fn get_open_orders(&self, symbol: Option<&str>) -> Result<Vec<OrderResult>, ExchangeError> {
        self.require_credentials()?;
        let symbol = symbol.map(|s| self.normalize(s));
        let data = self
            .rest
            .realtime_orders(OrderQuery {
                symbol: symbol.as_deref(),
                settle_coin: self.settle_coin_for(symbol.as_deref()),
                ..OrderQuery::default()
            })
            .await?;
        DIALECT.orders_from_wire(&data, symbol.as_deref())
    }

    /// Executions across the whole category when no symbol is given.
    #[instrument(skip(self), fields(exchange = "bybit"))]
    pub async fn get_completed_orders(
        &self,
        symbol: Option<&str>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<OrderResult>, ExchangeError> {
        self.require_credentials()?;
        let symbol = symbol.map(|s| self.normalize(s));
        let data = self
            .rest
            .executions(symbol.as_deref(), since.map(|t| t.timestamp_millis()))
            .await?;
        let mut fills = DIALECT.fills_from_wire(&data, symbol.as_deref())?;
        fills.sort_by_key(|fill| fill.timestamp);
        Ok(fills)
    }
}
