use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Locale-independent decimal helpers shared by every dialect
pub mod conversion {
    use super::Decimal;
    use crate::core::errors::ExchangeError;
    use std::str::FromStr;

    /// Parse a vendor decimal string; scientific notation is accepted.
    pub fn parse_decimal(field: &str, raw: &str) -> Result<Decimal, ExchangeError> {
        let trimmed = raw.trim();
        Decimal::from_str(trimmed)
            .or_else(|_| Decimal::from_scientific(trimmed))
            .map_err(|e| ExchangeError::malformed(field, format!("'{}' ({})", raw, e)))
    }

    /// Render a decimal the way it goes on the wire: no trailing zeros, no exponent.
    pub fn format_decimal(value: Decimal) -> String {
        value.normalize().to_string()
    }
}

/// Precision and size rules the exchange declares for one tradable pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    /// Exchange-native symbol identifier, e.g. `BTC_TRY` or `BTCUSDT`
    pub symbol: String,
    pub base_asset: String,
    pub quote_asset: String,
    pub active: bool,
    pub price_increment: Decimal,
    pub quantity_increment: Decimal,
    pub min_notional: Option<Decimal>,
    pub min_qty: Decimal,
    pub max_qty: Option<Decimal>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeInForce {
    GTC, // Good Till Canceled
    IOC, // Immediate or Cancel
    FOK, // Fill or Kill
}

/// A caller's trade intent. The adapter never mutates it; clamped amounts are
/// derived into the wire payload instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub time_in_force: Option<TimeInForce>,
    /// Idempotency token used to re-query an order after an ambiguous failure
    pub client_order_id: Option<String>,
    /// Exchange-specific fields copied verbatim into the payload
    pub extra_params: BTreeMap<String, String>,
}

impl OrderRequest {
    pub fn limit(symbol: impl Into<String>, side: OrderSide, quantity: Decimal, price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: OrderType::Limit,
            quantity,
            price: Some(price),
            stop_price: None,
            time_in_force: None,
            client_order_id: None,
            extra_params: BTreeMap::new(),
        }
    }

    pub fn market(symbol: impl Into<String>, side: OrderSide, quantity: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: OrderType::Market,
            quantity,
            price: None,
            stop_price: None,
            time_in_force: None,
            client_order_id: None,
            extra_params: BTreeMap::new(),
        }
    }

    pub fn with_client_order_id(mut self, client_order_id: impl Into<String>) -> Self {
        self.client_order_id = Some(client_order_id.into());
        self
    }

    pub fn with_time_in_force(mut self, tif: TimeInForce) -> Self {
        self.time_in_force = Some(tif);
        self
    }

    pub fn with_stop_price(mut self, stop_price: Decimal) -> Self {
        self.order_type = OrderType::Stop;
        self.stop_price = Some(stop_price);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_params.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Open,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
    Unknown,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Filled | Self::Canceled | Self::Rejected)
    }
}

/// Canonical order or fill record produced from vendor JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResult {
    pub order_id: String,
    pub client_order_id: Option<String>,
    pub symbol: String,
    pub side: OrderSide,
    pub amount: Decimal,
    pub amount_filled: Decimal,
    pub price: Option<Decimal>,
    pub average_price: Option<Decimal>,
    pub status: OrderStatus,
    /// Vendor status exactly as reported, kept for diagnostics
    pub raw_status: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub fees: Option<Decimal>,
    pub fee_currency: Option<String>,
    /// Set when the record represents a single fill
    pub trade_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookLevel {
    pub price: Decimal,
    pub quantity: Decimal,
}

impl OrderBookLevel {
    pub const fn new(price: Decimal, quantity: Decimal) -> Self {
        Self { price, quantity }
    }
}

/// Bids are ordered by price descending, asks ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub symbol: String,
    pub sequence: u64,
    pub bids: Vec<OrderBookLevel>,
    pub asks: Vec<OrderBookLevel>,
}

impl OrderBookSnapshot {
    pub fn best_bid(&self) -> Option<&OrderBookLevel> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&OrderBookLevel> {
        self.asks.first()
    }
}

/// Incremental depth change covering `first_sequence..=sequence`.
/// A level with zero quantity removes that price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookUpdate {
    pub symbol: String,
    pub first_sequence: u64,
    pub sequence: u64,
    pub bids: Vec<OrderBookLevel>,
    pub asks: Vec<OrderBookLevel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub symbol: String,
    pub bid: Decimal,
    pub ask: Decimal,
    pub last: Decimal,
    pub volume: Option<Decimal>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Ordered parameter bag sent to an exchange. Built by value so that a payload
/// is never edited after it has been handed to the signer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Set `key`, replacing an existing value in place so ordering stays stable.
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        let key = key.into();
        let value = value.to_string();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
        self
    }

    pub fn with_opt<V: ToString>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(v) => self.with(key, v),
            None => self,
        }
    }

    pub fn merge<K, V, I>(self, other: I) -> Self
    where
        K: Into<String>,
        V: ToString,
        I: IntoIterator<Item = (K, V)>,
    {
        other.into_iter().fold(self, |acc, (k, v)| acc.with(k, v))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `application/x-www-form-urlencoded` serialization in insertion order
    pub fn to_query_string(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (k, v) in &self.0 {
            serializer.append_pair(k, v);
        }
        serializer.finish()
    }

    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .0
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_params_replace_keeps_position() {
        let params = Params::new()
            .with("symbol", "BTC_TRY")
            .with("side", 0)
            .with("symbol", "ETH_TRY");
        assert_eq!(params.to_query_string(), "symbol=ETH_TRY&side=0");
    }

    #[test]
    fn test_query_string_is_url_encoded() {
        let params = Params::new().with("clientId", "a b&c");
        assert_eq!(params.to_query_string(), "clientId=a+b%26c");
    }

    #[test]
    fn test_parse_decimal_rejects_garbage() {
        assert!(conversion::parse_decimal("price", "1,5").is_err());
        assert_eq!(conversion::parse_decimal("price", " 1.50 ").unwrap(), dec!(1.5));
        assert_eq!(conversion::parse_decimal("qty", "1e-3").unwrap(), dec!(0.001));
    }

    #[test]
    fn test_format_decimal_strips_trailing_zeros() {
        assert_eq!(conversion::format_decimal(dec!(0.00100)), "0.001");
        assert_eq!(conversion::format_decimal(dec!(100)), "100");
    }
}
