//! Order translation between the canonical model and a vendor dialect.
//!
//! A dialect is plain data: field names, enum codes and the response
//! envelope. Adapters declare one as a `const` and all parsing runs through
//! the shared functions here, so side/status quirks are handled at this
//! boundary and nowhere else.

use crate::core::errors::ExchangeError;
use crate::core::types::conversion::{format_decimal, parse_decimal};
use crate::core::types::{OrderRequest, OrderResult, OrderSide, OrderStatus, OrderType, Params, TimeInForce};
use chrono::{DateTime, TimeZone, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;
use tracing::warn;

/// Vendor order state, before the filled amount is taken into account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VendorState {
    /// Accepted but not yet on the book
    Pending,
    Open,
    PartiallyFilled,
    Filled,
    Canceled,
    /// Canceled by the exchange after time-in-force ran out
    Expired,
    Rejected,
}

#[derive(Debug, Clone, Copy)]
pub enum SideEncoding {
    /// Case-insensitive strings such as `BUY`/`SELL` or `Buy`/`Sell`
    Text {
        buy: &'static str,
        sell: &'static str,
    },
    /// Integer codes, sent as numbers and accepted as numbers or digit strings
    Numeric { buy: i64, sell: i64 },
}

/// Wire codes for canonical order types. `None` means the dialect has no
/// such order type.
#[derive(Debug, Clone, Copy)]
pub struct OrderTypeCodes {
    pub market: &'static str,
    pub limit: &'static str,
    /// Stop order without a limit price
    pub stop: Option<&'static str>,
    /// Stop order that rests at its limit price once triggered
    pub stop_limit: Option<&'static str>,
}

/// Field names of an order record, outbound and inbound.
#[derive(Debug, Clone, Copy)]
pub struct OrderFields {
    pub symbol: &'static str,
    pub side: &'static str,
    pub order_type: &'static str,
    /// Outbound quantity parameter
    pub quantity: &'static str,
    pub price: &'static str,
    pub stop_price: &'static str,
    pub time_in_force: Option<&'static str>,
    /// Outbound idempotency token parameter
    pub client_order_id_out: &'static str,

    pub order_id: &'static str,
    /// Inbound idempotency token
    pub client_order_id: &'static str,
    /// Inbound requested amount
    pub amount: &'static str,
    pub filled: &'static str,
    pub average_price: Option<&'static str>,
    pub status: &'static str,
    pub timestamp: &'static str,
    pub fee: Option<&'static str>,
}

/// How a fill record says which side it was on.
#[derive(Debug, Clone, Copy)]
pub enum FillSide {
    /// Same encoding as orders, in this field
    Field(&'static str),
    /// Boolean "was the buyer" flag
    BuyerFlag(&'static str),
}

/// Field names of a single fill (trade) record.
#[derive(Debug, Clone, Copy)]
pub struct FillFields {
    pub trade_id: &'static str,
    pub order_id: &'static str,
    pub client_order_id: Option<&'static str>,
    pub symbol: Option<&'static str>,
    pub side: FillSide,
    pub price: &'static str,
    pub quantity: &'static str,
    pub fee: &'static str,
    pub fee_currency: Option<&'static str>,
    pub timestamp: &'static str,
}

/// `{code, message, data}` wrapper some vendors put around every response.
#[derive(Debug, Clone, Copy)]
pub struct Envelope {
    pub code: &'static str,
    pub success_code: i64,
    pub message: &'static str,
    pub data: &'static str,
}

impl Envelope {
    /// Strip the wrapper, turning a non-success code into `ApiError`.
    pub fn open(&self, raw: Value) -> Result<Value, ExchangeError> {
        let Value::Object(mut map) = raw else {
            return Err(ExchangeError::malformed(self.code, "response is not an object"));
        };
        let code = match map.get(self.code) {
            Some(value) => value_as_i64(value)
                .ok_or_else(|| ExchangeError::malformed(self.code, value))?,
            None => return Err(ExchangeError::malformed(self.code, "missing")),
        };
        if code != self.success_code {
            let message = map
                .get(self.message)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            return Err(ExchangeError::ApiError { code, message });
        }
        Ok(map.remove(self.data).unwrap_or(Value::Null))
    }
}

/// Complete description of how one exchange spells orders on the wire.
#[derive(Debug, Clone, Copy)]
pub struct OrderDialect {
    pub name: &'static str,
    pub fields: OrderFields,
    pub fills: FillFields,
    pub side: SideEncoding,
    pub order_types: OrderTypeCodes,
    pub statuses: &'static [(&'static str, VendorState)],
    /// Path from the unwrapped response to the list of records
    pub list_path: &'static [&'static str],
    /// Maximum decimal places the venue accepts for quantities
    pub quantity_scale_cap: Option<u32>,
}

impl OrderDialect {
    /// Outbound payload for an order whose amounts have already been clamped.
    pub fn to_wire(&self, request: &OrderRequest) -> Result<Params, ExchangeError> {
        let f = &self.fields;
        let order_type = match request.order_type {
            OrderType::Market => self.order_types.market,
            OrderType::Limit => self.order_types.limit,
            OrderType::Stop if request.price.is_some() => self.order_types.stop_limit.ok_or_else(|| {
                ExchangeError::InvalidArgument(format!(
                    "{} stop orders cannot carry a limit price",
                    self.name
                ))
            })?,
            OrderType::Stop => self.order_types.stop.ok_or_else(|| {
                ExchangeError::InvalidArgument(format!("{} does not support stop orders", self.name))
            })?,
        };

        let quantity = match self.quantity_scale_cap {
            Some(dp) => request.quantity.round_dp_with_strategy(dp, RoundingStrategy::ToZero),
            None => request.quantity,
        };

        let price = match request.order_type {
            OrderType::Market => None,
            OrderType::Limit => Some(request.price.ok_or_else(|| {
                ExchangeError::InvalidArgument("limit order requires a price".to_string())
            })?),
            OrderType::Stop => request.price,
        };
        if request.order_type == OrderType::Stop && request.stop_price.is_none() {
            return Err(ExchangeError::InvalidArgument(
                "stop order requires a stop price".to_string(),
            ));
        }

        let params = Params::new()
            .with(f.symbol, &request.symbol)
            .with(f.side, self.encode_side(request.side))
            .with(f.order_type, order_type)
            .with(f.quantity, format_decimal(quantity))
            .with_opt(f.price, price.map(format_decimal))
            .with_opt(f.stop_price, request.stop_price.map(format_decimal))
            .with_opt(f.client_order_id_out, request.client_order_id.as_deref());
        let params = match (f.time_in_force, request.time_in_force) {
            (Some(field), Some(tif)) => params.with(field, time_in_force_code(tif)),
            _ => params,
        };

        // vendor extras win over anything derived above
        Ok(params.merge(request.extra_params.iter()))
    }

    pub fn encode_side(&self, side: OrderSide) -> String {
        match (self.side, side) {
            (SideEncoding::Text { buy, .. }, OrderSide::Buy) => buy.to_string(),
            (SideEncoding::Text { sell, .. }, OrderSide::Sell) => sell.to_string(),
            (SideEncoding::Numeric { buy, .. }, OrderSide::Buy) => buy.to_string(),
            (SideEncoding::Numeric { sell, .. }, OrderSide::Sell) => sell.to_string(),
        }
    }

    pub fn decode_side(&self, raw: &Value) -> Result<OrderSide, ExchangeError> {
        let field = self.fields.side;
        match self.side {
            SideEncoding::Text { buy, sell } => {
                let text = raw.as_str().ok_or_else(|| ExchangeError::malformed(field, raw))?;
                if text.eq_ignore_ascii_case(buy) {
                    Ok(OrderSide::Buy)
                } else if text.eq_ignore_ascii_case(sell) {
                    Ok(OrderSide::Sell)
                } else {
                    Err(ExchangeError::malformed(field, raw))
                }
            }
            SideEncoding::Numeric { buy, sell } => match value_as_i64(raw) {
                Some(code) if code == buy => Ok(OrderSide::Buy),
                Some(code) if code == sell => Ok(OrderSide::Sell),
                _ => Err(ExchangeError::malformed(field, raw)),
            },
        }
    }

    pub fn vendor_state(&self, raw_status: &str) -> Option<VendorState> {
        self.statuses
            .iter()
            .find(|(code, _)| code.eq_ignore_ascii_case(raw_status))
            .map(|(_, state)| *state)
    }

    /// Canonical record for one vendor order object.
    pub fn from_wire(&self, raw: &Value, symbol_hint: Option<&str>) -> Result<OrderResult, ExchangeError> {
        let f = &self.fields;

        let order_id = required_text(raw, f.order_id)?;
        let symbol = match optional_text(raw, f.symbol) {
            Some(symbol) => symbol,
            None => symbol_hint
                .map(str::to_string)
                .ok_or_else(|| ExchangeError::malformed(f.symbol, "missing"))?,
        };
        let side = self.decode_side(raw.get(f.side).unwrap_or(&Value::Null))?;
        let amount = required_decimal(raw, f.amount)?;
        let amount_filled = optional_decimal(raw, f.filled)?.unwrap_or(Decimal::ZERO);
        let price = optional_decimal(raw, f.price)?.filter(|p| !p.is_zero());
        let average_price = match f.average_price {
            Some(field) => optional_decimal(raw, field)?.filter(|p| !p.is_zero()),
            None => None,
        };
        let raw_status = required_text(raw, f.status)?;
        let status = derive_status(self.vendor_state(&raw_status), amount, amount_filled);
        if status == OrderStatus::Unknown {
            warn!(exchange = self.name, raw_status = %raw_status, "unrecognized order status");
        }
        let fees = match f.fee {
            Some(field) => optional_decimal(raw, field)?,
            None => None,
        };

        Ok(OrderResult {
            order_id,
            client_order_id: optional_text(raw, f.client_order_id),
            symbol,
            side,
            amount,
            amount_filled,
            price,
            average_price,
            status,
            raw_status,
            timestamp: optional_timestamp(raw, f.timestamp)?,
            fees,
            fee_currency: None,
            trade_id: None,
        })
    }

    /// Result of a placement. Venues that only echo ids get a `Pending`
    /// record built from what was sent.
    pub fn acknowledged(&self, raw: &Value, sent: &OrderRequest) -> Result<OrderResult, ExchangeError> {
        let f = &self.fields;
        if raw.get(f.status).is_some() {
            return self.from_wire(raw, Some(&sent.symbol));
        }
        Ok(OrderResult {
            order_id: required_text(raw, f.order_id)?,
            client_order_id: optional_text(raw, f.client_order_id)
                .or_else(|| sent.client_order_id.clone()),
            symbol: sent.symbol.clone(),
            side: sent.side,
            amount: sent.quantity,
            amount_filled: Decimal::ZERO,
            price: sent.price,
            average_price: None,
            status: OrderStatus::Pending,
            raw_status: String::new(),
            timestamp: optional_timestamp(raw, f.timestamp)?,
            fees: None,
            fee_currency: None,
            trade_id: None,
        })
    }

    /// Canonical record for one fill. Fills carry no vendor status.
    pub fn fill_from_wire(&self, raw: &Value, symbol_hint: Option<&str>) -> Result<OrderResult, ExchangeError> {
        let f = &self.fills;

        let symbol = f
            .symbol
            .and_then(|field| optional_text(raw, field))
            .or_else(|| symbol_hint.map(str::to_string))
            .ok_or_else(|| ExchangeError::malformed(f.symbol.unwrap_or("symbol"), "missing"))?;
        let side = match f.side {
            FillSide::Field(field) => self.decode_side(raw.get(field).unwrap_or(&Value::Null))?,
            FillSide::BuyerFlag(field) => match raw.get(field) {
                Some(Value::Bool(true)) => OrderSide::Buy,
                Some(Value::Bool(false)) => OrderSide::Sell,
                other => {
                    return Err(ExchangeError::malformed(field, other.unwrap_or(&Value::Null)))
                }
            },
        };
        let quantity = required_decimal(raw, f.quantity)?;
        let price = required_decimal(raw, f.price)?;

        Ok(OrderResult {
            order_id: required_text(raw, f.order_id)?,
            client_order_id: f.client_order_id.and_then(|field| optional_text(raw, field)),
            symbol,
            side,
            amount: quantity,
            amount_filled: quantity,
            price: Some(price),
            average_price: Some(price),
            status: OrderStatus::Filled,
            raw_status: String::new(),
            timestamp: optional_timestamp(raw, f.timestamp)?,
            fees: optional_decimal(raw, f.fee)?,
            fee_currency: f.fee_currency.and_then(|field| optional_text(raw, field)),
            trade_id: Some(required_text(raw, f.trade_id)?),
        })
    }

    /// Every order record found under the dialect's list path.
    pub fn orders_from_wire(&self, raw: &Value, symbol_hint: Option<&str>) -> Result<Vec<OrderResult>, ExchangeError> {
        records(raw, self.list_path)?
            .into_iter()
            .map(|record| self.from_wire(record, symbol_hint))
            .collect()
    }

    /// Every fill record found under the dialect's list path.
    pub fn fills_from_wire(&self, raw: &Value, symbol_hint: Option<&str>) -> Result<Vec<OrderResult>, ExchangeError> {
        records(raw, self.list_path)?
            .into_iter()
            .map(|record| self.fill_from_wire(record, symbol_hint))
            .collect()
    }
}

/// Status from vendor state plus filled-vs-requested. Never time based.
pub fn derive_status(state: Option<VendorState>, amount: Decimal, filled: Decimal) -> OrderStatus {
    let fully_filled = amount > Decimal::ZERO && filled >= amount;
    match state {
        None => OrderStatus::Unknown,
        Some(VendorState::Pending) => OrderStatus::Pending,
        Some(VendorState::Open) if fully_filled => OrderStatus::Filled,
        Some(VendorState::Open) if filled > Decimal::ZERO => OrderStatus::PartiallyFilled,
        Some(VendorState::Open) => OrderStatus::Open,
        Some(VendorState::PartiallyFilled) if fully_filled => OrderStatus::Filled,
        Some(VendorState::PartiallyFilled) => OrderStatus::PartiallyFilled,
        Some(VendorState::Filled) => OrderStatus::Filled,
        Some(VendorState::Canceled | VendorState::Expired) => OrderStatus::Canceled,
        Some(VendorState::Rejected) => OrderStatus::Rejected,
    }
}

/// Walk `path` into `raw` and return the records found there: the elements
/// of an array or a lone object.
///
/// Only an answer that is itself empty (null or `{}`, at the top or at the
/// list node) yields no records. A missing key or a node of the wrong type
/// is a malformed response.
pub fn records<'a>(raw: &'a Value, path: &[&str]) -> Result<Vec<&'a Value>, ExchangeError> {
    let mut node = raw;
    for key in path {
        match node {
            Value::Null => return Ok(Vec::new()),
            Value::Object(map) if map.is_empty() => return Ok(Vec::new()),
            Value::Object(map) => {
                node = map
                    .get(*key)
                    .ok_or_else(|| ExchangeError::malformed(key, "missing"))?;
            }
            other => return Err(ExchangeError::malformed(key, other)),
        }
    }
    match node {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items.iter().collect()),
        Value::Object(map) if map.is_empty() => Ok(Vec::new()),
        Value::Object(_) => Ok(vec![node]),
        other => Err(ExchangeError::malformed(path.last().copied().unwrap_or("records"), other)),
    }
}

/// True when the vendor answered with nothing at all.
pub fn is_empty_response(raw: &Value) -> bool {
    match raw {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Random idempotency token for orders placed without one.
pub fn new_client_order_id(prefix: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(20)
        .map(char::from)
        .collect();
    format!("{}{}", prefix, suffix)
}

const fn time_in_force_code(tif: TimeInForce) -> &'static str {
    match tif {
        TimeInForce::GTC => "GTC",
        TimeInForce::IOC => "IOC",
        TimeInForce::FOK => "FOK",
    }
}

fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Strings and numbers as text; empty strings count as absent.
pub(crate) fn optional_text(raw: &Value, field: &str) -> Option<String> {
    match raw.get(field)? {
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn required_text(raw: &Value, field: &str) -> Result<String, ExchangeError> {
    optional_text(raw, field).ok_or_else(|| ExchangeError::malformed(field, "missing"))
}

pub(crate) fn optional_decimal(raw: &Value, field: &str) -> Result<Option<Decimal>, ExchangeError> {
    match raw.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => parse_decimal(field, s).map(Some),
        Some(Value::Number(n)) => parse_decimal(field, &n.to_string()).map(Some),
        Some(other) => Err(ExchangeError::malformed(field, other)),
    }
}

pub(crate) fn required_decimal(raw: &Value, field: &str) -> Result<Decimal, ExchangeError> {
    optional_decimal(raw, field)?.ok_or_else(|| ExchangeError::malformed(field, "missing"))
}

pub(crate) fn optional_timestamp(raw: &Value, field: &str) -> Result<Option<DateTime<Utc>>, ExchangeError> {
    match raw.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => {
            let millis = value_as_i64(value).ok_or_else(|| ExchangeError::malformed(field, value))?;
            Utc.timestamp_millis_opt(millis)
                .single()
                .map(Some)
                .ok_or_else(|| ExchangeError::malformed(field, millis))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    const TEST_DIALECT: OrderDialect = OrderDialect {
        name: "test",
        fields: OrderFields {
            symbol: "symbol",
            side: "side",
            order_type: "type",
            quantity: "quantity",
            price: "price",
            stop_price: "stopPrice",
            time_in_force: Some("timeInForce"),
            client_order_id_out: "newClientOrderId",
            order_id: "orderId",
            client_order_id: "clientId",
            amount: "origQty",
            filled: "executedQty",
            average_price: Some("executedPrice"),
            status: "status",
            timestamp: "createTime",
            fee: None,
        },
        fills: FillFields {
            trade_id: "tradeId",
            order_id: "orderId",
            client_order_id: None,
            symbol: None,
            side: FillSide::BuyerFlag("isBuyer"),
            price: "price",
            quantity: "qty",
            fee: "commission",
            fee_currency: Some("commissionAsset"),
            timestamp: "time",
        },
        side: SideEncoding::Numeric { buy: 0, sell: 1 },
        order_types: OrderTypeCodes {
            market: "2",
            limit: "1",
            stop: Some("3"),
            stop_limit: None,
        },
        statuses: &[
            ("NEW", VendorState::Open),
            ("0", VendorState::Open),
            ("PARTIALLY_FILLED", VendorState::PartiallyFilled),
            ("FILLED", VendorState::Filled),
            ("CANCELED", VendorState::Canceled),
            ("EXPIRED", VendorState::Expired),
        ],
        list_path: &["list"],
        quantity_scale_cap: Some(20),
    };

    fn order(status: Value, filled: &str) -> Value {
        json!({
            "orderId": 42,
            "symbol": "BTC_USD",
            "side": 0,
            "origQty": "1.5",
            "executedQty": filled,
            "price": "100.25",
            "status": status,
            "createTime": 1_700_000_000_000_i64
        })
    }

    #[test]
    fn test_new_with_nothing_filled_is_open() {
        let result = TEST_DIALECT.from_wire(&order(json!("NEW"), "0"), None).unwrap();
        assert_eq!(result.status, OrderStatus::Open);
        assert_eq!(result.order_id, "42");
        assert_eq!(result.side, OrderSide::Buy);
        assert_eq!(result.raw_status, "NEW");
    }

    #[test]
    fn test_numeric_status_code() {
        let result = TEST_DIALECT.from_wire(&order(json!(0), "0.5"), None).unwrap();
        assert_eq!(result.status, OrderStatus::PartiallyFilled);
        assert_eq!(result.raw_status, "0");
    }

    #[test]
    fn test_filled_when_filled_equals_requested() {
        let result = TEST_DIALECT.from_wire(&order(json!("FILLED"), "1.5"), None).unwrap();
        assert_eq!(result.status, OrderStatus::Filled);
        assert_eq!(result.amount_filled, dec!(1.5));
    }

    #[test]
    fn test_unrecognized_status_is_unknown_and_kept() {
        let result = TEST_DIALECT
            .from_wire(&order(json!("WEIRD_STATE"), "0"), None)
            .unwrap();
        assert_eq!(result.status, OrderStatus::Unknown);
        assert_eq!(result.raw_status, "WEIRD_STATE");
    }

    #[test]
    fn test_expired_maps_to_canceled() {
        let result = TEST_DIALECT.from_wire(&order(json!("EXPIRED"), "0"), None).unwrap();
        assert_eq!(result.status, OrderStatus::Canceled);
    }

    #[test]
    fn test_bad_decimal_is_malformed_not_zero() {
        let mut raw = order(json!("NEW"), "0");
        raw["origQty"] = json!("1,5");
        assert!(matches!(
            TEST_DIALECT.from_wire(&raw, None),
            Err(ExchangeError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_unknown_side_code_is_malformed() {
        let mut raw = order(json!("NEW"), "0");
        raw["side"] = json!(7);
        assert!(matches!(
            TEST_DIALECT.from_wire(&raw, None),
            Err(ExchangeError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_symbol_hint_fills_missing_symbol() {
        let mut raw = order(json!("NEW"), "0");
        raw.as_object_mut().unwrap().remove("symbol");
        let result = TEST_DIALECT.from_wire(&raw, Some("ETH_USD")).unwrap();
        assert_eq!(result.symbol, "ETH_USD");
        raw.as_object_mut().unwrap().remove("symbol");
        assert!(TEST_DIALECT.from_wire(&raw, None).is_err());
    }

    #[test]
    fn test_wire_round_trip_recovers_clamped_amounts() {
        let request = OrderRequest::limit("BTC_USD", OrderSide::Sell, dec!(0.123), dec!(27123.45))
            .with_client_order_id("abc");
        let params = TEST_DIALECT.to_wire(&request).unwrap();
        assert_eq!(params.get("side"), Some("1"));
        assert_eq!(params.get("type"), Some("1"));

        let echo = json!({
            "orderId": "9",
            "clientId": params.get("newClientOrderId"),
            "symbol": params.get("symbol"),
            "side": params.get("side").unwrap().parse::<i64>().unwrap(),
            "origQty": params.get("quantity"),
            "price": params.get("price"),
            "status": "NEW",
        });
        let result = TEST_DIALECT.from_wire(&echo, None).unwrap();
        assert_eq!(result.amount, request.quantity);
        assert_eq!(result.price, request.price);
        assert_eq!(result.side, OrderSide::Sell);
        assert_eq!(result.client_order_id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_extra_params_override_derived_fields() {
        let request = OrderRequest::market("BTC_USD", OrderSide::Buy, dec!(1))
            .with_extra("type", "9")
            .with_extra("reduceOnly", "true");
        let params = TEST_DIALECT.to_wire(&request).unwrap();
        assert_eq!(params.get("type"), Some("9"));
        assert_eq!(params.get("reduceOnly"), Some("true"));
        assert_eq!(params.get("price"), None);
    }

    #[test]
    fn test_stop_requires_stop_price() {
        let mut request = OrderRequest::limit("BTC_USD", OrderSide::Buy, dec!(1), dec!(10));
        request.order_type = OrderType::Stop;
        assert!(matches!(
            TEST_DIALECT.to_wire(&request),
            Err(ExchangeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_priced_stop_needs_a_stop_limit_code() {
        let request = OrderRequest::limit("BTC_USD", OrderSide::Buy, dec!(1), dec!(10))
            .with_stop_price(dec!(9));
        assert!(matches!(
            TEST_DIALECT.to_wire(&request),
            Err(ExchangeError::InvalidArgument(_))
        ));

        let request = OrderRequest::market("BTC_USD", OrderSide::Buy, dec!(1)).with_stop_price(dec!(9));
        let params = TEST_DIALECT.to_wire(&request).unwrap();
        assert_eq!(params.get("type"), Some("3"));
        assert_eq!(params.get("price"), None);
        assert_eq!(params.get("stopPrice"), Some("9"));
    }

    #[test]
    fn test_quantity_scale_cap() {
        let request = OrderRequest::market(
            "BTC_USD",
            OrderSide::Buy,
            Decimal::from_i128_with_scale(1_234_567_890_123_456_789_012_345, 24),
        );
        let params = TEST_DIALECT.to_wire(&request).unwrap();
        assert_eq!(params.get("quantity"), Some("1.23456789012345678901"));
    }

    #[test]
    fn test_fill_list() {
        let raw = json!({"list": [
            {"tradeId": 1, "orderId": 42, "price": "100", "qty": "0.5", "isBuyer": false,
             "commission": "0.01", "commissionAsset": "TRY", "time": 1_700_000_000_000_i64},
            {"tradeId": 2, "orderId": 42, "price": "101", "qty": "0.25", "isBuyer": false,
             "commission": "0.005", "commissionAsset": "TRY", "time": 1_700_000_000_500_i64}
        ]});
        let fills = TEST_DIALECT.fills_from_wire(&raw, Some("BTC_TRY")).unwrap();
        assert_eq!(fills.len(), 2);
        assert_eq!(fills[0].trade_id.as_deref(), Some("1"));
        assert_eq!(fills[1].side, OrderSide::Sell);
        assert_eq!(fills[1].fees, Some(dec!(0.005)));
        assert_eq!(fills[1].fee_currency.as_deref(), Some("TRY"));
        assert_eq!(fills[1].status, OrderStatus::Filled);
    }

    #[test]
    fn test_envelope_error_code() {
        let envelope = Envelope {
            code: "code",
            success_code: 0,
            message: "msg",
            data: "data",
        };
        let err = envelope
            .open(json!({"code": 3210, "msg": "order not found"}))
            .unwrap_err();
        assert!(matches!(err, ExchangeError::ApiError { code: 3210, .. }));
        let data = envelope.open(json!({"code": 0, "msg": "ok", "data": {"x": 1}})).unwrap();
        assert_eq!(data, json!({"x": 1}));
    }

    #[test]
    fn test_records_walks_nesting() {
        let raw = json!({"list": []});
        assert!(records(&raw, &["list"]).unwrap().is_empty());
        let raw = json!({"a": {"b": [1, 2, 3]}});
        assert_eq!(records(&raw, &["a", "b"]).unwrap().len(), 3);
        assert!(records(&json!(null), &["list"]).unwrap().is_empty());
        assert!(records(&json!({"list": null}), &["list"]).unwrap().is_empty());
    }

    #[test]
    fn test_unexpected_shape_is_malformed_not_empty() {
        let renamed = json!({"rows": [{"orderId": 1}]});
        assert!(matches!(
            TEST_DIALECT.orders_from_wire(&renamed, None),
            Err(ExchangeError::MalformedResponse(_))
        ));
        let scalar = json!({"list": "none"});
        assert!(matches!(
            TEST_DIALECT.fills_from_wire(&scalar, None),
            Err(ExchangeError::MalformedResponse(_))
        ));
        let not_an_object = json!([{"orderId": 1}]);
        assert!(matches!(
            records(&not_an_object, &["list"]),
            Err(ExchangeError::MalformedResponse(_))
        ));
        assert!(TEST_DIALECT.orders_from_wire(&json!({}), None).unwrap().is_empty());
    }

    #[test]
    fn test_generated_client_ids_differ() {
        let a = new_client_order_id("ux-");
        let b = new_client_order_id("ux-");
        assert!(a.starts_with("ux-"));
        assert_ne!(a, b);
    }
}
