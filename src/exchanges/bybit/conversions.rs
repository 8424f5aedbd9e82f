use crate::core::errors::ExchangeError;
use crate::core::types::conversion::parse_decimal;
use crate::core::types::{Market, OrderBookLevel, OrderBookSnapshot, Ticker};
use crate::exchanges::bybit::types::{BybitInstrument, BybitOrderBook, BybitTicker, Category};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Bybit symbols are upper case with no separator. Option symbols keep
/// their dashes (`BTC-27DEC24-100000-C`).
pub fn normalize_symbol(category: Category, symbol: &str) -> String {
    let upper = symbol.trim().to_ascii_uppercase();
    match category {
        Category::Option => upper,
        Category::Spot | Category::Linear | Category::Inverse => {
            upper.replace(['-', '/', '_'], "")
        }
    }
}

fn optional(field: &str, raw: Option<&String>) -> Result<Option<Decimal>, ExchangeError> {
    match raw.map(String::as_str) {
        None | Some("") => Ok(None),
        Some(value) => parse_decimal(field, value).map(Some),
    }
}

/// Zero means "no bound".
fn bound(field: &str, raw: Option<&String>) -> Result<Option<Decimal>, ExchangeError> {
    Ok(optional(field, raw)?.filter(|value| !value.is_zero()))
}

pub fn convert_instrument(raw: &BybitInstrument) -> Result<Market, ExchangeError> {
    let lot = &raw.lot_size_filter;
    let quantity_increment = optional("qtyStep", lot.qty_step.as_ref())?
        .or(optional("basePrecision", lot.base_precision.as_ref())?)
        .ok_or_else(|| ExchangeError::malformed("lotSizeFilter", &raw.symbol))?;
    let min_notional = match bound("minNotionalValue", lot.min_notional_value.as_ref())? {
        Some(value) => Some(value),
        None => bound("minOrderAmt", lot.min_order_amt.as_ref())?,
    };

    Ok(Market {
        symbol: raw.symbol.clone(),
        base_asset: raw.base_coin.clone(),
        quote_asset: raw.quote_coin.clone(),
        active: raw.status == "Trading",
        price_increment: parse_decimal("tickSize", &raw.price_filter.tick_size)?,
        quantity_increment,
        min_notional,
        min_qty: optional("minOrderQty", lot.min_order_qty.as_ref())?.unwrap_or(Decimal::ZERO),
        max_qty: bound("maxOrderQty", lot.max_order_qty.as_ref())?,
        min_price: bound("minPrice", raw.price_filter.min_price.as_ref())?,
        max_price: bound("maxPrice", raw.price_filter.max_price.as_ref())?,
    })
}

pub fn convert_ticker(raw: &BybitTicker, timestamp: Option<DateTime<Utc>>) -> Result<Ticker, ExchangeError> {
    Ok(Ticker {
        symbol: raw.symbol.clone(),
        bid: parse_decimal("bid1Price", &raw.bid_price)?,
        ask: parse_decimal("ask1Price", &raw.ask_price)?,
        last: parse_decimal("lastPrice", &raw.last_price)?,
        volume: optional("volume24h", raw.volume.as_ref())?,
        timestamp,
    })
}

fn convert_levels(field: &str, raw: &[[String; 2]]) -> Result<Vec<OrderBookLevel>, ExchangeError> {
    raw.iter()
        .map(|[price, qty]| {
            Ok(OrderBookLevel::new(
                parse_decimal(field, price)?,
                parse_decimal(field, qty)?,
            ))
        })
        .collect()
}

pub fn convert_order_book(raw: &BybitOrderBook) -> Result<OrderBookSnapshot, ExchangeError> {
    let mut bids = convert_levels("b", &raw.bids)?;
    let mut asks = convert_levels("a", &raw.asks)?;
    bids.sort_by(|a, b| b.price.cmp(&a.price));
    asks.sort_by(|a, b| a.price.cmp(&b.price));
    Ok(OrderBookSnapshot {
        symbol: raw.symbol.clone(),
        sequence: raw.update_id,
        bids,
        asks,
    })
}
