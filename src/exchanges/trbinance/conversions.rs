use crate::core::errors::ExchangeError;
use crate::core::types::conversion::parse_decimal;
use crate::core::types::{BookUpdate, Market, OrderBookLevel, OrderBookSnapshot, Ticker};
use crate::exchanges::trbinance::types::{
    TrBinanceDepth, TrBinanceDepthEvent, TrBinanceFilter, TrBinanceSymbol, TrBinanceTicker,
};
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;

/// `btc-try`, `btc/try` and `BTC_TRY` all become `BTC_TRY`.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol
        .trim()
        .to_ascii_uppercase()
        .replace(['-', '/'], "_")
}

/// The public market-data API spells symbols without a separator.
pub fn to_public_symbol(symbol: &str) -> String {
    symbol.replace('_', "")
}

fn filter<'a>(raw: &'a TrBinanceSymbol, kind: &str) -> Option<&'a TrBinanceFilter> {
    raw.filters.iter().find(|f| f.filter_type == kind)
}

/// Zero means "no limit" in Binance filters.
fn limit(field: &str, raw: Option<&String>) -> Result<Option<Decimal>, ExchangeError> {
    match raw {
        Some(value) => {
            let parsed = parse_decimal(field, value)?;
            Ok((!parsed.is_zero()).then_some(parsed))
        }
        None => Ok(None),
    }
}

fn required(field: &str, raw: Option<&String>) -> Result<Decimal, ExchangeError> {
    let value = raw.ok_or_else(|| ExchangeError::malformed(field, "missing"))?;
    parse_decimal(field, value)
}

pub fn convert_symbol(raw: &TrBinanceSymbol) -> Result<Market, ExchangeError> {
    let price = filter(raw, "PRICE_FILTER")
        .ok_or_else(|| ExchangeError::malformed("PRICE_FILTER", &raw.symbol))?;
    let lot = filter(raw, "LOT_SIZE")
        .ok_or_else(|| ExchangeError::malformed("LOT_SIZE", &raw.symbol))?;
    let notional = filter(raw, "MIN_NOTIONAL");

    Ok(Market {
        symbol: normalize_symbol(&raw.symbol),
        base_asset: raw.base_asset.clone(),
        quote_asset: raw.quote_asset.clone(),
        active: raw.spot_trading_enable,
        price_increment: required("tickSize", price.tick_size.as_ref())?,
        quantity_increment: required("stepSize", lot.step_size.as_ref())?,
        min_notional: match notional {
            Some(f) => limit("minNotional", f.min_notional.as_ref())?,
            None => None,
        },
        min_qty: limit("minQty", lot.min_qty.as_ref())?.unwrap_or(Decimal::ZERO),
        max_qty: limit("maxQty", lot.max_qty.as_ref())?,
        min_price: limit("minPrice", price.min_price.as_ref())?,
        max_price: limit("maxPrice", price.max_price.as_ref())?,
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

pub fn convert_depth(symbol: &str, raw: &TrBinanceDepth) -> Result<OrderBookSnapshot, ExchangeError> {
    let mut bids = convert_levels("bids", &raw.bids)?;
    let mut asks = convert_levels("asks", &raw.asks)?;
    bids.sort_by(|a, b| b.price.cmp(&a.price));
    asks.sort_by(|a, b| a.price.cmp(&b.price));
    Ok(OrderBookSnapshot {
        symbol: symbol.to_string(),
        sequence: raw.last_update_id,
        bids,
        asks,
    })
}

pub fn convert_ticker(symbol: &str, raw: &TrBinanceTicker) -> Result<Ticker, ExchangeError> {
    Ok(Ticker {
        symbol: symbol.to_string(),
        bid: parse_decimal("bidPrice", &raw.bid_price)?,
        ask: parse_decimal("askPrice", &raw.ask_price)?,
        last: parse_decimal("lastPrice", &raw.last_price)?,
        volume: raw
            .volume
            .as_deref()
            .map(|v| parse_decimal("volume", v))
            .transpose()?,
        timestamp: raw
            .close_time
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
    })
}

/// Stream events carry the public symbol, so the book's own symbol is passed in.
pub fn convert_depth_event(
    book_symbol: &str,
    raw: &TrBinanceDepthEvent,
) -> Result<BookUpdate, ExchangeError> {
    if to_public_symbol(book_symbol) != raw.symbol {
        return Err(ExchangeError::malformed(
            "s",
            format!("{} on the {} stream", raw.symbol, book_symbol),
        ));
    }
    Ok(BookUpdate {
        symbol: book_symbol.to_string(),
        first_sequence: raw.first_update_id,
        sequence: raw.final_update_id,
        bids: convert_levels("b", &raw.bids)?,
        asks: convert_levels("a", &raw.asks)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_symbol_forms() {
        assert_eq!(normalize_symbol("btc-try"), "BTC_TRY");
        assert_eq!(normalize_symbol("Btc/Usdt"), "BTC_USDT");
        assert_eq!(to_public_symbol("BTC_TRY"), "BTCTRY");
    }

    #[test]
    fn test_convert_symbol_filters() {
        let raw: TrBinanceSymbol = serde_json::from_value(json!({
            "type": 1,
            "symbol": "BTC_TRY",
            "baseAsset": "BTC",
            "quoteAsset": "TRY",
            "spotTradingEnable": true,
            "filters": [
                {"filterType": "PRICE_FILTER", "minPrice": "1", "maxPrice": "0", "tickSize": "1"},
                {"filterType": "LOT_SIZE", "minQty": "0.00001", "maxQty": "9000", "stepSize": "0.00001"},
                {"filterType": "MIN_NOTIONAL", "minNotional": "10"}
            ]
        }))
        .unwrap();
        let market = convert_symbol(&raw).unwrap();
        assert_eq!(market.price_increment, dec!(1));
        assert_eq!(market.quantity_increment, dec!(0.00001));
        assert_eq!(market.max_qty, Some(dec!(9000)));
        assert_eq!(market.max_price, None);
        assert_eq!(market.min_notional, Some(dec!(10)));
    }

    #[test]
    fn test_missing_lot_filter_is_malformed() {
        let raw: TrBinanceSymbol = serde_json::from_value(json!({
            "symbol": "BTC_TRY", "baseAsset": "BTC", "quoteAsset": "TRY",
            "filters": [{"filterType": "PRICE_FILTER", "tickSize": "1"}]
        }))
        .unwrap();
        assert!(matches!(
            convert_symbol(&raw),
            Err(ExchangeError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_depth_event_symbol_must_match() {
        let event: TrBinanceDepthEvent = serde_json::from_value(json!({
            "e": "depthUpdate", "E": 1, "s": "ETHTRY", "U": 5, "u": 7,
            "b": [["100.0", "1.0"]], "a": []
        }))
        .unwrap();
        assert!(convert_depth_event("BTC_TRY", &event).is_err());
        let update = convert_depth_event("ETH_TRY", &event).unwrap();
        assert_eq!((update.first_sequence, update.sequence), (5, 7));
    }
}
