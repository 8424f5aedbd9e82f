mod common;

use common::{hmac_hex, RecordingRest, API_KEY, SECRET_KEY};
use reqwest::Method;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use unifex::core::book::{read_fresh, BookState, OrderBookSynchronizer};
use unifex::exchanges::trbinance::{build_connector_with_rest, TrBinanceConnector};
use unifex::{
    ErrorKind, ExchangeAdapter, ExchangeConfig, ExchangeError, OrderRequest, OrderSide,
    OrderStatus,
};

fn symbol(name: &str, base: &str, quote: &str) -> Value {
    json!({
        "type": 1,
        "symbol": name,
        "baseAsset": base,
        "quoteAsset": quote,
        "spotTradingEnable": true,
        "filters": [
            {"filterType": "PRICE_FILTER", "minPrice": "1", "maxPrice": "0", "tickSize": "1"},
            {"filterType": "LOT_SIZE", "minQty": "0.00001", "maxQty": "9000", "stepSize": "0.00001"},
            {"filterType": "MIN_NOTIONAL", "minNotional": "10"}
        ]
    })
}

fn ok(data: Value) -> Value {
    json!({"code": 0, "msg": "success", "data": data, "timestamp": 1_700_000_000_000_i64})
}

fn connector(rest: &RecordingRest) -> TrBinanceConnector<RecordingRest> {
    let config = ExchangeConfig::new(API_KEY.to_string(), SECRET_KEY.to_string());
    build_connector_with_rest(config, rest.clone()).unwrap()
}

fn with_markets(rest: &RecordingRest) {
    rest.reply(
        "/open/v1/common/symbols",
        ok(json!({"list": [symbol("BTC_TRY", "BTC", "TRY"), symbol("ETH_TRY", "ETH", "TRY")]})),
    );
}

#[tokio::test]
async fn test_get_order_without_symbol_sends_nothing() {
    let rest = RecordingRest::new();
    let adapter = connector(&rest);

    let err = adapter.get_order("42", None).await.unwrap_err();
    assert!(matches!(err, ExchangeError::InvalidArgument(_)));
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(rest.calls().is_empty());
}

#[tokio::test]
async fn test_place_order_clamps_then_signs_the_exact_body() {
    let rest = RecordingRest::new();
    with_markets(&rest);
    rest.reply(
        "/open/v1/orders",
        ok(json!({"orderId": "555", "createTime": 1_700_000_000_123_i64})),
    );
    let adapter = connector(&rest);

    let order = OrderRequest::limit("btc-try", OrderSide::Buy, dec!(0.123456789), dec!(2500000.6));
    let result = adapter.place_order(order).await.unwrap().unwrap();

    let call = rest.calls_to("/open/v1/orders").pop().unwrap();
    assert_eq!(call.method, Method::POST);
    assert_eq!(call.base_url, "https://www.trbinance.com");
    assert_eq!(call.param("symbol"), Some("BTC_TRY"));
    assert_eq!(call.param("side"), Some("0"));
    assert_eq!(call.param("type"), Some("1"));
    assert_eq!(call.param("quantity"), Some("0.12345"));
    assert_eq!(call.param("price"), Some("2500001"));
    assert!(call.param("newClientOrderId").unwrap().starts_with("ux"));
    assert!(call.param("timestamp").is_some());
    assert_eq!(call.header("X-MBX-APIKEY"), Some(API_KEY));

    let (signed, signature) = call.wire.rsplit_once("&signature=").unwrap();
    assert_eq!(signature, hmac_hex(signed));
    assert_eq!(call.param("signature"), Some(signature));

    assert_eq!(result.order_id, "555");
    assert_eq!(result.symbol, "BTC_TRY");
    assert_eq!(result.status, OrderStatus::Pending);
    assert_eq!(result.amount, dec!(0.12345));
    assert_eq!(result.price, Some(dec!(2500001)));
    assert_eq!(
        result.client_order_id.as_deref(),
        call.param("newClientOrderId")
    );
}

#[tokio::test]
async fn test_place_order_below_minimum_never_reaches_the_wire() {
    let rest = RecordingRest::new();
    with_markets(&rest);
    let adapter = connector(&rest);

    let order = OrderRequest::limit("BTC_TRY", OrderSide::Sell, dec!(0.000004), dec!(2500000));
    let err = adapter.place_order(order).await.unwrap_err();
    assert!(matches!(err, ExchangeError::InvalidQuantity(_)));
    assert!(rest.calls_to("/open/v1/orders").is_empty());
}

#[tokio::test]
async fn test_empty_placement_response_is_none() {
    let rest = RecordingRest::new();
    with_markets(&rest);
    rest.reply("/open/v1/orders", json!({"code": 0, "msg": "success"}));
    let adapter = connector(&rest);

    let order = OrderRequest::market("BTC_TRY", OrderSide::Buy, dec!(0.01));
    assert!(adapter.place_order(order).await.unwrap().is_none());
}

#[tokio::test]
async fn test_open_orders_are_read_from_the_nested_list() {
    let rest = RecordingRest::new();
    rest.reply(
        "/open/v1/orders",
        ok(json!({"list": [
            {"orderId": 1, "clientId": "a", "symbol": "BTC_TRY", "side": 0, "type": 1,
             "origQty": "0.5", "executedQty": "0", "price": "2500000", "status": 0,
             "createTime": 1_700_000_000_000_i64},
            {"orderId": 2, "clientId": "b", "symbol": "BTC_TRY", "side": 1, "type": 1,
             "origQty": "1", "executedQty": "0.25", "executedPrice": "2600000", "price": "2600000",
             "status": "PARTIALLY_FILLED", "createTime": 1_700_000_001_000_i64}
        ]})),
    );
    let adapter = connector(&rest);

    let orders = adapter.get_open_orders(Some("btc_try")).await.unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].status, OrderStatus::Open);
    assert_eq!(orders[0].side, OrderSide::Buy);
    assert_eq!(orders[1].status, OrderStatus::PartiallyFilled);
    assert_eq!(orders[1].average_price, Some(dec!(2600000)));

    let call = rest.calls().pop().unwrap();
    assert_eq!(call.method, Method::GET);
    assert_eq!(call.param("type"), Some("1"));
    assert_eq!(call.param("symbol"), Some("BTC_TRY"));
}

#[tokio::test]
async fn test_transport_failure_propagates_once() {
    let rest = RecordingRest::new();
    rest.fail("/open/v1/orders/detail", "connection reset by peer");
    let adapter = connector(&rest);

    let err = adapter.get_order("42", Some("BTC_TRY")).await.unwrap_err();
    assert!(matches!(err, ExchangeError::TransportError(_)));
    assert!(err.is_retryable());
    assert_eq!(rest.calls().len(), 1);
}

#[tokio::test]
async fn test_vendor_rejection_is_api_error() {
    let rest = RecordingRest::new();
    rest.reply(
        "/open/v1/orders/detail",
        json!({"code": 3210, "msg": "order does not exist", "timestamp": 1}),
    );
    let adapter = connector(&rest);

    let err = adapter.get_order("42", Some("BTC_TRY")).await.unwrap_err();
    assert!(matches!(err, ExchangeError::ApiError { code: 3210, .. }));
}

#[tokio::test]
async fn test_completed_orders_without_symbol_visit_every_market() {
    let rest = RecordingRest::new();
    with_markets(&rest);
    rest.reply(
        "/open/v1/orders/trades",
        ok(json!({"list": [
            {"tradeId": 7, "orderId": 70, "symbol": "BTC_TRY", "price": "2500000", "qty": "0.01",
             "isBuyer": true, "commission": "25", "commissionAsset": "TRY", "time": 1_700_000_002_000_i64}
        ]})),
    );
    rest.reply(
        "/open/v1/orders/trades",
        ok(json!({"list": [
            {"tradeId": 8, "orderId": 80, "symbol": "ETH_TRY", "price": "100000", "qty": "0.5",
             "isBuyer": false, "commission": "50", "commissionAsset": "TRY", "time": 1_700_000_001_000_i64}
        ]})),
    );
    let adapter = connector(&rest);

    let fills = adapter.get_completed_orders(None, None).await.unwrap();
    let visited: Vec<_> = rest
        .calls_to("/open/v1/orders/trades")
        .iter()
        .map(|c| c.param("symbol").unwrap().to_string())
        .collect();
    assert_eq!(visited, vec!["BTC_TRY", "ETH_TRY"]);

    assert_eq!(fills.len(), 2);
    assert_eq!(fills[0].trade_id.as_deref(), Some("8"));
    assert_eq!(fills[0].side, OrderSide::Sell);
    assert_eq!(fills[1].status, OrderStatus::Filled);
    assert_eq!(fills[1].fee_currency.as_deref(), Some("TRY"));
}

#[tokio::test]
async fn test_trading_without_credentials_is_auth_error() {
    let rest = RecordingRest::new();
    let adapter = build_connector_with_rest(ExchangeConfig::read_only(), rest.clone()).unwrap();

    let err = adapter.get_open_orders(None).await.unwrap_err();
    assert!(matches!(err, ExchangeError::AuthError(_)));
    assert!(rest.calls().is_empty());
}

#[tokio::test]
async fn test_book_resync_through_the_adapter() {
    let rest = RecordingRest::new();
    rest.reply(
        "/open/v1/market/depth",
        ok(json!({
            "lastUpdateId": 1027024,
            "bids": [["2500000", "0.5"], ["2499999", "1"], ["2499998", "2"]],
            "asks": [["2500001", "0.1"], ["2500002", "3"]]
        })),
    );
    let adapter = connector(&rest);

    let mut book = OrderBookSynchronizer::new("BTC_TRY");
    let snapshot = read_fresh(&mut book, &adapter, 2).await.unwrap();
    assert_eq!(book.state(), BookState::Synced);
    assert_eq!(snapshot.sequence, 1027024);
    assert_eq!(snapshot.bids.len(), 2);
    assert_eq!(snapshot.best_ask().unwrap().price, dec!(2500001));

    let call = rest.calls().pop().unwrap();
    // resync loads a deep book; the published view is cut to two levels
    assert_eq!(call.param("limit"), Some("1000"));
    assert!(call.header("X-MBX-APIKEY").is_none());
}

#[tokio::test]
async fn test_refresh_markets_picks_up_a_new_listing() {
    let rest = RecordingRest::new();
    with_markets(&rest);
    rest.reply(
        "/open/v1/common/symbols",
        ok(json!({"list": [
            symbol("BTC_TRY", "BTC", "TRY"),
            symbol("ETH_TRY", "ETH", "TRY"),
            symbol("AVAX_TRY", "AVAX", "TRY")
        ]})),
    );
    let adapter = connector(&rest);

    assert_eq!(adapter.get_markets().await.unwrap().len(), 2);
    adapter.refresh_markets().await.unwrap();

    let markets = adapter.get_markets().await.unwrap();
    assert!(markets.iter().any(|m| m.symbol == "AVAX_TRY"));
    assert_eq!(rest.calls_to("/open/v1/common/symbols").len(), 2);
}
