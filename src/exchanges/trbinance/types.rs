use crate::core::translate::{
    Envelope, FillFields, FillSide, OrderDialect, OrderFields, OrderTypeCodes, SideEncoding,
    VendorState,
};
use serde::Deserialize;

pub const PUBLIC_BASE_URL: &str = "https://api.binance.cc/api/v3";
pub const PRIVATE_BASE_URL: &str = "https://www.trbinance.com";
pub const WS_BASE_URL: &str = "wss://stream.binance.cc/ws";

pub const ENVELOPE: Envelope = Envelope {
    code: "code",
    success_code: 0,
    message: "msg",
    data: "data",
};

/// `type` values of the order list endpoint
pub const OPEN_ORDERS: u8 = 1;
pub const HISTORY_ORDERS: u8 = 2;

pub const DIALECT: OrderDialect = OrderDialect {
    name: "trbinance",
    fields: OrderFields {
        symbol: "symbol",
        side: "side",
        order_type: "type",
        quantity: "quantity",
        price: "price",
        stop_price: "stopPrice",
        time_in_force: None,
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
        symbol: Some("symbol"),
        side: FillSide::BuyerFlag("isBuyer"),
        price: "price",
        quantity: "qty",
        fee: "commission",
        fee_currency: Some("commissionAsset"),
        timestamp: "time",
    },
    side: SideEncoding::Numeric { buy: 0, sell: 1 },
    order_types: OrderTypeCodes {
        limit: "1",
        market: "2",
        stop: Some("3"),
        stop_limit: Some("3"),
    },
    statuses: &[
        ("NEW", VendorState::Open),
        ("PARTIALLY_FILLED", VendorState::PartiallyFilled),
        ("FILLED", VendorState::Filled),
        ("CANCELED", VendorState::Canceled),
        ("PENDING_CANCEL", VendorState::Open),
        ("REJECTED", VendorState::Rejected),
        ("EXPIRED", VendorState::Expired),
        ("0", VendorState::Open),
        ("1", VendorState::PartiallyFilled),
        ("2", VendorState::Filled),
        ("3", VendorState::Canceled),
        ("4", VendorState::Open),
        ("5", VendorState::Rejected),
        ("6", VendorState::Expired),
    ],
    list_path: &["list"],
    quantity_scale_cap: Some(20),
};

#[derive(Debug, Clone, Deserialize)]
pub struct TrBinanceSymbolList {
    pub list: Vec<TrBinanceSymbol>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrBinanceSymbol {
    pub symbol: String,
    pub base_asset: String,
    pub quote_asset: String,
    #[serde(default = "default_true")]
    pub spot_trading_enable: bool,
    #[serde(default)]
    pub filters: Vec<TrBinanceFilter>,
}

const fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrBinanceFilter {
    pub filter_type: String,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub tick_size: Option<String>,
    pub min_qty: Option<String>,
    pub max_qty: Option<String>,
    pub step_size: Option<String>,
    pub min_notional: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrBinanceDepth {
    pub last_update_id: u64,
    pub bids: Vec<[String; 2]>,
    pub asks: Vec<[String; 2]>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrBinanceTicker {
    pub symbol: String,
    pub bid_price: String,
    pub ask_price: String,
    pub last_price: String,
    pub volume: Option<String>,
    pub close_time: Option<i64>,
}

/// Diff-depth stream event
#[derive(Debug, Clone, Deserialize)]
pub struct TrBinanceDepthEvent {
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "U")]
    pub first_update_id: u64,
    #[serde(rename = "u")]
    pub final_update_id: u64,
    #[serde(rename = "b")]
    pub bids: Vec<[String; 2]>,
    #[serde(rename = "a")]
    pub asks: Vec<[String; 2]>,
}
