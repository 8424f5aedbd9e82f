use crate::core::translate::{
    Envelope, FillFields, FillSide, OrderDialect, OrderFields, OrderTypeCodes, SideEncoding,
    VendorState,
};
use serde::Deserialize;
use std::fmt;

pub const MAINNET_BASE_URL: &str = "https://api.bybit.com";
pub const TESTNET_BASE_URL: &str = "https://api-testnet.bybit.com";

pub const ENVELOPE: Envelope = Envelope {
    code: "retCode",
    success_code: 0,
    message: "retMsg",
    data: "result",
};

/// Product line an adapter instance trades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Spot,
    Linear,
    Inverse,
    Option,
}

impl Category {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Spot => "spot",
            Self::Linear => "linear",
            Self::Inverse => "inverse",
            Self::Option => "option",
        }
    }

    /// Registry name of an adapter for this category
    pub const fn exchange_name(self) -> &'static str {
        match self {
            Self::Spot => "bybit",
            Self::Linear => "bybit_linear",
            Self::Inverse => "bybit_inverse",
            Self::Option => "bybit_option",
        }
    }

    /// Largest order book depth the REST endpoint serves
    pub const fn max_depth(self) -> usize {
        match self {
            Self::Spot => 200,
            Self::Linear | Self::Inverse => 500,
            Self::Option => 25,
        }
    }

    /// Settle coin sent when an order query for this category has no symbol.
    pub const fn default_settle_coin(self) -> Option<&'static str> {
        match self {
            Self::Linear => Some("USDT"),
            Self::Inverse => Some("BTC"),
            Self::Spot | Self::Option => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const DIALECT: OrderDialect = OrderDialect {
    name: "bybit",
    fields: OrderFields {
        symbol: "symbol",
        side: "side",
        order_type: "orderType",
        quantity: "qty",
        price: "price",
        stop_price: "triggerPrice",
        time_in_force: Some("timeInForce"),
        client_order_id_out: "orderLinkId",
        order_id: "orderId",
        client_order_id: "orderLinkId",
        amount: "qty",
        filled: "cumExecQty",
        average_price: Some("avgPrice"),
        status: "orderStatus",
        timestamp: "createdTime",
        fee: Some("cumExecFee"),
    },
    fills: FillFields {
        trade_id: "execId",
        order_id: "orderId",
        client_order_id: Some("orderLinkId"),
        symbol: Some("symbol"),
        side: FillSide::Field("side"),
        price: "execPrice",
        quantity: "execQty",
        fee: "execFee",
        fee_currency: Some("feeCurrency"),
        timestamp: "execTime",
    },
    side: SideEncoding::Text {
        buy: "Buy",
        sell: "Sell",
    },
    // conditional orders carry a trigger price on a plain market or limit type
    order_types: OrderTypeCodes {
        market: "Market",
        limit: "Limit",
        stop: Some("Market"),
        stop_limit: Some("Limit"),
    },
    statuses: &[
        ("Created", VendorState::Pending),
        ("Untriggered", VendorState::Pending),
        ("New", VendorState::Open),
        ("Active", VendorState::Open),
        ("Triggered", VendorState::Open),
        ("PartiallyFilled", VendorState::PartiallyFilled),
        ("Filled", VendorState::Filled),
        ("Cancelled", VendorState::Canceled),
        ("PartiallyFilledCanceled", VendorState::Canceled),
        ("Deactivated", VendorState::Canceled),
        ("Rejected", VendorState::Rejected),
    ],
    list_path: &["list"],
    quantity_scale_cap: None,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BybitInstrumentPage {
    #[serde(default)]
    pub list: Vec<BybitInstrument>,
    #[serde(default)]
    pub next_page_cursor: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BybitInstrument {
    pub symbol: String,
    pub base_coin: String,
    pub quote_coin: String,
    pub status: String,
    pub lot_size_filter: BybitLotSizeFilter,
    pub price_filter: BybitPriceFilter,
}

/// Spot instruments carry `basePrecision` and `minOrderAmt`; derivatives
/// carry `qtyStep` and `minNotionalValue`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BybitLotSizeFilter {
    pub base_precision: Option<String>,
    pub qty_step: Option<String>,
    pub min_order_qty: Option<String>,
    pub max_order_qty: Option<String>,
    pub min_order_amt: Option<String>,
    pub min_notional_value: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BybitPriceFilter {
    pub tick_size: String,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BybitTickerList {
    pub list: Vec<BybitTicker>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BybitTicker {
    pub symbol: String,
    #[serde(rename = "bid1Price")]
    pub bid_price: String,
    #[serde(rename = "ask1Price")]
    pub ask_price: String,
    pub last_price: String,
    #[serde(rename = "volume24h")]
    pub volume: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BybitOrderBook {
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "b")]
    pub bids: Vec<[String; 2]>,
    #[serde(rename = "a")]
    pub asks: Vec<[String; 2]>,
    #[serde(rename = "u")]
    pub update_id: u64,
}
