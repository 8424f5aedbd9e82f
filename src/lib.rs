pub mod core;
pub mod exchanges;

pub use core::{
    book::{maintain_book, read_fresh, BookState, OrderBookSynchronizer},
    config::ExchangeConfig,
    errors::{ErrorKind, ExchangeError},
    precision::RoundingPolicy,
    registry::ExchangeRegistry,
    traits::ExchangeAdapter,
    types::*,
};
pub use exchanges::bybit::BybitConnector;
pub use exchanges::trbinance::TrBinanceConnector;
