//! TR Binance spot adapter.
//!
//! Trading goes through the `/open/v1` API on the private host; the 24h
//! ticker comes from the public v3 API.

pub mod builder;
pub mod codec;
pub mod connector;
pub mod conversions;
pub mod rest;
pub mod types;

pub use builder::{build_connector, build_connector_with_rest};
pub use codec::{TrBinanceCodec, TrBinanceMessage};
pub use connector::{MarketData, TrBinanceConnector, Trading};
pub use rest::TrBinanceRest;
