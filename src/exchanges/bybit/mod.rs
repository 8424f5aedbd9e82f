//! Bybit V5 adapter, one instance per product category.

pub mod builder;
pub mod connector;
pub mod conversions;
pub mod rest;
pub mod types;

pub use builder::{build_connector, build_connector_with_rest};
pub use connector::{BybitConnector, MarketData, Trading};
pub use rest::BybitRest;
pub use types::Category;
