/// Unified transport layer for all exchanges
///
/// The kernel holds only exchange-agnostic plumbing:
///
/// - `RestClient`: sends an already-signed payload and returns parsed JSON
/// - `WsSession` / `WsCodec`: WebSocket connection plus per-exchange framing
/// - `Signer`: pluggable signature scheme (`HmacSigner` for the
///   Binance and Bybit families)
///
/// Exchange knowledge (paths, field names, enum codes) lives in
/// `crate::exchanges`, never here.
///
/// ```rust,no_run
/// use unifex::core::auth::{AuthenticatedPayload, Encoding};
/// use unifex::core::kernel::{ReqwestRest, RestClient};
/// use unifex::core::types::Params;
/// use reqwest::Method;
///
/// # async fn example() -> Result<(), unifex::ExchangeError> {
/// let rest = ReqwestRest::new("trbinance")?;
/// let payload = AuthenticatedPayload::unsigned(
///     Params::new().with("symbol", "BTCTRY"),
///     Encoding::Query,
/// )?;
/// let ticker = rest
///     .send(Method::GET, "https://api.binance.cc/api/v3", "/ticker/24hr", &payload)
///     .await?;
/// # let _ = ticker;
/// # Ok(())
/// # }
/// ```
pub mod codec;
pub mod rest;
pub mod signer;
pub mod ws;

pub use codec::WsCodec;
pub use rest::{ReqwestRest, RestClient, RestClientBuilder, RestClientConfig};
pub use signer::{HmacExchangeType, HmacSigner, Signature, Signer, SigningInput};
pub use ws::{TungsteniteWs, WsSession};
