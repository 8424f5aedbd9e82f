use crate::core::errors::ExchangeError;
use tokio_tungstenite::tungstenite::Message;

/// Per-exchange framing for a streaming session.
///
/// Only data frames are handed to `decode_message`; pings and closes are
/// handled by the session.
pub trait WsCodec: Send + Sync + 'static {
    type Message: Send + Sync;

    /// Frame that subscribes to `streams`
    fn encode_subscription(
        &self,
        streams: &[impl AsRef<str> + Send + Sync],
    ) -> Result<Message, ExchangeError>;

    /// `Ok(None)` for frames the caller does not care about (acks, heartbeats,
    /// other event kinds).
    fn decode_message(&self, message: Message) -> Result<Option<Self::Message>, ExchangeError>;
}
