use crate::core::errors::ExchangeError;
use crate::core::kernel::WsCodec;
use crate::exchanges::trbinance::types::TrBinanceDepthEvent;
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::Message;

#[derive(Debug, Clone)]
pub enum TrBinanceMessage {
    Depth(TrBinanceDepthEvent),
}

/// Diff-depth stream name for a `BASE_QUOTE` symbol.
pub fn depth_stream(symbol: &str) -> String {
    format!("{}@depth@100ms", symbol.replace('_', "").to_lowercase())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TrBinanceCodec;

impl WsCodec for TrBinanceCodec {
    type Message = TrBinanceMessage;

    fn encode_subscription(
        &self,
        streams: &[impl AsRef<str> + Send + Sync],
    ) -> Result<Message, ExchangeError> {
        let stream_refs: Vec<&str> = streams.iter().map(|s| s.as_ref()).collect();
        let subscription = json!({
            "method": "SUBSCRIBE",
            "params": stream_refs,
            "id": 1
        });
        Ok(Message::Text(subscription.to_string()))
    }

    fn decode_message(&self, message: Message) -> Result<Option<Self::Message>, ExchangeError> {
        let text = match message {
            Message::Text(text) => text,
            Message::Binary(data) => String::from_utf8(data)
                .map_err(|e| ExchangeError::malformed("frame", format!("invalid UTF-8: {}", e)))?,
            _ => return Ok(None),
        };
        let value: Value = serde_json::from_str(&text)?;

        // combined streams wrap the event in {stream, data}
        let event = value.get("data").unwrap_or(&value);
        match event.get("e").and_then(Value::as_str) {
            Some("depthUpdate") => {
                let depth = serde_json::from_value(event.clone())
                    .map_err(|e| ExchangeError::malformed("depthUpdate", e))?;
                Ok(Some(TrBinanceMessage::Depth(depth)))
            }
            Some(_) => Ok(None),
            // subscription acks look like {"result": null, "id": 1}
            None if value.get("id").is_some() => match value.get("error") {
                Some(error) => Err(ExchangeError::TransportError(format!(
                    "subscription refused: {}",
                    error
                ))),
                None => Ok(None),
            },
            None => Ok(None),
        }
    }
}
