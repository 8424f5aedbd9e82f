use crate::core::errors::ExchangeError;
use crate::core::kernel::codec::WsCodec;
use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, instrument, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Streaming session over one socket. Frames are decoded by the session's codec.
#[async_trait]
pub trait WsSession<C: WsCodec>: Send {
    async fn connect(&mut self) -> Result<(), ExchangeError>;

    async fn subscribe(
        &mut self,
        streams: &[impl AsRef<str> + Send + Sync],
    ) -> Result<(), ExchangeError>;

    /// Next decoded message. `None` once the peer has closed the socket.
    async fn next_message(&mut self) -> Option<Result<C::Message, ExchangeError>>;
}

/// Tungstenite-backed session. Pings are answered here and never reach the codec.
pub struct TungsteniteWs<C: WsCodec> {
    url: String,
    exchange: &'static str,
    codec: C,
    write: Option<SplitSink<WsStream, Message>>,
    read: Option<SplitStream<WsStream>>,
}

impl<C: WsCodec> TungsteniteWs<C> {
    pub fn new(url: impl Into<String>, exchange: &'static str, codec: C) -> Self {
        Self {
            url: url.into(),
            exchange,
            codec,
            write: None,
            read: None,
        }
    }

    async fn send(&mut self, message: Message) -> Result<(), ExchangeError> {
        let write = self
            .write
            .as_mut()
            .ok_or_else(|| ExchangeError::TransportError("websocket is not connected".to_string()))?;
        write
            .send(message)
            .await
            .map_err(|e| ExchangeError::TransportError(format!("websocket send failed: {}", e)))
    }

    fn disconnect(&mut self) {
        self.write = None;
        self.read = None;
    }

    /// Next data frame, answering pings along the way.
    async fn next_frame(&mut self) -> Option<Result<Message, ExchangeError>> {
        loop {
            let frame = self.read.as_mut()?.next().await;
            match frame {
                Some(Ok(Message::Ping(data))) => {
                    if let Err(e) = self.send(Message::Pong(data)).await {
                        warn!(exchange = self.exchange, error = %e, "pong failed");
                    }
                }
                Some(Ok(Message::Pong(_) | Message::Frame(_))) => {}
                Some(Ok(Message::Close(frame))) => {
                    debug!(exchange = self.exchange, ?frame, "websocket closed by peer");
                    self.disconnect();
                    return None;
                }
                Some(Ok(message)) => return Some(Ok(message)),
                Some(Err(e)) => {
                    self.disconnect();
                    return Some(Err(ExchangeError::TransportError(format!(
                        "websocket error: {}",
                        e
                    ))));
                }
                None => {
                    self.disconnect();
                    return None;
                }
            }
        }
    }

    /// Decoded messages until the socket closes. A transport error ends the
    /// stream after it has been yielded.
    pub fn into_stream(self) -> BoxStream<'static, Result<C::Message, ExchangeError>>
    where
        C::Message: 'static,
    {
        stream::unfold(Some(self), |session| async move {
            let mut session = session?;
            let message = session.next_message().await?;
            let next = match &message {
                Err(ExchangeError::TransportError(_)) => None,
                _ => Some(session),
            };
            Some((message, next))
        })
        .boxed()
    }
}

#[async_trait]
impl<C: WsCodec> WsSession<C> for TungsteniteWs<C> {
    #[instrument(skip(self), fields(exchange = self.exchange, url = %self.url))]
    async fn connect(&mut self) -> Result<(), ExchangeError> {
        let (socket, _) = tokio::time::timeout(CONNECT_TIMEOUT, connect_async(&self.url))
            .await
            .map_err(|_| ExchangeError::TransportError("websocket connect timed out".to_string()))?
            .map_err(|e| ExchangeError::TransportError(format!("websocket connect failed: {}", e)))?;

        let (write, read) = socket.split();
        self.write = Some(write);
        self.read = Some(read);
        debug!("websocket connected");
        Ok(())
    }

    #[instrument(skip(self, streams), fields(exchange = self.exchange, stream_count = streams.len()))]
    async fn subscribe(
        &mut self,
        streams: &[impl AsRef<str> + Send + Sync],
    ) -> Result<(), ExchangeError> {
        if streams.is_empty() {
            return Ok(());
        }
        let message = self.codec.encode_subscription(streams)?;
        self.send(message).await
    }

    async fn next_message(&mut self) -> Option<Result<C::Message, ExchangeError>> {
        loop {
            match self.next_frame().await? {
                Ok(frame) => match self.codec.decode_message(frame) {
                    Ok(Some(message)) => return Some(Ok(message)),
                    Ok(None) => {}
                    Err(e) => return Some(Err(e)),
                },
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
