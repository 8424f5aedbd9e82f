use crate::core::errors::ExchangeError;
use crate::core::kernel::{RestClient, TungsteniteWs, WsSession};
use crate::core::markets::MarketCache;
use crate::core::types::{BookUpdate, Market, OrderBookSnapshot, Ticker};
use crate::exchanges::trbinance::codec::{depth_stream, TrBinanceCodec, TrBinanceMessage};
use crate::exchanges::trbinance::conversions::{
    convert_depth, convert_depth_event, convert_ticker, normalize_symbol,
};
use crate::exchanges::trbinance::rest::TrBinanceRest;
use futures_util::stream::{BoxStream, StreamExt};
use std::sync::Arc;
use tracing::instrument;

/// Market data operations for TR Binance
pub struct MarketData<R: RestClient> {
    rest: Arc<TrBinanceRest<R>>,
    markets: Arc<MarketCache>,
    ws_url: String,
}

impl<R: RestClient> MarketData<R> {
    pub fn new(rest: Arc<TrBinanceRest<R>>, markets: Arc<MarketCache>, ws_url: String) -> Self {
        Self {
            rest,
            markets,
            ws_url,
        }
    }

    pub async fn get_markets(&self) -> Result<Vec<Arc<Market>>, ExchangeError> {
        self.markets.all(self.rest.as_ref()).await
    }

    pub async fn refresh_markets(&self) -> Result<(), ExchangeError> {
        self.markets.refresh(self.rest.as_ref()).await
    }

    #[instrument(skip(self), fields(exchange = "trbinance"))]
    pub async fn get_ticker(&self, symbol: &str) -> Result<Ticker, ExchangeError> {
        let symbol = normalize_symbol(symbol);
        let raw = self.rest.ticker_24hr(&symbol).await?;
        convert_ticker(&symbol, &raw)
    }

    #[instrument(skip(self), fields(exchange = "trbinance"))]
    pub async fn get_order_book(
        &self,
        symbol: &str,
        depth: usize,
    ) -> Result<OrderBookSnapshot, ExchangeError> {
        let symbol = normalize_symbol(symbol);
        let raw = self.rest.depth(&symbol, depth).await?;
        let mut snapshot = convert_depth(&symbol, &raw)?;
        snapshot.bids.truncate(depth);
        snapshot.asks.truncate(depth);
        Ok(snapshot)
    }

    /// Open the diff-depth stream for `symbol`. Feed it to
    /// [`maintain_book`](crate::core::book::maintain_book) together with this
    /// connector as the snapshot source.
    #[instrument(skip(self), fields(exchange = "trbinance"))]
    pub async fn depth_updates(
        &self,
        symbol: &str,
    ) -> Result<BoxStream<'static, Result<BookUpdate, ExchangeError>>, ExchangeError> {
        let symbol = normalize_symbol(symbol);
        let mut ws = TungsteniteWs::new(self.ws_url.as_str(), "trbinance", TrBinanceCodec);
        ws.connect().await?;
        ws.subscribe(&[depth_stream(&symbol)]).await?;

        let updates = ws.into_stream().map(move |message| match message? {
            TrBinanceMessage::Depth(event) => convert_depth_event(&symbol, &event),
        });
        Ok(updates.boxed())
    }
}
