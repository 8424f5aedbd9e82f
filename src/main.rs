use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;
use unifex::{ExchangeConfig, ExchangeRegistry};

/// Print the ticker and top of book for one market.
///
/// Usage: `unifex [exchange] [symbol]`, e.g. `unifex bybit BTC/USDT`.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let exchange = args.next().unwrap_or_else(|| "bybit".to_string());
    let symbol = args.next().unwrap_or_else(|| "BTC/USDT".to_string());

    let registry = ExchangeRegistry::with_defaults();
    let adapter = registry
        .create(&exchange, ExchangeConfig::read_only())
        .with_context(|| format!("creating {} adapter (known: {:?})", exchange, registry.names()))?;
    let symbol = adapter.normalize_symbol(&symbol);

    let ticker = adapter
        .get_ticker(&symbol)
        .await
        .with_context(|| format!("fetching {} ticker", symbol))?;
    info!(%symbol, bid = %ticker.bid, ask = %ticker.ask, last = %ticker.last, "ticker");

    let book = adapter
        .get_order_book(&symbol, 5)
        .await
        .with_context(|| format!("fetching {} order book", symbol))?;
    println!("{} @ sequence {}", book.symbol, book.sequence);
    for (bid, ask) in book.bids.iter().zip(book.asks.iter()) {
        println!("{:>16} {:>14} | {:<16} {:<14}", bid.quantity, bid.price, ask.price, ask.quantity);
    }

    Ok(())
}
