use crate::core::errors::ExchangeError;
use crate::core::traits::MarketSource;
use crate::core::types::Market;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, instrument};

/// Misses trigger at most one refresh per this interval.
const MISS_REFRESH_COOLDOWN: Duration = Duration::from_secs(5);

#[derive(Debug)]
struct MarketTable {
    markets: HashMap<String, Arc<Market>>,
    loaded_at: Instant,
}

/// Per-exchange market metadata, loaded lazily and swapped as a whole.
///
/// Readers clone an `Arc` of the current table, so a refresh never exposes a
/// half-built table. A lookup that misses refreshes once (rate bounded by
/// [`MISS_REFRESH_COOLDOWN`]) before reporting `NotFound`, so newly listed
/// markets show up without a restart.
#[derive(Debug)]
pub struct MarketCache {
    exchange: String,
    max_age: Option<Duration>,
    table: RwLock<Option<Arc<MarketTable>>>,
    refreshing: Mutex<()>,
    last_miss_refresh: Mutex<Option<Instant>>,
}

impl MarketCache {
    pub fn new(exchange: impl Into<String>, max_age: Option<Duration>) -> Self {
        Self {
            exchange: exchange.into(),
            max_age,
            table: RwLock::new(None),
            refreshing: Mutex::new(()),
            last_miss_refresh: Mutex::new(None),
        }
    }

    fn is_fresh(&self, table: &MarketTable) -> bool {
        self.max_age
            .map_or(true, |max_age| table.loaded_at.elapsed() < max_age)
    }

    async fn install(&self, markets: Vec<Market>) -> Arc<MarketTable> {
        let table = Arc::new(MarketTable {
            markets: markets
                .into_iter()
                .map(|market| (market.symbol.clone(), Arc::new(market)))
                .collect(),
            loaded_at: Instant::now(),
        });
        debug!(exchange = %self.exchange, count = table.markets.len(), "market table replaced");
        *self.table.write().await = Some(Arc::clone(&table));
        table
    }

    /// Install a market list directly.
    pub async fn load(&self, markets: Vec<Market>) {
        self.install(markets).await;
    }

    /// Re-pull every market from `source`.
    #[instrument(skip(self, source), fields(exchange = %self.exchange))]
    pub async fn refresh<S: MarketSource + ?Sized>(&self, source: &S) -> Result<(), ExchangeError> {
        let _guard = self.refreshing.lock().await;
        let markets = source.fetch_markets().await?;
        self.install(markets).await;
        Ok(())
    }

    async fn current<S: MarketSource + ?Sized>(
        &self,
        source: &S,
    ) -> Result<Arc<MarketTable>, ExchangeError> {
        if let Some(table) = self.table.read().await.as_ref() {
            if self.is_fresh(table) {
                return Ok(Arc::clone(table));
            }
        }

        let _guard = self.refreshing.lock().await;
        // another caller may have refreshed while we waited
        if let Some(table) = self.table.read().await.as_ref() {
            if self.is_fresh(table) {
                return Ok(Arc::clone(table));
            }
        }
        let markets = source.fetch_markets().await?;
        Ok(self.install(markets).await)
    }

    /// Table to consult after `seen` missed a symbol: a fresh pull when the
    /// cooldown allows it, otherwise whatever is installed once any
    /// in-flight refresh has finished.
    async fn after_miss<S: MarketSource + ?Sized>(
        &self,
        source: &S,
        seen: &Arc<MarketTable>,
    ) -> Result<Option<Arc<MarketTable>>, ExchangeError> {
        let _guard = self.refreshing.lock().await;
        let installed = self.table.read().await.clone();
        if let Some(table) = installed.filter(|table| !Arc::ptr_eq(table, seen)) {
            return Ok(Some(table));
        }

        let mut last = self.last_miss_refresh.lock().await;
        if last.is_some_and(|at| at.elapsed() < MISS_REFRESH_COOLDOWN) {
            return Ok(None);
        }
        *last = Some(Instant::now());
        drop(last);

        debug!(exchange = %self.exchange, "refreshing markets after a miss");
        let markets = source.fetch_markets().await?;
        Ok(Some(self.install(markets).await))
    }

    pub async fn get_market<S: MarketSource + ?Sized>(
        &self,
        source: &S,
        symbol: &str,
    ) -> Result<Arc<Market>, ExchangeError> {
        let table = self.current(source).await?;
        if let Some(market) = table.markets.get(symbol) {
            return Ok(Arc::clone(market));
        }
        self.after_miss(source, &table)
            .await?
            .and_then(|table| table.markets.get(symbol).cloned())
            .ok_or_else(|| {
                ExchangeError::NotFound(format!("{} has no market {}", self.exchange, symbol))
            })
    }

    /// All markets, ordered by symbol.
    pub async fn all<S: MarketSource + ?Sized>(
        &self,
        source: &S,
    ) -> Result<Vec<Arc<Market>>, ExchangeError> {
        let table = self.current(source).await?;
        let mut markets: Vec<Arc<Market>> = table.markets.values().cloned().collect();
        markets.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(markets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn market(symbol: &str, generation: usize) -> Market {
        Market {
            symbol: symbol.to_string(),
            base_asset: symbol[..3].to_string(),
            quote_asset: "USD".to_string(),
            active: true,
            price_increment: dec!(0.01),
            quantity_increment: dec!(0.001),
            min_notional: None,
            min_qty: rust_decimal::Decimal::from(generation as u64),
            max_qty: None,
            min_price: None,
            max_price: None,
        }
    }

    #[derive(Default)]
    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MarketSource for CountingSource {
        async fn fetch_markets(&self) -> Result<Vec<Market>, ExchangeError> {
            let generation = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::task::yield_now().await;
            Ok(vec![
                market("BTC_USD", generation),
                market("ETH_USD", generation),
            ])
        }
    }

    #[tokio::test]
    async fn test_lazy_load_happens_once() {
        let source = CountingSource::default();
        let cache = MarketCache::new("test", None);
        let btc = cache.get_market(&source, "BTC_USD").await.unwrap();
        cache.get_market(&source, "ETH_USD").await.unwrap();
        assert_eq!(btc.base_asset, "BTC");
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_symbol_is_not_found() {
        let source = CountingSource::default();
        let cache = MarketCache::new("test", None);
        let err = cache.get_market(&source, "DOGE_USD").await.unwrap_err();
        assert!(matches!(err, ExchangeError::NotFound(_)));
    }

    /// Lists one more market on every fetch.
    #[derive(Default)]
    struct GrowingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MarketSource for GrowingSource {
        async fn fetch_markets(&self) -> Result<Vec<Market>, ExchangeError> {
            let generation = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let mut markets = vec![market("BTC_USD", generation)];
            if generation >= 2 {
                markets.push(market("NEW_USD", generation));
            }
            Ok(markets)
        }
    }

    #[tokio::test]
    async fn test_miss_refreshes_once_and_finds_new_listing() {
        let source = GrowingSource::default();
        let cache = MarketCache::new("test", None);
        cache.get_market(&source, "BTC_USD").await.unwrap();

        let listed = cache.get_market(&source, "NEW_USD").await.unwrap();
        assert_eq!(listed.symbol, "NEW_USD");
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_repeated_misses_are_rate_bounded() {
        let source = CountingSource::default();
        let cache = MarketCache::new("test", None);
        cache.get_market(&source, "BTC_USD").await.unwrap();

        for _ in 0..5 {
            let err = cache.get_market(&source, "DOGE_USD").await.unwrap_err();
            assert!(matches!(err, ExchangeError::NotFound(_)));
        }
        // initial load plus one refresh for the first miss
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_explicit_refresh_picks_up_listing() {
        let source = GrowingSource::default();
        let cache = MarketCache::new("test", None);
        assert_eq!(cache.all(&source).await.unwrap().len(), 1);
        cache.refresh(&source).await.unwrap();
        assert_eq!(cache.all(&source).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_expired_table_is_refreshed() {
        let source = CountingSource::default();
        let cache = MarketCache::new("test", Some(Duration::ZERO));
        cache.get_market(&source, "BTC_USD").await.unwrap();
        let btc = cache.get_market(&source, "BTC_USD").await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(btc.min_qty, dec!(2));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_readers_see_whole_tables_during_refresh() {
        let source = Arc::new(CountingSource::default());
        let cache = Arc::new(MarketCache::new("test", None));
        cache.refresh(source.as_ref()).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let cache = Arc::clone(&cache);
            let source = Arc::clone(&source);
            handles.push(tokio::spawn(async move {
                for _ in 0..20 {
                    if i % 2 == 0 {
                        cache.refresh(source.as_ref()).await.unwrap();
                    } else {
                        let all = cache.all(source.as_ref()).await.unwrap();
                        assert_eq!(all.len(), 2);
                        // both entries come from the same fetch
                        assert_eq!(all[0].min_qty, all[1].min_qty);
                    }
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
    }
}
