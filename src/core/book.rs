//! Local order book kept consistent with a vendor's sequenced update stream.
//!
//! A book is only ever reported while `Synced`. Any gap in the update
//! sequence moves it to `Stale`, and nothing more is applied until a full
//! snapshot has been loaded again.

use crate::core::errors::ExchangeError;
use crate::core::traits::SnapshotSource;
use crate::core::types::{BookUpdate, OrderBookLevel, OrderBookSnapshot};
use futures_util::{Stream, StreamExt};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookState {
    Uninitialized,
    Synced,
    Stale,
    Closed,
}

/// What happened to one incremental update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    /// Already covered by the book, or the book is not accepting updates
    Discarded,
    /// Sequence jumped; the book is now stale
    Gap { expected: u64, received: u64 },
}

/// Levels per side requested when (re)loading a book
pub const DEFAULT_SNAPSHOT_DEPTH: usize = 1000;

#[derive(Debug, Clone)]
pub struct OrderBookSynchronizer {
    symbol: String,
    snapshot_depth: usize,
    state: BookState,
    sequence: u64,
    bids: BTreeMap<Decimal, Decimal>,
    asks: BTreeMap<Decimal, Decimal>,
}

fn load_side(levels: &[OrderBookLevel]) -> BTreeMap<Decimal, Decimal> {
    levels
        .iter()
        .filter(|level| !level.quantity.is_zero())
        .map(|level| (level.price, level.quantity))
        .collect()
}

fn apply_side(side: &mut BTreeMap<Decimal, Decimal>, levels: &[OrderBookLevel]) {
    for level in levels {
        if level.quantity.is_zero() {
            side.remove(&level.price);
        } else {
            side.insert(level.price, level.quantity);
        }
    }
}

impl OrderBookSynchronizer {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            snapshot_depth: DEFAULT_SNAPSHOT_DEPTH,
            state: BookState::Uninitialized,
            sequence: 0,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
        }
    }

    /// Levels per side to load on resync. Keep this well above any published
    /// depth: levels below the loaded snapshot only reappear when they change.
    #[must_use]
    pub fn with_snapshot_depth(mut self, depth: usize) -> Self {
        self.snapshot_depth = depth;
        self
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub const fn snapshot_depth(&self) -> usize {
        self.snapshot_depth
    }

    pub const fn state(&self) -> BookState {
        self.state
    }

    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    fn closed_error(&self) -> ExchangeError {
        ExchangeError::StaleBook(format!("{} book is closed", self.symbol))
    }

    /// Replace the whole book. The sequence never moves backwards, so a
    /// snapshot older than what has already been applied is refused.
    pub fn apply_snapshot(&mut self, snapshot: OrderBookSnapshot) -> Result<(), ExchangeError> {
        if self.state == BookState::Closed {
            return Err(self.closed_error());
        }
        if snapshot.symbol != self.symbol {
            return Err(ExchangeError::InvalidArgument(format!(
                "snapshot for {} applied to {} book",
                snapshot.symbol, self.symbol
            )));
        }
        if self.state != BookState::Uninitialized && snapshot.sequence < self.sequence {
            return Err(ExchangeError::StaleBook(format!(
                "{}: snapshot {} is older than book sequence {}",
                self.symbol, snapshot.sequence, self.sequence
            )));
        }

        self.bids = load_side(&snapshot.bids);
        self.asks = load_side(&snapshot.asks);
        self.sequence = snapshot.sequence;
        self.state = BookState::Synced;
        debug!(symbol = %self.symbol, sequence = self.sequence, "book snapshot loaded");
        Ok(())
    }

    /// Apply an update covering `first_sequence..=sequence`.
    pub fn apply_update(&mut self, update: &BookUpdate) -> Result<UpdateOutcome, ExchangeError> {
        match self.state {
            BookState::Closed => return Err(self.closed_error()),
            BookState::Uninitialized | BookState::Stale => return Ok(UpdateOutcome::Discarded),
            BookState::Synced => {}
        }
        if update.symbol != self.symbol {
            return Err(ExchangeError::InvalidArgument(format!(
                "update for {} applied to {} book",
                update.symbol, self.symbol
            )));
        }
        if update.first_sequence > update.sequence {
            return Err(ExchangeError::malformed(
                "sequence",
                format!("range {}..={} is inverted", update.first_sequence, update.sequence),
            ));
        }

        if update.sequence <= self.sequence {
            return Ok(UpdateOutcome::Discarded);
        }
        let expected = self.sequence + 1;
        if update.first_sequence > expected {
            self.state = BookState::Stale;
            warn!(
                symbol = %self.symbol,
                expected,
                received = update.first_sequence,
                "sequence gap, book marked stale"
            );
            return Ok(UpdateOutcome::Gap {
                expected,
                received: update.first_sequence,
            });
        }

        apply_side(&mut self.bids, &update.bids);
        apply_side(&mut self.asks, &update.asks);
        self.sequence = update.sequence;
        Ok(UpdateOutcome::Applied)
    }

    /// Force a resync before any further update is accepted.
    pub fn mark_stale(&mut self) {
        if self.state == BookState::Synced {
            self.state = BookState::Stale;
        }
    }

    pub fn close(&mut self) {
        self.state = BookState::Closed;
        self.bids.clear();
        self.asks.clear();
    }

    /// Consistent copy of the top `depth` levels per side; `None` for all.
    pub fn snapshot(&self, depth: Option<usize>) -> Result<OrderBookSnapshot, ExchangeError> {
        match self.state {
            BookState::Synced => {}
            BookState::Closed => return Err(self.closed_error()),
            BookState::Uninitialized | BookState::Stale => {
                return Err(ExchangeError::StaleBook(format!(
                    "{} book is {:?}",
                    self.symbol, self.state
                )))
            }
        }
        let depth = depth.unwrap_or(usize::MAX);
        Ok(OrderBookSnapshot {
            symbol: self.symbol.clone(),
            sequence: self.sequence,
            bids: self
                .bids
                .iter()
                .rev()
                .take(depth)
                .map(|(price, qty)| OrderBookLevel::new(*price, *qty))
                .collect(),
            asks: self
                .asks
                .iter()
                .take(depth)
                .map(|(price, qty)| OrderBookLevel::new(*price, *qty))
                .collect(),
        })
    }
}

/// Fetch a snapshot at the book's own snapshot depth and load it, reporting
/// any failure as `StaleBook`. Published depth is applied on read only.
async fn resync<S>(book: &mut OrderBookSynchronizer, source: &S) -> Result<(), ExchangeError>
where
    S: SnapshotSource + ?Sized,
{
    let snapshot = source
        .fetch_snapshot(book.symbol(), book.snapshot_depth())
        .await
        .map_err(|e| ExchangeError::StaleBook(format!("{}: resync failed: {}", book.symbol(), e)))?;
    book.apply_snapshot(snapshot)
}

/// Read the book, resynchronizing first if it is not currently synced.
pub async fn read_fresh<S>(
    book: &mut OrderBookSynchronizer,
    source: &S,
    depth: usize,
) -> Result<OrderBookSnapshot, ExchangeError>
where
    S: SnapshotSource + ?Sized,
{
    match book.state() {
        BookState::Synced => {}
        BookState::Closed => return book.snapshot(Some(depth)),
        BookState::Uninitialized | BookState::Stale => resync(book, source).await?,
    }
    book.snapshot(Some(depth))
}

/// Drive `book` from an update stream until the stream ends or every
/// subscriber has gone, publishing a snapshot after each change.
///
/// Gaps trigger an immediate resync from `source`. The book is closed on exit.
#[instrument(skip_all, fields(symbol = %book.symbol()))]
pub async fn maintain_book<S, U>(
    mut book: OrderBookSynchronizer,
    source: &S,
    mut updates: U,
    depth: usize,
    publisher: watch::Sender<Option<OrderBookSnapshot>>,
) -> Result<(), ExchangeError>
where
    S: SnapshotSource + ?Sized,
    U: Stream<Item = Result<BookUpdate, ExchangeError>> + Unpin,
{
    let outcome: Result<(), ExchangeError> = async {
        if book.state() != BookState::Synced {
            resync(&mut book, source).await?;
            publisher.send_replace(book.snapshot(Some(depth)).ok());
        }

        while let Some(update) = updates.next().await {
            if publisher.is_closed() {
                break;
            }
            match book.apply_update(&update?)? {
                UpdateOutcome::Applied => {
                    publisher.send_replace(book.snapshot(Some(depth)).ok());
                }
                UpdateOutcome::Discarded => {}
                UpdateOutcome::Gap { .. } => {
                    // withdrawn until the resync lands
                    publisher.send_replace(None);
                    resync(&mut book, source).await?;
                    publisher.send_replace(book.snapshot(Some(depth)).ok());
                }
            }
        }
        Ok(())
    }
    .await;

    book.close();
    publisher.send_replace(None);
    info!(sequence = book.sequence(), "book maintenance stopped");
    outcome
}
