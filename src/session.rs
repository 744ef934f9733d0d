//! Session state for the selected ticker.
//!
//! The state is an immutable record swapped atomically on every change.
//! Each fetch carries the [`RequestStamp`] it was issued under; a response
//! whose stamp no longer matches the current generation is dropped, so a
//! slow reply for an old ticker can never overwrite the new one.

use crate::error::FeedError;
use crate::feed_client::DataFeed;
use crate::models::{spot_price, AiVerdict, CandleSeries, OptionChainSnapshot};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub ticker: String,
    pub generation: u64,
    pub snapshot: Option<OptionChainSnapshot>,
    pub candles: CandleSeries,
    pub verdict: Option<AiVerdict>,
}

impl SessionState {
    pub fn spot(&self) -> Option<f64> {
        spot_price(&self.candles)
    }
}

/// Identity of an in-flight request: the ticker and the selection it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestStamp {
    pub ticker: String,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Response stored in the current state
    Current,
    /// Feed failed; the slot was left empty
    Degraded,
    /// Response belonged to an older selection and was discarded
    Stale,
}

pub struct Session {
    state: RwLock<Arc<SessionState>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(Arc::new(SessionState::default())),
        }
    }

    /// Current state. The returned record never changes; later updates replace it.
    pub async fn snapshot(&self) -> Arc<SessionState> {
        Arc::clone(&*self.state.read().await)
    }

    /// Select a ticker: bump the generation and reset every feed slot
    pub async fn select_ticker(&self, ticker: &str) -> RequestStamp {
        let mut guard = self.state.write().await;
        let generation = guard.generation + 1;

        *guard = Arc::new(SessionState {
            ticker: ticker.to_string(),
            generation,
            ..SessionState::default()
        });

        info!(ticker, generation, "ticker selected");
        RequestStamp {
            ticker: ticker.to_string(),
            generation,
        }
    }

    pub async fn is_current(&self, stamp: &RequestStamp) -> bool {
        let guard = self.state.read().await;
        guard.generation == stamp.generation && guard.ticker == stamp.ticker
    }

    pub async fn apply_chain(
        &self,
        stamp: &RequestStamp,
        result: Result<OptionChainSnapshot, FeedError>,
    ) -> Applied {
        self.apply(stamp, "options", result, |state, value| state.snapshot = value)
            .await
    }

    pub async fn apply_candles(
        &self,
        stamp: &RequestStamp,
        result: Result<CandleSeries, FeedError>,
    ) -> Applied {
        self.apply(stamp, "candles", result, |state, value| {
            state.candles = value.unwrap_or_default()
        })
        .await
    }

    pub async fn apply_verdict(&self, stamp: &RequestStamp, result: Result<AiVerdict, FeedError>) -> Applied {
        self.apply(stamp, "ai", result, |state, value| state.verdict = value)
            .await
    }

    /// Swap in a new record with one slot replaced, unless the stamp is stale
    async fn apply<T>(
        &self,
        stamp: &RequestStamp,
        feed: &'static str,
        result: Result<T, FeedError>,
        set: impl FnOnce(&mut SessionState, Option<T>),
    ) -> Applied {
        let mut guard = self.state.write().await;

        if guard.generation != stamp.generation || guard.ticker != stamp.ticker {
            debug!(
                feed,
                stale_ticker = %stamp.ticker,
                current_ticker = %guard.ticker,
                "discarding stale response"
            );
            return Applied::Stale;
        }

        let mut next = SessionState::clone(&guard);
        let applied = match result {
            Ok(value) => {
                set(&mut next, Some(value));
                Applied::Current
            }
            Err(e) => {
                warn!(feed, ticker = %stamp.ticker, error = %e, "feed unavailable, showing empty");
                set(&mut next, None);
                Applied::Degraded
            }
        };

        *guard = Arc::new(next);
        applied
    }
}

/// Outcome of one three-feed load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub stamp: RequestStamp,
    pub chain: Applied,
    pub candles: Applied,
    pub verdict: Applied,
}

impl LoadReport {
    pub fn is_stale(&self) -> bool {
        self.chain == Applied::Stale && self.candles == Applied::Stale && self.verdict == Applied::Stale
    }
}

/// Select `ticker` and fetch its three feeds concurrently.
///
/// Each feed is applied as soon as it resolves. A failed feed degrades to
/// empty without affecting the others.
pub async fn load_ticker<F: DataFeed + Sync>(session: &Session, feed: &F, ticker: &str) -> LoadReport {
    let stamp = session.select_ticker(ticker).await;

    let chain = async {
        let result = feed.fetch_chain(&stamp.ticker).await;
        session.apply_chain(&stamp, result).await
    };
    let candles = async {
        let result = feed.fetch_candles(&stamp.ticker).await;
        session.apply_candles(&stamp, result).await
    };
    let verdict = async {
        let result = feed.fetch_verdict(&stamp.ticker).await;
        session.apply_verdict(&stamp, result).await
    };

    let (chain, candles, verdict) = tokio::join!(chain, candles, verdict);

    LoadReport {
        stamp,
        chain,
        candles,
        verdict,
    }
}
