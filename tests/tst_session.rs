use flow_dashboard::error::FeedError;
use flow_dashboard::feed_client::DataFeed;
use flow_dashboard::models::{AiVerdict, Bias, Candle, CandleSeries, OptionChainSnapshot, OptionContract};
use flow_dashboard::session::{load_ticker, Applied, Session};
use std::sync::Mutex;
use tokio::sync::oneshot;

/// In-memory feed. Candles for `slow_ticker` wait until the test releases them.
struct ScriptedFeed {
    slow_ticker: String,
    failing_candles: bool,
    started: Mutex<Option<oneshot::Sender<()>>>,
    release: Mutex<Option<oneshot::Receiver<()>>>,
}

impl ScriptedFeed {
    fn instant() -> Self {
        Self {
            slow_ticker: String::new(),
            failing_candles: false,
            started: Mutex::new(None),
            release: Mutex::new(None),
        }
    }

    fn gated(slow_ticker: &str, started: oneshot::Sender<()>, release: oneshot::Receiver<()>) -> Self {
        Self {
            slow_ticker: slow_ticker.to_string(),
            failing_candles: false,
            started: Mutex::new(Some(started)),
            release: Mutex::new(Some(release)),
        }
    }
}

fn close_for(ticker: &str) -> f64 {
    match ticker {
        "AAPL" => 190.0,
        "TSLA" => 250.0,
        _ => 100.0,
    }
}

impl DataFeed for ScriptedFeed {
    async fn fetch_chain(&self, ticker: &str) -> Result<OptionChainSnapshot, FeedError> {
        let call = OptionContract {
            strike: close_for(ticker),
            last_price: 1.0,
            volume: 10,
            open_interest: 5,
            implied_volatility: 0.3,
        };
        Ok(OptionChainSnapshot::new(ticker, vec![call], vec![]))
    }

    async fn fetch_candles(&self, ticker: &str) -> Result<CandleSeries, FeedError> {
        if self.failing_candles {
            return Err(FeedError::NonJsonResponse("<html>".to_string()));
        }

        if ticker == self.slow_ticker {
            let started = self.started.lock().unwrap().take();
            let release = self.release.lock().unwrap().take();
            if let Some(tx) = started {
                let _ = tx.send(());
            }
            if let Some(rx) = release {
                let _ = rx.await;
            }
        }

        let close = close_for(ticker);
        Ok((0..5)
            .map(|i| Candle {
                time: 1_700_000_000 + i * 60,
                open: close,
                high: close,
                low: close,
                close,
            })
            .collect())
    }

    async fn fetch_verdict(&self, _ticker: &str) -> Result<AiVerdict, FeedError> {
        Ok(AiVerdict {
            bias: Bias::Calls,
            confidence: 64,
            ..AiVerdict::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_applies_all_three_feeds() {
        let session = Session::new();
        let report = load_ticker(&session, &ScriptedFeed::instant(), "SPY").await;

        assert_eq!(report.chain, Applied::Current);
        assert_eq!(report.candles, Applied::Current);
        assert_eq!(report.verdict, Applied::Current);

        let state = session.snapshot().await;
        assert_eq!(state.ticker, "SPY");
        assert_eq!(state.spot(), Some(100.0));
        assert_eq!(state.verdict.map(|v| v.confidence), Some(64));
    }

    #[tokio::test]
    async fn test_failed_feed_does_not_block_others() {
        let feed = ScriptedFeed {
            failing_candles: true,
            ..ScriptedFeed::instant()
        };
        let session = Session::new();
        let report = load_ticker(&session, &feed, "SPY").await;

        assert_eq!(report.candles, Applied::Degraded);
        assert_eq!(report.chain, Applied::Current);
        assert_eq!(report.verdict, Applied::Current);

        let state = session.snapshot().await;
        assert!(state.candles.is_empty());
        assert!(state.spot().is_none());
        assert!(state.snapshot.is_some());
    }

    #[tokio::test]
    async fn test_switch_before_candles_resolve_keeps_new_ticker() {
        let (started_tx, started_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        let feed = ScriptedFeed::gated("AAPL", started_tx, release_rx);
        let session = Session::new();

        let switch = async {
            // AAPL candles are in flight; the user picks TSLA
            started_rx.await.unwrap();
            let report = load_ticker(&session, &feed, "TSLA").await;
            release_tx.send(()).unwrap();
            report
        };

        let (old, new) = tokio::join!(load_ticker(&session, &feed, "AAPL"), switch);

        assert_eq!(old.candles, Applied::Stale);
        assert_eq!(new.candles, Applied::Current);
        assert!(new.stamp.generation > old.stamp.generation);

        let state = session.snapshot().await;
        assert_eq!(state.ticker, "TSLA");
        assert!(!state.candles.is_empty());
        assert!(state.candles.iter().all(|c| c.close == close_for("TSLA")));
        assert_eq!(state.snapshot.as_ref().map(|s| s.ticker.as_str()), Some("TSLA"));
    }
}
