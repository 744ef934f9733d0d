use crate::config;
use crate::indicators;
use crate::models::{Bias, Candle, OptionChainSnapshot, OptionContract, OptionSide};
use crate::processor;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

/// Contract flagged by the unusual-flow rule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnusualContract {
    pub side: OptionSide,
    pub strike: f64,
    pub last_price: f64,
    pub volume: u64,
    pub open_interest: u64,
    pub premium: f64,
}

/// Watchlist hit: unusual flow on a ticker whose RSI sits at an extreme
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanResult {
    pub ticker: String,
    pub rsi: f64,
    pub contracts: Vec<UnusualContract>,
    pub scanned_at: DateTime<Utc>,
}

// -----------------------------------------------
// UNUSUAL FLOW
// -----------------------------------------------

/// Rule: volume more than twice open interest AND premium above the floor
pub fn is_unusual(contract: &OptionContract) -> bool {
    let premium = processor::premium(contract);
    contract.volume as f64 > config::UNUSUAL_VOLUME_OI_RATIO * contract.open_interest as f64
        && premium > config::UNUSUAL_MIN_PREMIUM
}

/// Unusual contracts from both sides, largest premium first
pub fn unusual_flow(snapshot: &OptionChainSnapshot) -> Vec<UnusualContract> {
    let mut hits: Vec<UnusualContract> = [OptionSide::Call, OptionSide::Put]
        .into_iter()
        .flat_map(|side| {
            snapshot
                .side(side)
                .iter()
                .filter(|c| is_unusual(c))
                .map(move |c| UnusualContract {
                    side,
                    strike: c.strike,
                    last_price: c.last_price,
                    volume: c.volume,
                    open_interest: c.open_interest,
                    premium: processor::premium(c),
                })
        })
        .collect();

    hits.sort_by(|a, b| b.premium.total_cmp(&a.premium));
    hits
}

// -----------------------------------------------
// RSI EXTREME SCAN
// -----------------------------------------------

pub fn is_rsi_extreme(rsi: f64) -> bool {
    rsi < config::SCAN_RSI_OVERSOLD || rsi > config::SCAN_RSI_OVERBOUGHT
}

/// Apply the scan rules to one ticker. `None` when there is no unusual flow
/// or the RSI is inside the neutral band.
pub fn scan_ticker(ticker: &str, snapshot: &OptionChainSnapshot, candles: &[Candle]) -> Option<ScanResult> {
    let mut contracts = unusual_flow(snapshot);
    if contracts.is_empty() {
        return None;
    }

    let rsi = indicators::latest_rsi(candles, config::RSI_PERIOD);
    if !is_rsi_extreme(rsi) {
        return None;
    }

    contracts.truncate(config::SCAN_CONTRACTS_KEPT);
    Some(ScanResult {
        ticker: ticker.to_string(),
        rsi,
        contracts,
        scanned_at: Utc::now(),
    })
}

/// Bounded in-memory log of scan hits, oldest evicted first
#[derive(Debug, Clone)]
pub struct ScanLog {
    entries: VecDeque<ScanResult>,
    capacity: usize,
}

impl Default for ScanLog {
    fn default() -> Self {
        Self::with_capacity(config::SCAN_LOG_CAPACITY)
    }
}

impl ScanLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, result: ScanResult) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(result);
    }

    pub fn extend(&mut self, results: impl IntoIterator<Item = ScanResult>) {
        for result in results {
            self.push(result);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest first
    pub fn entries(&self) -> Vec<ScanResult> {
        self.entries.iter().cloned().collect()
    }
}

// -----------------------------------------------
// TRADE LEVELS
// -----------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TradeLevels {
    pub entry: f64,
    pub stop: f64,
    pub target: f64,
}

impl TradeLevels {
    /// Stop 1% against the bias, target 2% with it. Neutral is treated as long.
    pub fn from_bias(bias: Bias, spot: f64) -> Self {
        let (stop, target) = match bias {
            Bias::Puts => (spot * 1.01, spot * 0.98),
            Bias::Calls | Bias::Neutral => (spot * 0.99, spot * 1.02),
        };

        Self {
            entry: round_cents(spot),
            stop: round_cents(stop),
            target: round_cents(target),
        }
    }
}

fn round_cents(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
