use crate::config;
use crate::models::{OptionChainSnapshot, OptionContract, OptionSide};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Moneyness {
    #[serde(rename = "ITM")]
    Itm,
    #[serde(rename = "ATM")]
    Atm,
    #[serde(rename = "OTM")]
    Otm,
}

impl Moneyness {
    pub fn label(&self) -> &'static str {
        match self {
            Moneyness::Itm => "ITM",
            Moneyness::Atm => "ATM",
            Moneyness::Otm => "OTM",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Flow {
    #[serde(rename = "AGGRESSIVE")]
    Aggressive,
    #[serde(rename = "NORMAL")]
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Dominance {
    #[serde(rename = "CALLS")]
    Calls,
    #[serde(rename = "PUTS")]
    Puts,
}

/// Tunables of the analytics pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyticsParams {
    pub heat_cap: f64,
    pub moneyness_epsilon: f64,
}

impl Default for AnalyticsParams {
    fn default() -> Self {
        Self {
            heat_cap: config::HEAT_CAP,
            moneyness_epsilon: config::MONEYNESS_EPSILON,
        }
    }
}

/// Per-contract analytics, recomputed on every render pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DerivedContractMetrics {
    pub side: OptionSide,
    /// Position of the contract in its side of the snapshot
    pub index: usize,
    pub contract: OptionContract,
    pub premium: f64,
    pub heat: f64,
    pub moneyness: Moneyness,
    pub flow: Flow,
    pub is_wall: bool,
    pub is_top_strike: bool,
}

impl AsRef<OptionContract> for DerivedContractMetrics {
    fn as_ref(&self) -> &OptionContract {
        &self.contract
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NetPremiumSplit {
    pub call_premium: f64,
    pub put_premium: f64,
    pub call_pct: u8,
    pub put_pct: u8,
    pub dominant: Dominance,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainMetrics {
    pub call_metrics: Vec<DerivedContractMetrics>,
    pub put_metrics: Vec<DerivedContractMetrics>,
    pub net_premium: NetPremiumSplit,
}

/// Derive metrics for both sides of the chain with the default tunables
pub fn derive_metrics(snapshot: &OptionChainSnapshot, spot: Option<f64>) -> ChainMetrics {
    derive_metrics_with(snapshot, spot, &AnalyticsParams::default())
}

pub fn derive_metrics_with(
    snapshot: &OptionChainSnapshot,
    spot: Option<f64>,
    params: &AnalyticsParams,
) -> ChainMetrics {
    ChainMetrics {
        call_metrics: derive_side(&snapshot.calls, OptionSide::Call, spot, params),
        put_metrics: derive_side(&snapshot.puts, OptionSide::Put, spot, params),
        net_premium: net_premium_split(snapshot),
    }
}

fn derive_side(
    contracts: &[OptionContract],
    side: OptionSide,
    spot: Option<f64>,
    params: &AnalyticsParams,
) -> Vec<DerivedContractMetrics> {
    let top = top_strikes(contracts);

    contracts
        .iter()
        .enumerate()
        .map(|(index, contract)| {
            let premium = premium(contract);
            let strike = finite_or_zero(contract.strike);

            DerivedContractMetrics {
                side,
                index,
                contract: *contract,
                premium,
                heat: heat(premium, params.heat_cap),
                moneyness: classify_money(strike, spot, side, params.moneyness_epsilon),
                flow: classify_flow(contract),
                is_wall: is_wall(premium),
                is_top_strike: top.contains(&strike),
            }
        })
        .collect()
}

/// Notional flow: lastPrice × volume × multiplier, never negative
pub fn premium(contract: &OptionContract) -> f64 {
    let last_price = finite_or_zero(contract.last_price).max(0.0);
    last_price * contract.volume as f64 * config::CONTRACT_MULTIPLIER
}

/// Display intensity in [0, HEAT_MAX], monotone in premium
pub fn heat(premium: f64, cap: f64) -> f64 {
    let cap = if cap > 0.0 { cap } else { config::HEAT_CAP };
    (finite_or_zero(premium).max(0.0) / cap).min(config::HEAT_MAX)
}

pub fn is_wall(premium: f64) -> bool {
    premium > config::WALL_THRESHOLD
}

/// Classify a strike against spot. Without a spot every contract is OTM.
pub fn classify_money(strike: f64, spot: Option<f64>, side: OptionSide, epsilon: f64) -> Moneyness {
    let Some(spot) = spot.filter(|s| s.is_finite()) else {
        return Moneyness::Otm;
    };

    if (strike - spot).abs() < epsilon {
        return Moneyness::Atm;
    }

    let in_the_money = match side {
        // Call: below spot = ITM
        OptionSide::Call => strike < spot,
        // Put: above spot = ITM
        OptionSide::Put => strike > spot,
    };

    if in_the_money { Moneyness::Itm } else { Moneyness::Otm }
}

pub fn classify_flow(contract: &OptionContract) -> Flow {
    if contract.volume > contract.open_interest {
        Flow::Aggressive
    } else {
        Flow::Normal
    }
}

/// Strikes of the three highest-premium contracts, ties kept in snapshot order
pub fn top_strikes(contracts: &[OptionContract]) -> Vec<f64> {
    let mut ranked: Vec<(f64, f64)> = contracts
        .iter()
        .map(|c| (premium(c), finite_or_zero(c.strike)))
        .collect();

    // stable: equal premiums keep their original order
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));

    ranked
        .into_iter()
        .take(config::TOP_STRIKES_PER_SIDE)
        .map(|(_, strike)| strike)
        .collect()
}

/// Call/put premium totals and their rounded percentage split
pub fn net_premium_split(snapshot: &OptionChainSnapshot) -> NetPremiumSplit {
    let call_premium: f64 = snapshot.calls.iter().map(premium).sum();
    let put_premium: f64 = snapshot.puts.iter().map(premium).sum();

    let total = call_premium + put_premium;
    let denominator = if total > 0.0 { total } else { 1.0 };

    let call_pct = ((call_premium / denominator) * 100.0).round().clamp(0.0, 100.0) as u8;
    let put_pct = 100 - call_pct;

    // tie goes to puts
    let dominant = if call_premium > put_premium {
        Dominance::Calls
    } else {
        Dominance::Puts
    };

    NetPremiumSplit {
        call_premium,
        put_premium,
        call_pct,
        put_pct,
        dominant,
    }
}

/// Display filter for the unusual-only toggle. Ranking is never affected.
pub fn filter_unusual<T: AsRef<OptionContract>>(items: &[T], min_volume: u64) -> Vec<&T> {
    items
        .iter()
        .filter(|item| item.as_ref().volume >= min_volume)
        .collect()
}

fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() { x } else { 0.0 }
}
