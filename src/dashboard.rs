//! Terminal dashboard: one render pass per loaded ticker, plus the watch and
//! scan loops built on top of it.

use crate::app_config::AppConfig;
use crate::chart::{ChartData, ChartSurface, Container, TextCanvas, TextSurface};
use crate::config;
use crate::feed_client::{DataFeed, HttpDataFeed};
use crate::indicators;
use crate::models::{AiVerdict, Bias, IndicatorSeries};
use crate::processor::{self, DerivedContractMetrics, Dominance, Flow, Moneyness, NetPremiumSplit};
use crate::rules::{self, ScanLog, ScanResult, TradeLevels, UnusualContract};
use crate::session::{load_ticker, Session, SessionState};
use crate::utility::timing::{timed, timed_async};
use anyhow::{Context, Result};
use colored::{ColoredString, Colorize};
use futures::future::join_all;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

/// Everything one dashboard view shows, derived from a single session state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderPass {
    pub ticker: String,
    pub generation: u64,
    pub spot: Option<f64>,
    pub calls: Vec<DerivedContractMetrics>,
    pub puts: Vec<DerivedContractMetrics>,
    pub net_premium: NetPremiumSplit,
    pub unusual: Vec<UnusualContract>,
    pub sma: IndicatorSeries,
    pub rsi: IndicatorSeries,
    pub latest_rsi: f64,
    pub verdict: Option<AiVerdict>,
    pub levels: Option<TradeLevels>,
}

impl RenderPass {
    /// Derive the view. `unusual_only` narrows the displayed rows; ranking
    /// and top strikes are computed on the full chain first.
    pub fn build(state: &SessionState, unusual_only: bool) -> Self {
        let spot = state.spot();
        let snapshot = state.snapshot.clone().unwrap_or_default();
        let metrics = processor::derive_metrics(&snapshot, spot);

        let bias = state.verdict.map(|v| v.bias).unwrap_or_default();

        Self {
            ticker: state.ticker.clone(),
            generation: state.generation,
            spot,
            calls: display_rows(&metrics.call_metrics, unusual_only),
            puts: display_rows(&metrics.put_metrics, unusual_only),
            net_premium: metrics.net_premium,
            unusual: rules::unusual_flow(&snapshot),
            sma: indicators::sma(&state.candles, config::SMA_PERIOD),
            rsi: indicators::rsi(&state.candles, config::RSI_PERIOD),
            latest_rsi: indicators::latest_rsi(&state.candles, config::RSI_PERIOD),
            verdict: state.verdict,
            levels: spot.map(|s| TradeLevels::from_bias(bias, s)),
        }
    }

    /// Verdict badge, only when the model has an opinion
    pub fn badge(&self) -> Option<String> {
        let verdict = self.verdict?;
        if verdict.bias == Bias::Neutral {
            return None;
        }
        Some(format!("{} {}%", verdict.bias.label(), verdict.confidence))
    }

    pub fn print(&self, chart: Option<&TextCanvas>) {
        println!("{}", "=".repeat(60).blue());
        let spot = self
            .spot
            .map(|s| format!("${:.2}", s))
            .unwrap_or_else(|| "--".to_string());
        println!("{}  {}", self.ticker.green().bold(), spot.yellow());
        if let Some(badge) = self.badge() {
            let badge = match self.verdict.map(|v| v.bias) {
                Some(Bias::Calls) => badge.black().on_green(),
                _ => badge.white().on_red(),
            };
            println!("{} AI verdict: {}", "ℹ".blue(), badge);
        }
        if let Some(levels) = self.levels {
            println!(
                "{} Entry {:.2}  Stop {:.2}  Target {:.2}",
                "→".cyan(),
                levels.entry,
                levels.stop,
                levels.target
            );
        }
        println!("{}", "=".repeat(60).blue());

        match chart {
            Some(canvas) => print!("{}", canvas.render(true)),
            None => println!("{}", "(chart waiting for a visible width)".dimmed()),
        }
        println!("{} RSI {}: {:.1}", "ℹ".blue(), config::RSI_PERIOD, self.latest_rsi);
        println!();

        let split = &self.net_premium;
        let headline = match split.dominant {
            Dominance::Calls => "CALLS DOMINATING".green().bold(),
            Dominance::Puts => "PUTS DOMINATING".red().bold(),
        };
        println!(
            "{}  calls {} ({}%) / puts {} ({}%)",
            headline,
            format_millions(split.call_premium),
            split.call_pct,
            format_millions(split.put_premium),
            split.put_pct
        );
        println!();

        print_side("CALLS", &self.calls);
        print_side("PUTS", &self.puts);

        if !self.unusual.is_empty() {
            println!("{}", "Unusual flow:".yellow().bold());
            for hit in self.unusual.iter().take(config::SCAN_CONTRACTS_KEPT) {
                println!(
                    "  {} {} {:.2} vol {} / oi {} → {}",
                    "⚠".yellow(),
                    hit.side.label(),
                    hit.strike,
                    hit.volume,
                    hit.open_interest,
                    format_thousands(hit.premium)
                );
            }
            println!();
        }
    }
}

fn display_rows(metrics: &[DerivedContractMetrics], unusual_only: bool) -> Vec<DerivedContractMetrics> {
    let rows: Vec<&DerivedContractMetrics> = if unusual_only {
        processor::filter_unusual(metrics, config::UNUSUAL_MIN_VOLUME)
    } else {
        metrics.iter().collect()
    };

    rows.into_iter()
        .take(config::DISPLAY_ROWS_PER_SIDE)
        .copied()
        .collect()
}

fn print_side(title: &str, rows: &[DerivedContractMetrics]) {
    println!("{}", title.cyan().bold());
    if rows.is_empty() {
        println!("  {}", "no contracts".dimmed());
        println!();
        return;
    }

    println!(
        "  {:>9} {:>8} {:>8} {:>8} {:>9}  {:<4} {}",
        "STRIKE", "LAST", "VOL", "OI", "PREMIUM", "", "FLOW"
    );
    for row in rows {
        let c = &row.contract;
        let marker = if row.is_top_strike { "★" } else { " " };
        let line = format!(
            "{} {:>9.2} {:>8.2} {:>8} {:>8} {:>9}  {:<4} {}{}",
            marker,
            c.strike,
            c.last_price,
            c.volume,
            c.open_interest,
            format_thousands(row.premium),
            row.moneyness.label(),
            match row.flow {
                Flow::Aggressive => "AGGRESSIVE",
                Flow::Normal => "",
            },
            if row.is_wall { "  WALL" } else { "" }
        );
        println!("{}", shade(line, row));
    }
    println!();
}

// Heat drives emphasis; ATM rows are highlighted regardless
fn shade(line: String, row: &DerivedContractMetrics) -> ColoredString {
    let line = if row.moneyness == Moneyness::Atm {
        line.on_bright_black()
    } else {
        line.normal()
    };
    if row.heat >= config::HEAT_MAX / 2.0 { line.bold() } else { line }
}

/// `$Nk`
pub fn format_thousands(premium: f64) -> String {
    format!("${}k", (premium / 1_000.0).round() as i64)
}

/// `$X.XXM`
pub fn format_millions(premium: f64) -> String {
    format!("${:.2}M", premium / 1_000_000.0)
}

// -----------------------------------------------
// SCANNING
// -----------------------------------------------

/// Fetch chain and candles for every ticker concurrently and keep the hits.
/// A ticker whose feeds fail is skipped.
pub async fn scan_watchlist<F: DataFeed + Sync>(feed: &F, tickers: &[String]) -> Vec<ScanResult> {
    let scans = tickers.iter().map(|ticker| async move {
        let (chain, candles) = tokio::join!(feed.fetch_chain(ticker), feed.fetch_candles(ticker));
        match (chain, candles) {
            (Ok(chain), Ok(candles)) => rules::scan_ticker(ticker, &chain, &candles),
            (Err(e), _) | (_, Err(e)) => {
                warn!(ticker = %ticker, error = %e, "scan skipped");
                None
            }
        }
    });

    join_all(scans).await.into_iter().flatten().collect()
}

// -----------------------------------------------
// COMMANDS
// -----------------------------------------------

pub struct DashboardCommands {
    config: AppConfig,
    feed: HttpDataFeed,
}

impl DashboardCommands {
    pub fn new(config: AppConfig) -> Result<Self> {
        let feed = HttpDataFeed::new(config.api_base_url.clone()).context("Failed to create data feed")?;
        Ok(Self { config, feed })
    }

    /// Load one ticker, draw it once, release the chart
    pub async fn run_single(&self) -> Result<()> {
        let session = Session::new();
        let mut container = Container::new(self.config.chart_width);
        let mut chart = ChartSurface::new(TextSurface::new(), config::CHART_HEIGHT);

        self.show(&session, &mut chart, &mut container, &self.config.ticker).await;
        chart.destroy(&mut container);
        Ok(())
    }

    /// Cycle through the watchlist, one ticker per refresh, until Ctrl-C
    pub async fn run_watch(&self) -> Result<()> {
        let session = Session::new();
        let mut container = Container::new(self.config.chart_width);
        let mut chart = ChartSurface::new(TextSurface::new(), config::CHART_HEIGHT);
        let mut interval = tokio::time::interval(Duration::from_secs(self.config.refresh_secs));

        for ticker in self.config.watchlist.iter().cycle() {
            tokio::select! {
                _ = interval.tick() => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("watch stopped");
                    break;
                }
            }

            // ticker change: old chart goes before the new one mounts
            chart.destroy(&mut container);
            self.show(&session, &mut chart, &mut container, ticker).await;
        }

        chart.destroy(&mut container);
        Ok(())
    }

    /// Periodic RSI-extreme scan of the watchlist until Ctrl-C
    pub async fn run_scan(&self) -> Result<()> {
        let mut log = ScanLog::default();
        let mut interval = tokio::time::interval(Duration::from_secs(self.config.scan_interval_secs));

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("scan stopped");
                    return Ok(());
                }
            }

            let hits = timed_async("watchlist scan", || scan_watchlist(&self.feed, &self.config.watchlist)).await;
            info!(tickers = self.config.watchlist.len(), hits = hits.len(), "scan complete");

            print_scan_hits(&hits);
            log.extend(hits);
            println!("{} {} results kept", "ℹ".blue(), log.len());
            println!();
        }
    }

    async fn show(
        &self,
        session: &Session,
        chart: &mut ChartSurface<TextSurface>,
        container: &mut Container,
        ticker: &str,
    ) {
        chart.mount(container);

        let report = timed_async(format!("load {}", ticker), || load_ticker(session, &self.feed, ticker)).await;
        if report.is_stale() {
            return;
        }

        let state = session.snapshot().await;
        let pass = timed("render pass", || {
            chart.update(ChartData::with_indicators(
                &state.candles,
                config::SMA_PERIOD,
                config::RSI_PERIOD,
            ));
            RenderPass::build(&state, self.config.unusual_only)
        });

        pass.print(chart.context());
    }
}

fn print_scan_hits(hits: &[ScanResult]) {
    println!("{}", "=".repeat(60).blue());
    println!("{}", "Watchlist Scan".cyan().bold());
    println!("{}", "=".repeat(60).blue());

    if hits.is_empty() {
        println!("{} No unusual flow at RSI extremes", "ℹ".blue());
        return;
    }

    for hit in hits {
        let rsi = if hit.rsi < config::SCAN_RSI_OVERSOLD {
            format!("RSI {:.1} oversold", hit.rsi).green()
        } else {
            format!("RSI {:.1} overbought", hit.rsi).red()
        };
        println!("{} {} {}", "✓".green(), hit.ticker.yellow(), rsi);
        for c in &hit.contracts {
            println!(
                "    {} {:.2} vol {} / oi {} → {}",
                c.side.label(),
                c.strike,
                c.volume,
                c.open_interest,
                format_thousands(c.premium)
            );
        }
    }
}
