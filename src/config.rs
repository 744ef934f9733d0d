use std::time::Duration;

// -----------------------------------------------
// DATA SERVICE
// -----------------------------------------------
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

pub fn options_url(base: &str, ticker: &str) -> String {
    format!("{}/options/{}", base.trim_end_matches('/'), urlencoding::encode(ticker))
}

pub fn candles_url(base: &str, ticker: &str) -> String {
    format!("{}/candles/{}", base.trim_end_matches('/'), urlencoding::encode(ticker))
}

pub fn verdict_url(base: &str, ticker: &str) -> String {
    format!("{}/ai/{}", base.trim_end_matches('/'), urlencoding::encode(ticker))
}

// -----------------------------------------------
// WATCHLIST
// -----------------------------------------------
pub const DEFAULT_WATCHLIST: &[&str] = &["AAPL", "TSLA", "SPY", "NFLX", "AMZN", "MO", "IWM"];
pub const DEFAULT_TICKER: &str = "TSLA";

// -----------------------------------------------
// FLOW ANALYTICS
// -----------------------------------------------
pub const CONTRACT_MULTIPLIER: f64 = 100.0;

/// Premium at which heat saturates before the visual cap is applied.
pub const HEAT_CAP: f64 = 1_000_000.0;
pub const HEAT_MAX: f64 = 0.35;

/// Strictly greater than this premium marks a wall.
pub const WALL_THRESHOLD: f64 = 500_000.0;

/// |strike - spot| below this is at-the-money.
pub const MONEYNESS_EPSILON: f64 = 0.75;

pub const TOP_STRIKES_PER_SIDE: usize = 3;
pub const UNUSUAL_MIN_VOLUME: u64 = 50;

// Unusual flow scanner
pub const UNUSUAL_VOLUME_OI_RATIO: f64 = 2.0;
pub const UNUSUAL_MIN_PREMIUM: f64 = 200_000.0;
pub const SCAN_RSI_OVERSOLD: f64 = 35.0;
pub const SCAN_RSI_OVERBOUGHT: f64 = 65.0;
pub const SCAN_CONTRACTS_KEPT: usize = 5;
pub const SCAN_LOG_CAPACITY: usize = 50;

// -----------------------------------------------
// INDICATORS
// -----------------------------------------------
pub const SMA_PERIOD: usize = 50;
pub const RSI_PERIOD: usize = 14;
pub const RSI_NEUTRAL: f64 = 50.0;

// -----------------------------------------------
// CHART / DISPLAY
// -----------------------------------------------
pub const CHART_HEIGHT: u32 = 280;
pub const DEFAULT_CHART_WIDTH: u32 = 80;
pub const DISPLAY_ROWS_PER_SIDE: usize = 12;

// -----------------------------------------------
// HTTP CLIENT CONFIG
// -----------------------------------------------
pub const USER_AGENT: &str = concat!("flow-dashboard/", env!("CARGO_PKG_VERSION"));
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(20);

pub const RETRY_BASE_DELAY_MS: u64 = 100;
pub const RETRY_FACTOR: u64 = 2;
pub const RETRY_MAX_DELAY_SECS: u64 = 3;
pub const RETRY_MAX_ATTEMPTS: usize = 3;

// -----------------------------------------------
// LOOP TIMING
// -----------------------------------------------
pub const DEFAULT_REFRESH_SECS: u64 = 30;
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 120;
pub const DEFAULT_PORT: u16 = 3002;

// -----------------------------------------------
// RUNTIME CONFIGURATION
// -----------------------------------------------

/// Base address of the options/candles/ai service
pub fn get_api_base_url() -> String {
    std::env::var("FLOW_API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string())
}

/// Execution mode: single, watch, scan or server
pub fn get_execution_mode() -> String {
    std::env::var("FLOW_MODE").unwrap_or_else(|_| "single".to_string())
}

pub fn get_ticker() -> String {
    std::env::var("FLOW_TICKER")
        .map(|t| t.trim().to_uppercase())
        .ok()
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_TICKER.to_string())
}

pub fn get_watchlist() -> Vec<String> {
    match std::env::var("FLOW_WATCHLIST") {
        Ok(raw) => parse_watchlist(&raw),
        Err(_) => DEFAULT_WATCHLIST.iter().map(|t| t.to_string()).collect(),
    }
}

/// Split a comma separated list, dropping blanks and duplicates
pub fn parse_watchlist(raw: &str) -> Vec<String> {
    let mut tickers: Vec<String> = Vec::new();
    for t in raw.split(',').map(|t| t.trim().to_uppercase()) {
        if !t.is_empty() && !tickers.contains(&t) {
            tickers.push(t);
        }
    }
    tickers
}

pub fn get_port() -> u16 {
    env_parse("FLOW_PORT").unwrap_or(DEFAULT_PORT)
}

pub fn get_refresh_secs() -> u64 {
    env_parse("FLOW_REFRESH_SECS").unwrap_or(DEFAULT_REFRESH_SECS)
}

pub fn get_scan_interval_secs() -> u64 {
    env_parse("FLOW_SCAN_INTERVAL_SECS").unwrap_or(DEFAULT_SCAN_INTERVAL_SECS)
}

pub fn get_chart_width() -> u32 {
    env_parse("FLOW_CHART_WIDTH").unwrap_or(DEFAULT_CHART_WIDTH)
}

pub fn get_unusual_only() -> bool {
    std::env::var("FLOW_UNUSUAL_ONLY")
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_encode_ticker() {
        assert_eq!(options_url("http://api/", "SPY"), "http://api/options/SPY");
        assert_eq!(candles_url("http://api", "BRK.B"), "http://api/candles/BRK.B");
        assert_eq!(verdict_url("http://api", "M&M"), "http://api/ai/M%26M");
    }

    #[test]
    fn test_parse_watchlist() {
        assert_eq!(parse_watchlist(" spy, tsla ,,SPY,iwm"), vec!["SPY", "TSLA", "IWM"]);
        assert!(parse_watchlist(" , ").is_empty());
    }
}
