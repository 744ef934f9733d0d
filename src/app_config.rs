use crate::config;
use anyhow::{bail, Result};
use colored::Colorize;

pub const MODES: &[&str] = &["single", "watch", "scan", "server"];

/// Runtime configuration collected from the environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mode: String,
    pub api_base_url: String,
    pub ticker: String,
    pub watchlist: Vec<String>,
    pub port: u16,
    pub refresh_secs: u64,
    pub scan_interval_secs: u64,
    pub chart_width: u32,
    pub unusual_only: bool,
}

impl AppConfig {
    /// Create new configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            mode: config::get_execution_mode(),
            api_base_url: config::get_api_base_url(),
            ticker: config::get_ticker(),
            watchlist: config::get_watchlist(),
            port: config::get_port(),
            refresh_secs: config::get_refresh_secs(),
            scan_interval_secs: config::get_scan_interval_secs(),
            chart_width: config::get_chart_width(),
            unusual_only: config::get_unusual_only(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !MODES.contains(&self.mode.as_str()) {
            bail!("unknown FLOW_MODE '{}', expected one of {}", self.mode, MODES.join(", "));
        }
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://")) {
            bail!("FLOW_API_BASE_URL must be an http(s) address, got '{}'", self.api_base_url);
        }
        if self.watchlist.is_empty() {
            bail!("FLOW_WATCHLIST is empty");
        }
        if self.refresh_secs == 0 || self.scan_interval_secs == 0 {
            bail!("refresh and scan intervals must be at least one second");
        }
        Ok(())
    }

    pub fn print_summary(&self) {
        println!("{} Mode: {}", "→".cyan(), self.mode.yellow());
        println!("{} Data service: {}", "→".cyan(), self.api_base_url.yellow());
        match self.mode.as_str() {
            "single" => println!("{} Ticker: {}", "→".cyan(), self.ticker.yellow()),
            _ => println!("{} Watchlist: {}", "→".cyan(), self.watchlist.join(", ").yellow()),
        }
        if self.unusual_only {
            println!("{} Showing unusual contracts only", "ℹ".blue());
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AppConfig {
        AppConfig {
            mode: "single".to_string(),
            api_base_url: "http://localhost:8000".to_string(),
            ticker: "SPY".to_string(),
            watchlist: vec!["SPY".to_string()],
            port: 3002,
            refresh_secs: 30,
            scan_interval_secs: 120,
            chart_width: 80,
            unusual_only: false,
        }
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut cfg = sample();
        cfg.api_base_url = "localhost:8000".to_string();
        assert!(cfg.validate().is_err());

        let mut cfg = sample();
        cfg.watchlist.clear();
        assert!(cfg.validate().is_err());

        let mut cfg = sample();
        cfg.refresh_secs = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_mode() {
        let mut cfg = sample();
        cfg.mode = "batch".to_string();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("unknown FLOW_MODE 'batch'"));

        for mode in MODES {
            cfg.mode = mode.to_string();
            assert!(cfg.validate().is_ok());
        }
    }
}
