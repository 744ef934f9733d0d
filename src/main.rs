use anyhow::{bail, Result};
use colored::Colorize;
use flow_dashboard::api_server_axum;
use flow_dashboard::app_config::AppConfig;
use flow_dashboard::dashboard::DashboardCommands;
use flow_dashboard::logging;
use tracing::{error, info};

fn banner(title: &str) {
    println!("{}", "=".repeat(60).blue());
    println!("{}", title.green().bold());
    println!("{}", "=".repeat(60).blue());
    println!();
}

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = logging::init_logging()?;

    // ========================================
    // CONFIGURATION - from environment
    // ========================================

    let config = AppConfig::from_env();
    if let Err(e) = config.validate() {
        error!(error = %e, "invalid configuration");
        println!("{} {}", "✗".red(), e);
        return Err(e);
    }

    info!(mode = %config.mode, base_url = %config.api_base_url, "starting");

    match config.mode.as_str() {
        "server" => {
            banner("Flow Dashboard API Server");
            config.print_summary();
            api_server_axum::start_server(&config).await?;
        }
        "watch" => {
            banner("Options Flow Watch");
            config.print_summary();
            DashboardCommands::new(config)?.run_watch().await?;
        }
        "scan" => {
            banner("Unusual Flow Scanner");
            config.print_summary();
            DashboardCommands::new(config)?.run_scan().await?;
        }
        "single" => {
            banner("Options Flow Dashboard");
            config.print_summary();
            DashboardCommands::new(config)?.run_single().await?;
        }
        // validate() already rejects anything else
        other => bail!("unknown FLOW_MODE '{}'", other),
    }

    Ok(())
}
