use crate::app_config::AppConfig;
use crate::dashboard::{scan_watchlist, RenderPass};
use crate::feed_client::HttpDataFeed;
use crate::rules::{ScanLog, ScanResult};
use crate::session::{load_ticker, Applied, Session};
use crate::utility::timing::{Timer, SLOW_MS};
use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tracing::info;

// -----------------------------------------------
// API RESPONSE MODELS
// -----------------------------------------------

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub processing_time_ms: Option<u64>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T, start_time: Instant) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            processing_time_ms: Some(start_time.elapsed().as_millis() as u64),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    /// Feeds that failed and are shown empty
    pub degraded: Vec<&'static str>,
    #[serde(flatten)]
    pub view: RenderPass,
}

// -----------------------------------------------
// APPLICATION STATE
// -----------------------------------------------

#[derive(Clone)]
pub struct AppState {
    feed: Arc<HttpDataFeed>,
    scans: Arc<RwLock<ScanLog>>,
    unusual_only: bool,
}

impl AppState {
    pub fn new(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            feed: Arc::new(HttpDataFeed::new(config.api_base_url.clone())?),
            scans: Arc::new(RwLock::new(ScanLog::default())),
            unusual_only: config.unusual_only,
        })
    }
}

// -----------------------------------------------
// API HANDLERS
// -----------------------------------------------

/// GET /
async fn get_status() -> Json<Value> {
    Json(json!({ "status": "running" }))
}

/// GET /dashboard/{ticker} - Load the three feeds and return one render pass
async fn get_dashboard(
    Path(ticker): Path<String>,
    State(app_state): State<AppState>,
) -> Result<Json<ApiResponse<DashboardResponse>>, StatusCode> {
    let start_time = Instant::now();
    let ticker = ticker.trim().to_uppercase();
    let timer = Timer::start_with_threshold(format!("dashboard {}", ticker), SLOW_MS);

    // each request owns its session, so concurrent requests never share state
    let session = Session::new();
    let report = load_ticker(&session, app_state.feed.as_ref(), &ticker).await;
    let state = session.snapshot().await;

    let degraded = [("options", report.chain), ("candles", report.candles), ("ai", report.verdict)]
        .into_iter()
        .filter(|(_, applied)| *applied == Applied::Degraded)
        .map(|(feed, _)| feed)
        .collect();

    let view = RenderPass::build(&state, app_state.unusual_only);
    timer.stop();

    Ok(Json(ApiResponse::ok(DashboardResponse { degraded, view }, start_time)))
}

/// GET /scan - Most recent scan hits, oldest first
async fn get_scan_results(
    State(app_state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ScanResult>>>, StatusCode> {
    let start_time = Instant::now();
    let entries = app_state.scans.read().await.entries();

    Ok(Json(ApiResponse::ok(entries, start_time)))
}

// -----------------------------------------------
// BACKGROUND SCAN
// -----------------------------------------------

async fn scan_loop(app_state: AppState, watchlist: Vec<String>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;

        let hits = scan_watchlist(app_state.feed.as_ref(), &watchlist).await;
        info!(tickers = watchlist.len(), hits = hits.len(), "background scan complete");

        app_state.scans.write().await.extend(hits);
    }
}

// -----------------------------------------------
// SERVER SETUP
// -----------------------------------------------

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(get_status))
        .route("/dashboard/{ticker}", get(get_dashboard))
        .route("/scan", get(get_scan_results))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

pub async fn start_server(config: &AppConfig) -> Result<()> {
    let app_state = AppState::new(config)?;

    tokio::spawn(scan_loop(
        app_state.clone(),
        config.watchlist.clone(),
        Duration::from_secs(config.scan_interval_secs),
    ));

    let addr = format!("127.0.0.1:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(%addr, "flow dashboard API listening");
    println!("🚀 Flow Dashboard API running on http://{}", addr);
    println!("📋 Available endpoints:");
    println!("   GET  /");
    println!("   GET  /dashboard/{{ticker}}");
    println!("   GET  /scan");
    println!();

    axum::serve(listener, router(app_state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_status_route() {
        let Json(body) = get_status().await;
        assert_eq!(body["status"], "running");
    }

    #[tokio::test]
    async fn test_scan_route_starts_empty() {
        let config = AppConfig {
            mode: "server".to_string(),
            api_base_url: "http://127.0.0.1:9".to_string(),
            ticker: "SPY".to_string(),
            watchlist: vec!["SPY".to_string()],
            port: 0,
            refresh_secs: 30,
            scan_interval_secs: 120,
            chart_width: 80,
            unusual_only: false,
        };
        let app_state = AppState::new(&config).unwrap();

        let Json(body) = get_scan_results(State(app_state)).await.unwrap();
        assert!(body.success);
        assert_eq!(body.data.map(|d| d.len()), Some(0));
    }
}
