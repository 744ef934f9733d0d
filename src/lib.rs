pub mod api_server_axum;
pub mod app_config;
pub mod chart;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod feed_client;
pub mod indicators;
pub mod logging;
pub mod models;
pub mod processor;
pub mod rules;
pub mod session;
pub mod utility;

// Re-exports for convenience
pub use app_config::AppConfig;
pub use chart::{ChartData, ChartPhase, ChartSurface, Container, Surface};
pub use error::FeedError;
pub use feed_client::{DataFeed, HttpDataFeed};
pub use models::{AiVerdict, Bias, Candle, CandleSeries, OptionChainSnapshot, OptionContract, OptionSide};
pub use session::{load_ticker, Applied, Session, SessionState};
