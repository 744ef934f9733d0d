use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Which half of the chain a contract belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionSide {
    #[serde(rename = "CALL")]
    Call,
    #[serde(rename = "PUT")]
    Put,
}

impl OptionSide {
    pub fn label(&self) -> &'static str {
        match self {
            OptionSide::Call => "CALL",
            OptionSide::Put => "PUT",
        }
    }
}

/// One contract as delivered by `GET /options/{ticker}`.
///
/// Missing, null or malformed numbers deserialize as zero so a single bad
/// row never fails the whole chain.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OptionContract {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub strike: f64,

    #[serde(rename = "lastPrice", default, deserialize_with = "lenient_f64")]
    pub last_price: f64,

    #[serde(default, deserialize_with = "lenient_u64")]
    pub volume: u64,

    #[serde(rename = "openInterest", default, deserialize_with = "lenient_u64")]
    pub open_interest: u64,

    #[serde(rename = "impliedVolatility", default, deserialize_with = "lenient_f64")]
    pub implied_volatility: f64,
}

impl AsRef<OptionContract> for OptionContract {
    fn as_ref(&self) -> &OptionContract {
        self
    }
}

/// Wire body of `GET /options/{ticker}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChainResponse {
    #[serde(default, deserialize_with = "lenient_contracts")]
    pub calls: Vec<OptionContract>,

    #[serde(default, deserialize_with = "lenient_contracts")]
    pub puts: Vec<OptionContract>,
}

/// Chain for one ticker, replaced wholesale on every fetch
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OptionChainSnapshot {
    pub ticker: String,
    pub calls: Vec<OptionContract>,
    pub puts: Vec<OptionContract>,
}

impl OptionChainSnapshot {
    pub fn new(ticker: impl Into<String>, calls: Vec<OptionContract>, puts: Vec<OptionContract>) -> Self {
        Self { ticker: ticker.into(), calls, puts }
    }

    pub fn from_response(ticker: impl Into<String>, response: ChainResponse) -> Self {
        Self::new(ticker, response.calls, response.puts)
    }

    pub fn side(&self, side: OptionSide) -> &[OptionContract] {
        match side {
            OptionSide::Call => &self.calls,
            OptionSide::Put => &self.puts,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty() && self.puts.is_empty()
    }
}

/// OHLC bar keyed by Unix seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Ordered by strictly increasing `time`, as delivered by the feed
pub type CandleSeries = Vec<Candle>;

/// Wire row of `GET /candles/{ticker}`
#[derive(Debug, Clone, Deserialize)]
pub struct WireCandle {
    #[serde(rename = "Datetime", default)]
    pub datetime: Option<String>,

    #[serde(rename = "Open", default, deserialize_with = "lenient_f64")]
    pub open: f64,

    #[serde(rename = "High", default, deserialize_with = "lenient_f64")]
    pub high: f64,

    #[serde(rename = "Low", default, deserialize_with = "lenient_f64")]
    pub low: f64,

    #[serde(rename = "Close", default, deserialize_with = "lenient_f64")]
    pub close: f64,

    #[serde(rename = "Volume", default, deserialize_with = "lenient_u64")]
    pub volume: u64,
}

impl WireCandle {
    pub fn to_candle(&self) -> Option<Candle> {
        Some(Candle {
            time: parse_timestamp(self.datetime.as_deref()?)?,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
        })
    }
}

/// Convert raw wire rows. A row that is not an object or whose timestamp
/// is missing or unreadable is dropped; the rest of the series survives.
pub fn candles_from_rows(rows: Vec<Value>) -> CandleSeries {
    rows.into_iter()
        .filter_map(|row| WireCandle::deserialize(row).ok())
        .filter_map(|row| row.to_candle())
        .collect()
}

/// Last close of the series, the reference price for moneyness
pub fn spot_price(candles: &[Candle]) -> Option<f64> {
    candles.last().map(|c| c.close).filter(|c| c.is_finite())
}

/// ISO-8601 with or without offset, `T` or space separated. Offset-less values are UTC.
pub fn parse_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%.f%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt.timestamp());
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc().timestamp());
        }
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Bias {
    #[serde(rename = "CALLS")]
    Calls,
    #[serde(rename = "PUTS")]
    Puts,
    #[default]
    #[serde(rename = "NEUTRAL")]
    Neutral,
}

// Anything the model answers outside CALLS/PUTS counts as no opinion.
impl<'de> Deserialize<'de> for Bias {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<Value>::deserialize(deserializer)?;
        let label = raw.as_ref().and_then(Value::as_str).unwrap_or_default();
        Ok(match label.trim().to_ascii_uppercase().as_str() {
            "CALLS" => Bias::Calls,
            "PUTS" => Bias::Puts,
            _ => Bias::Neutral,
        })
    }
}

impl Bias {
    pub fn label(&self) -> &'static str {
        match self {
            Bias::Calls => "CALLS",
            Bias::Puts => "PUTS",
            Bias::Neutral => "NEUTRAL",
        }
    }
}

/// Body of `GET /ai/{ticker}`; price levels are optional extras
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AiVerdict {
    #[serde(default)]
    pub bias: Bias,

    #[serde(default, deserialize_with = "lenient_confidence")]
    pub confidence: u8,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: f64,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub stop: f64,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub target: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorPoint {
    pub time: i64,
    pub value: f64,
}

pub type IndicatorSeries = Vec<IndicatorPoint>;

// -----------------------------------------------
// LENIENT FIELD PARSING
// -----------------------------------------------

fn value_to_f64(value: Option<Value>) -> f64 {
    let n = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if n.is_finite() { n } else { 0.0 }
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(value_to_f64(Option::<Value>::deserialize(deserializer)?))
}

fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let n = value_to_f64(Option::<Value>::deserialize(deserializer)?);
    Ok(if n > 0.0 { n as u64 } else { 0 })
}

fn lenient_confidence<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let n = value_to_f64(Option::<Value>::deserialize(deserializer)?);
    Ok(n.round().clamp(0.0, 100.0) as u8)
}

fn lenient_contracts<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<OptionContract>, D::Error> {
    let rows = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(rows
        .into_iter()
        .filter_map(|row| OptionContract::deserialize(row).ok())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_missing_fields_are_zero() {
        let c: OptionContract = serde_json::from_str(
            r#"{"strike": 100, "lastPrice": null, "volume": "300", "openInterest": -4}"#,
        )
        .unwrap();
        assert_eq!(c.strike, 100.0);
        assert_eq!(c.last_price, 0.0);
        assert_eq!(c.volume, 300);
        assert_eq!(c.open_interest, 0);
        assert_eq!(c.implied_volatility, 0.0);
    }

    #[test]
    fn test_chain_skips_unreadable_rows() {
        let chain: ChainResponse = serde_json::from_str(
            r#"{"calls": [{"strike": 1}, null, 7, {"strike": 2}], "puts": null}"#,
        )
        .unwrap();
        assert_eq!(chain.calls.len(), 2);
        assert!(chain.puts.is_empty());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert_eq!(parse_timestamp("2024-01-02T14:30:00Z"), Some(1_704_205_800));
        assert_eq!(parse_timestamp("2024-01-02 09:30:00-05:00"), Some(1_704_205_800));
        assert_eq!(parse_timestamp("2024-01-02 14:30:00"), Some(1_704_205_800));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_candles_from_rows_drops_bad_rows() {
        let rows: Vec<Value> = serde_json::from_str(
            r#"[
                {"Datetime": "2024-01-02 09:30:00-05:00", "Open": 1, "High": 2, "Low": 0.5, "Close": 1.5, "Volume": 10},
                {"Datetime": "garbage", "Open": 1, "High": 2, "Low": 0.5, "Close": 1.5}
            ]"#,
        )
        .unwrap();
        let candles = candles_from_rows(rows);
        assert_eq!(candles.len(), 1);
        assert_eq!(spot_price(&candles), Some(1.5));
    }

    #[test]
    fn test_null_rows_do_not_reject_the_series() {
        let rows: Vec<Value> = serde_json::from_str(
            r#"[
                {"Datetime": "2024-01-02 09:30:00-05:00", "Open": 1, "High": 2, "Low": 0.5, "Close": 1.5},
                {"Datetime": null, "Open": 1, "High": 2, "Low": 0.5, "Close": 9.0},
                {"Open": 1, "High": 2, "Low": 0.5, "Close": 9.0},
                null,
                {"Datetime": "2024-01-02 09:35:00-05:00", "Open": 1.5, "High": 2.5, "Low": 1, "Close": 2.0}
            ]"#,
        )
        .unwrap();
        let candles = candles_from_rows(rows);

        assert_eq!(candles.len(), 2);
        assert_eq!(candles[1].time - candles[0].time, 300);
        assert_eq!(spot_price(&candles), Some(2.0));
    }

    #[test]
    fn test_verdict_unknown_bias_is_neutral() {
        let v: AiVerdict = serde_json::from_str(r#"{"bias": "MAYBE", "confidence": 140.2}"#).unwrap();
        assert_eq!(v.bias, Bias::Neutral);
        assert_eq!(v.confidence, 100);

        let v: AiVerdict = serde_json::from_str(r#"{"bias": "PUTS", "confidence": 62}"#).unwrap();
        assert_eq!(v.bias, Bias::Puts);
        assert_eq!(v.confidence, 62);
    }
}
