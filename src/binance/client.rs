// =============================================================================
// Binance Futures REST API Client — public market-data endpoints
// =============================================================================
//
// Three read-only endpoints are consumed, none of them signed:
//
//   GET /fapi/v1/exchangeInfo            — symbol universe (rare, critical)
//   GET /futures/data/openInterestHist   — latest 5m-bucketed open interest
//   GET /fapi/v1/klines                  — last two 1h candles (quote volume)
//
// The universe fetch retries with a fixed delay because the whole scanner is
// useless without it.  Per-symbol fetches run hundreds of times per cycle, so
// they are single-attempt and fail-soft: any failure becomes `None` and must
// never abort the cycle for the other symbols.
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::{debug, info, warn};

/// Binance USDT-M futures REST client for public market data.
#[derive(Clone)]
pub struct FuturesClient {
    client: reqwest::Client,
    base_url: String,
    universe_timeout: Duration,
    universe_retry_attempts: u32,
    universe_retry_delay: Duration,
}

impl FuturesClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Create a new client.
    ///
    /// `fetch_timeout` is the client-wide timeout applied to per-symbol
    /// sampling requests; the universe fetch overrides it per request with
    /// the (longer) `universe_timeout`.
    pub fn new(
        base_url: impl Into<String>,
        fetch_timeout: Duration,
        universe_timeout: Duration,
        universe_retry_attempts: u32,
        universe_retry_delay: Duration,
    ) -> Self {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static("Mozilla/5.0"));

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(fetch_timeout)
            .build()
            .expect("failed to build reqwest client");

        Self {
            client,
            base_url: base_url.into(),
            universe_timeout,
            universe_retry_attempts,
            universe_retry_delay,
        }
    }

    // -------------------------------------------------------------------------
    // Symbol universe
    // -------------------------------------------------------------------------

    /// Fetch all USDT-margined perpetual contract symbols.
    ///
    /// Retries up to the configured attempt bound with a fixed inter-attempt
    /// delay.  Returns an empty vec only after exhausting every attempt —
    /// "unavailable now", not fatal; the caller retries at a coarser cadence.
    pub async fn fetch_perpetual_symbols(&self) -> Vec<String> {
        for attempt in 1..=self.universe_retry_attempts {
            debug!(attempt, "fetching symbol universe");
            match self.try_fetch_universe().await {
                Ok(symbols) => {
                    info!(count = symbols.len(), "symbol universe fetched");
                    return symbols;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "symbol universe fetch failed");
                }
            }
            tokio::time::sleep(self.universe_retry_delay).await;
        }
        warn!(
            attempts = self.universe_retry_attempts,
            "symbol universe fetch exhausted all attempts"
        );
        Vec::new()
    }

    async fn try_fetch_universe(&self) -> Result<Vec<String>> {
        let url = format!("{}/fapi/v1/exchangeInfo", self.base_url);

        let resp = self
            .client
            .get(&url)
            .timeout(self.universe_timeout)
            .send()
            .await
            .context("GET /fapi/v1/exchangeInfo request failed")?;

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse exchangeInfo response")?;

        if !status.is_success() {
            anyhow::bail!("exchangeInfo returned {}: {}", status, body);
        }

        parse_exchange_info(&body)
    }

    // -------------------------------------------------------------------------
    // Per-symbol sampling (single attempt, fail-soft)
    // -------------------------------------------------------------------------

    /// Latest 5-minute-bucketed open interest for `symbol`, or `None` on any
    /// failure (timeout, non-200, malformed payload).
    pub async fn fetch_open_interest(&self, symbol: &str) -> Option<f64> {
        match self.try_fetch_open_interest(symbol).await {
            Ok(oi) => Some(oi),
            Err(e) => {
                debug!(symbol, error = %e, "open interest fetch failed");
                None
            }
        }
    }

    async fn try_fetch_open_interest(&self, symbol: &str) -> Result<f64> {
        let url = format!(
            "{}/futures/data/openInterestHist?symbol={}&period=5m&limit=1",
            self.base_url, symbol
        );

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET open interest for {symbol}"))?;

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse open interest response")?;

        if !status.is_success() {
            anyhow::bail!("openInterestHist returned {}: {}", status, body);
        }

        parse_open_interest(&body)
    }

    /// (current, previous) quote volume from the two most recent 1-hour
    /// klines for `symbol`, or `None` on any failure.
    pub async fn fetch_volume_pair(&self, symbol: &str) -> Option<(f64, f64)> {
        match self.try_fetch_volume_pair(symbol).await {
            Ok(pair) => Some(pair),
            Err(e) => {
                debug!(symbol, error = %e, "volume fetch failed");
                None
            }
        }
    }

    async fn try_fetch_volume_pair(&self, symbol: &str) -> Result<(f64, f64)> {
        let url = format!(
            "{}/fapi/v1/klines?symbol={}&interval=1h&limit=2",
            self.base_url, symbol
        );

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET klines for {symbol}"))?;

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse klines response")?;

        if !status.is_success() {
            anyhow::bail!("klines returned {}: {}", status, body);
        }

        parse_kline_volumes(&body)
    }
}

impl std::fmt::Debug for FuturesClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FuturesClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

// =============================================================================
// Parsing — separated from I/O so the shapes are testable offline
// =============================================================================

/// Extract perpetual USDT-quoted symbols from an exchangeInfo body.
fn parse_exchange_info(body: &serde_json::Value) -> Result<Vec<String>> {
    let entries = body["symbols"]
        .as_array()
        .context("exchangeInfo response missing 'symbols' array")?;

    let symbols = entries
        .iter()
        .filter(|s| {
            s["contractType"].as_str() == Some("PERPETUAL")
                && s["quoteAsset"].as_str() == Some("USDT")
        })
        .filter_map(|s| s["symbol"].as_str().map(str::to_string))
        .collect();

    Ok(symbols)
}

/// Extract the latest `sumOpenInterest` from an openInterestHist body.
fn parse_open_interest(body: &serde_json::Value) -> Result<f64> {
    let arr = body
        .as_array()
        .context("openInterestHist response is not an array")?;
    let entry = arr
        .last()
        .context("openInterestHist response array is empty")?;

    parse_str_f64(&entry["sumOpenInterest"])
        .context("failed to parse sumOpenInterest")
}

/// Extract (current, previous) quote volume from a 2-kline body.
///
/// Kline array indices: [0] openTime .. [5] volume, [6] closeTime,
/// [7] quoteAssetVolume, ...
fn parse_kline_volumes(body: &serde_json::Value) -> Result<(f64, f64)> {
    let rows = body.as_array().context("klines response is not an array")?;
    if rows.len() < 2 {
        anyhow::bail!("klines response has {} rows, need 2", rows.len());
    }

    let quote_volume = |row: &serde_json::Value| -> Result<f64> {
        let arr = row.as_array().context("kline entry is not an array")?;
        let field = arr.get(7).context("kline entry has no quote-volume field")?;
        parse_str_f64(field)
    };

    let previous = quote_volume(&rows[rows.len() - 2])?;
    let current = quote_volume(&rows[rows.len() - 1])?;
    Ok((current, previous))
}

/// Parse a JSON value that may be either a string or a number into `f64`.
fn parse_str_f64(val: &serde_json::Value) -> Result<f64> {
    if let Some(s) = val.as_str() {
        s.parse::<f64>()
            .with_context(|| format!("failed to parse '{s}' as f64"))
    } else if let Some(n) = val.as_f64() {
        Ok(n)
    } else {
        anyhow::bail!("expected string or number, got: {val}")
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn exchange_info_keeps_only_usdt_perpetuals() {
        let body = json!({
            "timezone": "UTC",
            "symbols": [
                { "symbol": "BTCUSDT", "contractType": "PERPETUAL", "quoteAsset": "USDT" },
                { "symbol": "ETHUSDT", "contractType": "PERPETUAL", "quoteAsset": "USDT",
                  "someNewField": 42 },
                { "symbol": "BTCUSDT_240628", "contractType": "CURRENT_QUARTER", "quoteAsset": "USDT" },
                { "symbol": "BTCUSD_PERP", "contractType": "PERPETUAL", "quoteAsset": "USD" }
            ]
        });
        let symbols = parse_exchange_info(&body).unwrap();
        assert_eq!(symbols, vec!["BTCUSDT", "ETHUSDT"]);
    }

    #[test]
    fn exchange_info_missing_symbols_is_error() {
        let body = json!({ "timezone": "UTC" });
        assert!(parse_exchange_info(&body).is_err());
    }

    #[test]
    fn open_interest_takes_latest_entry() {
        let body = json!([
            { "symbol": "BTCUSDT", "sumOpenInterest": "10000.5", "timestamp": 1 },
            { "symbol": "BTCUSDT", "sumOpenInterest": "10250.75", "timestamp": 2 }
        ]);
        let oi = parse_open_interest(&body).unwrap();
        assert!((oi - 10250.75).abs() < f64::EPSILON);
    }

    #[test]
    fn open_interest_rejects_empty_or_malformed() {
        assert!(parse_open_interest(&json!([])).is_err());
        assert!(parse_open_interest(&json!({ "code": -1121 })).is_err());
        assert!(parse_open_interest(&json!([{ "sumOpenInterest": "abc" }])).is_err());
    }

    #[test]
    fn kline_volumes_returns_current_then_previous() {
        // Two rows, quote volume at index 7, extra trailing fields tolerated.
        let body = json!([
            [1, "1", "2", "0.5", "1.5", "100", 2, "5000.0", 10, "50", "2500", "0"],
            [2, "1", "2", "0.5", "1.5", "120", 3, "6000.0", 12, "60", "3000", "0"]
        ]);
        let (current, previous) = parse_kline_volumes(&body).unwrap();
        assert!((current - 6000.0).abs() < f64::EPSILON);
        assert!((previous - 5000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn kline_volumes_requires_two_rows() {
        let body = json!([
            [1, "1", "2", "0.5", "1.5", "100", 2, "5000.0", 10, "50", "2500", "0"]
        ]);
        assert!(parse_kline_volumes(&body).is_err());
    }

    #[test]
    fn kline_volumes_rejects_short_rows() {
        let body = json!([[1, "1"], [2, "2"]]);
        assert!(parse_kline_volumes(&body).is_err());
    }

    #[test]
    fn parse_str_f64_accepts_string_and_number() {
        assert_eq!(parse_str_f64(&json!("12.5")).unwrap(), 12.5);
        assert_eq!(parse_str_f64(&json!(7)).unwrap(), 7.0);
        assert!(parse_str_f64(&json!(null)).is_err());
        assert!(parse_str_f64(&json!("not-a-number")).is_err());
    }
}
