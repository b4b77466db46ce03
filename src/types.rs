// =============================================================================
// Shared types used across the OI scanner
// =============================================================================

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Named lookback window for open-interest change computation.
///
/// Open-interest history is kept separately per window so that each ranking
/// only ever considers samples inside its own lookback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Window {
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "24h")]
    H24,
}

impl Window {
    /// All windows, in ascending lookback order.
    pub const ALL: [Window; 3] = [Window::H1, Window::H4, Window::H24];

    /// Lookback duration this window scopes change computation to.
    pub fn lookback(&self) -> Duration {
        match self {
            Self::H1 => Duration::hours(1),
            Self::H4 => Duration::hours(4),
            Self::H24 => Duration::hours(24),
        }
    }
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::H1 => write!(f, "1h"),
            Self::H4 => write!(f, "4h"),
            Self::H24 => write!(f, "24h"),
        }
    }
}

impl std::str::FromStr for Window {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1h" => Ok(Self::H1),
            "4h" => Ok(Self::H4),
            "24h" => Ok(Self::H24),
            other => anyhow::bail!("unknown window '{other}' (expected 1h, 4h or 24h)"),
        }
    }
}

/// A single (timestamp, value) observation of one metric for one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub ts: DateTime<Utc>,
    pub value: f64,
}

impl Sample {
    pub fn new(ts: DateTime<Utc>, value: f64) -> Self {
        Self { ts, value }
    }
}

/// One entry in a per-window open-interest movers ranking.
///
/// `previous_oi` is the oldest sample still inside the window's lookback,
/// not the second-most-recent raw sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OiMover {
    pub symbol: String,
    pub oi_change_pct: f64,
    pub current_oi: f64,
    pub previous_oi: f64,
}

/// One entry in the "OI and volume both rising" ranking.
///
/// Both changes come from the two most recent raw samples of each metric and
/// are strictly positive by construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinedMover {
    pub symbol: String,
    pub volume_change_pct: f64,
    pub oi_change_pct: f64,
    pub current_volume: f64,
    pub previous_volume: f64,
    pub current_oi: f64,
    pub previous_oi: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn window_roundtrip_display_fromstr() {
        for w in Window::ALL {
            let parsed = Window::from_str(&w.to_string()).unwrap();
            assert_eq!(parsed, w);
        }
    }

    #[test]
    fn window_rejects_unknown() {
        assert!(Window::from_str("2h").is_err());
        assert!(Window::from_str("").is_err());
        assert!(Window::from_str("1H").is_err());
    }

    #[test]
    fn window_lookbacks() {
        assert_eq!(Window::H1.lookback(), Duration::hours(1));
        assert_eq!(Window::H4.lookback(), Duration::hours(4));
        assert_eq!(Window::H24.lookback(), Duration::hours(24));
    }

    #[test]
    fn window_serde_uses_lowercase_names() {
        assert_eq!(serde_json::to_string(&Window::H24).unwrap(), "\"24h\"");
        let w: Window = serde_json::from_str("\"4h\"").unwrap();
        assert_eq!(w, Window::H4);
    }
}
