//! Market regime labels.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Qualitative market state classified per bar by a
/// [`RegimeDetector`](super::RegimeDetector). Which labels appear
/// depends on the detector: the moving-average cross detectors emit
/// Above/Below, the dual-MA filter Strong/Weak/Below, the breakout
/// detector Strong/Weak, and the Bollinger-touch detector Neutral only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Regime {
    Above,
    Below,
    Strong,
    Weak,
    Neutral,
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Regime::Above => "ABOVE",
            Regime::Below => "BELOW",
            Regime::Strong => "STRONG",
            Regime::Weak => "WEAK",
            Regime::Neutral => "NEUTRAL",
        };
        f.write_str(s)
    }
}
