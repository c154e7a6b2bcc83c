//! Per-bar signal codes emitted by the offline pre-pass.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What the strategy wants to happen on a bar. Emitted once per bar by
/// [`Strategy::prepare`](super::Strategy::prepare); the engine
/// dispatches orders only on active signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    /// No action.
    Hold,
    /// Full switch to the active regime's allocation table. Emitted on
    /// bar 0 (bootstrap) and on every regime transition.
    Reallocate,
    /// Calendar rebalance interval elapsed.
    Periodic,
    /// Banding or daily policy: re-evaluate the ratio, trade only if
    /// drift exceeds the band threshold.
    BandCheck,
    /// Price closed outside a Bollinger band; rebalance to target.
    BandTouch,
}

impl Signal {
    /// Whether the engine should ask for orders on this bar.
    pub fn is_active(self) -> bool {
        self != Signal::Hold
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Signal::Hold => "HOLD",
            Signal::Reallocate => "REALLOCATE",
            Signal::Periodic => "PERIODIC",
            Signal::BandCheck => "BAND_CHECK",
            Signal::BandTouch => "BAND_TOUCH",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_hold_is_inactive() {
        assert!(!Signal::Hold.is_active());
        assert!(Signal::Reallocate.is_active());
        assert!(Signal::Periodic.is_active());
        assert!(Signal::BandCheck.is_active());
        assert!(Signal::BandTouch.is_active());
    }

    #[test]
    fn display_matches_wire_names() {
        assert_eq!(Signal::Reallocate.to_string(), "REALLOCATE");
        assert_eq!(Signal::BandCheck.to_string(), "BAND_CHECK");
    }
}
