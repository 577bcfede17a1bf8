//! Derived synchronization health.

use serde::{Deserialize, Serialize};

/// Follower-side indicator of how far local playback is from the Master.
///
/// Purely a UI signal; `Lagging` is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncHealth {
    #[default]
    Good,
    Lagging,
}

impl SyncHealth {
    /// Classify a drift in seconds. Drift equal to the threshold is still `Good`.
    pub fn from_drift(drift: f64, threshold: f64) -> Self {
        if drift > threshold {
            Self::Lagging
        } else {
            Self::Good
        }
    }

    pub const fn is_lagging(self) -> bool {
        matches!(self, Self::Lagging)
    }
}

impl std::fmt::Display for SyncHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Good => write!(f, "GOOD"),
            Self::Lagging => write!(f, "LAGGING"),
        }
    }
}

/// Absolute distance between two playback positions, in seconds.
pub fn drift_between(local: f64, remote: f64) -> f64 {
    (local - remote).abs()
}
