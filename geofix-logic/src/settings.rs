use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Thresholds for the fix acceptance policy
pub struct ArbiterSettings {
    /// Time span within which two fixes are contemporaneous enough that
    /// accuracy, not recency alone, decides acceptance
    pub staleness_seconds: u32,
    /// How much worse (in meters) a newer fix from the same provider may be
    /// and still replace the current best, tolerating that provider's own
    /// accuracy jitter
    pub jitter_tolerance_meters: f64,
}

impl ArbiterSettings {
    pub fn staleness_window(&self) -> TimeDelta {
        TimeDelta::seconds(self.staleness_seconds as i64)
    }
}

impl Default for ArbiterSettings {
    fn default() -> Self {
        Self {
            staleness_seconds: 120,
            jitter_tolerance_meters: 200.0,
        }
    }
}
