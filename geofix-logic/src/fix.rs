use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Convenience alias for UTC DT
pub type UtcDT = DateTime<Utc>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// A single location reading as reported by one provider
pub struct LocationFix {
    /// Latitude
    pub latitude: f64,
    /// Longitude
    pub longitude: f64,
    /// When the fix was obtained, consistently sourced across providers
    pub timestamp: UtcDT,
    /// Estimated error radius in meters, lower is better
    pub accuracy: f64,
    /// The provider that produced this fix, if it reported one
    pub provider: Option<String>,
}

/// Checks whether two fixes came from the same provider. Present-vs-absent
/// is never equal.
pub fn same_provider(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_identity() {
        assert!(same_provider(None, None));
        assert!(same_provider(Some("gps"), Some("gps")));
        assert!(!same_provider(Some("gps"), Some("network")));
        assert!(!same_provider(Some("gps"), None));
        assert!(!same_provider(None, Some("network")));
    }
}
