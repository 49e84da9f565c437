use chrono::Utc;
use serde::Serialize;

use super::Action;

/// Outcome of one control cycle, the unit pushed to observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub action: Action,
    pub reward: f64,
    pub indoor_temperature: f64,
    pub outdoor_temperature: Option<f64>,
    pub rain: bool,
    pub humidity: u32,
    pub energy_saved_percentage: f64,
    /// Seconds since the Unix epoch
    pub timestamp: f64,
}

impl Snapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Wall-clock time as fractional epoch seconds
pub fn epoch_seconds_now() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
