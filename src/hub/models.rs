use std::collections::HashMap;

use serde::Deserialize;

// ---------------------------------------------------------------------------
// Device: GET /api/manager/devices/device/{device_id}
// ---------------------------------------------------------------------------

/// A device as returned by the hub, reduced to the fields the dashboard reads.
#[derive(Debug, Clone, Deserialize)]
pub struct Device {
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Current value of every capability, keyed by capability ID
    /// (e.g. `"measure_temperature"`).
    #[serde(rename = "capabilitiesObj", default)]
    pub capabilities: HashMap<String, CapabilityState>,
}

/// Snapshot of one capability.
///
/// `value` is `null` until the device has reported at least once.
#[derive(Debug, Clone, Deserialize)]
pub struct CapabilityState {
    pub value: Option<f64>,

    #[serde(default)]
    pub units: Option<String>,
}

// ---------------------------------------------------------------------------
// Insight log entries:
// GET /api/manager/insights/log/{uri}/{log_id}/entries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct LogEntries {
    /// Oldest first.
    #[serde(default)]
    pub values: Vec<LogEntry>,

    #[serde(default)]
    pub units: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogEntry {
    /// `null` for gaps in the series.
    pub v: Option<f64>,
}

impl LogEntries {
    /// The most recent non-null sample.
    pub fn latest(&self) -> Option<&LogEntry> {
        self.values.iter().rev().find(|e| e.v.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_parses_capabilities_obj() {
        let json = r#"{
            "id": "fad84db7",
            "name": "Netatmo Indoor",
            "class": "sensor",
            "capabilitiesObj": {
                "measure_temperature": { "value": 21.34, "units": "°C", "lastUpdated": "2026-10-19T06:00:00.000Z" },
                "measure_co2": { "value": null, "units": "ppm" }
            }
        }"#;
        let d: Device = serde_json::from_str(json).unwrap();
        assert_eq!(d.name, "Netatmo Indoor");
        assert_eq!(d.capabilities["measure_temperature"].value, Some(21.34));
        assert_eq!(d.capabilities["measure_temperature"].units.as_deref(), Some("°C"));
        assert_eq!(d.capabilities["measure_co2"].value, None);
    }

    #[test]
    fn latest_skips_trailing_gaps() {
        let json = r#"{
            "values": [
                { "t": "2026-10-19T05:00:00.000Z", "v": 18.0 },
                { "t": "2026-10-19T05:05:00.000Z", "v": 18.5 },
                { "t": "2026-10-19T05:10:00.000Z", "v": null }
            ]
        }"#;
        let entries: LogEntries = serde_json::from_str(json).unwrap();
        assert_eq!(entries.latest().unwrap().v, Some(18.5));
    }

    #[test]
    fn latest_of_empty_log_is_none() {
        let entries: LogEntries = serde_json::from_str("{}").unwrap();
        assert!(entries.latest().is_none());
    }
}
