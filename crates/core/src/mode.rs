//! Tracking mode resolution.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::TrackerConfiguration;

/// Analytics backend generation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TrackingMode {
    /// ga.js with the `_gaq` command array.
    Legacy,
    /// analytics.js with the `ga` command function.
    Universal,
    /// gtag.js with the `dataLayer` event-data array.
    #[serde(alias = "nextGen")]
    NextGen,
}

impl TrackingMode {
    pub const ALL: [TrackingMode; 3] = [
        TrackingMode::Legacy,
        TrackingMode::Universal,
        TrackingMode::NextGen,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TrackingMode::Legacy => "legacy",
            TrackingMode::Universal => "universal",
            TrackingMode::NextGen => "next_gen",
        }
    }
}

impl fmt::Display for TrackingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derive the active mode from configuration. An explicit `tracking_mode`
/// wins; otherwise the `universal_tracking` flag picks gtag.js or ga.js.
pub fn resolve(config: &TrackerConfiguration) -> TrackingMode {
    match config.tracking_mode {
        Some(mode) => mode,
        None if config.universal_tracking => TrackingMode::NextGen,
        None => TrackingMode::Legacy,
    }
}
