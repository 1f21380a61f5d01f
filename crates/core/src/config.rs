use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{TrackerError, TrackerResult};
use crate::mode::TrackingMode;

/// Tracker state as pushed by the server-side component. The connector only
/// ever reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerConfiguration {
    #[serde(default)]
    pub tracker_id: String,
    #[serde(default)]
    pub domain_name: Option<String>,
    #[serde(default = "default_allow_anchor")]
    pub allow_anchor: bool,
    #[serde(default)]
    pub allow_linker: bool,
    #[serde(default)]
    pub tracking_mode: Option<TrackingMode>,
    #[serde(default = "default_universal_tracking")]
    pub universal_tracking: bool,
    #[serde(default)]
    pub page_view_prefix: String,
    #[serde(default)]
    pub ignored_pages: Vec<String>,
    #[serde(default)]
    pub create_fields: Map<String, Value>,
    /// Values set once at start-up; layered over `create_fields` in the
    /// gtag.js `config` directive.
    #[serde(default)]
    pub initial_values: Map<String, Value>,
}

fn default_allow_anchor() -> bool {
    true
}
fn default_universal_tracking() -> bool {
    true
}

impl TrackerConfiguration {
    pub fn new(tracker_id: impl Into<String>) -> Self {
        Self {
            tracker_id: tracker_id.into(),
            domain_name: None,
            allow_anchor: default_allow_anchor(),
            allow_linker: false,
            tracking_mode: None,
            universal_tracking: default_universal_tracking(),
            page_view_prefix: String::new(),
            ignored_pages: Vec::new(),
            create_fields: Map::new(),
            initial_values: Map::new(),
        }
    }

    /// Reject configuration that would hand the vendor an empty identity.
    /// Every other field is optional.
    pub fn validate(&self) -> TrackerResult<()> {
        if self.tracker_id.trim().is_empty() {
            return Err(TrackerError::MissingTrackerId);
        }
        Ok(())
    }

    /// Domain override, treating an empty string as unset.
    pub fn domain(&self) -> Option<&str> {
        self.domain_name.as_deref().filter(|d| !d.is_empty())
    }

    /// Parse state delivered by the transport as JSON.
    pub fn from_json(json: &str) -> TrackerResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// ─── Host-side settings ─────────────────────────────────────────────────

/// Whether tracked page views and events are actually handed to the vendor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SendMode {
    #[default]
    Always,
    Production,
    Never,
}

impl SendMode {
    pub fn should_send(self, production_mode: bool) -> bool {
        match self {
            SendMode::Always => true,
            SendMode::Production => production_mode,
            SendMode::Never => false,
        }
    }
}

/// Vendor-side debug verbosity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    None,
    Debug,
    Trace,
}

impl LogLevel {
    /// Debug parameters merged into the gtag.js `config` directive.
    pub fn debug_fields(self) -> Map<String, Value> {
        let mut fields = Map::new();
        match self {
            LogLevel::None => {}
            LogLevel::Debug => {
                fields.insert("debug_mode".into(), Value::Bool(true));
            }
            LogLevel::Trace => {
                fields.insert("debug_mode".into(), Value::Bool(true));
                fields.insert("trace".into(), Value::Bool(true));
            }
        }
        fields
    }
}

/// Connector settings owned by the hosting page rather than the server
/// state. Loaded from environment variables with the prefix `GATRACK__`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectorSettings {
    #[serde(default)]
    pub production_mode: bool,
    #[serde(default)]
    pub send_mode: SendMode,
    #[serde(default = "default_production_log_level")]
    pub production_log_level: LogLevel,
    #[serde(default = "default_dev_log_level")]
    pub dev_log_level: LogLevel,
    #[serde(default = "default_gtag_script_url")]
    pub gtag_script_url: String,
}

fn default_production_log_level() -> LogLevel {
    LogLevel::None
}
fn default_dev_log_level() -> LogLevel {
    LogLevel::Debug
}
fn default_gtag_script_url() -> String {
    "https://www.googletagmanager.com/gtag/js".to_string()
}

impl Default for ConnectorSettings {
    fn default() -> Self {
        Self {
            production_mode: false,
            send_mode: SendMode::default(),
            production_log_level: default_production_log_level(),
            dev_log_level: default_dev_log_level(),
            gtag_script_url: default_gtag_script_url(),
        }
    }
}

impl ConnectorSettings {
    /// Load settings from environment variables.
    pub fn load() -> TrackerResult<Self> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("GATRACK")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn log_level(&self) -> LogLevel {
        if self.production_mode {
            self.production_log_level
        } else {
            self.dev_log_level
        }
    }

    pub fn sending_enabled(&self) -> bool {
        self.send_mode.should_send(self.production_mode)
    }
}
