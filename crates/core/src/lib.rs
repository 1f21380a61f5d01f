pub mod command;
pub mod config;
pub mod error;
pub mod mode;

pub use config::{ConnectorSettings, TrackerConfiguration};
pub use error::{TrackerError, TrackerResult};
pub use mode::TrackingMode;
