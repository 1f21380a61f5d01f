//! Browser-side tracking connector — bridges server-pushed tracker state to
//! the Google Analytics tag generations (ga.js, analytics.js, gtag.js).
//!
//! # Modules
//!
//! - [`connector`] — Entry points for configuration changes and track requests
//! - [`loader`] — One-shot script injection behind a sticky loaded flag
//! - [`initializer`] — Per-change identity handshake
//! - [`dispatcher`] — Page view and event call shaping onto the vendor queue
//! - [`backends`] — Per-mode strategies (legacy, universal, gtag)
//! - [`ports`] — Document, vendor global and configuration ports

pub mod backends;
pub mod connector;
pub mod dispatcher;
pub mod initializer;
pub mod loader;
pub mod ports;

pub use backends::{backend_for, Backend, BackendContext};
pub use connector::{Connector, TrackRequest};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use loader::{LoadOutcome, LoadState, Loader};
pub use ports::{
    CaptureDocument, CaptureQueues, CommandQueues, ConfigurationSource, Document,
    SharedConfiguration,
};
