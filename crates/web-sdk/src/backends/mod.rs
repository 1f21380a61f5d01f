//! Backend strategies, one per tracking mode.
//!
//! Each backend implements [`Backend`]: it knows its script URL, how to
//! bootstrap its command queue before the script arrives, the
//! initialization handshake, and the exact call shapes for page views and
//! events. [`backend_for`] selects one per operation so no call site
//! branches on the mode itself.

pub mod gtag;
pub mod legacy;
pub mod universal;

use serde_json::{Map, Value};

use gatrack_core::command::{Command, QueueKind};
use gatrack_core::{TrackerConfiguration, TrackerResult, TrackingMode};

use crate::ports::CommandQueues;

pub use gtag::GtagBackend;
pub use legacy::LegacyBackend;
pub use universal::UniversalBackend;

/// Page-level inputs that shape backend calls but are not part of the
/// server-pushed state.
#[derive(Debug, Clone)]
pub struct BackendContext {
    /// Whether the hosting page is served over https.
    pub secure: bool,
    /// Base URL of the gtag.js loader, without the `id` query.
    pub gtag_script_url: String,
    /// Vendor debug parameters for the gtag.js `config` directive.
    pub debug_fields: Map<String, Value>,
}

impl Default for BackendContext {
    fn default() -> Self {
        Self {
            secure: true,
            gtag_script_url: "https://www.googletagmanager.com/gtag/js".into(),
            debug_fields: Map::new(),
        }
    }
}

/// Backend strategy trait.
pub trait Backend: Send + Sync {
    fn mode(&self) -> TrackingMode;

    /// The global this backend's calls go to.
    fn queue(&self) -> QueueKind;

    /// The script resource to inject for this backend.
    fn script_url(&self, config: &TrackerConfiguration, ctx: &BackendContext)
        -> TrackerResult<String>;

    /// Queue setup done together with script injection, so calls issued
    /// before the script arrives are buffered by the queue itself.
    fn bootstrap(&self, _queues: &dyn CommandQueues) {}

    /// The identity / configuration handshake, re-sent in full on every
    /// configuration change.
    fn init_commands(
        &self,
        config: &TrackerConfiguration,
        ctx: &BackendContext,
    ) -> Vec<Command>;

    /// Run the handshake against the vendor globals. Stops at the first
    /// failed push.
    fn initialize(
        &self,
        config: &TrackerConfiguration,
        ctx: &BackendContext,
        queues: &dyn CommandQueues,
    ) -> TrackerResult<usize> {
        let commands = self.init_commands(config, ctx);
        let count = commands.len();
        for command in commands {
            queues.push(command)?;
        }
        Ok(count)
    }

    /// Page view call. `None` reports the current page implicitly.
    fn page_view(&self, page_id: Option<&str>) -> Command;

    /// Custom event call, or `None` when the backend has no such concept.
    fn event(
        &self,
        _category: &str,
        _action: &str,
        _label: &str,
        _value: Option<i64>,
    ) -> Option<Command> {
        None
    }
}

static LEGACY: LegacyBackend = LegacyBackend;
static UNIVERSAL: UniversalBackend = UniversalBackend;
static GTAG: GtagBackend = GtagBackend;

/// The strategy table: one backend per mode.
pub fn backend_for(mode: TrackingMode) -> &'static dyn Backend {
    match mode {
        TrackingMode::Legacy => &LEGACY,
        TrackingMode::Universal => &UNIVERSAL,
        TrackingMode::NextGen => &GTAG,
    }
}
