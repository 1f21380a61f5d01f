//! Wire representation of the calls made into the vendor's global command
//! queues. Every call is a loosely-typed JSON argument list, exactly as the
//! vendor script would receive it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The vendor-owned global objects a backend speaks to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QueueKind {
    /// `window._gaq`, the ga.js command array.
    Gaq,
    /// `window.ga`, the analytics.js command function.
    Ga,
    /// `window.dataLayer`, the gtag.js event-data array.
    DataLayer,
}

impl QueueKind {
    /// Name of the global as it appears on `window`.
    pub fn global_name(self) -> &'static str {
        match self {
            QueueKind::Gaq => "_gaq",
            QueueKind::Ga => "ga",
            QueueKind::DataLayer => "dataLayer",
        }
    }
}

/// One call into a vendor queue: `_gaq.push(args)`, `ga(...args)` or
/// `dataLayer.push(arguments)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub queue: QueueKind,
    pub args: Vec<Value>,
}

impl Command {
    pub fn new(queue: QueueKind, args: Vec<Value>) -> Self {
        Self { queue, args }
    }

    /// The first argument, i.e. the command or directive name.
    pub fn name(&self) -> Option<&str> {
        self.args.first().and_then(Value::as_str)
    }
}
