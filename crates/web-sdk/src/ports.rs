//! Boundary ports — the pieces of the hosting page the connector talks
//! through: the server-pushed state, the document, and the vendor's global
//! command queues.
//!
//! Each port has an in-memory implementation used by tests and by the
//! replay harness.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use gatrack_core::command::{Command, QueueKind};
use gatrack_core::{TrackerConfiguration, TrackerError, TrackerResult};

/// Read access to the configuration state owned by the server-side component.
pub trait ConfigurationSource: Send + Sync {
    fn current(&self) -> TrackerConfiguration;
}

/// Document mutation used by the loader.
pub trait Document: Send + Sync {
    /// Whether the page was served over https.
    fn is_secure(&self) -> bool;

    /// Request async insertion of a script element ahead of the existing
    /// scripts. Returns once the request is made, not when the script loads.
    fn insert_script(&self, url: &str) -> TrackerResult<()>;
}

/// The vendor's global command objects (`window._gaq`, `window.ga`,
/// `window.dataLayer`).
pub trait CommandQueues: Send + Sync {
    fn exists(&self, queue: QueueKind) -> bool;

    /// `window.<queue> = window.<queue> || ...`. Returns `true` if the queue
    /// had to be created.
    fn ensure(&self, queue: QueueKind) -> bool;

    /// Append a call. Fails with [`TrackerError::BackendUnavailable`] when
    /// the target global is not defined.
    fn push(&self, command: Command) -> TrackerResult<()>;
}

// ─── In-memory implementations ──────────────────────────────────────────

/// Configuration holder the host updates before signalling a change.
#[derive(Debug)]
pub struct SharedConfiguration {
    state: Mutex<TrackerConfiguration>,
}

impl SharedConfiguration {
    pub fn new(initial: TrackerConfiguration) -> Self {
        Self {
            state: Mutex::new(initial),
        }
    }

    pub fn set(&self, config: TrackerConfiguration) {
        *self.state.lock().expect("configuration mutex poisoned") = config;
    }

    /// Apply an in-place edit to the current state.
    pub fn update(&self, edit: impl FnOnce(&mut TrackerConfiguration)) {
        edit(&mut self.state.lock().expect("configuration mutex poisoned"));
    }
}

impl ConfigurationSource for SharedConfiguration {
    fn current(&self) -> TrackerConfiguration {
        self.state.lock().expect("configuration mutex poisoned").clone()
    }
}

/// Document that records every script insertion request.
#[derive(Debug, Default)]
pub struct CaptureDocument {
    secure: bool,
    reject: bool,
    scripts: Mutex<Vec<String>>,
}

impl CaptureDocument {
    pub fn new(secure: bool) -> Self {
        Self {
            secure,
            ..Default::default()
        }
    }

    /// A document whose script insertion always fails, e.g. blocked by CSP.
    pub fn rejecting(secure: bool) -> Self {
        Self {
            secure,
            reject: true,
            ..Default::default()
        }
    }

    pub fn scripts(&self) -> Vec<String> {
        self.scripts.lock().expect("document mutex poisoned").clone()
    }

    pub fn count(&self) -> usize {
        self.scripts.lock().expect("document mutex poisoned").len()
    }

    /// Drain the recorded insertions.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.scripts.lock().expect("document mutex poisoned"))
    }
}

impl Document for CaptureDocument {
    fn is_secure(&self) -> bool {
        self.secure
    }

    fn insert_script(&self, url: &str) -> TrackerResult<()> {
        if self.reject {
            return Err(TrackerError::Document(format!(
                "script insertion refused for {url}"
            )));
        }
        self.scripts
            .lock()
            .expect("document mutex poisoned")
            .push(url.to_string());
        Ok(())
    }
}

#[derive(Debug, Default)]
struct QueueState {
    defined: HashSet<QueueKind>,
    log: Vec<Command>,
}

/// Vendor globals that record every pushed command in order.
#[derive(Debug, Default)]
pub struct CaptureQueues {
    state: Mutex<QueueState>,
}

impl CaptureQueues {
    pub fn new() -> Self {
        Self::default()
    }

    /// All commands across all queues, in push order.
    pub fn commands(&self) -> Vec<Command> {
        self.state.lock().expect("queue mutex poisoned").log.clone()
    }

    /// Argument lists pushed to a single queue, in push order.
    pub fn args(&self, queue: QueueKind) -> Vec<Vec<serde_json::Value>> {
        self.state
            .lock()
            .expect("queue mutex poisoned")
            .log
            .iter()
            .filter(|c| c.queue == queue)
            .map(|c| c.args.clone())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.state.lock().expect("queue mutex poisoned").log.len()
    }

    pub fn count_named(&self, name: &str) -> usize {
        self.state
            .lock()
            .expect("queue mutex poisoned")
            .log
            .iter()
            .filter(|c| c.name() == Some(name))
            .count()
    }

    /// Drain the recorded commands; defined globals stay defined.
    pub fn take(&self) -> Vec<Command> {
        std::mem::take(&mut self.state.lock().expect("queue mutex poisoned").log)
    }

    pub fn clear(&self) {
        self.state.lock().expect("queue mutex poisoned").log.clear();
    }
}

impl CommandQueues for CaptureQueues {
    fn exists(&self, queue: QueueKind) -> bool {
        self.state
            .lock()
            .expect("queue mutex poisoned")
            .defined
            .contains(&queue)
    }

    fn ensure(&self, queue: QueueKind) -> bool {
        self.state
            .lock()
            .expect("queue mutex poisoned")
            .defined
            .insert(queue)
    }

    fn push(&self, command: Command) -> TrackerResult<()> {
        let mut state = self.state.lock().expect("queue mutex poisoned");
        if !state.defined.contains(&command.queue) {
            return Err(TrackerError::BackendUnavailable(command.queue));
        }
        state.log.push(command);
        Ok(())
    }
}

/// Convenience: a configuration holder shared between host and connector.
pub fn shared_configuration(initial: TrackerConfiguration) -> Arc<SharedConfiguration> {
    Arc::new(SharedConfiguration::new(initial))
}

/// Convenience: a capturing document for tests.
pub fn capture_document(secure: bool) -> Arc<CaptureDocument> {
    Arc::new(CaptureDocument::new(secure))
}

/// Convenience: capturing vendor globals for tests.
pub fn capture_queues() -> Arc<CaptureQueues> {
    Arc::new(CaptureQueues::new())
}
