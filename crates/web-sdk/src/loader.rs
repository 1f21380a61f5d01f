//! One-shot script injection.
//!
//! The loader requests insertion of the active backend's script the first
//! time it is asked and never again for the lifetime of the connector, even
//! if the tracking mode changes later on.

use tracing::{info, warn};

use gatrack_core::{TrackerConfiguration, TrackerResult};

use crate::backends::{Backend, BackendContext};
use crate::ports::{CommandQueues, Document};

/// Sticky "script requested" flag. Starts unloaded and transitions to loaded
/// exactly once; there is no way back.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadState {
    loaded: bool,
}

impl LoadState {
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Returns `true` only for the call that performs the transition.
    fn mark_loaded(&mut self) -> bool {
        !std::mem::replace(&mut self.loaded, true)
    }
}

/// What a call to [`Loader::ensure_loaded`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Script insertion was requested for this URL.
    Injected(String),
    /// A script was already requested earlier; nothing happened.
    AlreadyLoaded,
}

#[derive(Debug, Default)]
pub struct Loader {
    state: LoadState,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    /// Inject the backend's script unless any script was injected before.
    ///
    /// A failed insertion request still counts as loaded: script loading is
    /// fire-and-forget and is never retried.
    pub fn ensure_loaded(
        &mut self,
        backend: &dyn Backend,
        config: &TrackerConfiguration,
        ctx: &BackendContext,
        document: &dyn Document,
        queues: &dyn CommandQueues,
    ) -> TrackerResult<LoadOutcome> {
        if self.state.is_loaded() {
            return Ok(LoadOutcome::AlreadyLoaded);
        }

        let url = backend.script_url(config, ctx)?;
        backend.bootstrap(queues);
        self.state.mark_loaded();

        match document.insert_script(&url) {
            Ok(()) => {
                metrics::counter!("tracker.script.injected").increment(1);
                info!(mode = %backend.mode(), url = %url, "tracking script injected");
            }
            Err(e) => {
                warn!(mode = %backend.mode(), url = %url, error = %e, "tracking script injection failed");
            }
        }

        Ok(LoadOutcome::Injected(url))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backends::backend_for;
    use crate::ports::{capture_document, capture_queues, CaptureDocument};
    use gatrack_core::command::QueueKind;
    use gatrack_core::TrackingMode;

    #[test]
    fn test_mark_loaded_once() {
        let mut state = LoadState::default();
        assert!(!state.is_loaded());
        assert!(state.mark_loaded());
        assert!(!state.mark_loaded());
        assert!(state.is_loaded());
    }

    #[test]
    fn test_injects_once() {
        let doc = capture_document(true);
        let queues = capture_queues();
        let ctx = BackendContext::default();
        let config = TrackerConfiguration::new("UA-1");
        let backend = backend_for(TrackingMode::Legacy);
        let mut loader = Loader::new();

        let first = loader
            .ensure_loaded(backend, &config, &ctx, &*doc, &*queues)
            .unwrap();
        assert_eq!(
            first,
            LoadOutcome::Injected("https://ssl.google-analytics.com/ga.js".into())
        );
        assert!(queues.exists(QueueKind::Gaq));

        for _ in 0..3 {
            let again = loader
                .ensure_loaded(backend, &config, &ctx, &*doc, &*queues)
                .unwrap();
            assert_eq!(again, LoadOutcome::AlreadyLoaded);
        }
        assert_eq!(doc.count(), 1);
    }

    #[test]
    fn test_mode_switch_does_not_reload() {
        let doc = capture_document(true);
        let queues = capture_queues();
        let ctx = BackendContext::default();
        let config = TrackerConfiguration::new("UA-1");
        let mut loader = Loader::new();

        loader
            .ensure_loaded(
                backend_for(TrackingMode::Legacy),
                &config,
                &ctx,
                &*doc,
                &*queues,
            )
            .unwrap();
        let outcome = loader
            .ensure_loaded(
                backend_for(TrackingMode::Universal),
                &config,
                &ctx,
                &*doc,
                &*queues,
            )
            .unwrap();

        assert_eq!(outcome, LoadOutcome::AlreadyLoaded);
        assert_eq!(doc.count(), 1);
        assert!(!queues.exists(QueueKind::Ga));
    }

    #[test]
    fn test_failed_insertion_stays_loaded() {
        let doc = CaptureDocument::rejecting(true);
        let queues = capture_queues();
        let mut loader = Loader::new();

        let outcome = loader
            .ensure_loaded(
                backend_for(TrackingMode::NextGen),
                &TrackerConfiguration::new("G-1"),
                &BackendContext::default(),
                &doc,
                &*queues,
            )
            .unwrap();
        assert!(matches!(outcome, LoadOutcome::Injected(_)));
        assert!(loader.state().is_loaded());
        assert_eq!(doc.count(), 0);
    }

    #[test]
    fn test_bad_url_leaves_unloaded() {
        let doc = capture_document(true);
        let queues = capture_queues();
        let ctx = BackendContext {
            gtag_script_url: "::".into(),
            ..Default::default()
        };
        let mut loader = Loader::new();

        let result = loader.ensure_loaded(
            backend_for(TrackingMode::NextGen),
            &TrackerConfiguration::new("G-1"),
            &ctx,
            &*doc,
            &*queues,
        );
        assert!(result.is_err());
        assert!(!loader.state().is_loaded());
    }
}
