//! The tracker connector — entry points invoked by the transport layer.
//!
//! A configuration change runs resolve → load (once) → initialize. A track
//! request runs resolve → dispatch. Track requests that arrive before the
//! first successful initialization are held and replayed right after it.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use gatrack_core::mode::resolve;
use gatrack_core::{ConnectorSettings, TrackerResult, TrackingMode};

use crate::backends::{backend_for, BackendContext};
use crate::dispatcher::{DispatchOutcome, Dispatcher};
use crate::initializer::initialize;
use crate::loader::{LoadState, Loader};
use crate::ports::{CommandQueues, ConfigurationSource, Document};

/// Upper bound on requests held before the first initialization.
const MAX_PENDING: usize = 256;

/// A track request as delivered by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackRequest {
    PageView {
        page_id: Option<String>,
    },
    Event {
        category: String,
        action: String,
        label: String,
        value: Option<i64>,
    },
}

pub struct Connector {
    id: Uuid,
    source: Arc<dyn ConfigurationSource>,
    document: Arc<dyn Document>,
    queues: Arc<dyn CommandQueues>,
    settings: ConnectorSettings,
    loader: Loader,
    initialized: bool,
    pending: VecDeque<TrackRequest>,
}

impl Connector {
    pub fn new(
        source: Arc<dyn ConfigurationSource>,
        document: Arc<dyn Document>,
        queues: Arc<dyn CommandQueues>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            document,
            queues,
            settings: ConnectorSettings::default(),
            loader: Loader::new(),
            initialized: false,
            pending: VecDeque::new(),
        }
    }

    pub fn with_settings(mut self, settings: ConnectorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn load_state(&self) -> LoadState {
        self.loader.state()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// The configuration changed: load the backend if nothing was loaded
    /// yet, then re-initialize it from the full current snapshot.
    ///
    /// Invalid configuration is rejected before anything is loaded or
    /// pushed. Errors are returned for diagnostics only; the connector stays
    /// usable.
    pub fn on_configuration_change(&mut self) -> TrackerResult<TrackingMode> {
        let config = self.source.current();
        if let Err(e) = config.validate() {
            warn!(connector_id = %self.id, error = %e, "rejected tracker configuration");
            return Err(e);
        }

        let mode = resolve(&config);
        let backend = backend_for(mode);
        let ctx = self.context();

        self.loader.ensure_loaded(
            backend,
            &config,
            &ctx,
            self.document.as_ref(),
            self.queues.as_ref(),
        )?;
        initialize(backend, &config, &ctx, self.queues.as_ref())?;

        if !self.initialized {
            self.initialized = true;
            info!(connector_id = %self.id, mode = %mode, "connector initialized");
            self.flush_pending();
        }

        Ok(mode)
    }

    /// Report a page view; `None` lets the backend report the current page.
    pub fn on_track_page_view(&mut self, page_id: Option<&str>) -> DispatchOutcome {
        self.track(TrackRequest::PageView {
            page_id: page_id.map(str::to_string),
        })
    }

    pub fn on_track_event(
        &mut self,
        category: &str,
        action: &str,
        label: &str,
        value: Option<i64>,
    ) -> DispatchOutcome {
        self.track(TrackRequest::Event {
            category: category.to_string(),
            action: action.to_string(),
            label: label.to_string(),
            value,
        })
    }

    /// A navigation happened; track it as a page view unless the location
    /// is on the ignore list.
    pub fn on_navigation(&mut self, location: &str) -> DispatchOutcome {
        let config = self.source.current();
        if is_ignored(location, &config.ignored_pages) {
            debug!(connector_id = %self.id, location, "navigation ignored");
            return DispatchOutcome::Suppressed;
        }
        self.on_track_page_view(Some(location))
    }

    pub fn track(&mut self, request: TrackRequest) -> DispatchOutcome {
        if !self.initialized {
            if self.pending.len() >= MAX_PENDING {
                self.pending.pop_front();
                warn!(connector_id = %self.id, "pending track buffer full, dropped oldest request");
            }
            self.pending.push_back(request);
            debug!(connector_id = %self.id, pending = self.pending.len(), "track request buffered");
            return DispatchOutcome::Buffered;
        }

        if !self.settings.sending_enabled() {
            debug!(connector_id = %self.id, ?request, "sending disabled, request suppressed");
            return DispatchOutcome::Suppressed;
        }

        let config = self.source.current();
        let backend = backend_for(resolve(&config));
        let dispatcher = Dispatcher::new(backend, self.queues.as_ref());

        match request {
            TrackRequest::PageView { page_id } => {
                // prefix is read at send time so buffered requests pick it up
                let page = page_id.map(|p| format!("{}{}", config.page_view_prefix, p));
                dispatcher.track_page_view(page.as_deref())
            }
            TrackRequest::Event {
                category,
                action,
                label,
                value,
            } => dispatcher.track_event(&category, &action, &label, value),
        }
    }

    fn flush_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let pending = std::mem::take(&mut self.pending);
        info!(connector_id = %self.id, count = pending.len(), "replaying buffered track requests");
        for request in pending {
            self.track(request);
        }
    }

    fn context(&self) -> BackendContext {
        BackendContext {
            secure: self.document.is_secure(),
            gtag_script_url: self.settings.gtag_script_url.clone(),
            debug_fields: self.settings.log_level().debug_fields(),
        }
    }
}

/// A location is ignored if it equals an ignored page or lies below one.
/// Query string and fragment are not considered.
fn is_ignored(location: &str, ignored_pages: &[String]) -> bool {
    let path = location.split(['?', '#']).next().unwrap_or(location);
    ignored_pages.iter().any(|ignored| {
        let ignored = ignored.trim_end_matches('/');
        if ignored.is_empty() {
            return path.is_empty() || path == "/";
        }
        path == ignored
            || path
                .strip_prefix(ignored)
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ports::{
        capture_document, capture_queues, shared_configuration, CaptureDocument, CaptureQueues,
        SharedConfiguration,
    };
    use gatrack_core::command::QueueKind;
    use gatrack_core::config::{LogLevel, SendMode};
    use gatrack_core::{TrackerConfiguration, TrackerError};
    use serde_json::json;

    struct Harness {
        source: Arc<SharedConfiguration>,
        document: Arc<CaptureDocument>,
        queues: Arc<CaptureQueues>,
        connector: Connector,
    }

    fn harness(config: TrackerConfiguration) -> Harness {
        let source = shared_configuration(config);
        let document = capture_document(true);
        let queues = capture_queues();
        let connector = Connector::new(source.clone(), document.clone(), queues.clone());
        Harness {
            source,
            document,
            queues,
            connector,
        }
    }

    fn gtag_config() -> TrackerConfiguration {
        TrackerConfiguration {
            tracking_mode: Some(TrackingMode::NextGen),
            ..TrackerConfiguration::new("G-1")
        }
    }

    #[test]
    fn test_ignore_matching() {
        let ignored = vec!["/admin".to_string(), "/secret/".to_string()];
        assert!(is_ignored("/admin", &ignored));
        assert!(is_ignored("/admin/users", &ignored));
        assert!(is_ignored("/admin?tab=1", &ignored));
        assert!(is_ignored("/secret", &ignored));
        assert!(!is_ignored("/administrator", &ignored));
        assert!(!is_ignored("/home", &ignored));
        assert!(!is_ignored("/home", &[]));

        let root = vec!["/".to_string()];
        assert!(is_ignored("/", &root));
        assert!(!is_ignored("/home", &root));
    }

    #[test]
    fn test_missing_tracker_id_rejected() {
        let mut h = harness(TrackerConfiguration::new(""));
        let err = h.connector.on_configuration_change().unwrap_err();
        assert!(matches!(err, TrackerError::MissingTrackerId));
        assert!(!h.connector.load_state().is_loaded());
        assert!(!h.connector.is_initialized());
        assert_eq!(h.document.count(), 0);
        assert_eq!(h.queues.count(), 0);
    }

    #[test]
    fn test_empty_domain_treated_as_unset() {
        for (json, mode) in [
            (r#"{"trackerId":"UA-1","universalTracking":false,"domainName":""}"#, TrackingMode::Legacy),
            (r#"{"trackerId":"UA-2","trackingMode":"universal","domainName":""}"#, TrackingMode::Universal),
        ] {
            let mut h = harness(TrackerConfiguration::from_json(json).unwrap());

            assert_eq!(h.connector.on_configuration_change().unwrap(), mode);
            assert!(h.connector.is_initialized());
            assert_eq!(h.document.count(), 1);
            assert!(h.queues.count() > 0);
            assert_eq!(h.queues.count_named("_setDomainName"), 0);
            assert!(h
                .queues
                .commands()
                .iter()
                .flat_map(|c| c.args.iter())
                .all(|a| a.get("cookieDomain").is_none()));
        }
    }

    #[test]
    fn test_requests_buffered_until_initialized() {
        let mut h = harness(gtag_config());

        assert_eq!(h.connector.on_track_page_view(Some("early")), DispatchOutcome::Buffered);
        assert_eq!(
            h.connector.on_track_event("c", "a", "l", None),
            DispatchOutcome::Buffered
        );
        assert_eq!(h.connector.pending_count(), 2);
        assert_eq!(h.queues.count(), 0);

        h.connector.on_configuration_change().unwrap();
        assert_eq!(h.connector.pending_count(), 0);

        let args = h.queues.args(QueueKind::DataLayer);
        assert_eq!(args[0][0], json!("js"));
        assert_eq!(args[1], vec![json!("config"), json!("G-1"), json!({ "debug_mode": true })]);
        assert_eq!(
            args[2],
            vec![json!("event"), json!("page_view"), json!({ "page_title": "early" })]
        );
        assert_eq!(args[3][1], json!("a"));
    }

    #[test]
    fn test_buffer_is_bounded() {
        let mut h = harness(gtag_config());
        for i in 0..(MAX_PENDING + 10) {
            h.connector.on_track_page_view(Some(&format!("/p{i}")));
        }
        assert_eq!(h.connector.pending_count(), MAX_PENDING);
    }

    #[test]
    fn test_failed_validation_keeps_buffer() {
        let mut h = harness(TrackerConfiguration::new(" "));
        h.connector.on_track_page_view(None);
        assert!(h.connector.on_configuration_change().is_err());
        assert_eq!(h.connector.pending_count(), 1);

        h.source.set(gtag_config());
        h.connector.on_configuration_change().unwrap();
        assert_eq!(h.connector.pending_count(), 0);
        assert_eq!(h.queues.count_named("event"), 1);
    }

    #[test]
    fn test_page_view_prefix() {
        let mut h = harness(TrackerConfiguration {
            page_view_prefix: "/app".into(),
            tracking_mode: Some(TrackingMode::Legacy),
            ..TrackerConfiguration::new("UA-1")
        });
        h.connector.on_configuration_change().unwrap();
        h.queues.clear();

        h.connector.on_track_page_view(Some("/orders"));
        h.connector.on_track_page_view(None);

        assert_eq!(
            h.queues.args(QueueKind::Gaq),
            vec![
                vec![json!("_trackPageview"), json!("/app/orders")],
                vec![json!("_trackPageview")],
            ]
        );
    }

    #[test]
    fn test_navigation_respects_ignore_list() {
        let mut h = harness(TrackerConfiguration {
            ignored_pages: vec!["/ignored".into()],
            ..gtag_config()
        });
        h.connector.on_configuration_change().unwrap();
        h.queues.clear();

        assert_eq!(h.connector.on_navigation("/ignored"), DispatchOutcome::Suppressed);
        assert_eq!(h.connector.on_navigation("/second"), DispatchOutcome::Sent);
        assert_eq!(
            h.queues.args(QueueKind::DataLayer),
            vec![vec![
                json!("event"),
                json!("page_view"),
                json!({ "page_title": "/second" })
            ]]
        );
    }

    #[test]
    fn test_sending_disabled_suppresses_dispatch() {
        let mut h = harness(gtag_config());
        h.connector = Connector::new(h.source.clone(), h.document.clone(), h.queues.clone())
            .with_settings(ConnectorSettings {
                send_mode: SendMode::Production,
                production_mode: false,
                ..Default::default()
            });

        h.connector.on_configuration_change().unwrap();
        assert_eq!(h.document.count(), 1);
        assert_eq!(h.queues.count_named("config"), 1);

        assert_eq!(h.connector.on_track_page_view(Some("x")), DispatchOutcome::Suppressed);
        assert_eq!(h.connector.on_track_event("c", "a", "l", Some(1)), DispatchOutcome::Suppressed);
        assert_eq!(h.queues.count_named("event"), 0);
    }

    #[test]
    fn test_production_log_level() {
        let mut h = harness(gtag_config());
        h.connector = Connector::new(h.source.clone(), h.document.clone(), h.queues.clone())
            .with_settings(ConnectorSettings {
                production_mode: true,
                production_log_level: LogLevel::None,
                ..Default::default()
            });

        h.connector.on_configuration_change().unwrap();
        assert_eq!(
            h.queues.args(QueueKind::DataLayer)[1],
            vec![json!("config"), json!("G-1")]
        );
    }

    #[test]
    fn test_legacy_event_is_noop() {
        let mut h = harness(TrackerConfiguration {
            tracking_mode: Some(TrackingMode::Legacy),
            ..TrackerConfiguration::new("UA-1")
        });
        h.connector.on_configuration_change().unwrap();
        let before = h.queues.count();

        assert_eq!(
            h.connector.on_track_event("c", "a", "l", Some(5)),
            DispatchOutcome::Unsupported
        );
        assert_eq!(h.queues.count(), before);
    }

    #[test]
    fn test_insecure_document_loads_plain_legacy_script() {
        let source = shared_configuration(TrackerConfiguration {
            universal_tracking: false,
            ..TrackerConfiguration::new("UA-1")
        });
        let document = capture_document(false);
        let queues = capture_queues();
        let mut connector = Connector::new(source, document.clone(), queues);

        assert_eq!(connector.on_configuration_change().unwrap(), TrackingMode::Legacy);
        assert_eq!(
            document.scripts(),
            vec!["http://www.google-analytics.com/ga.js".to_string()]
        );
    }
}
