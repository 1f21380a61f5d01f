//! Page view and event dispatch onto the active backend's queue.
//!
//! Dispatch never fails towards the caller: a missing vendor global is
//! logged and reported as [`DispatchOutcome::Unavailable`].

use serde::Serialize;
use tracing::{debug, warn};

use gatrack_core::command::Command;
use gatrack_core::TrackerError;

use crate::backends::Backend;
use crate::ports::CommandQueues;

/// Result of a track request as seen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// The call was appended to the vendor queue.
    Sent,
    /// Held until the connector is first initialized.
    Buffered,
    /// Dropped on purpose: sending disabled or page ignored.
    Suppressed,
    /// The active backend has no such operation.
    Unsupported,
    /// The vendor global is absent; the call was dropped.
    Unavailable,
}

pub struct Dispatcher<'a> {
    backend: &'a dyn Backend,
    queues: &'a dyn CommandQueues,
}

impl<'a> Dispatcher<'a> {
    pub fn new(backend: &'a dyn Backend, queues: &'a dyn CommandQueues) -> Self {
        Self { backend, queues }
    }

    pub fn track_page_view(&self, page_id: Option<&str>) -> DispatchOutcome {
        self.send(self.backend.page_view(page_id))
    }

    pub fn track_event(
        &self,
        category: &str,
        action: &str,
        label: &str,
        value: Option<i64>,
    ) -> DispatchOutcome {
        match self.backend.event(category, action, label, value) {
            Some(command) => self.send(command),
            None => {
                debug!(
                    mode = %self.backend.mode(),
                    action,
                    "event tracking not supported by backend, ignoring"
                );
                DispatchOutcome::Unsupported
            }
        }
    }

    fn send(&self, command: Command) -> DispatchOutcome {
        debug!(queue = command.queue.global_name(), args = ?command.args, "dispatching");
        match self.queues.push(command) {
            Ok(()) => {
                metrics::counter!("tracker.dispatch.sent").increment(1);
                DispatchOutcome::Sent
            }
            Err(TrackerError::BackendUnavailable(queue)) => {
                metrics::counter!("tracker.dispatch.dropped").increment(1);
                warn!(
                    mode = %self.backend.mode(),
                    queue = queue.global_name(),
                    "tracking backend unavailable, call dropped"
                );
                DispatchOutcome::Unavailable
            }
            Err(e) => {
                metrics::counter!("tracker.dispatch.dropped").increment(1);
                warn!(mode = %self.backend.mode(), error = %e, "tracking call failed, dropped");
                DispatchOutcome::Unavailable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::backend_for;
    use crate::ports::capture_queues;
    use gatrack_core::command::QueueKind;
    use gatrack_core::TrackingMode;
    use serde_json::json;

    #[test]
    fn test_page_view_sent() {
        let queues = capture_queues();
        queues.ensure(QueueKind::Ga);
        let dispatcher = Dispatcher::new(backend_for(TrackingMode::Universal), &*queues);

        assert_eq!(dispatcher.track_page_view(Some("/a")), DispatchOutcome::Sent);
        assert_eq!(dispatcher.track_page_view(None), DispatchOutcome::Sent);

        let args = queues.args(QueueKind::Ga);
        assert_eq!(args[0], vec![json!("send"), json!("pageview"), json!({ "page": "/a" })]);
        assert_eq!(args[1], vec![json!("send"), json!("pageview")]);
    }

    #[test]
    fn test_missing_queue_is_unavailable() {
        let queues = capture_queues();
        let dispatcher = Dispatcher::new(backend_for(TrackingMode::Legacy), &*queues);

        assert_eq!(dispatcher.track_page_view(Some("/a")), DispatchOutcome::Unavailable);
        assert_eq!(queues.count(), 0);
    }

    #[test]
    fn test_event_unsupported_outside_gtag() {
        let queues = capture_queues();
        queues.ensure(QueueKind::Gaq);
        queues.ensure(QueueKind::Ga);

        for mode in [TrackingMode::Legacy, TrackingMode::Universal] {
            let dispatcher = Dispatcher::new(backend_for(mode), &*queues);
            assert_eq!(
                dispatcher.track_event("cat", "act", "lbl", Some(1)),
                DispatchOutcome::Unsupported
            );
        }
        assert_eq!(queues.count(), 0);
    }

    #[test]
    fn test_event_sent_on_gtag() {
        let queues = capture_queues();
        queues.ensure(QueueKind::DataLayer);
        let dispatcher = Dispatcher::new(backend_for(TrackingMode::NextGen), &*queues);

        assert_eq!(
            dispatcher.track_event("cart", "add_to_cart", "sku-1", Some(2)),
            DispatchOutcome::Sent
        );
        assert_eq!(queues.count_named("event"), 1);
    }
}
