//! analytics.js backend — calls on the `ga` command function.

use serde_json::{json, Map, Value};
use tracing::debug;

use gatrack_core::command::{Command, QueueKind};
use gatrack_core::{TrackerConfiguration, TrackerResult, TrackingMode};

use super::{Backend, BackendContext};
use crate::ports::CommandQueues;

const SCRIPT_URL: &str = "https://www.google-analytics.com/analytics.js";

pub struct UniversalBackend;

impl UniversalBackend {
    /// The `create` options record. Custom create fields go in first so the
    /// connector-managed keys always win.
    fn create_options(config: &TrackerConfiguration) -> Map<String, Value> {
        let mut options = config.create_fields.clone();
        if let Some(domain) = config.domain() {
            options.insert("cookieDomain".into(), json!(domain));
        }
        options.insert("allowAnchor".into(), json!(config.allow_anchor));
        options
    }
}

impl Backend for UniversalBackend {
    fn mode(&self) -> TrackingMode {
        TrackingMode::Universal
    }

    fn queue(&self) -> QueueKind {
        QueueKind::Ga
    }

    fn script_url(
        &self,
        _config: &TrackerConfiguration,
        _ctx: &BackendContext,
    ) -> TrackerResult<String> {
        Ok(SCRIPT_URL.to_string())
    }

    fn bootstrap(&self, queues: &dyn CommandQueues) {
        // ga.q stub, replayed by analytics.js once it loads
        if queues.ensure(QueueKind::Ga) {
            debug!("defined window.ga command queue");
        }
    }

    fn init_commands(
        &self,
        config: &TrackerConfiguration,
        _ctx: &BackendContext,
    ) -> Vec<Command> {
        vec![Command::new(
            QueueKind::Ga,
            vec![
                json!("create"),
                json!(config.tracker_id),
                Value::Object(Self::create_options(config)),
            ],
        )]
    }

    fn page_view(&self, page_id: Option<&str>) -> Command {
        let mut args = vec![json!("send"), json!("pageview")];
        if let Some(page) = page_id {
            args.push(json!({ "page": page }));
        }
        Command::new(QueueKind::Ga, args)
    }
}
