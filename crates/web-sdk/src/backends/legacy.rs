//! ga.js backend — named commands pushed onto the `_gaq` array.

use serde_json::json;
use tracing::debug;

use gatrack_core::command::{Command, QueueKind};
use gatrack_core::{TrackerConfiguration, TrackerResult, TrackingMode};

use super::{Backend, BackendContext};
use crate::ports::CommandQueues;

const SECURE_SCRIPT_URL: &str = "https://ssl.google-analytics.com/ga.js";
const PLAIN_SCRIPT_URL: &str = "http://www.google-analytics.com/ga.js";

pub struct LegacyBackend;

impl Backend for LegacyBackend {
    fn mode(&self) -> TrackingMode {
        TrackingMode::Legacy
    }

    fn queue(&self) -> QueueKind {
        QueueKind::Gaq
    }

    fn script_url(
        &self,
        _config: &TrackerConfiguration,
        ctx: &BackendContext,
    ) -> TrackerResult<String> {
        let url = if ctx.secure {
            SECURE_SCRIPT_URL
        } else {
            PLAIN_SCRIPT_URL
        };
        Ok(url.to_string())
    }

    fn bootstrap(&self, queues: &dyn CommandQueues) {
        if queues.ensure(QueueKind::Gaq) {
            debug!("defined window._gaq");
        }
    }

    fn init_commands(
        &self,
        config: &TrackerConfiguration,
        _ctx: &BackendContext,
    ) -> Vec<Command> {
        let mut commands = vec![gaq(vec![json!("_setAccount"), json!(config.tracker_id)])];

        if let Some(domain) = config.domain() {
            commands.push(gaq(vec![json!("_setDomainName"), json!(domain)]));
        }
        commands.push(gaq(vec![json!("_setAllowAnchor"), json!(config.allow_anchor)]));
        commands.push(gaq(vec![json!("_setAllowLinker"), json!(config.allow_linker)]));

        commands
    }

    fn page_view(&self, page_id: Option<&str>) -> Command {
        match page_id {
            Some(page) => gaq(vec![json!("_trackPageview"), json!(page)]),
            None => gaq(vec![json!("_trackPageview")]),
        }
    }
}

fn gaq(args: Vec<serde_json::Value>) -> Command {
    Command::new(QueueKind::Gaq, args)
}
