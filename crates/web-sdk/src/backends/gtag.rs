//! gtag.js backend — directives pushed onto the `dataLayer` array, the way
//! `gtag(...)` forwards its `arguments`.

use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use gatrack_core::command::{Command, QueueKind};
use gatrack_core::{TrackerConfiguration, TrackerError, TrackerResult, TrackingMode};

use super::{Backend, BackendContext};
use crate::ports::CommandQueues;

pub struct GtagBackend;

impl GtagBackend {
    /// The `js` directive that timestamps the first use of the data layer.
    fn js_directive() -> Command {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        data_layer(vec![json!("js"), json!(now)])
    }
}

impl Backend for GtagBackend {
    fn mode(&self) -> TrackingMode {
        TrackingMode::NextGen
    }

    fn queue(&self) -> QueueKind {
        QueueKind::DataLayer
    }

    fn script_url(
        &self,
        config: &TrackerConfiguration,
        ctx: &BackendContext,
    ) -> TrackerResult<String> {
        let mut url = Url::parse(&ctx.gtag_script_url).map_err(|e| {
            TrackerError::Config(format!(
                "invalid gtag script url '{}': {e}",
                ctx.gtag_script_url
            ))
        })?;
        url.query_pairs_mut().append_pair("id", &config.tracker_id);
        Ok(url.into())
    }

    fn init_commands(
        &self,
        config: &TrackerConfiguration,
        ctx: &BackendContext,
    ) -> Vec<Command> {
        let mut params = config.create_fields.clone();
        params.extend(config.initial_values.clone());
        params.extend(ctx.debug_fields.clone());

        let mut args = vec![json!("config"), json!(config.tracker_id)];
        if !params.is_empty() {
            args.push(Value::Object(params));
        }
        vec![data_layer(args)]
    }

    fn initialize(
        &self,
        config: &TrackerConfiguration,
        ctx: &BackendContext,
        queues: &dyn CommandQueues,
    ) -> TrackerResult<usize> {
        let mut count = 0;
        if queues.ensure(QueueKind::DataLayer) {
            debug!("defined window.dataLayer");
            queues.push(Self::js_directive())?;
            count += 1;
        }
        for command in self.init_commands(config, ctx) {
            queues.push(command)?;
            count += 1;
        }
        Ok(count)
    }

    fn page_view(&self, page_id: Option<&str>) -> Command {
        let mut args = vec![json!("event"), json!("page_view")];
        if let Some(page) = page_id {
            args.push(json!({ "page_title": page }));
        }
        data_layer(args)
    }

    fn event(
        &self,
        category: &str,
        action: &str,
        label: &str,
        value: Option<i64>,
    ) -> Option<Command> {
        let mut params = json!({
            "event_category": category,
            "event_label": label,
        });
        if let Some(value) = value {
            params["value"] = json!(value);
        }
        Some(data_layer(vec![json!("event"), json!(action), params]))
    }
}

fn data_layer(args: Vec<Value>) -> Command {
    Command::new(QueueKind::DataLayer, args)
}
