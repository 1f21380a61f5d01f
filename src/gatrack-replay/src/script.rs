//! Replay of recorded transport events through a connector wired to
//! in-memory ports. Every resulting document mutation and vendor call is
//! reported as one JSON line.

use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use gatrack_core::{ConnectorSettings, TrackerConfiguration, TrackingMode};
use gatrack_web_sdk::ports::{capture_queues, shared_configuration};
use gatrack_web_sdk::{
    CaptureDocument, CaptureQueues, Connector, DispatchOutcome, SharedConfiguration,
};

/// One line of a replay script.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScriptEvent {
    /// The server pushed new tracker state.
    State { state: TrackerConfiguration },
    TrackPageView {
        #[serde(default)]
        page_id: Option<String>,
    },
    TrackEvent {
        category: String,
        action: String,
        label: String,
        #[serde(default)]
        value: Option<i64>,
    },
    Navigate { location: String },
}

/// One line of replay output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WireCall {
    InsertScript { url: String },
    Push { queue: &'static str, args: Vec<Value> },
    Initialized { mode: TrackingMode },
    Rejected { error: String },
    Outcome { outcome: DispatchOutcome },
}

pub struct Replay {
    source: Arc<SharedConfiguration>,
    document: Arc<CaptureDocument>,
    queues: Arc<CaptureQueues>,
    connector: Connector,
}

impl Replay {
    pub fn new(settings: ConnectorSettings, secure: bool) -> Self {
        let source = shared_configuration(TrackerConfiguration::new(""));
        let document = Arc::new(CaptureDocument::new(secure));
        let queues = capture_queues();
        let connector = Connector::new(source.clone(), document.clone(), queues.clone())
            .with_settings(settings);

        Self {
            source,
            document,
            queues,
            connector,
        }
    }

    /// Feed one event and collect what it caused, in order: script
    /// insertions, queue pushes, then the event's own result.
    pub fn apply(&mut self, event: ScriptEvent) -> Vec<WireCall> {
        let result = match event {
            ScriptEvent::State { state } => {
                self.source.set(state);
                match self.connector.on_configuration_change() {
                    Ok(mode) => WireCall::Initialized { mode },
                    Err(e) => WireCall::Rejected {
                        error: e.to_string(),
                    },
                }
            }
            ScriptEvent::TrackPageView { page_id } => WireCall::Outcome {
                outcome: self.connector.on_track_page_view(page_id.as_deref()),
            },
            ScriptEvent::TrackEvent {
                category,
                action,
                label,
                value,
            } => WireCall::Outcome {
                outcome: self
                    .connector
                    .on_track_event(&category, &action, &label, value),
            },
            ScriptEvent::Navigate { location } => WireCall::Outcome {
                outcome: self.connector.on_navigation(&location),
            },
        };

        let mut calls: Vec<WireCall> = self
            .document
            .take()
            .into_iter()
            .map(|url| WireCall::InsertScript { url })
            .collect();
        calls.extend(self.queues.take().into_iter().map(|cmd| WireCall::Push {
            queue: cmd.queue.global_name(),
            args: cmd.args,
        }));
        calls.push(result);
        calls
    }
}

/// Replay every non-blank line of `input`, writing JSON lines to `output`.
/// Returns the number of events replayed.
pub fn run<R: BufRead, W: Write>(replay: &mut Replay, input: R, mut output: W) -> anyhow::Result<usize> {
    let mut events = 0;
    for (index, line) in input.lines().enumerate() {
        let line = line.context("failed to read replay script")?;
        let line = line.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }

        let event: ScriptEvent = serde_json::from_str(line)
            .with_context(|| format!("invalid replay event on line {}", index + 1))?;
        debug!(line = index + 1, ?event, "replaying event");

        for call in replay.apply(event) {
            serde_json::to_writer(&mut output, &call)?;
            writeln!(output)?;
        }
        events += 1;
    }
    output.flush()?;

    info!(events, "replay finished");
    Ok(events)
}
