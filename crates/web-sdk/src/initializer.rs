//! Backend (re-)initialization, run on every configuration change.

use tracing::{info, warn};

use gatrack_core::{TrackerConfiguration, TrackerResult};

use crate::backends::{Backend, BackendContext};
use crate::ports::CommandQueues;

/// Send the backend's full identity handshake for the current snapshot.
/// No diffing against earlier snapshots is attempted.
pub fn initialize(
    backend: &dyn Backend,
    config: &TrackerConfiguration,
    ctx: &BackendContext,
    queues: &dyn CommandQueues,
) -> TrackerResult<usize> {
    match backend.initialize(config, ctx, queues) {
        Ok(count) => {
            metrics::counter!("tracker.initialized").increment(1);
            info!(
                mode = %backend.mode(),
                tracker_id = %config.tracker_id,
                commands = count,
                "tracker initialized"
            );
            Ok(count)
        }
        Err(e) => {
            warn!(
                mode = %backend.mode(),
                tracker_id = %config.tracker_id,
                error = %e,
                "tracker initialization failed"
            );
            Err(e)
        }
    }
}
