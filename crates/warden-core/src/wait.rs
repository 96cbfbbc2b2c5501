//! Bounded-wait polling of service status.

use std::time::{Duration, Instant};

use crate::backend::ServiceEntry;
use crate::config::PollPolicy;
use crate::error::{OsOperation, Result, WardenError};
use crate::types::{ServiceStatus, StateSet};

/// Floor for a single sleep so a zero interval cannot busy-spin.
const MIN_STEP: Duration = Duration::from_millis(1);

/// Polls `entry` until its state is in `accept` or `timeout` elapses.
///
/// The first query happens immediately. Each following sleep is chosen by
/// `poll` from the service's wait hint and never runs past the deadline.
///
/// # Errors
///
/// Returns [`WardenError::Timeout`] when the deadline passes, or an
/// [`OsOperation::QueryStatus`] failure if a query fails.
pub fn wait_for_state(
    entry: &dyn ServiceEntry,
    accept: StateSet,
    timeout: Duration,
    poll: &PollPolicy,
) -> Result<ServiceStatus> {
    let started = Instant::now();
    loop {
        let status = entry
            .query_status()
            .map_err(|e| WardenError::os(OsOperation::QueryStatus, e))?;
        if accept.accepts(status.state) {
            return Ok(status);
        }

        let elapsed = started.elapsed();
        if elapsed >= timeout {
            tracing::warn!(
                state = %status.state,
                timeout = %humantime::format_duration(timeout),
                "service did not reach the expected state in time"
            );
            return Err(WardenError::Timeout(timeout));
        }

        let step = poll
            .interval_for(status.wait_hint)
            .min(timeout - elapsed)
            .max(MIN_STEP);
        tracing::debug!(
            state = %status.state,
            checkpoint = status.checkpoint,
            step_ms = step.as_millis() as u64,
            "waiting for service state"
        );
        std::thread::sleep(step);
    }
}
