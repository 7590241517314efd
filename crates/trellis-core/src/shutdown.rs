//! Graceful-then-forceful termination of a running instance.

use std::time::Duration;

use crate::log_warn;
use crate::process::ProcessControl;
use crate::{InstanceRecord, NodeResult};

/// How long `stop` waits for a graceful exit before escalating.
pub const DEFAULT_TERMINATE_TIMEOUT: Duration = Duration::from_secs(5);

/// Final outcome of a termination attempt, for caller-side reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminateOutcome {
    /// The target was already dead when we got here. Success.
    AlreadyGone,
    /// The target exited within the timeout after the graceful request.
    Graceful,
    /// The graceful request went unacknowledged; one kill was sent.
    Escalated,
    /// A graceful request was sent, but this platform cannot confirm
    /// the exit.
    SignalSent,
}

/// Terminates the instance described by `record`.
///
/// Sends a graceful-termination request, waits up to `timeout` for the
/// target to exit, and escalates to exactly one unconditional kill if
/// it does not. A target that is already gone — at entry or mid-wait —
/// is success, not an error; the only error here is an OS refusal to
/// signal at all (e.g. insufficient permissions).
pub fn terminate(
    control: &dyn ProcessControl,
    record: &InstanceRecord,
    timeout: Duration,
) -> NodeResult<TerminateOutcome> {
    let pid = record.pid;

    if !control.exists(pid) {
        return Ok(TerminateOutcome::AlreadyGone);
    }

    control.request_stop(pid)?;

    match control.await_exit(pid, timeout) {
        None => Ok(TerminateOutcome::SignalSent),
        Some(true) => Ok(TerminateOutcome::Graceful),
        Some(false) => {
            log_warn!("process {pid} still alive after {}s, killing", timeout.as_secs());
            control.kill(pid)?;
            Ok(TerminateOutcome::Escalated)
        }
    }
}
