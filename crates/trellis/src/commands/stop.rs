use std::path::Path;

use trellis_core::pid::{self, InstanceRecord, LookupVerdict};
use trellis_core::shutdown::{self, TerminateOutcome};
use trellis_core::{log, process};

use super::{EX_INDETERMINATE, EX_UNAVAILABLE};

/// What the internal stop attempt concluded, for `restart` to act on.
pub(crate) enum StopResult {
    /// The instance was terminated; its record is returned so the
    /// caller can reuse the original invocation.
    Stopped(InstanceRecord),
    NotRunning,
    /// The record's PID is alive but unverified; we refuse to signal
    /// a process that may not be ours.
    Refused,
}

pub fn execute(dir: &Path) -> i32 {
    log::init(log::Level::Info);

    match stop_instance(dir) {
        Ok(StopResult::Stopped(_)) => 0,
        Ok(StopResult::NotRunning) => {
            println!(
                "No Trellis node is currently running from node directory {}.",
                dir.display()
            );
            EX_UNAVAILABLE
        }
        Ok(StopResult::Refused) => EX_INDETERMINATE,
        Err(e) => {
            eprintln!("Error: {e}");
            1
        }
    }
}

/// Looks up the instance and terminates it if one is verifiably
/// running. Does not delete the record file: that belongs to the
/// stopped process, whose own exit hook removes it.
pub(crate) fn stop_instance(dir: &Path) -> trellis_core::NodeResult<StopResult> {
    let control = process::platform_control()?;

    match pid::lookup(dir, control.as_ref()) {
        LookupVerdict::NotRunning => Ok(StopResult::NotRunning),
        LookupVerdict::Indeterminate { record, cmdline } => {
            eprintln!(
                "Refusing to stop PID {}: it does not look like a trellis process:",
                record.pid
            );
            eprintln!("  {cmdline}");
            eprintln!(
                "Verify manually and either kill {} or delete {}.",
                record.pid,
                pid::pid_path(dir).display()
            );
            Ok(StopResult::Refused)
        }
        LookupVerdict::Running(record) => {
            println!(
                "Stopping Trellis node running from node directory {} (PID {}) ...",
                dir.display(),
                record.pid
            );
            let timeout = shutdown::DEFAULT_TERMINATE_TIMEOUT;
            match shutdown::terminate(control.as_ref(), &record, timeout)? {
                TerminateOutcome::AlreadyGone => {
                    println!("Process {} had already exited.", record.pid);
                }
                TerminateOutcome::Graceful => {
                    println!("Process {} terminated.", record.pid);
                }
                TerminateOutcome::Escalated => {
                    println!(
                        "Process {} did not exit within {}s - killed.",
                        record.pid,
                        timeout.as_secs()
                    );
                }
                TerminateOutcome::SignalSent => {
                    println!(
                        "Termination requested for process {} (exit not confirmable here).",
                        record.pid
                    );
                }
            }
            Ok(StopResult::Stopped(record))
        }
    }
}
