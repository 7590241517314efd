//! Platform-conditional process inspection and signalling.
//!
//! Everything the registry and shutdown orchestrator need from the OS
//! goes through the [`ProcessControl`] trait, so the PID-file state
//! machine stays platform-agnostic and testable. A single probe at
//! startup picks the implementation: POSIX signals where available,
//! the process table (via `sysinfo`) elsewhere.

use std::time::{Duration, Instant};

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};

use crate::NodeResult;

/// How often the bounded exit wait re-probes the target.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// OS capabilities needed to supervise one external process.
///
/// `exists` is the load-bearing call: wrongly answering "dead" lets a
/// second instance start against a live one, so implementations must
/// err on the side of "alive" when in doubt.
pub trait ProcessControl {
    /// Returns whether a process with the given PID currently exists.
    fn exists(&self, pid: u32) -> bool;

    /// Returns the command line of the process, if inspection is
    /// available on this platform. `None` means "cannot tell", not
    /// "empty command line".
    fn inspect_cmdline(&self, pid: u32) -> Option<Vec<String>>;

    /// Sends a graceful-termination request (SIGINT on POSIX, the
    /// closest equivalent elsewhere).
    fn request_stop(&self, pid: u32) -> NodeResult<()>;

    /// Sends an unconditional kill request.
    fn kill(&self, pid: u32) -> NodeResult<()>;

    /// Blocks up to `timeout` waiting for the process to exit.
    ///
    /// Returns `Some(true)` if it exited, `Some(false)` if the timeout
    /// expired, or `None` if exit confirmation is not possible on this
    /// platform (the caller then proceeds unconfirmed).
    fn await_exit(&self, pid: u32, timeout: Duration) -> Option<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if !self.exists(pid) {
                return Some(true);
            }
            if Instant::now() >= deadline {
                return Some(false);
            }
            std::thread::sleep(WAIT_POLL_INTERVAL);
        }
    }
}

/// Picks the process-control implementation for the current host.
///
/// Fails hard when the host offers no way to probe liveness; guessing
/// "not running" would allow a double start, so we refuse to answer
/// instead.
#[cfg(unix)]
pub fn platform_control() -> NodeResult<Box<dyn ProcessControl>> {
    Ok(Box::new(SignalControl))
}

/// Picks the process-control implementation for the current host.
#[cfg(not(unix))]
pub fn platform_control() -> NodeResult<Box<dyn ProcessControl>> {
    if sysinfo::IS_SUPPORTED_SYSTEM {
        Ok(Box::new(TableControl))
    } else {
        Err("cannot probe process liveness on this platform".into())
    }
}

/// Reads one process entry from the OS process table.
fn table_lookup(pid: u32) -> (System, Pid) {
    let target = Pid::from_u32(pid);
    let mut system = System::new();
    // The default refresh does not populate command lines; request
    // them explicitly or `cmd()` always comes back empty.
    system.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[target]),
        true,
        ProcessRefreshKind::nothing().with_cmd(UpdateKind::Always),
    );
    (system, target)
}

/// Returns the command line of a process from the process table.
///
/// Shared by both implementations: even on POSIX, reading another
/// process's argv needs the process table rather than a syscall.
///
/// An empty command line (zombies, restricted /proc) is reported as
/// `None`: it means "cannot inspect", not "ran with no arguments",
/// and identity verification has nothing to work with.
fn table_cmdline(pid: u32) -> Option<Vec<String>> {
    let (system, target) = table_lookup(pid);
    let process = system.process(target)?;
    let cmd = process.cmd();
    if cmd.is_empty() {
        return None;
    }
    Some(
        cmd.iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect(),
    )
}

/// POSIX implementation: null signal for liveness, SIGINT/SIGKILL for
/// termination, process table for command lines.
#[cfg(unix)]
pub struct SignalControl;

/// Converts a record PID to a signalable POSIX PID.
///
/// `None` for 0 and for values above `i32::MAX`: no real process has
/// such a PID, and `kill(2)` gives both special meaning — 0 is the
/// caller's own process group, and a blind `as i32` cast maps e.g.
/// `u32::MAX` to -1, "every process I may signal". A record carrying
/// either must read as dead, never as a signal target.
#[cfg(unix)]
fn posix_pid(pid: u32) -> Option<nix::unistd::Pid> {
    if pid == 0 {
        return None;
    }
    i32::try_from(pid).ok().map(nix::unistd::Pid::from_raw)
}

#[cfg(unix)]
impl ProcessControl for SignalControl {
    fn exists(&self, pid: u32) -> bool {
        use nix::errno::Errno;
        use nix::sys::signal::kill;

        let Some(pid) = posix_pid(pid) else {
            return false;
        };
        // Null signal probes without delivering anything. EPERM means
        // the process exists but belongs to someone else — still alive.
        match kill(pid, None) {
            Ok(()) => true,
            Err(Errno::EPERM) => true,
            Err(_) => false,
        }
    }

    fn inspect_cmdline(&self, pid: u32) -> Option<Vec<String>> {
        table_cmdline(pid)
    }

    fn request_stop(&self, pid: u32) -> NodeResult<()> {
        use nix::errno::Errno;
        use nix::sys::signal::{Signal, kill};

        let Some(target) = posix_pid(pid) else {
            return Ok(());
        };
        match kill(target, Signal::SIGINT) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(format!("could not signal process {pid}: {e}").into()),
        }
    }

    fn kill(&self, pid: u32) -> NodeResult<()> {
        use nix::errno::Errno;
        use nix::sys::signal::{Signal, kill};

        let Some(target) = posix_pid(pid) else {
            return Ok(());
        };
        match kill(target, Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(format!("could not kill process {pid}: {e}").into()),
        }
    }
}

/// Process-table implementation for hosts without a liveness syscall.
pub struct TableControl;

impl ProcessControl for TableControl {
    fn exists(&self, pid: u32) -> bool {
        let (system, target) = table_lookup(pid);
        system.process(target).is_some()
    }

    fn inspect_cmdline(&self, pid: u32) -> Option<Vec<String>> {
        table_cmdline(pid)
    }

    fn request_stop(&self, pid: u32) -> NodeResult<()> {
        let (system, target) = table_lookup(pid);
        let Some(process) = system.process(target) else {
            // Already gone is success, not an error.
            return Ok(());
        };
        // Not every platform exposes a graceful signal; fall back to a
        // hard termination request where SIGTERM is unsupported.
        if process.kill_with(sysinfo::Signal::Term).is_none() {
            process.kill();
        }
        Ok(())
    }

    fn kill(&self, pid: u32) -> NodeResult<()> {
        let (system, target) = table_lookup(pid);
        if let Some(process) = system.process(target) {
            process.kill();
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn own_process_is_alive() {
        assert!(SignalControl.exists(std::process::id()));
    }

    #[test]
    fn oversized_pid_is_reported_dead() {
        // A cast would map u32::MAX to kill(-1, ...); these must be
        // classified as dead instead, so stale records get reclaimed.
        assert!(!SignalControl.exists(u32::MAX));
        assert!(!SignalControl.exists(i32::MAX as u32 + 1));
    }

    #[test]
    fn pid_zero_is_reported_dead() {
        // kill(0, ...) would probe the caller's own process group.
        assert!(!SignalControl.exists(0));
    }

    #[test]
    fn unsignalable_pids_get_no_signals() {
        assert!(SignalControl.request_stop(u32::MAX).is_ok());
        assert!(SignalControl.kill(u32::MAX).is_ok());
        assert!(SignalControl.request_stop(0).is_ok());
        assert!(SignalControl.kill(0).is_ok());
    }
}
