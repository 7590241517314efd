//! The on-disk instance registry.
//!
//! One node directory holds at most one running instance, tracked by a
//! `node.pid` file containing the PID, the launch argv and the resolved
//! options as JSON. `lookup` classifies the file against the live
//! process table, repairing stale or corrupted state as it goes; there
//! is deliberately no filesystem lock (see [`register`]).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::process::ProcessControl;
use crate::{NodeResult, log_info, log_warn};

/// Name of the record file inside the node directory.
pub const PID_FILENAME: &str = "node.pid";

/// Program name the identity heuristic looks for in a command line.
const PROGRAM_NAME: &str = "trellis";

/// Widest command line shown verbatim in identity-mismatch reports.
/// Longer ones keep a 38-character prefix and suffix.
const CMDLINE_DISPLAY_WIDTH: usize = 76;
const CMDLINE_KEEP: usize = 38;

/// The persisted handle for one running instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceRecord {
    /// OS process identifier at the time the record was written.
    pub pid: u32,
    /// Full invocation used to launch the instance (kept for restart).
    pub argv: Vec<String>,
    /// Resolved option values, excluding the argv itself.
    pub options: Map<String, Value>,
}

/// Result of checking whether an instance is running.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupVerdict {
    /// A verified (or unverifiable-but-alive) instance is running.
    Running(InstanceRecord),
    /// No instance is running; any stale record has been removed.
    NotRunning,
    /// The record points to a live PID whose command line does not
    /// look like ours. The file is left in place for an operator.
    Indeterminate {
        record: InstanceRecord,
        /// Display-truncated command line of the conflicting process.
        cmdline: String,
    },
}

/// Returns the record file path inside a node directory.
pub fn pid_path(dir: &Path) -> PathBuf {
    dir.join(PID_FILENAME)
}

/// Heuristic check that a command line belongs to a Trellis node.
///
/// Guards against PID reuse by unrelated processes. True when the
/// second token mentions the program name (interpreter- or
/// worker-style launches), or the first token is the controller
/// executable itself. A heuristic, not a guarantee.
pub fn looks_like_node_process(cmdline: &[String]) -> bool {
    if cmdline.len() > 1 && cmdline[1].contains(PROGRAM_NAME) {
        return true;
    }
    cmdline.first().is_some_and(|first| {
        Path::new(first)
            .file_stem()
            .is_some_and(|stem| stem == PROGRAM_NAME)
    })
}

/// Truncates a joined command line for display, keeping a prefix and
/// suffix so the operator can still recognize the program.
pub fn truncate_cmdline(cmdline: &[String]) -> String {
    let joined = cmdline.join(" ");
    // Gate and slice in characters, not bytes: a multibyte command
    // line under the width must come back verbatim.
    let total = joined.chars().count();
    if total <= CMDLINE_DISPLAY_WIDTH {
        return joined;
    }
    let prefix: String = joined.chars().take(CMDLINE_KEEP).collect();
    let suffix: String = joined.chars().skip(total - CMDLINE_KEEP).collect();
    format!("{prefix} ... {suffix}")
}

/// Classifies the state of the record file in a node directory.
///
/// Self-heals on the way: a corrupted record or one pointing at a dead
/// PID is removed and reported as `NotRunning`. A live PID that fails
/// identity verification is *not* removed — a human must resolve that.
/// Never panics and never errors; unreadable state is treated as
/// corrupt.
pub fn lookup(dir: &Path, control: &dyn ProcessControl) -> LookupVerdict {
    let path = pid_path(dir);
    if !path.is_file() {
        return LookupVerdict::NotRunning;
    }

    let record: InstanceRecord = match fs::read_to_string(&path)
        .map_err(|e| e.to_string())
        .and_then(|s| serde_json::from_str(&s).map_err(|e| e.to_string()))
    {
        Ok(record) => record,
        Err(e) => {
            remove_record(&path, &format!("corrupted ({e})"));
            return LookupVerdict::NotRunning;
        }
    };

    if !control.exists(record.pid) {
        remove_record(
            &path,
            &format!("stale, points to non-existing process {}", record.pid),
        );
        return LookupVerdict::NotRunning;
    }

    match control.inspect_cmdline(record.pid) {
        // No way to read the command line on this platform: trust the
        // live PID. The platform cannot do better.
        None => LookupVerdict::Running(record),
        // An empty command line is unverifiable, not a mismatch.
        Some(cmdline) if cmdline.is_empty() => LookupVerdict::Running(record),
        Some(cmdline) if looks_like_node_process(&cmdline) => LookupVerdict::Running(record),
        Some(cmdline) => {
            let display = truncate_cmdline(&cmdline);
            log_warn!(
                "{} points to PID {} which is not a trellis process: {}",
                path.display(),
                record.pid,
                display
            );
            log_warn!(
                "verify manually and either kill {} or delete {}",
                record.pid,
                path.display()
            );
            LookupVerdict::Indeterminate {
                record,
                cmdline: display,
            }
        }
    }
}

/// Writes the record for the *current* process.
///
/// Called by `start` only after `lookup` returned `NotRunning`. There
/// is no lock between that check and this write: two starts racing
/// inside the window may both succeed. The race is accepted — the
/// worker itself refuses to bind its resources twice, so a lost race
/// fails loudly rather than corrupting anything.
pub fn register(dir: &Path, argv: Vec<String>, options: Map<String, Value>) -> NodeResult<()> {
    let record = InstanceRecord {
        pid: std::process::id(),
        argv,
        options,
    };
    // Whole-file rewrite: a reader that catches us mid-write sees a
    // parse failure and treats the record as corrupt, never partial.
    let body = serde_json::to_string_pretty(&record)?;
    fs::write(pid_path(dir), format!("{body}\n"))
        .map_err(|e| format!("could not write {}: {e}", pid_path(dir).display()))?;
    Ok(())
}

/// Deletes the record file if present. Idempotent, best effort —
/// suitable as an exit hook on every shutdown path.
pub fn release(dir: &Path) {
    let path = pid_path(dir);
    if path.is_file()
        && let Err(e) = fs::remove_file(&path)
    {
        log_warn!("could not remove {}: {e}", path.display());
    }
}

/// Removes a bad record file, logging a recovery note either way.
fn remove_record(path: &Path, reason: &str) {
    match fs::remove_file(path) {
        Ok(()) => log_info!("{} PID file {} removed", reason, path.display()),
        Err(e) => log_info!(
            "could not remove {} PID file {}: {e}",
            reason,
            path.display()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::testing::ScriptedControl;

    fn scratch_dir() -> tempfile::TempDir {
        tempfile::tempdir().expect("failed to create temp dir")
    }

    fn sample_options() -> Map<String, Value> {
        let mut options = Map::new();
        options.insert("dir".into(), Value::String(".trellis".into()));
        options.insert("loglevel".into(), Value::String("info".into()));
        options
    }

    #[test]
    fn lookup_with_no_file_is_not_running() {
        let dir = scratch_dir();
        let control = ScriptedControl::new();

        assert_eq!(lookup(dir.path(), &control), LookupVerdict::NotRunning);
    }

    #[test]
    fn lookup_removes_corrupted_file() {
        let dir = scratch_dir();
        let control = ScriptedControl::new();
        fs::write(pid_path(dir.path()), "{not json").unwrap();

        let verdict = lookup(dir.path(), &control);

        assert_eq!(verdict, LookupVerdict::NotRunning);
        assert!(!pid_path(dir.path()).exists());
    }

    #[test]
    fn lookup_removes_stale_record_and_is_idempotent() {
        let dir = scratch_dir();
        // PID 9999999 is not in the scripted process table.
        let control = ScriptedControl::new();
        register(dir.path(), vec!["trellis".into(), "start".into()], sample_options()).unwrap();
        let stale = fs::read_to_string(pid_path(dir.path())).unwrap();
        let stale = stale.replace(&std::process::id().to_string(), "9999999");
        fs::write(pid_path(dir.path()), stale).unwrap();

        assert_eq!(lookup(dir.path(), &control), LookupVerdict::NotRunning);
        assert!(!pid_path(dir.path()).exists());
        // Second lookup with no file behaves the same, without error.
        assert_eq!(lookup(dir.path(), &control), LookupVerdict::NotRunning);
    }

    #[test]
    fn register_then_lookup_round_trips() {
        let dir = scratch_dir();
        let own_pid = std::process::id();
        let control =
            ScriptedControl::new().with_process(own_pid, &["/usr/bin/trellis", "start"]);
        let argv = vec!["trellis".to_string(), "start".to_string()];

        register(dir.path(), argv.clone(), sample_options()).unwrap();

        match lookup(dir.path(), &control) {
            LookupVerdict::Running(record) => {
                assert_eq!(record.pid, own_pid);
                assert_eq!(record.argv, argv);
                assert_eq!(record.options, sample_options());
            }
            other => panic!("expected Running, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn lookup_reclaims_record_with_oversized_pid() {
        // u32::MAX parses as a valid record but can be no real POSIX
        // process; it must read as stale, not as alive (a pid-as-i32
        // cast would probe kill(-1, 0), which always "succeeds").
        let dir = scratch_dir();
        fs::write(
            pid_path(dir.path()),
            format!(
                r#"{{"pid": {}, "argv": ["trellis", "start"], "options": {{}}}}"#,
                u32::MAX
            ),
        )
        .unwrap();

        let verdict = lookup(dir.path(), &crate::process::SignalControl);

        assert_eq!(verdict, LookupVerdict::NotRunning);
        assert!(!pid_path(dir.path()).exists());
    }

    #[test]
    fn live_pid_with_empty_cmdline_is_best_effort_running() {
        // Zombies and restricted /proc yield an empty command line:
        // unverifiable, not a mismatch. Flagging it Indeterminate
        // would make stop refuse to stop a node we started ourselves.
        let dir = scratch_dir();
        let own_pid = std::process::id();
        let control = ScriptedControl::new().with_process(own_pid, &[]);

        register(dir.path(), vec!["trellis".into()], Map::new()).unwrap();

        assert!(matches!(
            lookup(dir.path(), &control),
            LookupVerdict::Running(_)
        ));
    }

    #[test]
    fn live_pid_without_inspection_is_best_effort_running() {
        let dir = scratch_dir();
        let own_pid = std::process::id();
        let mut control = ScriptedControl::new().with_process(own_pid, &[]);
        control.inspectable = false;

        register(dir.path(), vec!["trellis".into()], Map::new()).unwrap();

        assert!(matches!(
            lookup(dir.path(), &control),
            LookupVerdict::Running(_)
        ));
    }

    #[test]
    fn live_pid_with_foreign_cmdline_is_indeterminate() {
        let dir = scratch_dir();
        let own_pid = std::process::id();
        let control =
            ScriptedControl::new().with_process(own_pid, &["/usr/bin/postgres", "-D", "/data"]);

        register(dir.path(), vec!["trellis".into()], Map::new()).unwrap();

        match lookup(dir.path(), &control) {
            LookupVerdict::Indeterminate { record, cmdline } => {
                assert_eq!(record.pid, own_pid);
                assert!(cmdline.contains("postgres"));
            }
            other => panic!("expected Indeterminate, got {other:?}"),
        }
        // The file must be left for an operator to resolve.
        assert!(pid_path(dir.path()).exists());
    }

    #[test]
    fn release_is_idempotent() {
        let dir = scratch_dir();
        register(dir.path(), vec!["trellis".into()], Map::new()).unwrap();

        release(dir.path());
        assert!(!pid_path(dir.path()).exists());
        // No file, no error.
        release(dir.path());
    }

    #[test]
    fn identity_matches_second_token() {
        let cmdline = vec!["/usr/bin/env".to_string(), "trellis-worker".to_string()];
        assert!(looks_like_node_process(&cmdline));
    }

    #[test]
    fn identity_matches_controller_executable() {
        let cmdline = vec!["/opt/bin/trellis".to_string(), "start".to_string()];
        assert!(looks_like_node_process(&cmdline));
    }

    #[test]
    fn identity_rejects_unrelated_program() {
        let cmdline = vec!["/usr/bin/postgres".to_string(), "-D".to_string()];
        assert!(!looks_like_node_process(&cmdline));
        assert!(!looks_like_node_process(&[]));
    }

    #[test]
    fn short_cmdline_displays_verbatim() {
        let cmdline = vec!["trellis".to_string(), "start".to_string()];
        assert_eq!(truncate_cmdline(&cmdline), "trellis start");
    }

    #[test]
    fn long_cmdline_keeps_prefix_and_suffix() {
        let cmdline = vec!["x".repeat(200)];
        let display = truncate_cmdline(&cmdline);
        assert_eq!(display.len(), CMDLINE_KEEP * 2 + 5);
        assert!(display.contains(" ... "));
    }

    #[test]
    fn multibyte_cmdline_under_width_is_verbatim() {
        // 60 characters but 120 bytes: byte-gating would truncate into
        // an overlapping prefix+suffix longer than the input.
        let cmdline = vec!["ö".repeat(60)];
        assert_eq!(truncate_cmdline(&cmdline), cmdline[0]);
    }

    #[test]
    fn multibyte_cmdline_over_width_truncates_by_chars() {
        let cmdline = vec!["ö".repeat(100)];
        let display = truncate_cmdline(&cmdline);
        assert_eq!(display.chars().count(), CMDLINE_KEEP * 2 + 5);
    }
}
