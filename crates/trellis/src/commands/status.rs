use std::path::Path;

use trellis_core::pid::{self, LookupVerdict};
use trellis_core::{log, process};

use super::{EX_INDETERMINATE, EX_UNAVAILABLE};

pub fn execute(dir: &Path) -> i32 {
    log::init(log::Level::Info);

    let control = match process::platform_control() {
        Ok(control) => control,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };

    match pid::lookup(dir, control.as_ref()) {
        LookupVerdict::Running(record) => {
            println!(
                "A Trellis node is running from node directory {} (PID {}).",
                dir.display(),
                record.pid
            );
            0
        }
        LookupVerdict::NotRunning => {
            println!(
                "No Trellis node is currently running from node directory {}.",
                dir.display()
            );
            EX_UNAVAILABLE
        }
        LookupVerdict::Indeterminate { record, cmdline } => {
            eprintln!(
                "Warning: {} points to PID {} which does not look like a trellis process:",
                pid::pid_path(dir).display(),
                record.pid
            );
            eprintln!("  {cmdline}");
            eprintln!(
                "Verify manually and either kill {} or delete {}.",
                record.pid,
                pid::pid_path(dir).display()
            );
            EX_INDETERMINATE
        }
    }
}
