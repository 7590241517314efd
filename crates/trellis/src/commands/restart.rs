use std::path::Path;

use trellis_core::log;

use super::stop::{StopResult, stop_instance};

/// Stops the running instance, then re-invokes the command pipeline
/// with the invocation that originally launched it, substituting the
/// `restart` token with `start`.
///
/// With nothing running, restart degrades to a plain start of the
/// current invocation instead of failing like `stop` would.
pub fn execute(dir: &Path, current_argv: &[String]) -> i32 {
    log::init(log::Level::Info);

    let argv = match stop_instance(dir) {
        Ok(StopResult::Stopped(record)) => record.argv,
        Ok(StopResult::NotRunning) => {
            println!(
                "No Trellis node is running from node directory {} - starting one.",
                dir.display()
            );
            current_argv.to_vec()
        }
        Ok(StopResult::Refused) => return super::EX_INDETERMINATE,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };

    let argv: Vec<String> = argv
        .into_iter()
        .map(|arg| if arg == "restart" { "start".into() } else { arg })
        .collect();

    crate::run(argv)
}
