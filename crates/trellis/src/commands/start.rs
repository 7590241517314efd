use std::sync::mpsc;

use serde_json::{Map, Value, json};
use trellis_core::node::Node;
use trellis_core::pid::{self, LookupVerdict};
use trellis_core::{config, exit_hooks, log, process};

use super::{EX_INDETERMINATE, banner};
use crate::StartArgs;

pub fn execute(args: &StartArgs, argv: Vec<String>) -> i32 {
    let dir = crate::resolve_dir(args.dir.dir.clone());
    let level = log::Level::parse(&args.loglevel);
    if args.logtofile {
        let logdir = args.logdir.clone().unwrap_or_else(|| dir.clone());
        log::init_file(level, &logdir);
    } else {
        log::init(level);
    }

    let control = match process::platform_control() {
        Ok(control) => control,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };

    // Refuse to run two instances from one node directory. The window
    // between this lookup and register below is unlocked: two starts
    // racing through it may both get here. Accepted - the worker
    // refuses to bind its resources twice, so the loser fails loudly.
    match pid::lookup(&dir, control.as_ref()) {
        LookupVerdict::NotRunning => {}
        LookupVerdict::Running(record) => {
            println!(
                "Trellis is already running from node directory {} (PID {}).",
                dir.display(),
                record.pid
            );
            return 1;
        }
        LookupVerdict::Indeterminate { record, cmdline } => {
            eprintln!(
                "Refusing to start: {} points to live PID {} which does not look like a trellis process:",
                pid::pid_path(&dir).display(),
                record.pid
            );
            eprintln!("  {cmdline}");
            return EX_INDETERMINATE;
        }
    }

    let config_path = config::config_path(&dir, args.config.as_deref());
    let node_config = match config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("*** Configuration validation failed ***");
            eprintln!("{e}");
            return 1;
        }
    };

    // Signal handling goes in before the record is written: anyone
    // who can see the PID file must be able to stop us gracefully.
    let (tx, rx) = mpsc::channel();
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = tx.send(());
    }) {
        eprintln!("Error: could not install signal handler: {e}");
        return 1;
    }

    if let Err(e) = pid::register(&dir, argv, resolved_options(args, &dir)) {
        eprintln!("Error: {e}");
        return 1;
    }

    // Remove the record on every exit path of this process, including
    // termination signals - main runs the hooks on the way out.
    {
        let dir = dir.clone();
        exit_hooks::register(move || pid::release(&dir));
    }

    banner::print(&dir);

    let node = Node::new(node_config);
    match node.run(&rx) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Could not start node: {e}");
            1
        }
    }
}

/// Resolved option values persisted in the instance record, so
/// `status` can show how the node was launched. The argv is stored
/// separately; nothing non-serializable goes in.
fn resolved_options(args: &StartArgs, dir: &std::path::Path) -> Map<String, Value> {
    let mut options = Map::new();
    options.insert("dir".into(), json!(dir.display().to_string()));
    options.insert("config".into(), json!(args.config));
    options.insert("loglevel".into(), json!(args.loglevel));
    options.insert("logtofile".into(), json!(args.logtofile));
    options.insert(
        "logdir".into(),
        json!(args.logdir.as_ref().map(|p| p.display().to_string())),
    );
    options
}
