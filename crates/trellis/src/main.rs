mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "trellis",
    version,
    about = "Single-instance supervisor for the Trellis application router"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that touches a node directory.
#[derive(clap::Args)]
struct DirArgs {
    /// Node directory (overrides $TRELLIS_DIR and the default .trellis)
    #[arg(long)]
    dir: Option<PathBuf>,
}

#[derive(clap::Args)]
struct StartArgs {
    #[command(flatten)]
    dir: DirArgs,
    /// Configuration file name inside the node directory
    #[arg(long)]
    config: Option<String>,
    /// How much to log: none, error, warn, info or debug
    #[arg(long, default_value = "info")]
    loglevel: String,
    /// Log to a file instead of stderr
    #[arg(long)]
    logtofile: bool,
    /// Log directory (defaults to the node directory)
    #[arg(long)]
    logdir: Option<PathBuf>,
}

#[derive(clap::Args)]
struct CheckArgs {
    #[command(flatten)]
    dir: DirArgs,
    /// Configuration file name inside the node directory
    #[arg(long)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a node from the node directory
    Start(StartArgs),
    /// Stop the node running from the node directory
    Stop(DirArgs),
    /// Restart the node running from the node directory
    Restart(DirArgs),
    /// Show whether a node is running from the node directory
    Status(DirArgs),
    /// Validate the node configuration file
    Check(CheckArgs),
    /// Print component versions
    Version,
}

/// Resolves the node directory: flag, then $TRELLIS_DIR, then
/// `.trellis` relative to the working directory.
fn resolve_dir(dir: Option<PathBuf>) -> PathBuf {
    let dir = dir
        .or_else(|| std::env::var_os("TRELLIS_DIR").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(".trellis"));
    std::path::absolute(&dir).unwrap_or(dir)
}

/// Parses and dispatches one full command invocation.
///
/// Takes the argv explicitly so `restart` can re-invoke the pipeline
/// with the saved invocation of the instance it just stopped.
pub(crate) fn run(argv: Vec<String>) -> i32 {
    let cli = match Cli::try_parse_from(&argv) {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return e.exit_code();
        }
    };

    match cli.command {
        Commands::Start(args) => commands::start::execute(&args, argv),
        Commands::Stop(args) => commands::stop::execute(&resolve_dir(args.dir)),
        Commands::Restart(args) => commands::restart::execute(&resolve_dir(args.dir), &argv),
        Commands::Status(args) => commands::status::execute(&resolve_dir(args.dir)),
        Commands::Check(args) => {
            commands::check::execute(&resolve_dir(args.dir.dir), args.config.as_deref())
        }
        Commands::Version => commands::version::execute(),
    }
}

fn main() {
    let argv: Vec<String> = std::env::args().collect();
    let code = run(argv);
    trellis_core::exit_hooks::run();
    std::process::exit(code);
}
