pub mod config;
pub mod exit_hooks;
pub mod log;
pub mod node;
pub mod pid;
pub mod process;
pub mod shutdown;

pub use config::NodeConfig;
pub use pid::{InstanceRecord, LookupVerdict};
pub use process::ProcessControl;
pub use shutdown::TerminateOutcome;

/// Version of the core crate, for the CLI's version report.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// A boxed error type for node operations.
///
/// Any error type that implements the `Error` trait can be boxed into
/// this. The command layer turns these into exit codes and messages.
pub type NodeResult<T> = Result<T, Box<dyn std::error::Error>>;
