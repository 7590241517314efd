pub mod banner;
pub mod check;
pub mod restart;
pub mod start;
pub mod status;
pub mod stop;
pub mod version;

/// Exit code for "no instance running": the BSD sysexits
/// EX_UNAVAILABLE where the platform defines it, 1 elsewhere.
#[cfg(unix)]
pub const EX_UNAVAILABLE: i32 = 69;
#[cfg(not(unix))]
pub const EX_UNAVAILABLE: i32 = 1;

/// Exit code for an unresolvable verdict: the record points at a live
/// PID that does not look like a trellis process. Distinct from both
/// "running" (0) and "not running" (`EX_UNAVAILABLE`).
pub const EX_INDETERMINATE: i32 = 2;
