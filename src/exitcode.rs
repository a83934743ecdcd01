//! Standard exit codes (BSD sysexits.h compatible)

/// Successful termination
pub const OK: i32 = 0;

/// Command line usage error
pub const USAGE: i32 = 64;

/// Data format error (bad CSV, invalid move, inconsistent nested set)
pub const DATAERR: i32 = 65;

/// Cannot open input (missing file, unknown node)
pub const NOINPUT: i32 = 66;

/// Internal software error
pub const SOFTWARE: i32 = 70;

/// Input/output error
pub const IOERR: i32 = 74;

/// Temporary failure (lock held by another process)
pub const TEMPFAIL: i32 = 75;

/// Configuration error
pub const CONFIG: i32 = 78;
