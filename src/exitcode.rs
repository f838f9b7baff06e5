//! Process exit codes (BSD sysexits.h compatible where one fits)

/// Run completed and every service was skipped or recreated
pub const OK: i32 = 0;

/// Run completed but at least one service failed
pub const FAILURE: i32 = 1;

/// Data format error (malformed credentials file)
pub const DATAERR: i32 = 65;

/// Cannot open input (root directory missing or unreadable)
pub const NOINPUT: i32 = 66;

/// Service unavailable (docker or compose not found)
pub const UNAVAILABLE: i32 = 69;

/// Internal software error
pub const SOFTWARE: i32 = 70;

/// Permission denied (registry login rejected)
pub const NOPERM: i32 = 77;

/// Configuration error (malformed settings file)
pub const CONFIG: i32 = 78;
