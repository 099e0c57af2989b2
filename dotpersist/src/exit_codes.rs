//! Stable exit codes for `dotpersist` CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Command failed due to an unreadable config or other errors.
pub const INVALID: i32 = 1;
/// Persistence is disabled or a required setting is missing.
pub const NOT_CONFIGURED: i32 = 2;
/// `dotpersist pull` or `dotpersist push` ran but the sync tool failed.
pub const SYNC_FAILED: i32 = 3;
