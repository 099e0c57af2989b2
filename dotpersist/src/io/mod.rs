//! I/O helpers for the persistence hook.

pub mod config;
pub mod environment;
pub mod process;
pub mod sync;
