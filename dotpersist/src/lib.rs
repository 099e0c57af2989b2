//! Persistence of a crawl's `.scrapy` state directory across ephemeral jobs.
//!
//! A [`hook::PersistenceHook`] is installed when a job starts. It pulls the
//! job's state from S3 into the local directory, then pushes the directory
//! back (mirroring deletions) when the host reports that the engine stopped.
//! The architecture keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (settings validation, remote path
//!   construction, command and environment assembly). No I/O.
//! - **[`io`]**: Side-effecting operations (config files, process
//!   environment, child processes).
//!
//! [`hook`] and [`lifecycle`] wire the two together for a host framework.

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod hook;
pub mod io;
pub mod lifecycle;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
