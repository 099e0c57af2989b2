//! Deterministic, pure logic shared by the persistence hook.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! values and return deterministic outputs suitable for tests.

pub mod command;
pub mod remote_path;
pub mod settings;
pub mod types;
