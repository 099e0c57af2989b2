//! Sync tool adapter for `aws s3 sync`.
//!
//! The [`SyncRunner`] trait decouples the hook from the actual storage CLI.
//! Tests use scripted runners that record requests without spawning
//! processes.

use std::path::Path;

use anyhow::Result;
use tracing::{debug, instrument};

use crate::core::command::{ChildEnv, SyncCommand};
use crate::core::types::Direction;
use crate::io::process::{DEFAULT_CAPTURE_LIMIT_BYTES, run_merged};

/// Characters of tool output reported when a sync fails.
pub const FAILURE_OUTPUT_CHARS: usize = 1000;

/// Parameters for one sync invocation.
#[derive(Debug, Clone, Copy)]
pub struct SyncRequest<'a> {
    pub direction: Direction,
    pub command: &'a SyncCommand,
    /// Complete environment of the child process.
    pub env: &'a ChildEnv,
    /// Local state directory taking part in the sync.
    pub local_path: &'a Path,
}

/// Result of a sync that managed to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Synced,
    Failed {
        /// `None` when the tool never ran or was killed by a signal.
        exit_code: Option<i32>,
        /// Last [`FAILURE_OUTPUT_CHARS`] characters of output or the error.
        output_tail: String,
    },
}

impl SyncOutcome {
    pub fn is_synced(&self) -> bool {
        matches!(self, SyncOutcome::Synced)
    }
}

/// Abstraction over sync backends.
pub trait SyncRunner {
    /// Run one sync. `Err` means the tool could not be run at all.
    fn run(&self, request: &SyncRequest<'_>) -> Result<SyncOutcome>;
}

/// Runner that spawns the storage CLI.
#[derive(Debug, Clone)]
pub struct CliSyncRunner {
    /// Bytes of merged output buffered while the tool runs.
    pub capture_limit_bytes: usize,
    pub failure_output_chars: usize,
}

impl Default for CliSyncRunner {
    fn default() -> Self {
        Self {
            capture_limit_bytes: DEFAULT_CAPTURE_LIMIT_BYTES,
            failure_output_chars: FAILURE_OUTPUT_CHARS,
        }
    }
}

impl SyncRunner for CliSyncRunner {
    #[instrument(skip_all, fields(direction = %request.direction))]
    fn run(&self, request: &SyncRequest<'_>) -> Result<SyncOutcome> {
        let output = run_merged(
            &request.command.program,
            &request.command.args,
            request.env.iter(),
            self.capture_limit_bytes,
        )?;

        if output.success() {
            debug!("sync tool succeeded");
            return Ok(SyncOutcome::Synced);
        }
        Ok(SyncOutcome::Failed {
            exit_code: output.status.code(),
            output_tail: output.tail(self.failure_output_chars),
        })
    }
}
