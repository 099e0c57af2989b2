//! Test-only helpers: deterministic settings, job directories, a recording
//! sync runner, and captured log output.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Result, bail};
use tempfile::TempDir;

use crate::core::command::{HOME_VAR, PATH_VAR, SyncCommand};
use crate::core::settings::Settings;
use crate::core::types::Direction;
use crate::io::environment::{PROJECT_ID_VAR, SPIDER_VAR, StaticEnvironment};
use crate::io::sync::{SyncOutcome, SyncRequest, SyncRunner};

/// Enabled settings with a bucket and both required keys.
pub fn enabled_settings() -> Settings {
    Settings {
        enabled: Some(true),
        bucket: Some("s3_bucket".to_string()),
        access_key_id: Some("access-key".to_string()),
        secret_access_key: Some("secret-key".to_string()),
        ..Settings::default()
    }
}

/// A job running in its own temporary working directory.
pub struct TestJob {
    temp: TempDir,
    pub env: StaticEnvironment,
}

impl TestJob {
    /// Job for project `123` running `test_spider`, with HOME and PATH set.
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir()?;
        let env = StaticEnvironment::new(temp.path())
            .with_var(PROJECT_ID_VAR, "123")
            .with_var(SPIDER_VAR, "test_spider")
            .with_var(HOME_VAR, "/home/user")
            .with_var(PATH_VAR, "/usr/bin:/bin");
        Ok(Self { temp, env })
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Where the hook keeps state when no override is set.
    pub fn default_local_dir(&self) -> PathBuf {
        self.temp.path().join(".scrapy/")
    }
}

/// What a [`ScriptedSyncRunner`] saw for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSync {
    pub direction: Direction,
    pub command: SyncCommand,
    pub env: BTreeMap<String, String>,
    /// Whether the local directory existed when the runner was called.
    pub local_dir_present: bool,
}

/// Scripted reply for one sync call.
#[derive(Debug, Clone)]
pub enum ScriptedSync {
    Outcome(SyncOutcome),
    /// The tool could not be run.
    Error(String),
}

/// Runner that records requests and replays queued replies.
///
/// Once the queue is empty every call succeeds. Clones share state, so a test
/// can keep one handle while the hook owns another.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSyncRunner {
    replies: Arc<Mutex<Vec<ScriptedSync>>>,
    calls: Arc<Mutex<Vec<RecordedSync>>>,
}

impl ScriptedSyncRunner {
    pub fn new(replies: Vec<ScriptedSync>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies)),
            calls: Arc::default(),
        }
    }

    /// Runner whose first call fails with `exit_code` and `output`.
    pub fn failing_once(exit_code: i32, output: &str) -> Self {
        Self::new(vec![ScriptedSync::Outcome(SyncOutcome::Failed {
            exit_code: Some(exit_code),
            output_tail: output.to_string(),
        })])
    }

    pub fn calls(&self) -> Vec<RecordedSync> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn directions(&self) -> Vec<Direction> {
        self.calls().iter().map(|call| call.direction).collect()
    }
}

impl SyncRunner for ScriptedSyncRunner {
    fn run(&self, request: &SyncRequest<'_>) -> Result<SyncOutcome> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedSync {
                direction: request.direction,
                command: request.command.clone(),
                env: request
                    .env
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                local_dir_present: request.local_path.is_dir(),
            });

        let mut replies = self.replies.lock().unwrap_or_else(PoisonError::into_inner);
        if replies.is_empty() {
            return Ok(SyncOutcome::Synced);
        }
        match replies.remove(0) {
            ScriptedSync::Outcome(outcome) => Ok(outcome),
            ScriptedSync::Error(message) => bail!(message),
        }
    }
}

/// In-memory log sink for asserting on emitted `tracing` events.
#[derive(Debug, Clone, Default)]
pub struct LogCapture {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plain-text fmt subscriber writing into this capture.
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + 'static {
        let writer = self.clone();
        tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish()
    }

    /// Run `f` with this capture as the thread's default subscriber.
    pub fn capture<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::subscriber::with_default(self.subscriber(), f)
    }

    pub fn contents(&self) -> String {
        let buf = self.buf.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
