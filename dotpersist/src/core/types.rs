//! Domain types for one job's sync target.

use std::fmt;
use std::path::PathBuf;

use secrecy::SecretString;

use crate::core::remote_path::build_remote_path;

/// Storage credentials forwarded to the sync tool.
///
/// Secret values stay wrapped so `Debug` output and tracing fields never show
/// them.
#[derive(Debug)]
pub struct Credentials {
    pub access_key_id: SecretString,
    pub secret_access_key: SecretString,
    pub session_token: Option<SecretString>,
}

/// Everything needed to address a job's state directory.
#[derive(Debug)]
pub struct SyncContext {
    /// Bucket holding all persisted state.
    pub bucket: String,
    /// Optional account/tenant folder inside the bucket.
    pub namespace: Option<String>,
    /// Hosting project identifier, absent when running locally.
    pub project_id: Option<String>,
    /// Trailing path segment.
    pub spider_name: String,
    /// Local state directory (pull destination, push source).
    pub local_path: PathBuf,
    pub credentials: Credentials,
}

impl SyncContext {
    /// Remote location for this context.
    ///
    /// Recomputed on every call so changes to `namespace`, `project_id` or
    /// `spider_name` apply to the next sync.
    pub fn remote_path(&self) -> String {
        build_remote_path(
            &self.bucket,
            self.namespace.as_deref(),
            self.project_id.as_deref(),
            &self.spider_name,
        )
    }
}

/// Direction of a sync relative to the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Remote → local, before the job runs.
    Pull,
    /// Local → remote with deletions, after the job stops.
    Push,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Pull => f.write_str("pull"),
            Direction::Push => f.write_str("push"),
        }
    }
}
