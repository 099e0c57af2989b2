//! Sync command and child environment assembly.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::Path;

use secrecy::ExposeSecret;

use crate::core::types::{Credentials, Direction, SyncContext};

/// Storage CLI binary.
pub const SYNC_TOOL: &str = "aws";
/// CLI service sub-command.
pub const STORAGE_VERB: &str = "s3";
/// Removes destination objects missing at the source (push only).
pub const DELETE_FLAG: &str = "--delete";

pub const HOME_VAR: &str = "HOME";
pub const PATH_VAR: &str = "PATH";
pub const ACCESS_KEY_ID_VAR: &str = "AWS_ACCESS_KEY_ID";
pub const SECRET_ACCESS_KEY_VAR: &str = "AWS_SECRET_ACCESS_KEY";
pub const SESSION_TOKEN_VAR: &str = "AWS_SESSION_TOKEN";

/// A fully formed `aws s3 sync` invocation.
///
/// Arguments stay OS strings so local paths reach the tool byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncCommand {
    pub program: String,
    pub args: Vec<OsString>,
}

impl SyncCommand {
    /// `aws s3 sync <remote> <local>`
    pub fn pull(remote: &str, local: &Path) -> Self {
        Self::sync(&[OsStr::new(remote), local.as_os_str()])
    }

    /// `aws s3 sync --delete <local> <remote>`
    pub fn push(local: &Path, remote: &str) -> Self {
        Self::sync(&[
            OsStr::new(DELETE_FLAG),
            local.as_os_str(),
            OsStr::new(remote),
        ])
    }

    /// Command for `direction` against the context's current remote path.
    pub fn for_context(direction: Direction, ctx: &SyncContext) -> Self {
        let remote = ctx.remote_path();
        match direction {
            Direction::Pull => Self::pull(&remote, &ctx.local_path),
            Direction::Push => Self::push(&ctx.local_path, &remote),
        }
    }

    fn sync(rest: &[&OsStr]) -> Self {
        let mut args = vec![OsString::from(STORAGE_VERB), OsString::from("sync")];
        args.extend(rest.iter().map(|arg| arg.to_os_string()));
        Self {
            program: SYNC_TOOL.to_string(),
            args,
        }
    }

    /// Program followed by its arguments.
    pub fn argv(&self) -> Vec<&OsStr> {
        std::iter::once(OsStr::new(&self.program))
            .chain(self.args.iter().map(OsString::as_os_str))
            .collect()
    }
}

/// Space-joined command line; non-unicode bytes are shown lossily.
impl fmt::Display for SyncCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let line: Vec<_> = self.argv().iter().map(|arg| arg.to_string_lossy()).collect();
        f.write_str(&line.join(" "))
    }
}

/// Values inherited from the parent process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParentEnv {
    pub home: Option<String>,
    pub path: Option<String>,
}

/// The complete environment handed to the sync tool.
///
/// Nothing else from the parent process leaks through. `Debug` lists
/// variable names only.
#[derive(Clone, PartialEq, Eq)]
pub struct ChildEnv {
    vars: BTreeMap<String, String>,
}

impl ChildEnv {
    /// HOME and PATH from the parent plus the present credentials.
    ///
    /// Absent values are left out rather than forwarded empty.
    pub fn new(parent: &ParentEnv, credentials: &Credentials) -> Self {
        let mut vars = BTreeMap::new();
        let mut insert = |key: &str, value: Option<&str>| {
            if let Some(value) = value {
                vars.insert(key.to_string(), value.to_string());
            }
        };
        insert(HOME_VAR, parent.home.as_deref());
        insert(PATH_VAR, parent.path.as_deref());
        insert(
            ACCESS_KEY_ID_VAR,
            Some(credentials.access_key_id.expose_secret()),
        );
        insert(
            SECRET_ACCESS_KEY_VAR,
            Some(credentials.secret_access_key.expose_secret()),
        );
        insert(
            SESSION_TOKEN_VAR,
            credentials
                .session_token
                .as_ref()
                .map(|token| token.expose_secret()),
        );
        Self { vars }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl fmt::Debug for ChildEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.keys()).finish()
    }
}
