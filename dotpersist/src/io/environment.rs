//! Job environment lookup.
//!
//! The hook never reads process-wide state directly; hosts hand it a
//! [`JobEnvironment`] so tests can supply synthetic values.

use std::collections::BTreeMap;
use std::env::VarError;
use std::ffi::OsString;
use std::path::PathBuf;

use tracing::warn;

use crate::core::command::{HOME_VAR, PATH_VAR, ParentEnv};
use crate::core::settings::JobInputs;

/// Hosting project identifier.
pub const PROJECT_ID_VAR: &str = "SCRAPY_PROJECT_ID";
/// Name of the spider the job runs.
pub const SPIDER_VAR: &str = "SCRAPY_SPIDER";
/// Local state directory override.
pub const LOCAL_DIR_VAR: &str = "DOTSCRAPY_DIR";

/// Source of environment variables and the working directory.
pub trait JobEnvironment {
    /// Value of `key`, or `None` when unset or not valid unicode.
    fn var(&self, key: &str) -> Option<String>;

    /// Raw value of `key`, for values that name paths.
    fn var_os(&self, key: &str) -> Option<OsString>;

    /// Directory relative paths resolve against.
    fn current_dir(&self) -> PathBuf;
}

/// Reads the real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl JobEnvironment for ProcessEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        match std::env::var(key) {
            Ok(value) => Some(value),
            Err(VarError::NotPresent) => None,
            Err(VarError::NotUnicode(_)) => {
                warn!(key, "ignoring environment variable that is not valid unicode");
                None
            }
        }
    }

    fn var_os(&self, key: &str) -> Option<OsString> {
        std::env::var_os(key)
    }

    fn current_dir(&self) -> PathBuf {
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    }
}

/// Fixed set of variables, for hosts that assemble the environment
/// themselves and for tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticEnvironment {
    vars: BTreeMap<String, OsString>,
    current_dir: PathBuf,
}

impl StaticEnvironment {
    pub fn new(current_dir: impl Into<PathBuf>) -> Self {
        Self {
            vars: BTreeMap::new(),
            current_dir: current_dir.into(),
        }
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<OsString>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn set_var(&mut self, key: impl Into<String>, value: impl Into<OsString>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn remove_var(&mut self, key: &str) {
        self.vars.remove(key);
    }
}

impl JobEnvironment for StaticEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .and_then(|value| value.to_str())
            .map(str::to_string)
    }

    fn var_os(&self, key: &str) -> Option<OsString> {
        self.vars.get(key).cloned()
    }

    fn current_dir(&self) -> PathBuf {
        self.current_dir.clone()
    }
}

/// Extract the job's identity.
///
/// `spider_hint` is the host's own idea of the spider name (e.g. the spider
/// object it instantiated) and only applies when the job does not set one.
pub fn job_inputs<E: JobEnvironment + ?Sized>(env: &E, spider_hint: Option<&str>) -> JobInputs {
    JobInputs {
        project_id: env.var(PROJECT_ID_VAR),
        spider_name: env
            .var(SPIDER_VAR)
            .filter(|name| !name.trim().is_empty())
            .or_else(|| spider_hint.map(str::to_string)),
        local_dir: env
            .var_os(LOCAL_DIR_VAR)
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from),
        working_dir: env.current_dir(),
    }
}

/// HOME and PATH to forward to child processes.
pub fn parent_env<E: JobEnvironment + ?Sized>(env: &E) -> ParentEnv {
    ParentEnv {
        home: env.var(HOME_VAR),
        path: env.var(PATH_VAR),
    }
}
