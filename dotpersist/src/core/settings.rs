//! Typed settings and their validation into a [`SyncContext`].

use std::fmt;
use std::path::PathBuf;

use secrecy::SecretString;
use serde::Deserialize;

use crate::core::types::{Credentials, SyncContext};
use crate::error::NotConfigured;

/// Setting names as the host framework spells them.
pub mod keys {
    pub const ENABLED: &str = "DOTSCRAPY_ENABLED";
    pub const LEGACY_ENABLED: &str = "DOTSCRAPYPERSISTENCE_ENABLED";
    pub const BUCKET: &str = "ADDONS_S3_BUCKET";
    pub const ACCESS_KEY_ID: &str = "ADDONS_AWS_ACCESS_KEY_ID";
    pub const SECRET_ACCESS_KEY: &str = "ADDONS_AWS_SECRET_ACCESS_KEY";
    pub const SESSION_TOKEN: &str = "ADDONS_AWS_SESSION_TOKEN";
    pub const USERNAME: &str = "ADDONS_AWS_USERNAME";
    pub const LOCAL_DIR: &str = "DOTSCRAPY_DIR";
}

/// Spider segment used when neither the job nor the host names a spider.
pub const ALL_SPIDERS: &str = "all-spiders";

/// Local state directory, relative to the working directory.
pub const DEFAULT_LOCAL_DIR: &str = ".scrapy/";

/// Host settings consumed by the hook.
///
/// Populated once by the configuration loader; every value is already typed.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(rename = "DOTSCRAPY_ENABLED")]
    pub enabled: Option<bool>,
    #[serde(rename = "DOTSCRAPYPERSISTENCE_ENABLED")]
    pub legacy_enabled: Option<bool>,
    #[serde(rename = "ADDONS_S3_BUCKET")]
    pub bucket: Option<String>,
    #[serde(rename = "ADDONS_AWS_ACCESS_KEY_ID")]
    pub access_key_id: Option<String>,
    #[serde(rename = "ADDONS_AWS_SECRET_ACCESS_KEY")]
    pub secret_access_key: Option<String>,
    #[serde(rename = "ADDONS_AWS_SESSION_TOKEN")]
    pub session_token: Option<String>,
    /// Namespace folder inside the bucket.
    #[serde(rename = "ADDONS_AWS_USERNAME")]
    pub username: Option<String>,
    #[serde(rename = "DOTSCRAPY_DIR")]
    pub local_dir: Option<PathBuf>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("enabled", &self.enabled)
            .field("legacy_enabled", &self.legacy_enabled)
            .field("bucket", &self.bucket)
            .field("access_key_id", &redacted(&self.access_key_id))
            .field("secret_access_key", &redacted(&self.secret_access_key))
            .field("session_token", &redacted(&self.session_token))
            .field("username", &self.username)
            .field("local_dir", &self.local_dir)
            .finish()
    }
}

fn redacted(value: &Option<String>) -> Option<&'static str> {
    value.as_ref().map(|_| "[REDACTED]")
}

/// Job identity read from the hosting environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobInputs {
    pub project_id: Option<String>,
    /// Spider name from the job, or the host's hint when the job has none.
    pub spider_name: Option<String>,
    /// Local directory override from the job environment.
    pub local_dir: Option<PathBuf>,
    /// Directory the default local path is resolved against.
    pub working_dir: PathBuf,
}

impl Settings {
    /// Either enable flag being true activates the hook.
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(false) || self.legacy_enabled.unwrap_or(false)
    }

    /// Validate settings and combine them with job inputs.
    ///
    /// Blank strings count as missing.
    pub fn resolve(&self, job: &JobInputs) -> Result<SyncContext, NotConfigured> {
        if !self.is_enabled() {
            return Err(NotConfigured::Disabled);
        }
        let bucket = required(&self.bucket, keys::BUCKET)?;
        let access_key_id = required(&self.access_key_id, keys::ACCESS_KEY_ID)?;
        let secret_access_key = required(&self.secret_access_key, keys::SECRET_ACCESS_KEY)?;

        let local_path = non_empty(&job.local_dir)
            .or_else(|| non_empty(&self.local_dir))
            .unwrap_or_else(|| job.working_dir.join(DEFAULT_LOCAL_DIR));

        Ok(SyncContext {
            bucket,
            namespace: present(&self.username),
            project_id: present(&job.project_id),
            spider_name: present(&job.spider_name).unwrap_or_else(|| ALL_SPIDERS.to_string()),
            local_path,
            credentials: Credentials {
                access_key_id: secret(access_key_id),
                secret_access_key: secret(secret_access_key),
                session_token: present(&self.session_token).map(secret),
            },
        })
    }
}

fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn non_empty(dir: &Option<PathBuf>) -> Option<PathBuf> {
    dir.clone().filter(|dir| !dir.as_os_str().is_empty())
}

fn required(value: &Option<String>, key: &'static str) -> Result<String, NotConfigured> {
    present(value).ok_or(NotConfigured::MissingSetting(key))
}

fn secret(value: String) -> SecretString {
    SecretString::new(value.into())
}
