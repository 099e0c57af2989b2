//! Settings loaded from `dotpersist.toml` and the process environment.
//!
//! The file uses the host framework's setting names as keys:
//!
//! ```toml
//! DOTSCRAPY_ENABLED = true
//! ADDONS_S3_BUCKET = "my-bucket"
//! ADDONS_AWS_ACCESS_KEY_ID = "..."
//! ADDONS_AWS_SECRET_ACCESS_KEY = "..."
//! ```
//!
//! Any of the same names set in the environment override the file, except
//! `DOTSCRAPY_DIR`, which the job environment supplies separately. This is
//! the only place string values are coerced into typed settings.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::debug;

use crate::core::settings::{Settings, keys};
use crate::io::environment::JobEnvironment;

/// Default settings file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "dotpersist.toml";

/// Load settings from a TOML file.
///
/// If the file is missing, returns `Settings::default()` (disabled).
pub fn load_settings_file(path: &Path) -> Result<Settings> {
    if !path.exists() {
        debug!(path = %path.display(), "settings file missing, using defaults");
        return Ok(Settings::default());
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let settings: Settings =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    Ok(settings)
}

/// Load the file, then apply environment overrides.
pub fn load_settings<E: JobEnvironment + ?Sized>(path: &Path, env: &E) -> Result<Settings> {
    let mut settings = load_settings_file(path)?;
    apply_env_overrides(&mut settings, env)?;
    Ok(settings)
}

/// Override settings with same-named environment variables.
pub fn apply_env_overrides<E: JobEnvironment + ?Sized>(
    settings: &mut Settings,
    env: &E,
) -> Result<()> {
    if let Some(raw) = env.var(keys::ENABLED) {
        settings.enabled = Some(parse_bool(keys::ENABLED, &raw)?);
    }
    if let Some(raw) = env.var(keys::LEGACY_ENABLED) {
        settings.legacy_enabled = Some(parse_bool(keys::LEGACY_ENABLED, &raw)?);
    }
    override_string(&mut settings.bucket, env, keys::BUCKET);
    override_string(&mut settings.access_key_id, env, keys::ACCESS_KEY_ID);
    override_string(&mut settings.secret_access_key, env, keys::SECRET_ACCESS_KEY);
    override_string(&mut settings.session_token, env, keys::SESSION_TOKEN);
    override_string(&mut settings.username, env, keys::USERNAME);
    // DOTSCRAPY_DIR in the environment is a job input, read by `job_inputs`.
    Ok(())
}

fn override_string<E: JobEnvironment + ?Sized>(slot: &mut Option<String>, env: &E, key: &str) {
    if let Some(value) = env.var(key) {
        debug!(key, "setting overridden from environment");
        *slot = Some(value);
    }
}

/// Parse a boolean the way the host's settings API does.
pub fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim() {
        "1" | "true" | "True" | "TRUE" | "yes" => Ok(true),
        "0" | "false" | "False" | "FALSE" | "no" | "" => Ok(false),
        other => bail!("{key} must be a boolean, got {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::io::environment::StaticEnvironment;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let settings = load_settings_file(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(settings, Settings::default());
        assert!(!settings.is_enabled());
    }

    #[test]
    fn load_reads_host_setting_names() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(DEFAULT_CONFIG_FILE);
        fs::write(
            &path,
            r#"
DOTSCRAPYPERSISTENCE_ENABLED = true
ADDONS_S3_BUCKET = "test-bucket"
ADDONS_AWS_ACCESS_KEY_ID = "access-key"
ADDONS_AWS_SECRET_ACCESS_KEY = "secret-key"
ADDONS_AWS_USERNAME = "test-user"
DOTSCRAPY_DIR = "/tmp/.scrapy"
UNRELATED_SETTING = 5
"#,
        )
        .expect("write");

        let settings = load_settings_file(&path).expect("load");
        assert_eq!(settings.enabled, None);
        assert_eq!(settings.legacy_enabled, Some(true));
        assert!(settings.is_enabled());
        assert_eq!(settings.bucket.as_deref(), Some("test-bucket"));
        assert_eq!(settings.username.as_deref(), Some("test-user"));
        assert_eq!(settings.local_dir, Some(PathBuf::from("/tmp/.scrapy")));
        assert_eq!(settings.session_token, None);
    }

    #[test]
    fn load_rejects_malformed_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, "DOTSCRAPY_ENABLED = \"maybe\"\n").expect("write");
        let err = load_settings_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("parse"));
    }

    #[test]
    fn environment_overrides_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(DEFAULT_CONFIG_FILE);
        fs::write(
            &path,
            "DOTSCRAPY_ENABLED = false\nADDONS_S3_BUCKET = \"from-file\"\n",
        )
        .expect("write");
        let env = StaticEnvironment::new(temp.path())
            .with_var(keys::ENABLED, "True")
            .with_var(keys::BUCKET, "from-env")
            .with_var(keys::SESSION_TOKEN, "token");

        let settings = load_settings(&path, &env).expect("load");
        assert_eq!(settings.enabled, Some(true));
        assert_eq!(settings.bucket.as_deref(), Some("from-env"));
        assert_eq!(settings.session_token.as_deref(), Some("token"));
    }

    #[test]
    fn local_dir_variable_does_not_replace_the_file_setting() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, "DOTSCRAPY_DIR = \"/from/file\"\n").expect("write");
        let env = StaticEnvironment::new(temp.path()).with_var(keys::LOCAL_DIR, "");

        let settings = load_settings(&path, &env).expect("load");
        assert_eq!(settings.local_dir, Some(PathBuf::from("/from/file")));
    }

    #[test]
    fn invalid_boolean_names_the_key() {
        let mut settings = Settings::default();
        let env = StaticEnvironment::new("/work").with_var(keys::LEGACY_ENABLED, "sometimes");
        let err = apply_env_overrides(&mut settings, &env).unwrap_err();
        assert!(err.to_string().contains(keys::LEGACY_ENABLED));
    }

    #[test]
    fn parse_bool_accepts_host_spellings() {
        for raw in ["1", "true", "True", "yes"] {
            assert!(parse_bool("K", raw).expect(raw));
        }
        for raw in ["0", "false", "False", "no", ""] {
            assert!(!parse_bool("K", raw).expect(raw));
        }
    }
}
