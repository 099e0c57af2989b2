//! Lifecycle tests: install the hook the way a host would, stop the engine,
//! and check which syncs ran and with what.

use std::path::PathBuf;

use dotpersist::core::settings::{Settings, keys};
use dotpersist::core::types::Direction;
use dotpersist::error::NotConfigured;
use dotpersist::hook::PersistenceHook;
use dotpersist::io::environment::{LOCAL_DIR_VAR, PROJECT_ID_VAR, SPIDER_VAR};
use dotpersist::io::sync::SyncOutcome;
use dotpersist::lifecycle::EngineSignals;
use dotpersist::test_support::{
    LogCapture, ScriptedSync, ScriptedSyncRunner, TestJob, enabled_settings,
};

#[test]
fn install_pulls_into_a_created_directory_then_stop_pushes() {
    let job = TestJob::new().expect("job");
    let runner = ScriptedSyncRunner::default();
    let mut signals = EngineSignals::new();

    let hook = PersistenceHook::install(
        &enabled_settings(),
        &job.env,
        None,
        runner.clone(),
        &mut signals,
    )
    .expect("install");

    let local = job.default_local_dir();
    assert!(local.is_dir());
    assert_eq!(hook.local_path(), local);
    assert_eq!(signals.pending(), 1);

    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    let pull = &calls[0];
    assert_eq!(pull.direction, Direction::Pull);
    assert!(pull.local_dir_present);
    assert_eq!(
        pull.command.argv(),
        vec![
            "aws",
            "s3",
            "sync",
            "s3://s3_bucket/123/dot-scrapy/test_spider/",
            local.to_str().expect("utf-8 path"),
        ]
    );

    assert_eq!(signals.engine_stopped(), 1);
    let calls = runner.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(
        calls[1].command.argv(),
        vec![
            "aws",
            "s3",
            "sync",
            "--delete",
            local.to_str().expect("utf-8 path"),
            "s3://s3_bucket/123/dot-scrapy/test_spider/",
        ]
    );
}

#[test]
fn push_runs_once_even_if_stop_fires_again() {
    let job = TestJob::new().expect("job");
    let runner = ScriptedSyncRunner::default();
    let mut signals = EngineSignals::new();
    PersistenceHook::install(
        &enabled_settings(),
        &job.env,
        None,
        runner.clone(),
        &mut signals,
    )
    .expect("install");

    signals.engine_stopped();
    signals.engine_stopped();
    assert_eq!(runner.directions(), vec![Direction::Pull, Direction::Push]);
}

#[test]
fn failed_pull_does_not_block_the_job() {
    let job = TestJob::new().expect("job");
    let runner = ScriptedSyncRunner::failing_once(1, "fatal error: access denied");
    let mut signals = EngineSignals::new();

    let hook = PersistenceHook::install(
        &enabled_settings(),
        &job.env,
        None,
        runner.clone(),
        &mut signals,
    )
    .expect("install despite failed pull");

    assert_eq!(signals.pending(), 1);
    signals.engine_stopped();
    assert_eq!(runner.directions(), vec![Direction::Pull, Direction::Push]);
    assert_eq!(hook.push(), SyncOutcome::Synced);
}

#[test]
fn failed_sync_is_logged_with_command_and_output() {
    let job = TestJob::new().expect("job");
    let runner = ScriptedSyncRunner::failing_once(1, "fatal error: access denied");
    let hook =
        PersistenceHook::from_environment(&enabled_settings(), &job.env, None, runner.clone())
            .expect("hook");
    let logs = LogCapture::new();

    let outcome = logs.capture(|| hook.pull());
    assert!(!outcome.is_synced());

    let text = logs.contents();
    let command = runner.calls()[0].command.to_string();
    assert!(command.starts_with("aws s3 sync s3://s3_bucket/123/dot-scrapy/test_spider/ "));
    assert!(text.contains("ERROR"), "{text}");
    assert!(text.contains("failed to sync .scrapy directory"), "{text}");
    assert!(text.contains(&format!("command={command}")), "{text}");
    assert!(text.contains("exit_code=Some(1)"), "{text}");
    assert!(text.contains("output=fatal error: access denied"), "{text}");
    assert!(!text.contains("secret-key"), "{text}");
}

#[test]
fn successful_sync_logs_no_error() {
    let job = TestJob::new().expect("job");
    let hook = PersistenceHook::from_environment(
        &enabled_settings(),
        &job.env,
        None,
        ScriptedSyncRunner::default(),
    )
    .expect("hook");
    let logs = LogCapture::new();

    assert!(logs.capture(|| hook.push()).is_synced());
    let text = logs.contents();
    assert!(text.contains("syncing .scrapy directory to remote"), "{text}");
    assert!(!text.contains("ERROR"), "{text}");
}

#[test]
fn runner_errors_become_failed_outcomes() {
    let job = TestJob::new().expect("job");
    let runner = ScriptedSyncRunner::new(vec![ScriptedSync::Error(
        "spawn aws: No such file or directory".to_string(),
    )]);
    let hook =
        PersistenceHook::from_environment(&enabled_settings(), &job.env, None, runner.clone())
            .expect("hook");

    let outcome = hook.pull();
    assert_eq!(
        outcome,
        SyncOutcome::Failed {
            exit_code: None,
            output_tail: "spawn aws: No such file or directory".to_string(),
        }
    );
    assert!(hook.push().is_synced());
}

#[test]
fn not_configured_skips_sync_and_subscription() {
    let job = TestJob::new().expect("job");
    let cases = [
        (Settings::default(), NotConfigured::Disabled),
        (
            Settings {
                bucket: None,
                ..enabled_settings()
            },
            NotConfigured::MissingSetting(keys::BUCKET),
        ),
        (
            Settings {
                access_key_id: None,
                ..enabled_settings()
            },
            NotConfigured::MissingSetting(keys::ACCESS_KEY_ID),
        ),
        (
            Settings {
                secret_access_key: None,
                ..enabled_settings()
            },
            NotConfigured::MissingSetting(keys::SECRET_ACCESS_KEY),
        ),
    ];

    for (settings, expected) in cases {
        let runner = ScriptedSyncRunner::default();
        let mut signals = EngineSignals::new();
        let err = PersistenceHook::install(&settings, &job.env, None, runner.clone(), &mut signals)
            .err()
            .expect("not configured");
        assert_eq!(err, expected);
        assert!(runner.calls().is_empty());
        assert_eq!(signals.pending(), 0);
        assert!(!job.default_local_dir().exists());
    }
}

#[test]
fn child_env_carries_only_home_path_and_credentials() {
    let mut job = TestJob::new().expect("job");
    job.env.set_var("AWS_PROFILE", "should-not-leak");
    let settings = Settings {
        session_token: Some("session-token".to_string()),
        ..enabled_settings()
    };
    let runner = ScriptedSyncRunner::default();
    let hook = PersistenceHook::from_environment(&settings, &job.env, None, runner.clone())
        .expect("hook");

    hook.pull();
    let env = &runner.calls()[0].env;
    let keys: Vec<&str> = env.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec![
            "AWS_ACCESS_KEY_ID",
            "AWS_SECRET_ACCESS_KEY",
            "AWS_SESSION_TOKEN",
            "HOME",
            "PATH",
        ]
    );
    assert_eq!(env["HOME"], "/home/user");
    assert_eq!(env["PATH"], "/usr/bin:/bin");
    assert_eq!(env["AWS_ACCESS_KEY_ID"], "access-key");
    assert_eq!(env["AWS_SECRET_ACCESS_KEY"], "secret-key");
    assert_eq!(env["AWS_SESSION_TOKEN"], "session-token");
}

#[test]
fn missing_home_and_path_are_not_forwarded() {
    let mut job = TestJob::new().expect("job");
    job.env.remove_var("HOME");
    job.env.remove_var("PATH");
    let runner = ScriptedSyncRunner::default();
    let hook =
        PersistenceHook::from_environment(&enabled_settings(), &job.env, None, runner.clone())
            .expect("hook");

    hook.push();
    let env = &runner.calls()[0].env;
    assert!(!env.contains_key("HOME"));
    assert!(!env.contains_key("PATH"));
    assert!(!env.contains_key("AWS_SESSION_TOKEN"));
    assert_eq!(env.len(), 2);
}

#[test]
fn namespace_change_retargets_the_push() {
    let job = TestJob::new().expect("job");
    let settings = Settings {
        username: Some("username".to_string()),
        ..enabled_settings()
    };
    let runner = ScriptedSyncRunner::default();
    let mut signals = EngineSignals::new();
    let hook = PersistenceHook::install(&settings, &job.env, None, runner.clone(), &mut signals)
        .expect("install");
    assert_eq!(
        hook.remote_path(),
        "s3://s3_bucket/username/123/dot-scrapy/test_spider/"
    );

    hook.update_context(|ctx| ctx.namespace = None);
    signals.engine_stopped();

    let calls = runner.calls();
    assert_eq!(
        calls[0].command.args[2],
        "s3://s3_bucket/username/123/dot-scrapy/test_spider/"
    );
    assert_eq!(
        calls[1].command.args[4],
        "s3://s3_bucket/123/dot-scrapy/test_spider/"
    );
}

#[test]
fn job_without_identity_uses_hint_or_all_spiders() {
    let mut job = TestJob::new().expect("job");
    job.env.remove_var(PROJECT_ID_VAR);
    job.env.remove_var(SPIDER_VAR);

    let hinted = PersistenceHook::from_environment(
        &enabled_settings(),
        &job.env,
        Some("test_spider"),
        ScriptedSyncRunner::default(),
    )
    .expect("hook");
    assert_eq!(hinted.remote_path(), "s3://s3_bucket/dot-scrapy/test_spider/");

    let unnamed = PersistenceHook::from_environment(
        &enabled_settings(),
        &job.env,
        None,
        ScriptedSyncRunner::default(),
    )
    .expect("hook");
    assert_eq!(unnamed.remote_path(), "s3://s3_bucket/dot-scrapy/all-spiders/");
}

#[test]
fn local_dir_override_is_created_and_synced() {
    let mut job = TestJob::new().expect("job");
    let custom: PathBuf = job.path().join("state").join("nested");
    job.env.set_var(LOCAL_DIR_VAR, custom.as_os_str());
    let runner = ScriptedSyncRunner::default();
    let hook =
        PersistenceHook::from_environment(&enabled_settings(), &job.env, None, runner.clone())
            .expect("hook");

    assert!(hook.pull().is_synced());
    assert!(custom.is_dir());
    assert!(!job.default_local_dir().exists());
    assert_eq!(PathBuf::from(&runner.calls()[0].command.args[3]), custom);
}

#[test]
fn pull_reports_failure_when_local_dir_cannot_be_created() {
    let mut job = TestJob::new().expect("job");
    let blocker = job.path().join("blocker");
    std::fs::write(&blocker, "not a directory").expect("write");
    job.env.set_var(LOCAL_DIR_VAR, blocker.join(".scrapy"));
    let runner = ScriptedSyncRunner::default();
    let hook =
        PersistenceHook::from_environment(&enabled_settings(), &job.env, None, runner.clone())
            .expect("hook");

    let outcome = hook.pull();
    assert!(matches!(outcome, SyncOutcome::Failed { exit_code: None, .. }));
    assert!(runner.calls().is_empty());
}
