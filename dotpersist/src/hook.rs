//! The persistence hook: pull at job start, push once the engine stops.
//!
//! Both directions are best-effort. A failed sync is logged with the command
//! and the tail of the tool's output, and the job carries on.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{error, info, instrument};

use crate::core::command::{ChildEnv, ParentEnv, SyncCommand};
use crate::core::settings::{JobInputs, Settings};
use crate::core::types::{Direction, SyncContext};
use crate::error::NotConfigured;
use crate::io::environment::{JobEnvironment, job_inputs, parent_env};
use crate::io::process::tail_chars;
use crate::io::sync::{FAILURE_OUTPUT_CHARS, SyncOutcome, SyncRequest, SyncRunner};
use crate::lifecycle::LifecycleNotifier;

/// Keeps a job's `.scrapy` directory in sync with S3.
pub struct PersistenceHook<R> {
    context: RwLock<SyncContext>,
    /// Built once; later context changes do not alter it.
    env: ChildEnv,
    runner: R,
}

impl<R: SyncRunner> PersistenceHook<R> {
    /// Validate settings and build the hook without syncing anything.
    pub fn new(
        settings: &Settings,
        job: &JobInputs,
        parent: &ParentEnv,
        runner: R,
    ) -> Result<Self, NotConfigured> {
        let context = settings.resolve(job)?;
        let env = ChildEnv::new(parent, &context.credentials);
        Ok(Self {
            context: RwLock::new(context),
            env,
            runner,
        })
    }

    /// Like [`PersistenceHook::new`], reading job identity and HOME/PATH
    /// from `env`.
    pub fn from_environment<E: JobEnvironment + ?Sized>(
        settings: &Settings,
        env: &E,
        spider_hint: Option<&str>,
        runner: R,
    ) -> Result<Self, NotConfigured> {
        Self::new(
            settings,
            &job_inputs(env, spider_hint),
            &parent_env(env),
            runner,
        )
    }

    /// Construct, pull, and subscribe the push to engine-stopped.
    ///
    /// Returns [`NotConfigured`] without syncing or subscribing when the hook
    /// is disabled or incomplete.
    pub fn install<E, N>(
        settings: &Settings,
        env: &E,
        spider_hint: Option<&str>,
        runner: R,
        notifier: &mut N,
    ) -> Result<Arc<Self>, NotConfigured>
    where
        R: Send + Sync + 'static,
        E: JobEnvironment + ?Sized,
        N: LifecycleNotifier + ?Sized,
    {
        let hook = Arc::new(Self::from_environment(settings, env, spider_hint, runner)?);
        hook.pull();
        let on_stop = Arc::clone(&hook);
        notifier.on_engine_stopped(Box::new(move || {
            on_stop.push();
        }));
        Ok(hook)
    }

    /// Download the remote state into the local directory.
    ///
    /// The directory is created first; some sync tools treat a missing
    /// destination as a file.
    #[instrument(skip_all)]
    pub fn pull(&self) -> SyncOutcome {
        let (command, remote, local_path) = self.plan(Direction::Pull);
        info!(%remote, local = %local_path.display(), "syncing .scrapy directory from remote");

        if !local_path.is_dir()
            && let Err(err) = fs::create_dir_all(&local_path)
        {
            let output_tail = format!("create {}: {err}", local_path.display());
            error!(%command, output = %output_tail, "failed to sync .scrapy directory");
            return SyncOutcome::Failed {
                exit_code: None,
                output_tail,
            };
        }

        self.run(Direction::Pull, &command, &local_path)
    }

    /// Upload the local directory, deleting remote entries missing locally.
    #[instrument(skip_all)]
    pub fn push(&self) -> SyncOutcome {
        let (command, remote, local_path) = self.plan(Direction::Push);
        info!(%remote, local = %local_path.display(), "syncing .scrapy directory to remote");
        self.run(Direction::Push, &command, &local_path)
    }

    fn plan(&self, direction: Direction) -> (SyncCommand, String, PathBuf) {
        self.with_context(|ctx| {
            (
                SyncCommand::for_context(direction, ctx),
                ctx.remote_path(),
                ctx.local_path.clone(),
            )
        })
    }

    fn run(&self, direction: Direction, command: &SyncCommand, local_path: &Path) -> SyncOutcome {
        let request = SyncRequest {
            direction,
            command,
            env: &self.env,
            local_path,
        };
        let outcome = match self.runner.run(&request) {
            Ok(outcome) => outcome,
            Err(err) => SyncOutcome::Failed {
                exit_code: None,
                output_tail: tail_chars(&format!("{err:#}"), FAILURE_OUTPUT_CHARS).to_string(),
            },
        };
        if let SyncOutcome::Failed {
            exit_code,
            output_tail,
        } = &outcome
        {
            error!(
                %direction,
                %command,
                exit_code = ?exit_code,
                output = %output_tail,
                "failed to sync .scrapy directory"
            );
        }
        outcome
    }
}

impl<R> PersistenceHook<R> {
    /// Current remote location, recomputed from the context on every call.
    pub fn remote_path(&self) -> String {
        self.with_context(SyncContext::remote_path)
    }

    pub fn local_path(&self) -> PathBuf {
        self.with_context(|ctx| ctx.local_path.clone())
    }

    /// Environment handed to the sync tool.
    pub fn child_env(&self) -> &ChildEnv {
        &self.env
    }

    /// Read the context.
    pub fn with_context<T>(&self, f: impl FnOnce(&SyncContext) -> T) -> T {
        let guard = self.context.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    /// Change the context; the next sync targets the recomputed path.
    pub fn update_context(&self, f: impl FnOnce(&mut SyncContext)) {
        let mut guard = self.context.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard);
    }
}
