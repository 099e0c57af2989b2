//! `dotpersist`: sync a crawl's `.scrapy` directory with S3.
//!
//! Reads settings from `dotpersist.toml` (overridden by the environment) and
//! the job identity from `SCRAPY_PROJECT_ID`, `SCRAPY_SPIDER` and
//! `DOTSCRAPY_DIR`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use dotpersist::core::settings::Settings;
use dotpersist::core::types::SyncContext;
use dotpersist::error::NotConfigured;
use dotpersist::exit_codes;
use dotpersist::hook::PersistenceHook;
use dotpersist::io::config::{DEFAULT_CONFIG_FILE, load_settings};
use dotpersist::io::environment::ProcessEnvironment;
use dotpersist::io::sync::{CliSyncRunner, SyncOutcome};
use dotpersist::lifecycle::EngineSignals;
use dotpersist::logging;

#[derive(Parser)]
#[command(
    name = "dotpersist",
    version,
    about = "Persist a crawl's .scrapy directory in S3 across job runs"
)]
struct Cli {
    /// Settings file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Spider name used when SCRAPY_SPIDER is unset.
    #[arg(long, global = true)]
    spider: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the remote location of this job's state.
    Path {
        /// Print a JSON summary instead of the bare path.
        #[arg(long)]
        json: bool,
    },
    /// Download remote state into the local directory.
    Pull,
    /// Upload the local directory, mirroring deletions.
    Push,
    /// Pull, run a crawl command, then push once it exits.
    Run {
        /// Command and arguments, after `--`.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        command: Vec<String>,
    },
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let env = ProcessEnvironment;
    let settings = load_settings(&cli.config, &env)?;
    let spider = cli.spider.as_deref();

    match cli.command {
        Command::Path { json } => cmd_path(&settings, spider, json),
        Command::Pull => cmd_sync(&settings, spider, PersistenceHook::pull),
        Command::Push => cmd_sync(&settings, spider, PersistenceHook::push),
        Command::Run { command } => cmd_run(&settings, spider, &command),
    }
}

/// Summary printed by `path --json`. Credentials are never included.
#[derive(Debug, Serialize)]
struct PathSummary<'a> {
    remote_path: String,
    local_path: &'a Path,
    bucket: &'a str,
    namespace: Option<&'a str>,
    project_id: Option<&'a str>,
    spider_name: &'a str,
}

impl<'a> PathSummary<'a> {
    fn new(ctx: &'a SyncContext) -> Self {
        Self {
            remote_path: ctx.remote_path(),
            local_path: &ctx.local_path,
            bucket: &ctx.bucket,
            namespace: ctx.namespace.as_deref(),
            project_id: ctx.project_id.as_deref(),
            spider_name: &ctx.spider_name,
        }
    }
}

fn build_hook(
    settings: &Settings,
    spider: Option<&str>,
) -> Result<PersistenceHook<CliSyncRunner>, NotConfigured> {
    PersistenceHook::from_environment(
        settings,
        &ProcessEnvironment,
        spider,
        CliSyncRunner::default(),
    )
}

fn not_configured(err: &NotConfigured) -> i32 {
    eprintln!("not configured: {err}");
    exit_codes::NOT_CONFIGURED
}

fn cmd_path(settings: &Settings, spider: Option<&str>, json: bool) -> Result<i32> {
    let hook = match build_hook(settings, spider) {
        Ok(hook) => hook,
        Err(err) => return Ok(not_configured(&err)),
    };
    if json {
        let payload = hook
            .with_context(|ctx| serde_json::to_string_pretty(&PathSummary::new(ctx)))
            .context("serialize path summary")?;
        println!("{payload}");
    } else {
        println!("{}", hook.remote_path());
    }
    Ok(exit_codes::OK)
}

fn cmd_sync(
    settings: &Settings,
    spider: Option<&str>,
    sync: fn(&PersistenceHook<CliSyncRunner>) -> SyncOutcome,
) -> Result<i32> {
    let hook = match build_hook(settings, spider) {
        Ok(hook) => hook,
        Err(err) => return Ok(not_configured(&err)),
    };
    Ok(match sync(&hook) {
        SyncOutcome::Synced => exit_codes::OK,
        SyncOutcome::Failed { .. } => exit_codes::SYNC_FAILED,
    })
}

/// Play the host: install the hook, run the crawl, then stop the engine.
fn cmd_run(settings: &Settings, spider: Option<&str>, command: &[String]) -> Result<i32> {
    let Some((program, args)) = command.split_first() else {
        bail!("run requires a command");
    };

    let mut signals = EngineSignals::new();
    match PersistenceHook::install(
        settings,
        &ProcessEnvironment,
        spider,
        CliSyncRunner::default(),
        &mut signals,
    ) {
        Ok(hook) => info!(remote = %hook.remote_path(), "dot-scrapy persistence installed"),
        Err(err) => warn!(%err, "running without dot-scrapy persistence"),
    }

    info!(%program, "starting crawl");
    let result = duct::cmd(program, args).unchecked().run();
    signals.engine_stopped();

    let output = result.with_context(|| format!("spawn {program}"))?;
    Ok(output.status.code().unwrap_or(exit_codes::INVALID))
}
