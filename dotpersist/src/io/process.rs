//! Helpers for running child processes with merged, tail-bounded output.

use std::ffi::OsStr;
use std::io::Read;
use std::process::ExitStatus;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};

/// Bytes of merged output kept in memory per command.
pub const DEFAULT_CAPTURE_LIMIT_BYTES: usize = 64 * 1024;

/// Captured child process result.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    /// Tail of stdout and stderr, interleaved as the child wrote them.
    pub output: Vec<u8>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Last `max_chars` characters of the captured output.
    pub fn tail(&self, max_chars: usize) -> String {
        let text = String::from_utf8_lossy(&self.output);
        tail_chars(&text, max_chars).to_string()
    }
}

/// Run `program` with exactly `env` as its environment and wait for it.
///
/// stderr is redirected into stdout so the capture preserves ordering;
/// stdin is closed. A nonzero exit is returned as a normal result. Only
/// spawn and read failures are errors.
#[instrument(skip_all, fields(program = %program, capture_limit_bytes))]
pub fn run_merged<'a, A, I>(
    program: &str,
    args: &[A],
    env: I,
    capture_limit_bytes: usize,
) -> Result<CommandOutput>
where
    A: AsRef<OsStr>,
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let expression = duct::cmd(program, args)
        .full_env(env)
        .stderr_to_stdout()
        .stdin_null()
        .unchecked();

    debug!("spawning child process");
    let mut reader = match expression.reader() {
        Ok(reader) => reader,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(e).with_context(|| format!("spawn {program}"));
        }
    };

    let (output, dropped) = read_tail_limited(&mut reader, capture_limit_bytes)?;
    let status = reader
        .try_wait()
        .context("wait for command")?
        .map(|finished| finished.status)
        .ok_or_else(|| anyhow!("{program} closed its output but did not exit"))?;

    if dropped > 0 {
        warn!(dropped, "output truncated");
    }

    debug!(exit_code = ?status.code(), "command finished");
    Ok(CommandOutput { status, output })
}

/// Read to EOF, keeping only the last `limit` bytes.
fn read_tail_limited<R: Read>(mut reader: R, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut buf = Vec::new();
    let mut dropped = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.len() > limit {
            let excess = buf.len() - limit;
            buf.drain(..excess);
            dropped += excess;
        }
    }

    Ok((buf, dropped))
}

/// Suffix of `text` holding at most `max_chars` characters.
pub fn tail_chars(text: &str, max_chars: usize) -> &str {
    let total = text.chars().count();
    if total <= max_chars {
        return text;
    }
    match text.char_indices().nth(total - max_chars) {
        Some((start, _)) => &text[start..],
        None => "",
    }
}
