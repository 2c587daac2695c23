//! Compiler process management.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use jitforge_core::{JitError, Result};
use tracing::{info, warn};

use crate::toolchain::Toolchain;

const POLL_MIN: Duration = Duration::from_millis(5);
const POLL_MAX: Duration = Duration::from_millis(100);

/// Runs the configured compiler on one source file at a time.
///
/// Stateless apart from the toolchain; safe to share across threads.
#[derive(Debug, Clone, Default)]
pub struct BuildExecutor {
    toolchain: Toolchain,
}

impl BuildExecutor {
    pub fn new(toolchain: Toolchain) -> Self {
        Self { toolchain }
    }

    pub fn toolchain(&self) -> &Toolchain {
        &self.toolchain
    }

    /// Compiles `source` into the shared library `output`.
    ///
    /// The command line and the compiler's combined stdout/stderr are written
    /// to `log` whatever the outcome.
    ///
    /// # Errors
    ///
    /// - `ToolchainNotFound` if the compiler executable does not exist
    /// - `Compile` if it exits non-zero or produces no output
    /// - `Timeout` if it outlives the toolchain timeout; its whole process
    ///   group is killed first
    pub fn build(&self, source: &Path, output: &Path, log: &Path) -> Result<PathBuf> {
        let tc = &self.toolchain;
        let args = tc.args(source, output);

        let mut log_file = File::create(log)?;
        write!(log_file, "$ {}", tc.compiler)?;
        for arg in &args {
            write!(log_file, " {}", arg.to_string_lossy())?;
        }
        writeln!(log_file)?;

        let mut cmd = Command::new(&tc.compiler);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log_file.try_clone()?))
            .stderr(Stdio::from(log_file));
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        info!(
            event = "build_start",
            compiler = %tc.compiler,
            source = %source.display(),
        );
        let start = Instant::now();

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(JitError::ToolchainNotFound(format!(
                    "compiler `{}` not found",
                    tc.compiler
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let status = wait_timeout(&mut child, tc.timeout)?;
        let duration_ms = start.elapsed().as_millis() as u64;

        let Some(status) = status else {
            kill_process_group(&mut child);
            let _ = child.wait();
            warn!(
                event = "build_timeout",
                source = %source.display(),
                limit_secs = tc.timeout.as_secs_f64(),
            );
            return Err(JitError::Timeout {
                limit: tc.timeout,
                log: read_log(log),
            });
        };

        if !status.success() {
            warn!(event = "build_failed", status = %status, duration_ms);
            return Err(JitError::Compile {
                status: status.to_string(),
                log: read_log(log),
            });
        }
        if !output.is_file() {
            warn!(event = "build_failed", status = "no output", duration_ms);
            return Err(JitError::Compile {
                status: format!("{status}, but {} was not produced", output.display()),
                log: read_log(log),
            });
        }

        info!(event = "build_end", output = %output.display(), duration_ms);
        Ok(output.to_path_buf())
    }
}

/// Polls `child` until it exits or `limit` elapses; `None` on timeout.
///
/// A limit too large to represent as an `Instant` means no deadline.
fn wait_timeout(child: &mut Child, limit: Duration) -> Result<Option<ExitStatus>> {
    let deadline = Instant::now().checked_add(limit);
    let mut pause = POLL_MIN;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        match deadline {
            Some(deadline) if now >= deadline => return Ok(None),
            Some(deadline) => thread::sleep(pause.min(deadline - now)),
            None => thread::sleep(pause),
        }
        pause = (pause * 2).min(POLL_MAX);
    }
}

#[cfg(unix)]
fn kill_process_group(child: &mut Child) {
    // The child leads its own group (process_group(0)), so its pid is the pgid.
    let pgid = child.id() as libc::pid_t;
    // SAFETY: killpg only sends a signal; an already-exited group yields ESRCH.
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc != 0 {
        let _ = child.kill();
    }
}

#[cfg(not(unix))]
fn kill_process_group(child: &mut Child) {
    let _ = child.kill();
}

fn read_log(path: &Path) -> String {
    fs::read(path)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}
