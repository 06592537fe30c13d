//! Child process launcher.
//!
//! The child gets exactly the injected environment: the parent's environment
//! is cleared before the mapping is applied, in order.

use crate::environment::Environment;
use crate::error::LaunchError;
use std::io;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};

/// Starts a command with a prepared environment and waits for it.
pub trait Launcher {
    /// Run `command` with `args` and `env`, returning the child's exit code.
    fn run(&self, command: &str, args: &[String], env: &Environment) -> Result<i32, LaunchError>;
}

/// Launches real processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessLauncher;

impl ProcessLauncher {
    pub fn new() -> Self {
        Self
    }

    /// Resolve `command` against the caller's `PATH`.
    ///
    /// Resolution happens before the child environment is applied, so a
    /// pristine environment without `PATH` can still launch commands.
    pub fn resolve(&self, command: &str) -> Result<PathBuf, LaunchError> {
        which::which(command).map_err(|_| {
            if command.contains(std::path::MAIN_SEPARATOR)
                && std::path::Path::new(command).exists()
            {
                LaunchError::PermissionDenied {
                    command: command.to_string(),
                }
            } else {
                LaunchError::NotFound {
                    command: command.to_string(),
                }
            }
        })
    }
}

impl Launcher for ProcessLauncher {
    fn run(&self, command: &str, args: &[String], env: &Environment) -> Result<i32, LaunchError> {
        let program = self.resolve(command)?;
        tracing::debug!(
            program = %program.display(),
            args = args.len(),
            vars = env.len(),
            "launching command"
        );

        forward_interrupts();

        let status = Command::new(&program)
            .args(args)
            .env_clear()
            .envs(env.iter())
            .status()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => LaunchError::NotFound {
                    command: command.to_string(),
                },
                io::ErrorKind::PermissionDenied => LaunchError::PermissionDenied {
                    command: command.to_string(),
                },
                _ => LaunchError::Spawn {
                    command: command.to_string(),
                    source: e,
                },
            })?;

        Ok(exit_code(status))
    }
}

/// Let Ctrl+C reach the child instead of killing the parent first.
///
/// The child shares our process group, so the terminal delivers the signal to
/// it directly. The parent only has to survive until the child exits.
fn forward_interrupts() {
    if let Err(e) = ctrlc::set_handler(|| {}) {
        tracing::debug!("interrupt handler not installed: {}", e);
    }
}

/// Map a child's exit status to our own exit code.
///
/// A child killed by a signal maps to `128 + signal`, like a shell would.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}
