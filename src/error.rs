//! Error kinds for a single `exec` run.
//!
//! Every error here is terminal for the current invocation. There is no retry
//! anywhere in the pipeline.

use std::io;
use thiserror::Error;

/// Exit code used when injection itself fails (validation, store, strict mode).
pub const EXIT_INJECTION_FAILED: i32 = 125;

/// Exit code used when the command exists but cannot be executed.
pub const EXIT_NOT_EXECUTABLE: i32 = 126;

/// Exit code used when the command cannot be found.
pub const EXIT_NOT_FOUND: i32 = 127;

/// Fatal errors raised while preparing or launching the child process.
#[derive(Debug, Error)]
pub enum ExecError {
    /// A service name was rejected before any secret was fetched.
    #[error("invalid service '{service}': {reason}")]
    ServiceValidation {
        /// The rejected service name
        service: String,
        /// Why it was rejected
        reason: String,
    },

    /// The secret store failed to produce a service's secrets.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Strict mode found a sentinel variable with no matching secret.
    #[error("extra unfilled env var {name}")]
    StrictValidation {
        /// Name of the first unfilled variable
        name: String,
    },

    /// The child process could not be started.
    #[error(transparent)]
    Launch(#[from] LaunchError),
}

impl ExecError {
    /// Process exit code for this failure.
    ///
    /// Codes follow the `env(1)` convention so that a failure to inject can be
    /// told apart from the child command's own exit status.
    pub fn exit_code(&self) -> i32 {
        match self {
            ExecError::ServiceValidation { .. }
            | ExecError::Store(_)
            | ExecError::StrictValidation { .. } => EXIT_INJECTION_FAILED,
            ExecError::Launch(LaunchError::NotFound { .. }) => EXIT_NOT_FOUND,
            ExecError::Launch(LaunchError::PermissionDenied { .. }) => EXIT_NOT_EXECUTABLE,
            ExecError::Launch(LaunchError::Spawn { .. }) => EXIT_NOT_EXECUTABLE,
        }
    }
}

/// Errors from the secret store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no secrets found for service '{service}' (looked for {path})")]
    NotFound { service: String, path: String },

    #[error("failed to read secrets for service '{service}': {message}")]
    Read { service: String, message: String },

    #[error("failed to parse secrets for service '{service}': {message}")]
    Parse { service: String, message: String },

    #[error("failed to decrypt secrets for service '{service}': {message}")]
    Decrypt { service: String, message: String },

    /// Two distinct secret paths normalized to the same variable name.
    #[error("paths '{first}' and '{second}' in service '{service}' both map to variable {name}")]
    NormalizationCollision {
        service: String,
        name: String,
        first: String,
        second: String,
    },
}

/// Errors from starting the child process.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("command not found: {command}")]
    NotFound { command: String },

    #[error("permission denied: {command}")]
    PermissionDenied { command: String },

    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_validation_message() {
        let err = ExecError::StrictValidation {
            name: "EXTRA".to_string(),
        };
        assert_eq!(err.to_string(), "extra unfilled env var EXTRA");
    }

    #[test]
    fn test_exit_codes_are_distinct_from_common_child_codes() {
        let strict = ExecError::StrictValidation {
            name: "X".to_string(),
        };
        let missing = ExecError::Launch(LaunchError::NotFound {
            command: "nope".to_string(),
        });
        let denied = ExecError::Launch(LaunchError::PermissionDenied {
            command: "./script".to_string(),
        });

        assert_eq!(strict.exit_code(), EXIT_INJECTION_FAILED);
        assert_eq!(missing.exit_code(), EXIT_NOT_FOUND);
        assert_eq!(denied.exit_code(), EXIT_NOT_EXECUTABLE);
    }

    #[test]
    fn test_store_error_is_surfaced_verbatim() {
        let err: ExecError = StoreError::Read {
            service: "db".to_string(),
            message: "connection reset".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "failed to read secrets for service 'db': connection reset"
        );
        assert_eq!(err.exit_code(), EXIT_INJECTION_FAILED);
    }
}
