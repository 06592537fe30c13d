//! The `exec` pipeline: validate services, inject secrets, launch the command.

use crate::engine::{inject, CollisionEvent, Injection};
use crate::environment::Environment;
use crate::error::ExecError;
use crate::launcher::Launcher;
use crate::policy::PolicyFlags;
use crate::service::validate_service;
use crate::store::SecretSource;

/// One `exec` invocation.
#[derive(Debug, Clone)]
pub struct ExecRequest {
    pub services: Vec<String>,
    pub command: String,
    pub args: Vec<String>,
    pub flags: PolicyFlags,
}

/// Validate every service, then build the child environment.
///
/// All services are validated before the first fetch.
pub fn prepare(
    real: &Environment,
    services: &[String],
    source: &dyn SecretSource,
    flags: &PolicyFlags,
) -> Result<Injection, ExecError> {
    for service in services {
        validate_service(service)?;
    }

    if flags.pristine {
        tracing::info!("pristine mode engaged");
    }
    if flags.strict {
        tracing::info!(strict_value = %flags.strict_value, "strict mode engaged");
    }

    inject(real, services, source, flags)
}

/// Run a full invocation and return the child's exit code.
///
/// `report` receives every collision before the child is started.
pub fn execute<F>(
    request: &ExecRequest,
    real: &Environment,
    source: &dyn SecretSource,
    launcher: &dyn Launcher,
    mut report: F,
) -> Result<i32, ExecError>
where
    F: FnMut(&CollisionEvent),
{
    let injection = prepare(real, &request.services, source, &request.flags)?;

    for collision in &injection.collisions {
        report(collision);
    }

    tracing::info!(variables = ?injection.env.names(), "with environment");

    let code = launcher.run(&request.command, &request.args, &injection.env)?;
    Ok(code)
}
