//! Environment injection engine.
//!
//! Merges the secrets of one or more services into an environment according
//! to a [`PolicyFlags`]. The engine never writes to any output stream: the
//! resulting [`Injection`] carries the final environment and every collision
//! so the caller decides how to report them.
//!
//! # Strategies
//!
//! - [`MergeStrategy::Overwrite`]: secrets replace existing variables
//! - [`MergeStrategy::Preserve`]: existing variables are kept (no-clobber)
//! - [`MergeStrategy::StrictSubstitute`]: every variable set to the sentinel
//!   must be filled by a secret, otherwise the run fails
//!
//! In strict mode the sentinel scan always runs against the real environment,
//! and pristine mode is applied only once that scan has passed.
//!
//! # Example
//!
//! ```
//! use shadow_exec::engine::inject;
//! use shadow_exec::environment::Environment;
//! use shadow_exec::policy::PolicyFlags;
//! use shadow_exec::store::MemorySource;
//!
//! # fn main() -> Result<(), shadow_exec::error::ExecError> {
//! let source = MemorySource::new().with_service("app", [("db_password", "hunter22")]);
//! let real = Environment::from_pairs([("HOME", "/tmp")]);
//!
//! let injection = inject(&real, &["app".to_string()], &source, &PolicyFlags::default())?;
//! assert_eq!(injection.env.get("DB_PASSWORD"), Some("hunter22"));
//! assert_eq!(injection.env.get("HOME"), Some("/tmp"));
//! # Ok(())
//! # }
//! ```

use crate::environment::Environment;
use crate::error::ExecError;
use crate::policy::{MergeStrategy, PolicyFlags};
use crate::store::{SecretSet, SecretSource};
use std::fmt;

/// Outcome of a collision between a secret and an existing variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionKind {
    /// The secret replaced the existing value.
    Overwritten,
    /// The existing value was kept.
    Preserved,
}

/// A secret whose name already existed when its service was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollisionEvent {
    pub service: String,
    pub name: String,
    pub kind: CollisionKind,
}

impl fmt::Display for CollisionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            CollisionKind::Overwritten => write!(
                f,
                "service {} overwriting environment variable {}",
                self.service, self.name
            ),
            CollisionKind::Preserved => write!(
                f,
                "Not overwriting existing environment variable {} from service {}",
                self.name, self.service
            ),
        }
    }
}

/// Final environment plus the collisions seen while building it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Injection {
    pub env: Environment,
    pub collisions: Vec<CollisionEvent>,
}

/// Merge the secrets of `services` into an environment.
///
/// `real` is the captured process environment. It is the merge base unless
/// `flags.pristine` is set, and it is always the basis of strict validation.
/// Services are fetched and applied strictly in order.
///
/// # Errors
///
/// - [`ExecError::Store`] if any service cannot be fetched
/// - [`ExecError::StrictValidation`] naming the first sentinel variable with
///   no matching secret (strict mode only)
pub fn inject(
    real: &Environment,
    services: &[String],
    source: &dyn SecretSource,
    flags: &PolicyFlags,
) -> Result<Injection, ExecError> {
    let base = || {
        if flags.pristine {
            Environment::empty()
        } else {
            real.clone()
        }
    };

    match flags.strategy() {
        MergeStrategy::Overwrite => merge(base(), services, source, flags.hierarchical(), false),
        MergeStrategy::Preserve => merge(base(), services, source, flags.hierarchical(), true),
        MergeStrategy::StrictSubstitute => strict_substitute(real, services, source, flags),
    }
}

/// Apply each service in order, recording a collision for every name that is
/// already present when the service is applied.
///
/// With `keep_existing` a colliding name keeps its current value.
fn merge(
    mut env: Environment,
    services: &[String],
    source: &dyn SecretSource,
    hierarchical: bool,
    keep_existing: bool,
) -> Result<Injection, ExecError> {
    let mut collisions = Vec::new();

    for service in services {
        let secrets = source.fetch(service, hierarchical)?;
        tracing::debug!(service = %service, count = secrets.len(), "merging secrets");

        for (name, value) in secrets {
            if !env.contains(&name) {
                env.insert(name, value);
                continue;
            }

            let kind = if keep_existing {
                CollisionKind::Preserved
            } else {
                env.insert(name.clone(), value);
                CollisionKind::Overwritten
            };
            collisions.push(CollisionEvent {
                service: service.clone(),
                name,
                kind,
            });
        }
    }

    Ok(Injection { env, collisions })
}

/// Fetch every service and merge the secret sets, later services winning.
fn fetch_union(
    services: &[String],
    source: &dyn SecretSource,
    hierarchical: bool,
) -> Result<SecretSet, ExecError> {
    let mut union = SecretSet::new();
    for service in services {
        let secrets = source.fetch(service, hierarchical)?;
        tracing::debug!(
            service = %service,
            count = secrets.len(),
            "collected secrets for strict mode"
        );
        union.extend(secrets);
    }
    Ok(union)
}

fn strict_substitute(
    real: &Environment,
    services: &[String],
    source: &dyn SecretSource,
    flags: &PolicyFlags,
) -> Result<Injection, ExecError> {
    let secrets = fetch_union(services, source, flags.hierarchical())?;

    // Validation always looks at the real environment, even when pristine.
    let mut fills: Vec<(&str, &str)> = Vec::new();
    for (name, value) in real {
        if *value != flags.strict_value {
            continue;
        }
        match secrets.get(name) {
            Some(secret) => fills.push((name.as_str(), secret.as_str())),
            None => {
                return Err(ExecError::StrictValidation { name: name.clone() });
            }
        }
    }
    tracing::debug!(filled = fills.len(), "strict validation passed");

    let env = if flags.pristine {
        Environment::from_pairs(&secrets)
    } else {
        let mut env = real.clone();
        for (name, secret) in fills {
            env.insert(name, secret);
        }
        env
    };

    Ok(Injection {
        env,
        collisions: Vec::new(),
    })
}
