//! Service name validation.

use crate::error::ExecError;

const MAX_SERVICE_LEN: usize = 2048;

/// Check that a service name is usable as a store path.
///
/// A service is one or more `/`-separated segments made of ASCII letters,
/// digits, `-`, `_` and `.`. Relative segments (`.` and `..`) are rejected.
pub fn validate_service(service: &str) -> Result<(), ExecError> {
    let reject = |reason: &str| ExecError::ServiceValidation {
        service: service.to_string(),
        reason: reason.to_string(),
    };

    if service.is_empty() {
        return Err(reject("service name cannot be empty"));
    }
    if service.len() > MAX_SERVICE_LEN {
        return Err(reject("service name is too long"));
    }

    for segment in service.split('/') {
        if segment.is_empty() {
            return Err(reject("service name cannot contain empty path segments"));
        }
        if segment == "." || segment == ".." {
            return Err(reject("service name cannot contain relative path segments"));
        }
        if let Some(c) = segment
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(reject(&format!("invalid character '{}'", c)));
        }
    }

    Ok(())
}
