//! Secret sources and key normalization.
//!
//! A [`SecretSource`] returns the secrets of one service as a [`SecretSet`].
//! In hierarchical mode the store hands back structured paths (`db/password`)
//! which are normalized into environment variable names (`DB_PASSWORD`). In
//! flat mode keys are used exactly as stored.

pub mod file;

pub use file::{Engine, FileStore};

use crate::error::StoreError;
use std::collections::{BTreeMap, HashMap};

/// Secrets of a single service, keyed by environment variable name.
pub type SecretSet = BTreeMap<String, String>;

/// Backing store lookup, one call per service.
pub trait SecretSource {
    /// Fetch the secrets for `service`.
    ///
    /// When `hierarchical` is true, keys are derived from secret paths and
    /// normalized with [`normalize_key`].
    fn fetch(&self, service: &str, hierarchical: bool) -> Result<SecretSet, StoreError>;
}

/// Turn a secret path into an environment variable name.
///
/// Upper-cases ASCII letters and replaces path separators, dashes, dots and
/// whitespace with underscores. A leading `/` is dropped.
///
/// ```
/// use shadow_exec::store::normalize_key;
///
/// assert_eq!(normalize_key("db/password"), "DB_PASSWORD");
/// assert_eq!(normalize_key("/api-key"), "API_KEY");
/// ```
pub fn normalize_key(path: &str) -> String {
    path.trim_start_matches('/')
        .chars()
        .map(|c| match c {
            '/' | '-' | '.' => '_',
            c if c.is_whitespace() => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

/// Build a [`SecretSet`] from `(path, value)` entries in document order.
///
/// In hierarchical mode every path is normalized and two distinct paths that
/// land on the same name are rejected. In flat mode a repeated key keeps the
/// last value, matching how the store itself would resolve it.
pub fn collect_secrets<I>(
    service: &str,
    entries: I,
    hierarchical: bool,
) -> Result<SecretSet, StoreError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut secrets = SecretSet::new();
    let mut origins: HashMap<String, String> = HashMap::new();

    for (path, value) in entries {
        if !hierarchical {
            secrets.insert(path, value);
            continue;
        }

        let name = normalize_key(&path);
        if name.is_empty() {
            return Err(StoreError::Parse {
                service: service.to_string(),
                message: format!("secret path '{}' normalizes to an empty name", path),
            });
        }
        if let Some(first) = origins.get(&name) {
            if *first != path {
                return Err(StoreError::NormalizationCollision {
                    service: service.to_string(),
                    name,
                    first: first.clone(),
                    second: path,
                });
            }
        }
        origins.insert(name.clone(), path);
        secrets.insert(name, value);
    }

    Ok(secrets)
}

/// In-memory secret source.
///
/// Useful for tests and for embedding the engine behind a custom backend.
/// Keys are stored as paths and go through the same normalization as a real
/// store.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    services: HashMap<String, Vec<(String, String)>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the secrets of a service, replacing any previous set.
    pub fn with_service<I, K, V>(mut self, service: &str, secrets: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let entries = secrets
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.services.insert(service.to_string(), entries);
        self
    }
}

impl SecretSource for MemorySource {
    fn fetch(&self, service: &str, hierarchical: bool) -> Result<SecretSet, StoreError> {
        let entries = self
            .services
            .get(service)
            .ok_or_else(|| StoreError::NotFound {
                service: service.to_string(),
                path: "memory".to_string(),
            })?;
        collect_secrets(service, entries.iter().cloned(), hierarchical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("db_username"), "DB_USERNAME");
        assert_eq!(normalize_key("db/password"), "DB_PASSWORD");
        assert_eq!(normalize_key("/service/api-key"), "SERVICE_API_KEY");
        assert_eq!(normalize_key("smtp.host name"), "SMTP_HOST_NAME");
    }

    #[test]
    fn test_collect_hierarchical_normalizes() {
        let entries = vec![
            ("db/username".to_string(), "root".to_string()),
            ("api-key".to_string(), "k".to_string()),
        ];
        let secrets = collect_secrets("svc", entries, true).unwrap();

        assert_eq!(secrets.get("DB_USERNAME"), Some(&"root".to_string()));
        assert_eq!(secrets.get("API_KEY"), Some(&"k".to_string()));
        assert_eq!(secrets.len(), 2);
    }

    #[test]
    fn test_collect_flat_keeps_keys_verbatim() {
        let entries = vec![("db/username".to_string(), "root".to_string())];
        let secrets = collect_secrets("svc", entries, false).unwrap();

        assert_eq!(secrets.get("db/username"), Some(&"root".to_string()));
        assert!(secrets.get("DB_USERNAME").is_none());
    }

    #[test]
    fn test_normalization_collision_fails_loudly() {
        let entries = vec![
            ("db/password".to_string(), "a".to_string()),
            ("db-password".to_string(), "b".to_string()),
        ];
        let err = collect_secrets("svc", entries, true).unwrap_err();

        match err {
            StoreError::NormalizationCollision {
                name, first, second, ..
            } => {
                assert_eq!(name, "DB_PASSWORD");
                assert_eq!(first, "db/password");
                assert_eq!(second, "db-password");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_normalized_name_is_rejected() {
        let entries = vec![("/".to_string(), "a".to_string())];
        assert!(collect_secrets("svc", entries, true).is_err());
    }

    #[test]
    fn test_memory_source_unknown_service() {
        let source = MemorySource::new();
        let err = source.fetch("missing", true).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn test_memory_source_fetch() {
        let source = MemorySource::new().with_service("app", [("db_password", "hunter22")]);
        let secrets = source.fetch("app", true).unwrap();
        assert_eq!(secrets.get("DB_PASSWORD"), Some(&"hunter22".to_string()));
    }
}
