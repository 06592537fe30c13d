//! Ordered environment variable mapping.
//!
//! An [`Environment`] is either captured from the running process or starts
//! empty (pristine mode). It is only mutated while secrets are being merged and
//! is handed to the launcher once the merge is finished.

use indexmap::IndexMap;

/// Ordered mapping of variable name to value.
///
/// Names are case-sensitive and unique. Inserting an existing name replaces its
/// value in place, keeping the original position.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: IndexMap<String, String>,
}

impl Environment {
    /// Capture the current process environment.
    ///
    /// Variables whose name or value is not valid UTF-8 cannot be compared
    /// against secrets and are skipped.
    pub fn capture() -> Self {
        let mut vars = IndexMap::new();
        for (name, value) in std::env::vars_os() {
            match (name.into_string(), value.into_string()) {
                (Ok(name), Ok(value)) => {
                    vars.insert(name, value);
                }
                (name, _) => {
                    let name = match name {
                        Ok(name) => name,
                        Err(raw) => raw.to_string_lossy().into_owned(),
                    };
                    tracing::warn!(variable = %name, "skipping non UTF-8 environment variable");
                }
            }
        }
        Self { vars }
    }

    /// An empty environment.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build an environment from name/value pairs, last write wins.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut env = Self::empty();
        for (name, value) in pairs {
            env.insert(name, value);
        }
        env
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Set a variable, returning the previous value if there was one.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.vars.insert(name.into(), value.into())
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, String> {
        self.vars.iter()
    }

    /// Variable names in order.
    pub fn names(&self) -> Vec<&str> {
        self.vars.keys().map(String::as_str).collect()
    }

    /// Render as `NAME=value` strings in insertion order.
    pub fn to_env_strings(&self) -> Vec<String> {
        self.vars
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect()
    }
}

// Values are secrets once the merge has run, so only names are printed.
impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("len", &self.vars.len())
            .field("names", &self.names())
            .field("values", &"[REDACTED]")
            .finish()
    }
}

impl<'a> IntoIterator for &'a Environment {
    type Item = (&'a String, &'a String);
    type IntoIter = indexmap::map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.vars.iter()
    }
}
