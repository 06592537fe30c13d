//! File-backed secret store.
//!
//! Each service is one document under the store root: service `team/api`
//! lives at `<root>/team/api.yaml` (or `.yml`, `.json`, `.env`).
//!
//! # Engines
//!
//! - `file`: the document is read as-is
//! - `sops`: the document is decrypted with `sops -d` and stdout is captured
//!   directly to memory. No temporary files are created.
//!
//! # Supported Formats
//!
//! - ENV (key=value pairs)
//! - JSON (flat or nested objects)
//! - YAML (flat or nested mappings)

use super::{collect_secrets, SecretSet, SecretSource};
use crate::error::StoreError;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;

/// Extensions probed for a service document, in order.
const EXTENSIONS: [&str; 4] = ["yaml", "yml", "json", "env"];

/// How service documents are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    File,
    Sops,
}

impl Engine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::File => "file",
            Engine::Sops => "sops",
        }
    }
}

impl FromStr for Engine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(Engine::File),
            "sops" => Ok(Engine::Sops),
            other => Err(format!(
                "Unsupported store engine: '{}'. Expected 'file' or 'sops'.",
                other
            )),
        }
    }
}

/// Secret store backed by one document per service.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    engine: Engine,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>, engine: Engine) -> Self {
        Self {
            root: root.into(),
            engine,
        }
    }

    /// Candidate document paths for a service, in lookup order.
    fn candidates(&self, service: &str) -> Vec<PathBuf> {
        let mut dir = self.root.clone();
        let mut segments: Vec<&str> = service.split('/').collect();
        let last = segments.pop().unwrap_or(service);
        for segment in segments {
            dir.push(segment);
        }

        EXTENSIONS
            .iter()
            .map(|ext| dir.join(format!("{}.{}", last, ext)))
            .collect()
    }

    /// Find the document holding a service's secrets.
    pub fn locate(&self, service: &str) -> Result<PathBuf, StoreError> {
        let candidates = self.candidates(service);
        candidates
            .iter()
            .find(|path| path.is_file())
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                service: service.to_string(),
                path: candidates
                    .first()
                    .map(|p| p.with_extension("{yaml,yml,json,env}").display().to_string())
                    .unwrap_or_default(),
            })
    }

    fn read(&self, service: &str, path: &Path) -> Result<Vec<u8>, StoreError> {
        match self.engine {
            Engine::File => fs::read(path).map_err(|e| StoreError::Read {
                service: service.to_string(),
                message: format!("{}: {}", path.display(), e),
            }),
            Engine::Sops => execute_sops(service, path),
        }
    }
}

impl SecretSource for FileStore {
    fn fetch(&self, service: &str, hierarchical: bool) -> Result<SecretSet, StoreError> {
        let path = self.locate(service)?;
        tracing::debug!(
            service,
            path = %path.display(),
            engine = self.engine.as_str(),
            "reading secrets"
        );

        let output = self.read(service, &path)?;
        let entries = parse_output(service, &path, &output, hierarchical, self.engine)?;
        let secrets = collect_secrets(service, entries, hierarchical)?;

        tracing::debug!(service, count = secrets.len(), "loaded secrets");
        Ok(secrets)
    }
}

/// Execute SOPS and capture stdout to memory.
fn execute_sops(service: &str, path: &Path) -> Result<Vec<u8>, StoreError> {
    let decrypt_error = |message: String| StoreError::Decrypt {
        service: service.to_string(),
        message,
    };

    let sops = which::which("sops")
        .map_err(|e| decrypt_error(format!("SOPS is not installed or not in PATH: {}", e)))?;

    let output = Command::new(sops)
        .arg("-d")
        .arg(path)
        .output()
        .map_err(|e| {
            decrypt_error(format!(
                "failed to execute SOPS on '{}': {}",
                path.display(),
                e
            ))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(decrypt_error(if stderr.trim().is_empty() {
            "Unknown error".to_string()
        } else {
            stderr.trim().to_string()
        }));
    }

    Ok(output.stdout)
}

/// Parse a service document based on its file extension.
///
/// SOPS metadata and the `data` wrapper are only recognised for documents
/// decrypted by SOPS. Plain files are taken as written.
fn parse_output(
    service: &str,
    path: &Path,
    output: &[u8],
    hierarchical: bool,
    engine: Engine,
) -> Result<Vec<(String, String)>, StoreError> {
    let content = std::str::from_utf8(output).map_err(|_| StoreError::Parse {
        service: service.to_string(),
        message: "secrets are not valid UTF-8".to_string(),
    })?;

    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");
    let parsed = match extension {
        "env" => Ok(parse_env(content)),
        "json" => parse_json(content, hierarchical, engine),
        _ => parse_yaml(content, hierarchical, engine),
    };

    parsed.map_err(|message| StoreError::Parse {
        service: service.to_string(),
        message,
    })
}

/// Parse ENV format (key=value pairs).
fn parse_env(content: &str) -> Vec<(String, String)> {
    let mut entries = Vec::new();

    for line in content.lines() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line = line.strip_prefix("export ").unwrap_or(line);
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim().to_string();
            let value = value.trim();

            // Remove quotes if present
            let value = if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                &value[1..value.len() - 1]
            } else {
                value
            };

            entries.push((key, value.to_string()));
        }
    }

    entries
}

/// Error for a SOPS `data` wrapper that shares the document with other keys.
const DATA_WITH_SIBLINGS: &str =
    "'data' wrapper must be the only top-level key besides 'sops' metadata";

/// Parse JSON format, flattening nested objects into paths.
fn parse_json(
    content: &str,
    hierarchical: bool,
    engine: Engine,
) -> Result<Vec<(String, String)>, String> {
    let json: serde_json::Value =
        serde_json::from_str(content).map_err(|e| format!("invalid JSON: {}", e))?;

    let mut data = match json {
        serde_json::Value::Object(obj) => obj,
        serde_json::Value::Null => return Ok(Vec::new()),
        _ => return Err("JSON must be an object with key-value pairs".to_string()),
    };

    // SOPS format: {"data": {...}, "sops": {...}}
    if engine == Engine::Sops {
        data.remove("sops");
        if matches!(data.get("data"), Some(serde_json::Value::Object(_))) {
            if data.len() > 1 {
                return Err(DATA_WITH_SIBLINGS.to_string());
            }
            if let Some(serde_json::Value::Object(inner)) = data.remove("data") {
                data = inner;
            }
        }
    }

    let mut entries = Vec::new();
    for (key, value) in data {
        flatten_json(&key, value, hierarchical, &mut entries)?;
    }
    Ok(entries)
}

fn flatten_json(
    path: &str,
    value: serde_json::Value,
    hierarchical: bool,
    entries: &mut Vec<(String, String)>,
) -> Result<(), String> {
    use serde_json::Value;

    match value {
        Value::String(s) => entries.push((path.to_string(), s)),
        Value::Number(n) => entries.push((path.to_string(), n.to_string())),
        Value::Bool(b) => entries.push((path.to_string(), b.to_string())),
        Value::Object(obj) if hierarchical => {
            for (key, value) in obj {
                flatten_json(&format!("{}/{}", path, key), value, hierarchical, entries)?;
            }
        }
        other => {
            return Err(format!(
                "JSON value for key '{}' must be a string, found: {}",
                path, other
            ))
        }
    }
    Ok(())
}

/// Parse YAML format, flattening nested mappings into paths.
fn parse_yaml(
    content: &str,
    hierarchical: bool,
    engine: Engine,
) -> Result<Vec<(String, String)>, String> {
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(content).map_err(|e| format!("invalid YAML: {}", e))?;

    let mut data = match yaml {
        serde_yaml::Value::Mapping(mapping) => mapping,
        serde_yaml::Value::Null => return Ok(Vec::new()),
        _ => return Err("YAML must be a mapping with key-value pairs".to_string()),
    };

    // SOPS format: data: {key: value}
    if engine == Engine::Sops {
        data.remove("sops");
        if matches!(data.get("data"), Some(serde_yaml::Value::Mapping(_))) {
            if data.len() > 1 {
                return Err(DATA_WITH_SIBLINGS.to_string());
            }
            if let Some(serde_yaml::Value::Mapping(inner)) = data.remove("data") {
                data = inner;
            }
        }
    }

    let mut entries = Vec::new();
    for (key, value) in data {
        let key = yaml_key(&key)?;
        flatten_yaml(&key, value, hierarchical, &mut entries)?;
    }
    Ok(entries)
}

fn yaml_key(key: &serde_yaml::Value) -> Result<String, String> {
    match key {
        serde_yaml::Value::String(s) => Ok(s.clone()),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        other => Err(format!("YAML key must be a string, found: {:?}", other)),
    }
}

fn flatten_yaml(
    path: &str,
    value: serde_yaml::Value,
    hierarchical: bool,
    entries: &mut Vec<(String, String)>,
) -> Result<(), String> {
    use serde_yaml::Value;

    match value {
        Value::String(s) => entries.push((path.to_string(), s)),
        Value::Number(n) => entries.push((path.to_string(), n.to_string())),
        Value::Bool(b) => entries.push((path.to_string(), b.to_string())),
        Value::Mapping(mapping) if hierarchical => {
            for (key, value) in mapping {
                let key = yaml_key(&key)?;
                flatten_yaml(&format!("{}/{}", path, key), value, hierarchical, entries)?;
            }
        }
        other => {
            return Err(format!(
                "YAML value for key '{}' must be a string, found: {:?}",
                path, other
            ))
        }
    }
    Ok(())
}
