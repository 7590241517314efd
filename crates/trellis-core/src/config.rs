//! Node configuration loading and validation.
//!
//! A node directory carries a `config.json` describing the controller
//! and the workers the node runs. `start` validates it before entering
//! the run loop; the `check` command validates it standalone. The
//! router internals behind each worker are opaque to this crate.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::NodeResult;

/// Default configuration file name inside the node directory.
pub const CONFIG_FILENAME: &str = "config.json";

/// Configuration format versions this build understands.
const SUPPORTED_VERSIONS: [u32; 2] = [1, 2];

/// Worker types a node may run.
const KNOWN_WORKER_TYPES: [&str; 3] = ["router", "container", "guest"];

/// Top-level node configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Configuration format version.
    pub version: u32,
    /// Controller process settings.
    pub controller: ControllerConfig,
    /// Workers to launch at node start.
    pub workers: Vec<WorkerConfig>,
}

/// Controller settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Optional stable node identifier; defaults to the hostname.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// One worker entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Worker type: "router", "container" or "guest".
    #[serde(rename = "type")]
    pub worker_type: String,
    /// Optional worker identifier, for logs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Returns the configuration file path inside a node directory.
///
/// `override_name` replaces the default `config.json` when given.
pub fn config_path(dir: &Path, override_name: Option<&str>) -> PathBuf {
    dir.join(override_name.unwrap_or(CONFIG_FILENAME))
}

/// Loads and validates the node configuration.
pub fn load(path: &Path) -> NodeResult<NodeConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read {}: {e}", path.display()))?;
    let config: NodeConfig = serde_json::from_str(&content)
        .map_err(|e| format!("invalid configuration {}: {e}", path.display()))?;
    config.validate()?;
    Ok(config)
}

impl NodeConfig {
    /// Checks version and worker types, rejecting anything this build
    /// does not know how to run.
    pub fn validate(&self) -> NodeResult<()> {
        if !SUPPORTED_VERSIONS.contains(&self.version) {
            return Err(format!(
                "unsupported configuration version {} (supported: {SUPPORTED_VERSIONS:?})",
                self.version
            )
            .into());
        }
        for (index, worker) in self.workers.iter().enumerate() {
            if !KNOWN_WORKER_TYPES.contains(&worker.worker_type.as_str()) {
                return Err(format!(
                    "worker {}: unknown type '{}' (expected one of {KNOWN_WORKER_TYPES:?})",
                    worker.id.as_deref().unwrap_or(&index.to_string()),
                    worker.worker_type
                )
                .into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(body: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = config_path(dir.path(), None);
        std::fs::write(&path, body).unwrap();
        (dir, path)
    }

    #[test]
    fn loads_minimal_config() {
        let (_dir, path) = write_config(r#"{"version": 2, "workers": []}"#);

        let config = load(&path).unwrap();

        assert_eq!(config.version, 2);
        assert!(config.workers.is_empty());
    }

    #[test]
    fn loads_router_worker() {
        let (_dir, path) = write_config(
            r#"{"version": 2, "workers": [{"type": "router", "id": "rtr1"}]}"#,
        );

        let config = load(&path).unwrap();

        assert_eq!(config.workers[0].worker_type, "router");
        assert_eq!(config.workers[0].id.as_deref(), Some("rtr1"));
    }

    #[test]
    fn rejects_unsupported_version() {
        let (_dir, path) = write_config(r#"{"version": 9}"#);

        let err = load(&path).unwrap_err().to_string();

        assert!(err.contains("unsupported configuration version 9"));
    }

    #[test]
    fn rejects_unknown_worker_type() {
        let (_dir, path) =
            write_config(r#"{"version": 1, "workers": [{"type": "cron"}]}"#);

        let err = load(&path).unwrap_err().to_string();

        assert!(err.contains("unknown type 'cron'"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();

        assert!(load(&config_path(dir.path(), None)).is_err());
    }

    #[test]
    fn config_name_can_be_overridden() {
        let dir = tempfile::tempdir().unwrap();

        let path = config_path(dir.path(), Some("alt.json"));

        assert!(path.ends_with("alt.json"));
    }
}
