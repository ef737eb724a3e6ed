use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::error::{ShieldError, ShieldResult};

/// Configuration for a DataShieldNode instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Path where the node will store its data
    pub storage_path: PathBuf,
    /// Reason stamped on hidden fields when no read tier matches
    #[serde(default)]
    pub default_deny_reason: Option<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from("data"),
            default_deny_reason: None,
        }
    }
}

impl NodeConfig {
    /// Create a new node configuration with the specified storage path
    pub fn new(storage_path: PathBuf) -> Self {
        Self {
            storage_path,
            ..Default::default()
        }
    }

    /// Set the default deny reason
    pub fn with_default_deny_reason(mut self, reason: &str) -> Self {
        self.default_deny_reason = Some(reason.to_string());
        self
    }
}

/// Loads a node configuration from a TOML file.
///
/// With no explicit path, the `DATASHIELD_CONFIG` environment variable is
/// consulted; without that either, the default configuration is returned.
pub fn load_node_config(path: Option<&str>) -> ShieldResult<NodeConfig> {
    let path = match path {
        Some(p) => Some(p.to_string()),
        None => std::env::var("DATASHIELD_CONFIG").ok(),
    };

    let Some(path) = path else {
        return Ok(NodeConfig::default());
    };

    let contents = fs::read_to_string(&path)?;
    let config: NodeConfig = toml::from_str(&contents)
        .map_err(|e| ShieldError::Config(format!("Failed to parse config {}: {}", path, e)))?;
    info!("Loaded node config from {}", path);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_path_yields_default() {
        let config = load_node_config(None).unwrap();
        assert_eq!(config.storage_path, PathBuf::from("data"));
        assert!(config.default_deny_reason.is_none());
    }

    #[test]
    fn loads_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "storage_path = \"/tmp/shield\"\ndefault_deny_reason = \"no_access\""
        )
        .unwrap();

        let config = load_node_config(Some(file.path().to_str().unwrap())).unwrap();
        assert_eq!(config.storage_path, PathBuf::from("/tmp/shield"));
        assert_eq!(config.default_deny_reason.as_deref(), Some("no_access"));
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "storage_path = [not valid").unwrap();

        let err = load_node_config(Some(file.path().to_str().unwrap())).unwrap_err();
        assert!(matches!(err, ShieldError::Config(_)));
    }
}
