//! Runtime configuration (`sqvm.toml`)
//!
//! ```toml
//! config_tree = "config.json"
//!
//! [vm]
//! instruction_budget = 100000
//! networking_enabled = false
//!
//! [logging]
//! filter = "sqvm=debug"
//! min_level = "warning"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sqvm_core::diagnostics::LogLevels;
use sqvm_core::{Severity, VmConfig};

use crate::error::{RuntimeError, RuntimeResult};

pub const CONFIG_FILE_NAME: &str = "sqvm.toml";

/// The `[logging]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset
    pub filter: String,
    /// Lowest severity that reaches the sink
    pub min_level: Severity,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: "sqvm=info".to_string(), min_level: Severity::Verbose }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub vm: VmConfig,
    pub logging: LoggingConfig,
    /// JSON config tree, relative to the directory of `sqvm.toml`
    pub config_tree: Option<PathBuf>,
}

impl RuntimeConfig {
    /// Parse a configuration from a TOML string
    pub fn from_str(content: &str) -> RuntimeResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load a configuration file. Relative `config_tree` paths are resolved
    /// against the file's directory.
    pub fn from_file(path: &Path) -> RuntimeResult<Self> {
        let content = fs::read_to_string(path)?;
        let mut config = Self::from_str(&content)?;
        if let (Some(tree), Some(dir)) = (config.config_tree.as_mut(), path.parent()) {
            if tree.is_relative() {
                *tree = dir.join(&*tree);
            }
        }
        Ok(config)
    }

    /// Find and load `sqvm.toml` by searching up from `start_dir`
    pub fn find_and_load(start_dir: &Path) -> RuntimeResult<(Self, PathBuf)> {
        let mut current = start_dir.to_path_buf();
        loop {
            let candidate = current.join(CONFIG_FILE_NAME);
            if candidate.exists() {
                let config = Self::from_file(&candidate)?;
                return Ok((config, current));
            }
            if !current.pop() {
                return Err(RuntimeError::ConfigNotFound(start_dir.to_path_buf()));
            }
        }
    }

    /// `VmConfig` with the logging floor applied
    pub fn effective_vm_config(&self) -> VmConfig {
        let mut vm = self.vm.clone();
        vm.log_levels = LogLevels::from_minimum(self.logging.min_level);
        vm
    }

    pub fn to_toml(&self) -> Option<String> {
        toml::to_string_pretty(self).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let config = RuntimeConfig::from_str("").unwrap();
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.logging.filter, "sqvm=info");
    }

    #[test]
    fn test_parse_sections() {
        let config = RuntimeConfig::from_str(
            r#"
            config_tree = "tree.json"

            [vm]
            instruction_budget = 500
            networking_enabled = true
            max_array_size = 64

            [logging]
            min_level = "warning"
            "#,
        )
        .unwrap();
        assert_eq!(config.vm.instruction_budget, Some(500));
        assert!(config.vm.networking_enabled);
        assert_eq!(config.vm.max_array_size, 64);
        assert!(config.vm.allow_suspension);
        assert_eq!(config.logging.min_level, Severity::Warning);
        assert_eq!(config.config_tree, Some(PathBuf::from("tree.json")));

        let levels = config.effective_vm_config().log_levels;
        assert!(levels.is_enabled(Severity::Error));
        assert!(!levels.is_enabled(Severity::Info));
    }

    #[test]
    fn test_invalid_toml() {
        let err = RuntimeConfig::from_str("[vm\ninstruction_budget = ").unwrap_err();
        assert!(matches!(err, RuntimeError::Config(_)));
    }
}
