//! Configuração da VM
//!
//! Valores padrão embutidos, sobrescritos por variáveis de ambiente
//! (`SQVM_*`) ou por um arquivo `.env` carregado uma única vez.

use std::env;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::diagnostics::{LogLevels, Severity};

/// Tamanho padrão do buffer de saída de extensões
pub const DEFAULT_EXTENSION_BUFFER: usize = 10240;

/// Maior tamanho que `resize` e `set` aceitam produzir
pub const DEFAULT_MAX_ARRAY_SIZE: usize = 9_999_999;

static DOTENV_INIT: Lazy<()> = Lazy::new(|| {
    let _ = dotenv::dotenv();
});

#[inline]
fn ensure_loaded() {
    let _ = &*DOTENV_INIT;
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Aceita `1/0`, `true/false`, `yes/no`, `on/off`
fn env_flag(key: &str) -> Option<bool> {
    let raw = env::var(key).ok()?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    /// Instruções por handle antes do aborto fatal; `None` = sem limite
    pub instruction_budget: Option<u64>,
    /// `false` rejeita todo ponto de suspensão
    pub allow_suspension: bool,
    pub networking_enabled: bool,
    /// Valida classes de `createVehicle` contra `CfgVehicles`
    pub classname_checks: bool,
    pub extension_buffer_size: usize,
    pub max_array_size: usize,
    pub log_levels: LogLevels,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            instruction_budget: None,
            allow_suspension: true,
            networking_enabled: false,
            classname_checks: true,
            extension_buffer_size: DEFAULT_EXTENSION_BUFFER,
            max_array_size: DEFAULT_MAX_ARRAY_SIZE,
            log_levels: LogLevels::default(),
        }
    }
}

impl VmConfig {
    /// Padrões sobrescritos pelas variáveis `SQVM_*`.
    ///
    /// `SQVM_INSTRUCTION_BUDGET=0` desliga o orçamento.
    pub fn from_env() -> Self {
        ensure_loaded();
        let defaults = Self::default();
        let instruction_budget = match env_parse::<u64>("SQVM_INSTRUCTION_BUDGET") {
            Some(0) => None,
            Some(n) => Some(n),
            None => defaults.instruction_budget,
        };
        let log_levels = env_parse::<Severity>("SQVM_LOG_MIN_LEVEL")
            .map(LogLevels::from_minimum)
            .unwrap_or(defaults.log_levels);
        Self {
            instruction_budget,
            allow_suspension: env_flag("SQVM_ALLOW_SUSPENSION").unwrap_or(defaults.allow_suspension),
            networking_enabled: env_flag("SQVM_NETWORKING").unwrap_or(defaults.networking_enabled),
            classname_checks: env_flag("SQVM_CLASSNAME_CHECKS").unwrap_or(defaults.classname_checks),
            extension_buffer_size: env_parse("SQVM_EXTENSION_BUFFER")
                .unwrap_or(defaults.extension_buffer_size),
            max_array_size: env_parse("SQVM_MAX_ARRAY_SIZE").unwrap_or(defaults.max_array_size),
            log_levels,
        }
    }

    pub fn with_budget(mut self, budget: u64) -> Self {
        self.instruction_budget = Some(budget);
        self
    }

    pub fn with_networking(mut self, enabled: bool) -> Self {
        self.networking_enabled = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = VmConfig::default();
        assert_eq!(config.instruction_budget, None);
        assert!(config.allow_suspension);
        assert!(!config.networking_enabled);
        assert_eq!(config.extension_buffer_size, 10240);
        assert_eq!(config.max_array_size, 9_999_999);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: VmConfig = serde_json::from_str(r#"{"instruction_budget": 100}"#).unwrap();
        assert_eq!(config.instruction_budget, Some(100));
        assert!(config.allow_suspension);
        assert!(config.classname_checks);
    }

    #[test]
    fn test_builders() {
        let config = VmConfig::default().with_budget(5).with_networking(true);
        assert_eq!(config.instruction_budget, Some(5));
        assert!(config.networking_enabled);
    }
}
