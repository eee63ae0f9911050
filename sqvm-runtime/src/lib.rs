//! # 🏃 sqvm-runtime
//!
//! Liga a VM ao mundo do host: configuração em TOML, diagnósticos no
//! `tracing` e árvore de config carregada de JSON.
//!
//! ## Fluxo de Execução
//!
//! ```text
//! sqvm.toml ──► RuntimeConfig ──► ScriptRuntime
//!                    │                 │
//!        config.json ┘                 ├── VirtualMachine (sqvm-core)
//!                                      └── TracingSink ──► tracing
//! ```
//!
//! ## Exemplo
//!
//! ```
//! use sqvm_runtime::{RuntimeConfig, ScriptRuntime};
//! use sqvm_core::CodeBuilder;
//!
//! let mut runtime = ScriptRuntime::new(RuntimeConfig::default());
//! runtime.spawn(CodeBuilder::new("main.sqf").push(1).unary("sleep").end().build());
//!
//! let summary = runtime.run(10);
//! assert!(summary.idle);
//! ```

pub mod config;
pub mod error;
pub mod loader;
pub mod logger;
pub mod runtime;

pub use config::{LoggingConfig, RuntimeConfig, CONFIG_FILE_NAME};
pub use error::{RuntimeError, RuntimeResult};
pub use loader::ConfigTreeLoader;
pub use logger::{init_tracing, TracingSink};
pub use runtime::{RunSummary, ScriptRuntime};
