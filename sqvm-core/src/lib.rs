//! # ⚙️ SQVM-Core
//!
//! Motor de execução para uma linguagem de script de simulação, dinamicamente
//! tipada. Recebe blocos de instruções pós-fixas já compilados e os executa em
//! handles escalonados cooperativamente.
//!
//! ## Arquitetura
//!
//! ```text
//! CodeBlock ──► VirtualMachine ──► Scheduler ──► Exec ──► commands
//!                    │                             │
//!                    ├── Scopes (frames léxicos)   └── fault policy ──► Logger
//!                    ├── ConfigTree
//!                    ├── ExtensionRegistry
//!                    └── SessionTable
//! ```
//!
//! ## Política de falhas
//!
//! Toda anomalia de script é um [`RuntimeFault`] com severidade fixa:
//!
//! | Severidade          | Efeito                                |
//! |---------------------|---------------------------------------|
//! | `fatal`             | termina o handle (com stack trace)    |
//! | `error`             | descarta a instrução atual            |
//! | `warning` e abaixo  | segue com um valor de fallback        |
//!
//! Erros do host ([`VmError`]) são separados: só o uso indevido da API os produz.
//!
//! ## Módulos
//!
//! - [`value`]: valores de script e seus tipos
//! - [`instruction`]: instruções, [`CodeBlock`] e [`CodeBuilder`]
//! - [`scope`]: arena de frames de variáveis
//! - [`callstack`]: frames de execução e controladores de laço
//! - [`handle`]: script handles e a máquina de estados
//! - [`scheduler`]: fila cooperativa e relógio simulado
//! - [`diagnostics`]: eventos, severidades, códigos e sinks
//! - [`fault`]: política de falhas e verificações de forma de arrays
//! - [`config_tree`]: árvore de config somente leitura
//! - [`extension`]: bibliotecas nativas do host (`callExtension`)
//! - [`network`]: sessões de rede
//! - [`vm`]: a máquina virtual
//!
//! ## Quick Start
//!
//! ```
//! use sqvm_core::prelude::*;
//!
//! let mut vm = VirtualMachine::new(VmConfig::default(), Logger::silent());
//!
//! // x = 1 + 2
//! let code = CodeBuilder::new("quick.sqf").push(1).push(2).binary("+").assign("x").end().build();
//! let outcome = vm.execute_unscheduled(code);
//!
//! assert_eq!(outcome.state, HandleState::Finished);
//! assert_eq!(vm.global("x").and_then(|v| v.as_scalar()), Some(3.0));
//! ```

pub mod callstack;
pub mod config;
pub mod config_tree;
pub mod diagnostics;
pub mod error;
pub mod extension;
pub mod fault;
pub mod handle;
pub mod instruction;
pub mod network;
pub mod prelude;
pub mod scheduler;
pub mod scope;
pub mod value;
pub mod vm;

mod commands;
mod exec;

pub use commands::is_command;
pub use config::VmConfig;
pub use diagnostics::{DiagnosticEvent, LocationInfo, Logger, RuntimeFault, Severity};
pub use error::{ScopeError, VmError, VmResult};
pub use handle::{HandleId, HandleState};
pub use instruction::{CodeBlock, CodeBuilder, Instruction, Op};
pub use value::{Side, Value, ValueType};
pub use vm::{ScriptOutcome, TurnReport, VirtualMachine};

/// Versão do crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests;
