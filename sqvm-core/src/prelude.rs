//! # Prelude
//!
//! ```
//! use sqvm_core::prelude::*;
//! ```

// Máquina virtual
pub use crate::config::VmConfig;
pub use crate::vm::{ScriptOutcome, TurnReport, VirtualMachine};

// Código
pub use crate::instruction::{CodeBlock, CodeBuilder, Instruction, Op};
pub use crate::value::{ObjectKind, ObjectRef, Side, Value, ValueType};

// Handles
pub use crate::handle::{HandleId, HandleState, WakeCondition};

// Diagnóstico
pub use crate::diagnostics::{
    DiagnosticEvent,
    LocationInfo,
    LogLevels,
    LogSink,
    Logger,
    MemorySink,
    NullSink,
    RuntimeFault,
    Severity,
};
pub use crate::fault::{Abort, Checked, Diagnostics, Strength};

// Pontes com o host
pub use crate::config_tree::{ConfigClass, ConfigRef, ConfigTree, ConfigValue};
pub use crate::extension::{write_output, Extension, ExtensionLoader};
pub use crate::network::{ConnectionState, Connector, SessionId};

// Erros
pub use crate::error::{VmError, VmResult};
