//! Host-facing error types.
//!
//! Script anomalies never show up here: they are [`RuntimeFault`](crate::diagnostics::RuntimeFault)s
//! routed through the fault policy. These errors cover misuse of the host API.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScopeError {
    #[error("scope frame {0} does not exist")]
    UnknownFrame(usize),

    #[error("scope name already set to '{0}'")]
    NameAlreadySet(String),

    #[error("the global frame cannot be released")]
    GlobalFrame,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum VmError {
    #[error("unknown script handle {0}")]
    UnknownHandle(u64),

    #[error("private variable '{0}' cannot be stored in the global scope")]
    PrivateGlobal(String),

    #[error("scope error: {0}")]
    Scope(#[from] ScopeError),
}

pub type VmResult<T> = Result<T, VmError>;
