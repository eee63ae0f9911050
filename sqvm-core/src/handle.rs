//! Script handles e sua máquina de estados
//!
//! ```text
//! Created ──► Running ⇄ Suspended
//!                │           │
//!                ▼           ▼
//!          Finished | Terminated   (absorventes)
//! ```

use std::fmt;

use serde::Serialize;

use crate::callstack::{CallFrame, CallStack, StackTrace};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct HandleId(pub u64);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HandleState {
    Created,
    Running,
    Suspended,
    Finished,
    Terminated,
}

impl HandleState {
    /// Finished e Terminated não saem mais
    pub fn is_absorbed(self) -> bool {
        matches!(self, HandleState::Finished | HandleState::Terminated)
    }

    pub fn can_transition(self, to: HandleState) -> bool {
        use HandleState::*;
        matches!(
            (self, to),
            (Created, Running)
                | (Running, Suspended)
                | (Suspended, Running)
                | (Created | Running | Suspended, Finished | Terminated)
        )
    }
}

impl fmt::Display for HandleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandleState::Created => "CREATED",
            HandleState::Running => "RUNNING",
            HandleState::Suspended => "SUSPENDED",
            HandleState::Finished => "FINISHED",
            HandleState::Terminated => "TERMINATED",
        };
        f.write_str(name)
    }
}

/// Quando um handle suspenso volta a ser elegível
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WakeCondition {
    /// Clock time (`sleep`)
    At(f64),
    /// Next scheduler turn (`waitUntil` re-check)
    NextTurn,
}

#[derive(Debug)]
pub struct ScriptHandle {
    id: HandleId,
    name: Option<String>,
    state: HandleState,
    pub(crate) callstack: CallStack,
    pub(crate) wake: Option<WakeCondition>,
    pub(crate) terminate_requested: bool,
    pub(crate) executed: u64,
    pub(crate) result: Value,
    pub(crate) trace: Option<StackTrace>,
}

impl ScriptHandle {
    pub(crate) fn new(id: HandleId, root: CallFrame) -> Self {
        let mut callstack = CallStack::new();
        callstack.push(root);
        Self {
            id,
            name: None,
            state: HandleState::Created,
            callstack,
            wake: None,
            terminate_requested: false,
            executed: 0,
            result: Value::Nil,
            trace: None,
        }
    }

    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn state(&self) -> HandleState {
        self.state
    }

    pub fn is_absorbed(&self) -> bool {
        self.state.is_absorbed()
    }

    /// Instruções despachadas durante toda a vida do handle
    pub fn executed(&self) -> u64 {
        self.executed
    }

    pub fn result(&self) -> &Value {
        &self.result
    }

    /// Trace capturado quando uma falha fatal abortou o handle
    pub fn trace(&self) -> Option<&StackTrace> {
        self.trace.as_ref()
    }

    pub fn callstack(&self) -> &CallStack {
        &self.callstack
    }

    pub fn wake(&self) -> Option<WakeCondition> {
        self.wake
    }

    pub fn termination_requested(&self) -> bool {
        self.terminate_requested
    }

    /// `false` se já havia um nome
    pub(crate) fn set_name(&mut self, name: &str) -> bool {
        if self.name.is_some() {
            return false;
        }
        self.name = Some(name.to_string());
        true
    }

    /// Aplica uma transição. Transições inválidas são ignoradas e dão `false`.
    pub(crate) fn transition(&mut self, to: HandleState) -> bool {
        if !self.state.can_transition(to) {
            return false;
        }
        tracing::debug!(handle = self.id.0, from = %self.state, to = %to, "handle transition");
        self.state = to;
        true
    }

    pub fn is_ready(&self, now: f64) -> bool {
        match self.state {
            HandleState::Created | HandleState::Running => true,
            HandleState::Suspended => match self.wake {
                Some(WakeCondition::At(t)) => now >= t,
                Some(WakeCondition::NextTurn) | None => true,
            },
            HandleState::Finished | HandleState::Terminated => false,
        }
    }
}
