//! # Call stack
//!
//! Each [`CallFrame`] holds the instruction pointer, the operand stack and the
//! scope frame. Loop frames (`while`, `for`, `forEach`, `waitUntil`) carry no
//! code of their own: they are controllers that push child blocks and receive
//! each result in `delivered`.
//!
//! A suspended handle is exactly its [`CallStack`]: the explicit continuation
//! record (ip, operands and scope of every frame).

use std::fmt;
use std::rc::Rc;

use serde::Serialize;

use crate::diagnostics::LocationInfo;
use crate::instruction::{CodeBlock, Instruction};
use crate::scope::{FrameId, Scopes};
use crate::value::Value;

/// Execution environment, inherited across call boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Environment {
    Scheduled,
    Unscheduled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    Start,
    Condition,
    Body,
}

#[derive(Debug, Clone)]
pub enum FrameKind {
    /// Plain code block
    Block,
    /// Runs its code, then leaves the frame that issued `exitWith`
    ExitWith,
    /// Runs its code and yields `isNil(result)`
    IsNil,
    While {
        condition: Rc<CodeBlock>,
        body: Rc<CodeBlock>,
        phase: LoopPhase,
    },
    ForStep {
        variable: Rc<str>,
        current: f64,
        to: f64,
        step: f64,
        body: Rc<CodeBlock>,
        phase: LoopPhase,
    },
    ForEach {
        items: Vec<Value>,
        index: usize,
        body: Rc<CodeBlock>,
    },
    WaitUntil {
        condition: Rc<CodeBlock>,
        phase: LoopPhase,
    },
}

impl FrameKind {
    pub fn label(&self) -> &'static str {
        match self {
            FrameKind::Block => "block",
            FrameKind::ExitWith => "exitWith",
            FrameKind::IsNil => "isNil",
            FrameKind::While { .. } => "while",
            FrameKind::ForStep { .. } => "for",
            FrameKind::ForEach { .. } => "forEach",
            FrameKind::WaitUntil { .. } => "waitUntil",
        }
    }

    pub fn is_controller(&self) -> bool {
        matches!(
            self,
            FrameKind::While { .. }
                | FrameKind::ForStep { .. }
                | FrameKind::ForEach { .. }
                | FrameKind::WaitUntil { .. }
        )
    }

    /// Loops that `exitWith` leaves together with their body
    pub fn is_loop(&self) -> bool {
        matches!(self, FrameKind::While { .. } | FrameKind::ForStep { .. } | FrameKind::ForEach { .. })
    }
}

#[derive(Debug)]
pub struct CallFrame {
    pub kind: FrameKind,
    code: Rc<CodeBlock>,
    ip: usize,
    operands: Vec<Value>,
    pub scope: FrameId,
    pub environment: Environment,
    origin: LocationInfo,
    pub delivered: Option<Value>,
}

impl CallFrame {
    pub fn new(
        kind: FrameKind,
        code: Rc<CodeBlock>,
        scope: FrameId,
        environment: Environment,
        origin: LocationInfo,
    ) -> Self {
        Self {
            kind,
            code,
            ip: 0,
            operands: Vec::new(),
            scope,
            environment,
            origin,
            delivered: None,
        }
    }

    /// Loop controller: no code, only children
    pub fn controller(kind: FrameKind, scope: FrameId, environment: Environment, origin: LocationInfo) -> Self {
        Self::new(kind, Rc::new(CodeBlock::default()), scope, environment, origin)
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn is_exhausted(&self) -> bool {
        self.ip >= self.code.len()
    }

    /// Returns the code block and the index of the next instruction, advancing `ip`.
    pub fn fetch(&mut self) -> Option<(Rc<CodeBlock>, usize)> {
        if self.is_exhausted() {
            return None;
        }
        let ip = self.ip;
        self.ip += 1;
        Some((Rc::clone(&self.code), ip))
    }

    pub fn current_instruction(&self) -> Option<&Instruction> {
        self.ip.checked_sub(1).and_then(|i| self.code.get(i))
    }

    /// Location of the last dispatched instruction, or where the frame was entered
    pub fn location(&self) -> LocationInfo {
        self.current_instruction()
            .map(|i| i.location.clone())
            .unwrap_or_else(|| self.origin.clone())
    }

    pub fn push(&mut self, value: Value) {
        self.operands.push(value);
    }

    pub fn pop(&mut self) -> Option<Value> {
        self.operands.pop()
    }

    pub fn operand_count(&self) -> usize {
        self.operands.len()
    }

    /// Takes the top `count` operands in push order.
    pub fn pop_many(&mut self, count: usize) -> Option<Vec<Value>> {
        let len = self.operands.len();
        if count > len {
            return None;
        }
        Some(self.operands.split_off(len - count))
    }

    pub fn clear_operands(&mut self) {
        self.operands.clear();
    }

    /// Drops the rest of the current statement.
    pub fn skip_statement(&mut self) {
        self.operands.clear();
        self.ip = self.code.statement_end(self.ip);
    }

    /// Value left by the last statement
    pub fn take_result(&mut self) -> Value {
        self.operands.pop().unwrap_or_default()
    }
}

/// One line of a stack trace
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceEntry {
    pub depth: usize,
    pub kind: &'static str,
    pub scope_name: Option<String>,
    pub location: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StackTrace {
    pub entries: Vec<TraceEntry>,
}

impl StackTrace {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for StackTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            let name = entry.scope_name.as_deref().unwrap_or("<anonymous>");
            writeln!(f, "#{} {} {} at {}", entry.depth, entry.kind, name, entry.location)?;
        }
        Ok(())
    }
}

/// Serialisable state of a frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameSnapshot {
    pub kind: &'static str,
    pub ip: usize,
    pub instructions: usize,
    pub operands: usize,
    pub scope: usize,
    pub environment: Environment,
    pub location: String,
}

#[derive(Debug, Default)]
pub struct CallStack {
    frames: Vec<CallFrame>,
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: CallFrame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<CallFrame> {
        self.frames.pop()
    }

    pub fn top(&self) -> Option<&CallFrame> {
        self.frames.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut CallFrame> {
        self.frames.last_mut()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[CallFrame] {
        &self.frames
    }

    /// Pops a frame and releases its scope. Every frame owns the scope it was pushed with.
    pub fn pop_release(&mut self, scopes: &mut Scopes) -> Option<CallFrame> {
        let frame = self.frames.pop()?;
        if let Err(e) = scopes.pop_frame(frame.scope) {
            tracing::warn!(error = %e, "scope already released");
        }
        Some(frame)
    }

    /// Pops every frame, releasing scopes.
    pub fn unwind(&mut self, scopes: &mut Scopes) {
        while self.pop_release(scopes).is_some() {}
    }

    /// Index (from the bottom) of the innermost frame whose scope is named `name`
    pub fn find_named(&self, scopes: &Scopes, name: &str) -> Option<usize> {
        self.frames
            .iter()
            .rposition(|frame| scopes.scope_name(frame.scope) == Some(name))
    }

    pub fn trace(&self, scopes: &Scopes) -> StackTrace {
        let entries = self
            .frames
            .iter()
            .enumerate()
            .rev()
            .map(|(depth, frame)| TraceEntry {
                depth,
                kind: frame.kind.label(),
                scope_name: scopes.scope_name(frame.scope).map(str::to_string),
                location: frame.location().format(),
            })
            .collect();
        StackTrace { entries }
    }

    pub fn snapshot(&self) -> Vec<FrameSnapshot> {
        self.frames
            .iter()
            .map(|frame| FrameSnapshot {
                kind: frame.kind.label(),
                ip: frame.ip,
                instructions: frame.code.len(),
                operands: frame.operands.len(),
                scope: frame.scope.index(),
                environment: frame.environment,
                location: frame.location().format(),
            })
            .collect()
    }
}
