//! # Execução de um handle
//!
//! [`Exec`] empresta a VM e um handle retirado do escalonador e despacha
//! instruções até um ponto de suspensão, o fim do script ou um aborto.
//!
//! Cada passo:
//! 1. término pendente encerra o handle
//! 2. frame do topo esgotado: blocos entregam o resultado, controladores avançam
//! 3. orçamento de instruções
//! 4. fetch e dispatch
//!
//! Abortos chegam aqui como [`Abort`] e nunca atravessam [`Exec::run`].

use std::rc::Rc;

use crate::callstack::{CallFrame, Environment, FrameKind, LoopPhase};
use crate::commands::COMMANDS;
use crate::diagnostics::{AssemblyMessage, LocationInfo, Logger, RuntimeFault};
use crate::fault::{Abort, Checked, Diagnostics, Strength};
use crate::handle::{HandleId, HandleState, ScriptHandle, WakeCondition};
use crate::instruction::{CodeBlock, Op};
use crate::scope::FrameId;
use crate::value::{Value, ValueType};
use crate::vm::VirtualMachine;

/// O que um comando devolve ao interpretador
#[derive(Debug)]
pub(crate) enum Reply {
    /// Empilhado nos operandos de quem chamou
    Value(Value),
    /// O comando mexeu na pilha de chamadas; o valor chega quando o novo frame terminar
    Deferred,
    /// Empilha Nil e cede o handle
    Suspend(WakeCondition),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Yield,
}

pub(crate) struct Exec<'vm> {
    pub(crate) vm: &'vm mut VirtualMachine,
    pub(crate) handle: &'vm mut ScriptHandle,
    current: LocationInfo,
}

impl Diagnostics for Exec<'_> {
    fn location(&self) -> LocationInfo {
        self.current.clone()
    }

    fn logger(&mut self) -> &mut Logger {
        &mut self.vm.logger
    }
}

impl<'vm> Exec<'vm> {
    pub(crate) fn new(vm: &'vm mut VirtualMachine, handle: &'vm mut ScriptHandle) -> Self {
        let current = handle
            .callstack
            .top()
            .map(CallFrame::location)
            .unwrap_or_else(LocationInfo::host);
        Self { vm, handle, current }
    }

    /// Roda até o handle suspender, terminar ou ser encerrado.
    pub(crate) fn run(&mut self) {
        while self.handle.state() == HandleState::Running {
            let flow = match self.step() {
                Ok(flow) => flow,
                Err(abort) => {
                    self.abort(abort);
                    Flow::Continue
                }
            };
            if flow == Flow::Yield {
                break;
            }
        }
    }

    fn step(&mut self) -> Checked<Flow> {
        if self.handle.terminate_requested {
            self.terminate();
            return Ok(Flow::Yield);
        }
        let exhausted = match self.handle.callstack.top() {
            Some(frame) => frame.is_exhausted(),
            None => {
                self.finish(Value::Nil);
                return Ok(Flow::Yield);
            }
        };
        if exhausted {
            return self.complete_top();
        }
        self.charge()?;
        let Some((code, ip)) = self.handle.callstack.top_mut().and_then(CallFrame::fetch) else {
            return Ok(Flow::Continue);
        };
        let Some(instruction) = code.get(ip) else {
            return Ok(Flow::Continue);
        };
        self.current = instruction.location.clone();
        self.dispatch(&instruction.op)
    }

    /// Cobra uma unidade de trabalho do orçamento de instruções.
    ///
    /// Pagam tanto instruções despachadas quanto iterações de controladores de laço.
    fn charge(&mut self) -> Checked<()> {
        if let Some(maximum) = self.vm.config.instruction_budget {
            if self.handle.executed >= maximum {
                self.raise(RuntimeFault::MaximumInstructionCountReached { maximum })?;
                return Err(Abort::Handle);
            }
        }
        self.handle.executed += 1;
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // DISPATCH
    // ═══════════════════════════════════════════════════════════════════════

    fn dispatch(&mut self, op: &Op) -> Checked<Flow> {
        match op {
            Op::Push(value) => self.push(value.deep_copy()),
            Op::EndStatement => {
                if let Some(frame) = self.handle.callstack.top_mut() {
                    frame.clear_operands();
                }
            }
            Op::GetVariable(name) => {
                let value = match self.vm.scopes.resolve(Some(self.scope()), name) {
                    Some(value) => value,
                    None => self.recover(
                        RuntimeFault::VariableNotFound { variable: name.to_string() },
                        Value::Nil,
                    )?,
                };
                self.push(value);
            }
            Op::AssignTo(name) => {
                let value = self.pop_assigned()?;
                let head = self.scope();
                self.vm.scopes.assign(Some(head), name, value, true);
            }
            Op::AssignToLocal(name) => {
                let value = self.pop_assigned()?;
                let head = self.scope();
                self.declare(head, name, value)?;
            }
            Op::MakeArray(count) => {
                let popped = self.handle.callstack.top_mut().and_then(|f| f.pop_many(*count));
                match popped {
                    Some(items) => self.push(Value::array(items)),
                    None => {
                        let got = self.handle.callstack.top().map_or(0, CallFrame::operand_count);
                        self.raise(RuntimeFault::StackCorruptionMissingValues { expected: *count, got })?;
                    }
                }
            }
            Op::CallNular(name) => {
                let Some(func) = COMMANDS.nular(name) else {
                    self.raise(AssemblyMessage::UnknownNularOperator { operator: name.to_string() })?;
                    return Ok(Flow::Continue);
                };
                let reply = func(self)?;
                return Ok(self.apply(reply));
            }
            Op::CallUnary(name) => {
                let right = match self.pop_operand() {
                    Some(value) => value,
                    None => self.recover(
                        RuntimeFault::NoValueFoundForRightArgument {
                            operator: name.to_string(),
                            strength: Strength::Weak,
                        },
                        Value::Nil,
                    )?,
                };
                let reply = self.call_unary(name, right)?;
                return Ok(self.apply(reply));
            }
            Op::CallBinary(name) => {
                let Some(right) = self.pop_operand() else {
                    self.raise(RuntimeFault::NoValueFoundForRightArgument {
                        operator: name.to_string(),
                        strength: Strength::Strong,
                    })?;
                    return Ok(Flow::Continue);
                };
                let Some(left) = self.pop_operand() else {
                    self.raise(RuntimeFault::NoValueFoundForLeftArgument {
                        operator: name.to_string(),
                        strength: Strength::Strong,
                    })?;
                    return Ok(Flow::Continue);
                };
                let reply = self.call_binary(name, left, right)?;
                return Ok(self.apply(reply));
            }
        }
        Ok(Flow::Continue)
    }

    fn call_unary(&mut self, name: &str, right: Value) -> Checked<Reply> {
        let Some(overloads) = COMMANDS.unary(name) else {
            self.raise(AssemblyMessage::UnknownUnaryOperator { operator: name.to_string() })?;
            return Ok(Reply::Value(Value::Nil));
        };
        let got = right.value_type();
        match overloads.iter().find(|o| o.right.accepts(got)) {
            Some(overload) => (overload.func)(self, right),
            None => {
                let expected = overloads.iter().map(|o| o.right).collect();
                self.recover(
                    RuntimeFault::TypeMismatch { expected, got, strength: Strength::Strong },
                    Reply::Value(Value::Nil),
                )
            }
        }
    }

    fn call_binary(&mut self, name: &str, left: Value, right: Value) -> Checked<Reply> {
        let Some(overloads) = COMMANDS.binary(name) else {
            self.raise(AssemblyMessage::UnknownBinaryOperator { operator: name.to_string() })?;
            return Ok(Reply::Value(Value::Nil));
        };
        let (lt, rt) = (left.value_type(), right.value_type());
        match overloads.iter().find(|o| o.left.accepts(lt) && o.right.accepts(rt)) {
            Some(overload) => (overload.func)(self, left, right),
            None => self.recover(
                RuntimeFault::UnknownInputTypeCombinationBinary {
                    operator: name.to_string(),
                    left: Some(lt),
                    right: rt,
                },
                Reply::Value(Value::Nil),
            ),
        }
    }

    fn apply(&mut self, reply: Reply) -> Flow {
        match reply {
            Reply::Value(value) => {
                self.push(value);
                Flow::Continue
            }
            Reply::Deferred => Flow::Continue,
            Reply::Suspend(wake) => {
                self.push(Value::Nil);
                self.suspend(wake)
            }
        }
    }

    fn pop_operand(&mut self) -> Option<Value> {
        self.handle.callstack.top_mut().and_then(CallFrame::pop)
    }

    fn pop_assigned(&mut self) -> Checked<Value> {
        if let Some(value) = self.pop_operand() {
            return Ok(value);
        }
        let callstack = self.handle.callstack.top().map_or("", |f| f.kind.label()).to_string();
        self.recover(
            RuntimeFault::CallstackFoundNoValue { callstack, strength: Strength::Weak },
            Value::Nil,
        )
    }

    // ═══════════════════════════════════════════════════════════════════════
    // FRAMES
    // ═══════════════════════════════════════════════════════════════════════

    pub(crate) fn id(&self) -> HandleId {
        self.handle.id()
    }

    /// Escopo do frame mais interno
    pub(crate) fn scope(&self) -> FrameId {
        self.handle.callstack.top().map_or(FrameId::GLOBAL, |f| f.scope)
    }

    pub(crate) fn environment(&self) -> Environment {
        self.handle.callstack.top().map_or(Environment::Scheduled, |f| f.environment)
    }

    pub(crate) fn push(&mut self, value: Value) {
        if let Some(frame) = self.handle.callstack.top_mut() {
            frame.push(value);
        }
    }

    pub(crate) fn declare(&mut self, frame: FrameId, name: &str, value: Value) -> Checked<()> {
        match self.vm.scopes.declare(frame, name, value) {
            Ok(()) => Ok(()),
            Err(e) => self.raise(RuntimeFault::ErrorMessage {
                source: name.to_string(),
                message: e.to_string(),
            }),
        }
    }

    /// Empilha um frame de código cujo escopo é filho do escopo de quem chamou.
    ///
    /// O ambiente é herdado, a menos que `environment` o substitua.
    pub(crate) fn enter_block(
        &mut self,
        kind: FrameKind,
        code: Rc<CodeBlock>,
        environment: Option<Environment>,
    ) -> FrameId {
        let parent = self.scope();
        let environment = environment.unwrap_or_else(|| self.environment());
        let scope = self.vm.scopes.push_frame(Some(parent));
        let frame = CallFrame::new(kind, code, scope, environment, self.current.clone());
        self.handle.callstack.push(frame);
        scope
    }

    pub(crate) fn enter_controller(&mut self, kind: FrameKind) -> FrameId {
        let parent = self.scope();
        let environment = self.environment();
        let scope = self.vm.scopes.push_frame(Some(parent));
        let frame = CallFrame::controller(kind, scope, environment, self.current.clone());
        self.handle.callstack.push(frame);
        scope
    }

    pub(crate) fn pop_frame(&mut self) -> Option<CallFrame> {
        self.handle.callstack.pop_release(&mut self.vm.scopes)
    }

    /// Entrega o valor de um frame concluído a quem ficou no topo.
    pub(crate) fn deliver(&mut self, value: Value) {
        let Some(frame) = self.handle.callstack.top_mut() else {
            self.finish(value);
            return;
        };
        if frame.kind.is_controller() {
            frame.delivered = Some(value);
        } else {
            frame.push(value);
        }
    }

    fn complete_top(&mut self) -> Checked<Flow> {
        let controller = self.handle.callstack.top().is_some_and(|f| f.kind.is_controller());
        if controller {
            return self.step_controller();
        }
        let Some(mut frame) = self.pop_frame() else {
            return Ok(Flow::Continue);
        };
        let result = frame.take_result();
        match frame.kind {
            FrameKind::IsNil => self.deliver(Value::Boolean(result.is_nil())),
            FrameKind::ExitWith => {
                // sai do frame que chamou exitWith e do laço que o contém
                self.pop_frame();
                if self.handle.callstack.top().is_some_and(|f| f.kind.is_loop()) {
                    self.pop_frame();
                }
                self.deliver(result);
            }
            _ => self.deliver(result),
        }
        Ok(Flow::Continue)
    }

    fn finish(&mut self, value: Value) {
        self.handle.result = value;
        self.handle.transition(HandleState::Finished);
    }

    fn suspend(&mut self, wake: WakeCondition) -> Flow {
        self.handle.wake = Some(wake);
        self.handle.transition(HandleState::Suspended);
        Flow::Yield
    }

    fn terminate(&mut self) {
        self.handle.callstack.unwind(&mut self.vm.scopes);
        self.handle.transition(HandleState::Terminated);
    }

    fn abort(&mut self, abort: Abort) {
        match abort {
            Abort::Statement => {
                while self.handle.callstack.top().is_some_and(|f| f.kind.is_controller()) {
                    self.pop_frame();
                }
                if let Some(frame) = self.handle.callstack.top_mut() {
                    frame.skip_statement();
                }
            }
            Abort::Handle => {
                let trace = self.handle.callstack.trace(&self.vm.scopes);
                self.note(RuntimeFault::Stacktrace { trace: trace.to_string() });
                self.handle.trace = Some(trace);
                self.handle.callstack.unwind(&mut self.vm.scopes);
                self.handle.result = Value::Nil;
                self.handle.transition(HandleState::Terminated);
            }
        }
    }

    /// Recusa a suspensão quando a VM ou o ambiente a proíbem.
    pub(crate) fn check_suspension(&mut self) -> Checked<()> {
        if !self.vm.config.allow_suspension {
            return self.raise(RuntimeFault::SuspensionDisabled);
        }
        if self.environment() == Environment::Unscheduled {
            return self.raise(RuntimeFault::SuspensionInUnscheduledEnvironment);
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // LOOP CONTROLLERS
    // ═══════════════════════════════════════════════════════════════════════

    fn step_controller(&mut self) -> Checked<Flow> {
        self.charge()?;
        let Some(frame) = self.handle.callstack.top_mut() else {
            return Ok(Flow::Continue);
        };
        let delivered = frame.delivered.take();
        match &frame.kind {
            FrameKind::While { .. } => self.step_while(delivered),
            FrameKind::ForStep { .. } => self.step_for(),
            FrameKind::ForEach { .. } => self.step_for_each(),
            FrameKind::WaitUntil { .. } => self.step_wait_until(delivered),
            _ => Ok(Flow::Continue),
        }
    }

    fn top_kind_mut(&mut self) -> Option<&mut FrameKind> {
        self.handle.callstack.top_mut().map(|f| &mut f.kind)
    }

    fn set_phase(&mut self, next: LoopPhase) {
        match self.top_kind_mut() {
            Some(FrameKind::While { phase, .. })
            | Some(FrameKind::ForStep { phase, .. })
            | Some(FrameKind::WaitUntil { phase, .. }) => *phase = next,
            _ => {}
        }
    }

    fn leave_controller(&mut self, value: Value) {
        self.pop_frame();
        self.deliver(value);
    }

    fn loop_condition(&mut self, delivered: Option<Value>, label: &str) -> Checked<bool> {
        match delivered {
            Some(Value::Boolean(b)) => Ok(b),
            Some(other) => self.recover(
                RuntimeFault::TypeMismatch {
                    expected: vec![ValueType::Boolean],
                    got: other.value_type(),
                    strength: Strength::Strong,
                },
                false,
            ),
            None => self.recover(
                RuntimeFault::CallstackFoundNoValue {
                    callstack: label.to_string(),
                    strength: Strength::Strong,
                },
                false,
            ),
        }
    }

    fn step_while(&mut self, delivered: Option<Value>) -> Checked<Flow> {
        let (condition, body, phase) = match self.top_kind_mut() {
            Some(FrameKind::While { condition, body, phase }) => {
                (Rc::clone(condition), Rc::clone(body), *phase)
            }
            _ => return Ok(Flow::Continue),
        };
        match phase {
            LoopPhase::Start | LoopPhase::Body => {
                self.set_phase(LoopPhase::Condition);
                self.enter_block(FrameKind::Block, condition, None);
            }
            LoopPhase::Condition => {
                if self.loop_condition(delivered, "while")? {
                    self.set_phase(LoopPhase::Body);
                    self.enter_block(FrameKind::Block, body, None);
                } else {
                    self.leave_controller(Value::Nil);
                }
            }
        }
        Ok(Flow::Continue)
    }

    fn step_for(&mut self) -> Checked<Flow> {
        let scope = self.scope();
        let (variable, mut current, to, step, body, phase) = match self.top_kind_mut() {
            Some(FrameKind::ForStep { variable, current, to, step, body, phase }) => {
                (Rc::clone(variable), *current, *to, *step, Rc::clone(body), *phase)
            }
            _ => return Ok(Flow::Continue),
        };

        if phase == LoopPhase::Start {
            let reachable = (step > 0.0 && current <= to) || (step < 0.0 && current >= to);
            if !reachable {
                self.note(RuntimeFault::ForStepNoWorkShouldBeDone { step, from: current, to });
                self.leave_controller(Value::Nil);
                return Ok(Flow::Continue);
            }
        } else {
            // o corpo pode ter reescrito a variável do laço
            let value = self.vm.scopes.frame(scope).and_then(|f| f.get(&variable)).cloned();
            match value {
                // passos abaixo da precisão de f64 não avançam o laço
                Some(Value::Scalar(v)) if v + step == v => {
                    self.note(RuntimeFault::ForStepNoWorkShouldBeDone { step, from: v, to });
                    self.leave_controller(Value::Nil);
                    return Ok(Flow::Continue);
                }
                Some(Value::Scalar(v)) => current = v + step,
                other => {
                    let got = other.map_or(ValueType::Nil, |v| v.value_type());
                    self.note(RuntimeFault::ForStepVariableTypeMismatch {
                        variable: variable.to_string(),
                        expected: ValueType::Scalar,
                        got,
                    });
                    self.leave_controller(Value::Nil);
                    return Ok(Flow::Continue);
                }
            }
            let continues = if step > 0.0 { current <= to } else { current >= to };
            if !continues {
                self.leave_controller(Value::Nil);
                return Ok(Flow::Continue);
            }
        }

        if let Some(FrameKind::ForStep { current: stored, phase, .. }) = self.top_kind_mut() {
            *stored = current;
            *phase = LoopPhase::Body;
        }
        self.declare(scope, &variable, Value::Scalar(current))?;
        self.enter_block(FrameKind::Block, body, None);
        Ok(Flow::Continue)
    }

    fn step_for_each(&mut self) -> Checked<Flow> {
        let scope = self.scope();
        let next = match self.top_kind_mut() {
            Some(FrameKind::ForEach { items, index, body }) => {
                let next = items.get(*index).cloned().map(|item| (item, *index, Rc::clone(body)));
                *index += 1;
                next
            }
            _ => return Ok(Flow::Continue),
        };
        let Some((item, index, body)) = next else {
            self.leave_controller(Value::Nil);
            return Ok(Flow::Continue);
        };
        self.declare(scope, "_x", item)?;
        self.declare(scope, "_forEachIndex", Value::from(index))?;
        self.enter_block(FrameKind::Block, body, None);
        Ok(Flow::Continue)
    }

    fn step_wait_until(&mut self, delivered: Option<Value>) -> Checked<Flow> {
        let (condition, phase) = match self.top_kind_mut() {
            Some(FrameKind::WaitUntil { condition, phase }) => (Rc::clone(condition), *phase),
            _ => return Ok(Flow::Continue),
        };
        if phase != LoopPhase::Condition {
            self.set_phase(LoopPhase::Condition);
            self.enter_block(FrameKind::Block, condition, None);
            return Ok(Flow::Continue);
        }
        if self.loop_condition(delivered, "waitUntil")? {
            self.leave_controller(Value::Nil);
            return Ok(Flow::Continue);
        }
        self.set_phase(LoopPhase::Start);
        Ok(self.suspend(WakeCondition::NextTurn))
    }
}
