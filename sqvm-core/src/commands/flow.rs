//! Controle de fluxo: condicionais, laços, chamadas e escopos nomeados
//!
//! Construções compostas são montadas em valores de controle intermediários
//! (`if` → `then`, `while` → `do`, `for` → `from` → `to` → `step` → `do`).
//! Blocos e laços viram frames; o resultado chega pelo frame quando termina.

use std::rc::Rc;

use super::{flag, items, nil, reply, text, CommandRegistry};
use crate::callstack::{Environment, FrameKind, LoopPhase};
use crate::diagnostics::RuntimeFault;
use crate::exec::{Exec, Reply};
use crate::fault::{expect_size, expect_types, Checked, Diagnostics, Strength};
use crate::instruction::CodeBlock;
use crate::value::{ControlValue, ForSpec, Value};

use crate::value::ValueType::{Any, Array, Boolean, Code, For, If, String as Str, While};

pub(super) fn register(table: &mut CommandRegistry) {
    table.add_nular("nil", |_| nil());
    table.add_nular("true", |_| reply(true));
    table.add_nular("false", |_| reply(false));

    table.add_unary("if", Boolean, |_, v| reply(Value::Control(ControlValue::If(flag(&v)))));
    table.add_binary("then", If, Code, then_code);
    table.add_binary("then", If, Array, then_branches);
    table.add_binary("else", Code, Code, |_, l, r| reply(vec![l, r]));
    table.add_binary("exitWith", If, Code, exit_with);

    table.add_unary("while", Code, |_, v| reply(Value::Control(ControlValue::While(code_of(&v)))));
    table.add_binary("do", While, Code, while_do);

    table.add_unary("for", Str, |_, v| {
        let spec = ForSpec { variable: Rc::from(text(&v)), from: 0.0, to: 0.0, step: 1.0 };
        reply(Value::Control(ControlValue::For(spec)))
    });
    table.add_binary("from", For, Any, |ex, l, r| for_part(ex, l, r, |spec, n| spec.from = n));
    table.add_binary("to", For, Any, |ex, l, r| for_part(ex, l, r, |spec, n| spec.to = n));
    table.add_binary("step", For, Any, |ex, l, r| for_part(ex, l, r, |spec, n| spec.step = n));
    table.add_binary("do", For, Code, for_do);
    table.add_binary("forEach", Code, Array, for_each);

    table.add_unary("call", Code, |ex, v| {
        ex.enter_block(FrameKind::Block, code_of(&v), None);
        Ok(Reply::Deferred)
    });
    table.add_binary("call", Any, Code, |ex, l, r| {
        let scope = ex.enter_block(FrameKind::Block, code_of(&r), None);
        ex.declare(scope, "_this", l)?;
        Ok(Reply::Deferred)
    });

    table.add_unary("isNil", Str, |ex, v| {
        let found = ex.vm.scopes.resolve(Some(ex.scope()), text(&v));
        reply(found.is_none_or(|value| value.is_nil()))
    });
    table.add_unary("isNil", Code, |ex, v| {
        ex.enter_block(FrameKind::IsNil, code_of(&v), Some(Environment::Unscheduled));
        Ok(Reply::Deferred)
    });

    table.add_unary("private", Str, |ex, v| {
        let scope = ex.scope();
        ex.declare(scope, text(&v), Value::Nil)?;
        nil()
    });
    table.add_unary("private", Array, private_names);
    table.add_unary("scopeName", Str, scope_name);
    table.add_unary("breakOut", Str, |ex, v| break_out(ex, Value::Nil, text(&v)));
    table.add_binary("breakOut", Any, Str, |ex, l, r| break_out(ex, l, text(&r)));

    table.add_unary("assert", Boolean, |ex, v| {
        if !flag(&v) {
            ex.raise(RuntimeFault::AssertFailed)?;
        }
        reply(flag(&v))
    });
    table.add_unary("diag_log", Any, |ex, v| {
        ex.note(RuntimeFault::InfoMessage { source: "diag_log".to_string(), message: v.to_string() });
        nil()
    });
}

fn code_of(value: &Value) -> Rc<CodeBlock> {
    match value {
        Value::Code(code) => Rc::clone(code),
        Value::Control(ControlValue::While(code)) => Rc::clone(code),
        _ => Rc::new(CodeBlock::default()),
    }
}

fn condition(value: &Value) -> bool {
    matches!(value, Value::Control(ControlValue::If(true)))
}

fn then_code(ex: &mut Exec<'_>, left: Value, right: Value) -> Checked<Reply> {
    if !condition(&left) {
        return nil();
    }
    ex.enter_block(FrameKind::Block, code_of(&right), None);
    Ok(Reply::Deferred)
}

/// `if c then [{...}, {...}]` e `if c then {...} else {...}`
fn then_branches(ex: &mut Exec<'_>, left: Value, right: Value) -> Checked<Reply> {
    let branches = items(&right);
    if !expect_size(ex, &branches, 2, Strength::Strong)? {
        return nil();
    }
    if !expect_types(ex, &branches, &[Code, Code], Strength::Strong)? {
        return nil();
    }
    let chosen = if condition(&left) { &branches[0] } else { &branches[1] };
    ex.enter_block(FrameKind::Block, code_of(chosen), None);
    Ok(Reply::Deferred)
}

fn exit_with(ex: &mut Exec<'_>, left: Value, right: Value) -> Checked<Reply> {
    if !condition(&left) {
        return nil();
    }
    ex.enter_block(FrameKind::ExitWith, code_of(&right), None);
    Ok(Reply::Deferred)
}

fn while_do(ex: &mut Exec<'_>, left: Value, right: Value) -> Checked<Reply> {
    let kind = FrameKind::While {
        condition: code_of(&left),
        body: code_of(&right),
        phase: LoopPhase::Start,
    };
    ex.enter_controller(kind);
    Ok(Reply::Deferred)
}

fn for_part(ex: &mut Exec<'_>, left: Value, right: Value, apply: fn(&mut ForSpec, f64)) -> Checked<Reply> {
    let Value::Control(ControlValue::For(mut spec)) = left else {
        return nil();
    };
    let Some(n) = right.as_scalar() else {
        let fault = RuntimeFault::ForStepVariableTypeMismatch {
            variable: spec.variable.to_string(),
            expected: crate::value::ValueType::Scalar,
            got: right.value_type(),
        };
        ex.note(fault);
        return nil();
    };
    apply(&mut spec, n);
    reply(Value::Control(ControlValue::For(spec)))
}

fn for_do(ex: &mut Exec<'_>, left: Value, right: Value) -> Checked<Reply> {
    let Value::Control(ControlValue::For(spec)) = left else {
        return nil();
    };
    let kind = FrameKind::ForStep {
        variable: spec.variable,
        current: spec.from,
        to: spec.to,
        step: spec.step,
        body: code_of(&right),
        phase: LoopPhase::Start,
    };
    ex.enter_controller(kind);
    Ok(Reply::Deferred)
}

fn for_each(ex: &mut Exec<'_>, left: Value, right: Value) -> Checked<Reply> {
    let kind = FrameKind::ForEach { items: items(&right), index: 0, body: code_of(&left) };
    ex.enter_controller(kind);
    Ok(Reply::Deferred)
}

fn private_names(ex: &mut Exec<'_>, right: Value) -> Checked<Reply> {
    let names = items(&right);
    let types = vec![Str; names.len()];
    if !expect_types(ex, &names, &types, Strength::Strong)? {
        return nil();
    }
    let scope = ex.scope();
    for name in &names {
        ex.declare(scope, text(name), Value::Nil)?;
    }
    nil()
}

fn scope_name(ex: &mut Exec<'_>, right: Value) -> Checked<Reply> {
    let scope = ex.scope();
    if ex.vm.scopes.set_scope_name(scope, text(&right)).is_err() {
        ex.raise(RuntimeFault::ScopeNameAlreadySet)?;
    }
    nil()
}

/// Sai do escopo nomeado mais interno, entregando `value` a quem o chamou.
fn break_out(ex: &mut Exec<'_>, value: Value, name: &str) -> Checked<Reply> {
    let Some(depth) = ex.handle.callstack.find_named(&ex.vm.scopes, name) else {
        ex.raise(RuntimeFault::ErrorMessage {
            source: "breakOut".to_string(),
            message: format!("no scope named '{}'", name),
        })?;
        return nil();
    };
    while ex.handle.callstack.len() > depth {
        ex.pop_frame();
    }
    ex.deliver(value);
    Ok(Reply::Deferred)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_only_accepts_true_if() {
        assert!(condition(&Value::Control(ControlValue::If(true))));
        assert!(!condition(&Value::Control(ControlValue::If(false))));
        assert!(!condition(&Value::from(true)));
    }
}
