//! Handles de script: criação, suspensão e término

use super::{nil, num, reply, text, CommandRegistry};
use crate::callstack::{Environment, FrameKind, LoopPhase};
use crate::diagnostics::RuntimeFault;
use crate::exec::{Exec, Reply};
use crate::fault::{Checked, Diagnostics};
use crate::handle::{HandleId, WakeCondition};
use crate::value::Value;

use crate::value::ValueType::{Any, Code, Scalar, Script, String as Str};

pub(super) fn register(table: &mut CommandRegistry) {
    table.add_binary("spawn", Any, Code, |ex, l, r| {
        let Value::Code(code) = r else { return nil() };
        let origin = ex.location();
        let id = ex.vm.spawn_code(code, l, origin);
        reply(Value::Script(Some(id)))
    });
    table.add_unary("sleep", Scalar, sleep);
    table.add_unary("uiSleep", Scalar, sleep);
    table.add_unary("waitUntil", Code, wait_until);

    table.add_unary("terminate", Script, terminate);
    table.add_unary("scriptDone", Script, |ex, v| reply(script_done(ex, &v)));
    table.add_unary("scriptName", Str, |ex, v| {
        if !ex.handle.set_name(text(&v)) {
            ex.raise(RuntimeFault::ScriptNameAlreadySet)?;
        }
        nil()
    });
    table.add_nular("canSuspend", |ex| {
        let suspendable = ex.vm.config.allow_suspension && ex.environment() == Environment::Scheduled;
        reply(suspendable)
    });
    table.add_nular("scriptNull", |_| reply(Value::Script(None)));
    table.add_nular("time", |ex| reply(ex.vm.now()));
}

fn sleep(ex: &mut Exec<'_>, right: Value) -> Checked<Reply> {
    ex.check_suspension()?;
    let wake = ex.vm.now() + num(&right).max(0.0);
    Ok(Reply::Suspend(WakeCondition::At(wake)))
}

fn wait_until(ex: &mut Exec<'_>, right: Value) -> Checked<Reply> {
    ex.check_suspension()?;
    let Value::Code(condition) = right else { return nil() };
    ex.enter_controller(FrameKind::WaitUntil { condition, phase: LoopPhase::Start });
    Ok(Reply::Deferred)
}

fn target(value: &Value) -> Option<HandleId> {
    match value {
        Value::Script(id) => *id,
        _ => None,
    }
}

/// Pedir o próprio término vale no próximo passo; outro handle termina já.
fn terminate(ex: &mut Exec<'_>, right: Value) -> Checked<Reply> {
    let Some(id) = target(&right) else {
        return nil();
    };
    if id == ex.id() {
        ex.handle.terminate_requested = true;
        return nil();
    }
    let location = ex.location();
    if let Err(e) = ex.vm.terminate_at(id, location) {
        ex.raise(RuntimeFault::ErrorMessage { source: "terminate".to_string(), message: e.to_string() })?;
    }
    nil()
}

/// `scriptNull` e handles já recolhidos contam como concluídos
fn script_done(ex: &Exec<'_>, value: &Value) -> bool {
    match target(value) {
        None => true,
        Some(id) if id == ex.id() => false,
        Some(id) => ex.vm.state(id).is_none_or(|state| state.is_absorbed()),
    }
}
