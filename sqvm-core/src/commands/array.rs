//! Comandos sobre arrays
//!
//! Leituras usam a forma forte das verificações de índice; remoções e
//! redimensionamentos usam a fraca e devolvem Nil ou deixam o array intacto.

use super::{items, nil, num, reply, text, CommandRegistry};
use crate::diagnostics::RuntimeFault;
use crate::exec::{Exec, Reply};
use crate::fault::{expect_index, expect_not_empty, expect_size, expect_size_range, expect_types, Checked, Diagnostics, Strength};
use crate::value::{ArrayRef, Value};

use crate::value::ValueType::{Any, Array, Boolean, Scalar, String as Str};

pub(super) fn register(table: &mut CommandRegistry) {
    table.add_unary("count", Array, |_, v| reply(items(&v).len()));
    table.add_unary("count", Str, |_, v| reply(text(&v).chars().count()));

    table.add_binary("select", Array, Scalar, select_index);
    table.add_binary("select", Array, Boolean, |ex, l, r| {
        let index = if r.as_bool().unwrap_or_default() { 1.0 } else { 0.0 };
        select_index(ex, l, Value::from(index))
    });
    table.add_binary("select", Array, Array, select_range);

    table.add_binary("resize", Array, Scalar, resize);
    table.add_binary("set", Array, Array, set);
    table.add_binary("pushBack", Array, Any, push_back);
    table.add_binary("append", Array, Array, append);
    table.add_binary("deleteAt", Array, Scalar, delete_at);

    table.add_binary("find", Array, Any, |_, l, r| {
        let position = items(&l).iter().position(|v| v.equals(&r));
        reply(position.map_or(-1.0, |p| p as f64))
    });
    table.add_binary("find", Str, Str, |_, l, r| {
        let (haystack, needle) = (text(&l), text(&r));
        let position = haystack.find(needle).map(|byte| haystack[..byte].chars().count());
        reply(position.map_or(-1.0, |p| p as f64))
    });
    table.add_binary("in", Any, Array, |_, l, r| reply(items(&r).iter().any(|v| v.equals(&l))));

    table.add_unary("reverse", Array, |_, v| {
        if let Some(array) = v.as_array() {
            array.borrow_mut().reverse();
        }
        nil()
    });
    table.add_unary("selectMax", Array, |ex, v| select_extreme(ex, v, f64::max));
    table.add_unary("selectMin", Array, |ex, v| select_extreme(ex, v, f64::min));
}

fn array_of(value: &Value) -> ArrayRef {
    value.as_array().cloned().unwrap_or_default()
}

/// `array select index`
fn select_index(ex: &mut Exec<'_>, left: Value, right: Value) -> Checked<Reply> {
    let array = array_of(&left);
    match expect_index(ex, array.len(), num(&right), Strength::Strong)? {
        Some(index) => reply(array.get(index).unwrap_or_default()),
        None => nil(),
    }
}

/// `array select [start, count]`
fn select_range(ex: &mut Exec<'_>, left: Value, right: Value) -> Checked<Reply> {
    let range = items(&right);
    if !expect_size_range(ex, &range, 1, 2, Strength::Strong)? {
        return nil();
    }
    if !expect_types(ex, &range, &[Scalar, Scalar], Strength::Strong)? {
        return nil();
    }
    let start = num(&range[0]);
    if start < 0.0 {
        ex.raise(RuntimeFault::NegativeIndex { strength: Strength::Strong })?;
        return nil();
    }
    let source = items(&left);
    let start = start.floor() as usize;
    if start > source.len() {
        let fault = RuntimeFault::StartIndexExceedsToIndex {
            from: start,
            to: source.len(),
            strength: Strength::Weak,
        };
        ex.raise(fault)?;
        ex.note(RuntimeFault::ReturningEmptyArray);
        return reply(Value::empty_array());
    }
    let count = match range.get(1) {
        Some(count) if num(count) < 0.0 => {
            ex.raise(RuntimeFault::NegativeSize { strength: Strength::Strong })?;
            return nil();
        }
        Some(count) => num(count).floor() as usize,
        None => source.len() - start,
    };
    let end = start.saturating_add(count).min(source.len());
    reply(source[start..end].to_vec())
}

/// Tamanhos acima de `max_array_size` abortam a instrução
fn within_limit(ex: &mut Exec<'_>, size: usize) -> Checked<bool> {
    let maximum = ex.vm.config.max_array_size;
    if size <= maximum {
        return Ok(true);
    }
    ex.raise(RuntimeFault::IndexOutOfRange { range: maximum, index: size, strength: Strength::Strong })?;
    Ok(false)
}

fn resize(ex: &mut Exec<'_>, left: Value, right: Value) -> Checked<Reply> {
    let size = num(&right);
    if size < 0.0 {
        ex.raise(RuntimeFault::NegativeSize { strength: Strength::Weak })?;
        return nil();
    }
    let size = size.floor() as usize;
    if !within_limit(ex, size)? {
        return nil();
    }
    array_of(&left).borrow_mut().resize(size, Value::Nil);
    nil()
}

/// `array set [index, value]`; índices além do fim estendem o array
fn set(ex: &mut Exec<'_>, left: Value, right: Value) -> Checked<Reply> {
    let args = items(&right);
    if !expect_size(ex, &args, 2, Strength::Strong)? {
        return nil();
    }
    if !expect_types(ex, &args, &[Scalar, Any], Strength::Strong)? {
        return nil();
    }
    let index = num(&args[0]);
    if index < 0.0 {
        ex.raise(RuntimeFault::NegativeIndex { strength: Strength::Strong })?;
        return nil();
    }
    let target = array_of(&left);
    if target.would_recurse(&args[1]) {
        ex.raise(RuntimeFault::ArrayRecursion)?;
        return nil();
    }
    let index = index.floor() as usize;
    if index >= target.len() && !within_limit(ex, index.saturating_add(1))? {
        return nil();
    }
    let mut slots = target.borrow_mut();
    if index >= slots.len() {
        slots.resize(index + 1, Value::Nil);
    }
    slots[index] = args[1].clone();
    nil()
}

fn push_back(ex: &mut Exec<'_>, left: Value, right: Value) -> Checked<Reply> {
    let target = array_of(&left);
    if target.would_recurse(&right) {
        ex.raise(RuntimeFault::ArrayRecursion)?;
        return nil();
    }
    let mut slots = target.borrow_mut();
    slots.push(right);
    reply(slots.len() - 1)
}

fn append(ex: &mut Exec<'_>, left: Value, right: Value) -> Checked<Reply> {
    let target = array_of(&left);
    let incoming = items(&right);
    if incoming.iter().any(|v| target.would_recurse(v)) {
        ex.raise(RuntimeFault::ArrayRecursion)?;
        return nil();
    }
    target.borrow_mut().extend(incoming);
    nil()
}

fn delete_at(ex: &mut Exec<'_>, left: Value, right: Value) -> Checked<Reply> {
    let target = array_of(&left);
    match expect_index(ex, target.len(), num(&right), Strength::Weak)? {
        Some(index) => reply(target.borrow_mut().remove(index)),
        None => {
            ex.note(RuntimeFault::ReturningNil);
            nil()
        }
    }
}

fn select_extreme(ex: &mut Exec<'_>, value: Value, pick: fn(f64, f64) -> f64) -> Checked<Reply> {
    let values = items(&value);
    if !expect_not_empty(ex, &values, Strength::Weak)? {
        ex.note(RuntimeFault::ReturningNil);
        return nil();
    }
    let types = vec![Scalar; values.len()];
    if !expect_types(ex, &values, &types, Strength::Weak)? {
        ex.note(RuntimeFault::ReturningNil);
        return nil();
    }
    let best = values.iter().map(num).reduce(pick).unwrap_or_default();
    reply(best)
}
