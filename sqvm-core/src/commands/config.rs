//! Config tree navigation (`configFile >> "CfgVehicles" >> "Car"`)

use std::rc::Rc;

use super::{reply, text, CommandRegistry};
use crate::config_tree::{ConfigEntryRef, ConfigRef, ConfigValue};
use crate::diagnostics::RuntimeFault;
use crate::exec::{Exec, Reply};
use crate::fault::{Checked, Diagnostics, Reporter, Strength};
use crate::value::{Value, ValueType};

use crate::value::ValueType::{Config, String as Str};

pub(super) fn register(table: &mut CommandRegistry) {
    table.add_nular("configFile", |_| reply(Value::Config(ConfigRef::root())));
    table.add_nular("configNull", |_| reply(Value::Config(ConfigRef::null())));
    table.add_binary(">>", Config, Str, navigate);
    table.add_binary("/", Config, Str, navigate);

    table.add_unary("getNumber", Config, get_number);
    table.add_unary("getText", Config, get_text);
    table.add_unary("getArray", Config, get_array);
    table.add_unary("isClass", Config, |ex, v| {
        let found = with_entry(ex, &v, |entry| matches!(entry, Some(ConfigEntryRef::Class(_))));
        reply(found)
    });
    table.add_unary("isNumber", Config, |ex, v| {
        reply(with_entry(ex, &v, |e| matches!(e, Some(ConfigEntryRef::Value(ConfigValue::Number(_))))))
    });
    table.add_unary("isText", Config, |ex, v| {
        reply(with_entry(ex, &v, |e| matches!(e, Some(ConfigEntryRef::Value(ConfigValue::Text(_))))))
    });
    table.add_unary("isArray", Config, |ex, v| {
        reply(with_entry(ex, &v, |e| matches!(e, Some(ConfigEntryRef::Value(ConfigValue::Array(_))))))
    });
    table.add_unary("configName", Config, |_, v| reply(config_of(&v).name().to_string()));
}

fn config_of(value: &Value) -> ConfigRef {
    match value {
        Value::Config(config) => config.clone(),
        _ => ConfigRef::null(),
    }
}

/// Runs `f` on the entry `value` points at (`None` for null or dangling refs).
fn with_entry<T>(ex: &Exec<'_>, value: &Value, f: impl FnOnce(Option<ConfigEntryRef<'_>>) -> T) -> T {
    let config = config_of(value);
    let entry = config.segments().and_then(|path| ex.vm.config_tree.lookup(path));
    f(entry)
}

/// `config >> "Name"`: segments keep the tree's spelling
fn navigate(ex: &mut Exec<'_>, left: Value, right: Value) -> Checked<Reply> {
    let parent = config_of(&left);
    let Some(segments) = parent.segments() else {
        return reply(Value::Config(ConfigRef::null()));
    };
    let mut path: Vec<Rc<str>> = segments.to_vec();
    path.push(Rc::from(text(&right)));

    let location = ex.location();
    let vm = &mut *ex.vm;
    let mut reporter = Reporter::new(&mut vm.logger, location);
    if vm.config_tree.lookup_checked(&mut reporter, &path, Strength::Weak)?.is_none() {
        reporter.note(RuntimeFault::ReturningConfigNull);
        return reply(Value::Config(ConfigRef::null()));
    }
    let canonical = vm.config_tree.canonical_path(&path).unwrap_or_default();
    reply(Value::Config(ConfigRef::from_path(canonical)))
}

fn convert(value: &ConfigValue) -> Value {
    match value {
        ConfigValue::Number(n) => Value::from(*n),
        ConfigValue::Text(s) => Value::text(s),
        ConfigValue::Array(items) => Value::array(items.iter().map(convert).collect()),
    }
}

/// Reads a value entry of the wanted kind.
///
/// Missing entries give `None` silently; entries of another kind raise
/// `TypeMismatchWeak`, and the caller falls back.
fn read_value(ex: &mut Exec<'_>, value: &Value, expected: ValueType) -> Checked<Option<Value>> {
    let found = with_entry(ex, value, |entry| match entry {
        Some(ConfigEntryRef::Value(v)) => Some(convert(v)),
        Some(ConfigEntryRef::Class(_)) => Some(Value::Config(config_of(value))),
        None => None,
    });
    let Some(found) = found else {
        return Ok(None);
    };
    let got = found.value_type();
    if got == expected {
        return Ok(Some(found));
    }
    ex.raise(RuntimeFault::TypeMismatch { expected: vec![expected], got, strength: Strength::Weak })?;
    Ok(None)
}

fn get_number(ex: &mut Exec<'_>, right: Value) -> Checked<Reply> {
    match read_value(ex, &right, ValueType::Scalar)? {
        Some(number) => reply(number),
        None => {
            ex.note(RuntimeFault::ReturningScalarZero);
            reply(0.0)
        }
    }
}

fn get_text(ex: &mut Exec<'_>, right: Value) -> Checked<Reply> {
    match read_value(ex, &right, ValueType::String)? {
        Some(text) => reply(text),
        None => {
            ex.note(RuntimeFault::ReturningEmptyString);
            reply("")
        }
    }
}

fn get_array(ex: &mut Exec<'_>, right: Value) -> Checked<Reply> {
    match read_value(ex, &right, ValueType::Array)? {
        Some(array) => reply(array),
        None => {
            ex.note(RuntimeFault::ReturningEmptyArray);
            reply(Value::empty_array())
        }
    }
}
