//! # Tabela de comandos
//!
//! Comandos nulares, unários e binários registrados por nome (sem diferenciar
//! maiúsculas). Um nome pode ter várias assinaturas; a primeira cujos tipos
//! aceitam os operandos é chamada.
//!
//! A tabela é montada uma vez e compartilhada por todas as VMs: guarda apenas
//! ponteiros de função e tipos.

mod array;
mod config;
mod extension;
mod flow;
mod math;
mod network;
mod object;
mod script;

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::exec::{Exec, Reply};
use crate::fault::Checked;
use crate::value::{ArrayRef, Value, ValueType};

pub(crate) type NularFn = fn(&mut Exec<'_>) -> Checked<Reply>;
pub(crate) type UnaryFn = fn(&mut Exec<'_>, Value) -> Checked<Reply>;
pub(crate) type BinaryFn = fn(&mut Exec<'_>, Value, Value) -> Checked<Reply>;

pub(crate) struct Unary {
    pub right: ValueType,
    pub func: UnaryFn,
}

pub(crate) struct Binary {
    pub left: ValueType,
    pub right: ValueType,
    pub func: BinaryFn,
}

#[derive(Default)]
pub(crate) struct CommandRegistry {
    nular: HashMap<String, NularFn>,
    unary: HashMap<String, Vec<Unary>>,
    binary: HashMap<String, Vec<Binary>>,
}

impl CommandRegistry {
    fn key(name: &str) -> String {
        name.to_ascii_lowercase()
    }

    pub(crate) fn add_nular(&mut self, name: &str, func: NularFn) {
        self.nular.insert(Self::key(name), func);
    }

    pub(crate) fn add_unary(&mut self, name: &str, right: ValueType, func: UnaryFn) {
        self.unary.entry(Self::key(name)).or_default().push(Unary { right, func });
    }

    pub(crate) fn add_binary(&mut self, name: &str, left: ValueType, right: ValueType, func: BinaryFn) {
        self.binary.entry(Self::key(name)).or_default().push(Binary { left, right, func });
    }

    pub(crate) fn nular(&self, name: &str) -> Option<NularFn> {
        self.nular.get(&Self::key(name)).copied()
    }

    pub(crate) fn unary(&self, name: &str) -> Option<&[Unary]> {
        self.unary.get(&Self::key(name)).map(Vec::as_slice)
    }

    pub(crate) fn binary(&self, name: &str) -> Option<&[Binary]> {
        self.binary.get(&Self::key(name)).map(Vec::as_slice)
    }

    fn len(&self) -> usize {
        self.nular.len()
            + self.unary.values().map(Vec::len).sum::<usize>()
            + self.binary.values().map(Vec::len).sum::<usize>()
    }
}

pub(crate) static COMMANDS: Lazy<CommandRegistry> = Lazy::new(|| {
    let mut registry = CommandRegistry::default();
    math::register(&mut registry);
    array::register(&mut registry);
    flow::register(&mut registry);
    script::register(&mut registry);
    object::register(&mut registry);
    config::register(&mut registry);
    extension::register(&mut registry);
    network::register(&mut registry);
    tracing::debug!(signatures = registry.len(), "command table ready");
    registry
});

// Operandos já passaram pela assinatura; os acessores abaixo só evitam panics.

fn num(value: &Value) -> f64 {
    value.as_scalar().unwrap_or_default()
}

fn text(value: &Value) -> &str {
    value.as_text().unwrap_or_default()
}

fn flag(value: &Value) -> bool {
    value.as_bool().unwrap_or_default()
}

fn items(value: &Value) -> Vec<Value> {
    value.as_array().map(ArrayRef::to_vec).unwrap_or_default()
}

fn reply(value: impl Into<Value>) -> Checked<Reply> {
    Ok(Reply::Value(value.into()))
}

fn nil() -> Checked<Reply> {
    Ok(Reply::Value(Value::Nil))
}

/// `true` se algum comando, de qualquer aridade, usa o nome `name`
pub fn is_command(name: &str) -> bool {
    COMMANDS.nular(name).is_some() || COMMANDS.unary(name).is_some() || COMMANDS.binary(name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_ignores_case() {
        assert!(is_command("COUNT"));
        assert!(is_command("pushback"));
        assert!(COMMANDS.binary("SELECT").is_some_and(|o| o.len() >= 3));
        assert!(!is_command("definitelyNotACommand"));
    }
}
