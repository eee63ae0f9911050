//! `callExtension`

use super::{items, reply, text, CommandRegistry};
use crate::diagnostics::RuntimeFault;
use crate::exec::{Exec, Reply};
use crate::fault::{expect_size, expect_types, Checked, Diagnostics, Reporter, Strength};
use crate::value::{Value, ValueType};

use crate::value::ValueType::{Array, String as Str};

pub(super) fn register(table: &mut CommandRegistry) {
    table.add_binary("callExtension", Str, Str, call_plain);
    table.add_binary("callExtension", Str, Array, call_with_args);
}

fn call_plain(ex: &mut Exec<'_>, left: Value, right: Value) -> Checked<Reply> {
    let location = ex.location();
    let vm = &mut *ex.vm;
    let mut reporter = Reporter::new(&mut vm.logger, location);
    let output = vm.extensions.call(&mut reporter, text(&left), text(&right))?;
    reply(output)
}

/// `"ext" callExtension ["fn", [args...]]` devolve `[saída, código, 0]`
fn call_with_args(ex: &mut Exec<'_>, left: Value, right: Value) -> Checked<Reply> {
    let request = items(&right);
    expect_size(ex, &request, 2, Strength::Strong)?;
    expect_types(ex, &request, &[ValueType::String, ValueType::Array], Strength::Strong)?;

    // strings vão entre aspas, como `str` as formata
    let args: Vec<String> = items(&request[1]).iter().map(Value::to_script_string).collect();

    let location = ex.location();
    let vm = &mut *ex.vm;
    let mut reporter = Reporter::new(&mut vm.logger, location);
    let (output, code) = vm.extensions.call_args(&mut reporter, text(&left), text(&request[0]), &args)?;
    if code != 0 {
        reporter.note(RuntimeFault::ReturningErrorCode { error_code: code.to_string() });
    }
    reply(vec![Value::text(output), Value::from(code), Value::from(0)])
}
