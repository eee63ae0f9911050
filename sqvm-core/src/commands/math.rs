//! Aritmética, comparação, lógica e conversões para texto

use super::{flag, items, nil, num, reply, text, CommandRegistry};
use crate::diagnostics::RuntimeFault;
use crate::exec::{Exec, Reply};
use crate::fault::{expect_not_empty, expect_types, Checked, Diagnostics, Strength};
use crate::value::Value;

use crate::value::ValueType::{Any, Array, Boolean, Config, Group, Object, Scalar, Script, String as Str};

pub(super) fn register(table: &mut CommandRegistry) {
    table.add_binary("+", Scalar, Scalar, |_, l, r| reply(num(&l) + num(&r)));
    table.add_binary("+", Str, Str, |_, l, r| reply(format!("{}{}", text(&l), text(&r))));
    table.add_binary("+", Array, Array, |_, l, r| {
        let mut joined = items(&l);
        joined.extend(items(&r));
        reply(joined)
    });
    table.add_unary("+", Scalar, |_, v| reply(num(&v)));
    table.add_unary("+", Array, |_, v| reply(v.deep_copy()));

    table.add_binary("-", Scalar, Scalar, |_, l, r| reply(num(&l) - num(&r)));
    table.add_binary("-", Array, Array, |_, l, r| {
        let remove = items(&r);
        let kept: Vec<Value> = items(&l).into_iter().filter(|v| !remove.iter().any(|x| x.equals(v))).collect();
        reply(kept)
    });
    table.add_unary("-", Scalar, |_, v| reply(-num(&v)));

    table.add_binary("*", Scalar, Scalar, |_, l, r| reply(num(&l) * num(&r)));
    table.add_binary("/", Scalar, Scalar, divide);
    table.add_binary("%", Scalar, Scalar, modulo);
    table.add_binary("mod", Scalar, Scalar, modulo);
    table.add_binary("^", Scalar, Scalar, |_, l, r| reply(num(&l).powf(num(&r))));
    table.add_binary("min", Scalar, Scalar, |_, l, r| reply(num(&l).min(num(&r))));
    table.add_binary("max", Scalar, Scalar, |_, l, r| reply(num(&l).max(num(&r))));

    for ty in [Scalar, Str, Boolean, Object, Group, Script, Config] {
        table.add_binary("==", ty, ty, |_, l, r| reply(loose_equals(&l, &r)));
        table.add_binary("!=", ty, ty, |_, l, r| reply(!loose_equals(&l, &r)));
    }
    table.add_binary("<", Scalar, Scalar, |_, l, r| reply(num(&l) < num(&r)));
    table.add_binary(">", Scalar, Scalar, |_, l, r| reply(num(&l) > num(&r)));
    table.add_binary("<=", Scalar, Scalar, |_, l, r| reply(num(&l) <= num(&r)));
    table.add_binary(">=", Scalar, Scalar, |_, l, r| reply(num(&l) >= num(&r)));
    table.add_binary("isEqualTo", Any, Any, |_, l, r| reply(l.equals(&r)));

    for name in ["&&", "and"] {
        table.add_binary(name, Boolean, Boolean, |_, l, r| reply(flag(&l) && flag(&r)));
    }
    for name in ["||", "or"] {
        table.add_binary(name, Boolean, Boolean, |_, l, r| reply(flag(&l) || flag(&r)));
    }
    for name in ["!", "not"] {
        table.add_unary(name, Boolean, |_, v| reply(!flag(&v)));
    }

    table.add_unary("abs", Scalar, |_, v| reply(num(&v).abs()));
    table.add_unary("floor", Scalar, |_, v| reply(num(&v).floor()));
    table.add_unary("ceil", Scalar, |_, v| reply(num(&v).ceil()));
    table.add_unary("round", Scalar, |_, v| reply(num(&v).round()));
    table.add_unary("sqrt", Scalar, |_, v| reply(num(&v).sqrt()));

    table.add_unary("str", Any, |_, v| reply(v.to_script_string()));
    table.add_unary("typeName", Any, |_, v| reply(v.value_type().name()));
    table.add_unary("format", Array, format);
}

/// `==` do script: textos ignoram maiúsculas
fn loose_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Text(a), Value::Text(b)) => a.eq_ignore_ascii_case(b),
        _ => left.equals(right),
    }
}

fn divide(ex: &mut Exec<'_>, left: Value, right: Value) -> Checked<Reply> {
    let divisor = num(&right);
    if divisor == 0.0 {
        return ex.recover(RuntimeFault::ZeroDivisor, Reply::Value(Value::from(0.0)));
    }
    reply(num(&left) / divisor)
}

fn modulo(ex: &mut Exec<'_>, left: Value, right: Value) -> Checked<Reply> {
    let divisor = num(&right);
    if divisor == 0.0 {
        return ex.recover(RuntimeFault::ZeroDivisor, Reply::Value(Value::from(0.0)));
    }
    reply(num(&left) % divisor)
}

/// `format ["%1 de %2", a, b]`
fn format(ex: &mut Exec<'_>, right: Value) -> Checked<Reply> {
    let args = items(&right);
    if !expect_not_empty(ex, &args, Strength::Weak)? {
        ex.note(RuntimeFault::ReturningEmptyString);
        return reply("");
    }
    if !expect_types(ex, &args[..1], &[Str], Strength::Strong)? {
        return nil();
    }
    let template: Vec<char> = text(&args[0]).chars().collect();
    let mut out = String::with_capacity(template.len());
    let mut i = 0;
    while i < template.len() {
        if template[i] != '%' {
            out.push(template[i]);
            i += 1;
            continue;
        }
        let start = i;
        i += 1;
        let digits: String = template[i..].iter().take_while(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            match template.get(i) {
                Some('%') => {
                    out.push('%');
                    i += 1;
                }
                other => {
                    let placeholder = other.copied().unwrap_or('%');
                    ex.note(RuntimeFault::FormatInvalidPlaceholder { placeholder, index: start });
                    out.push('%');
                }
            }
            continue;
        }
        i += digits.len();
        let index: usize = digits.parse().unwrap_or_default();
        match args.get(index).filter(|_| index > 0) {
            Some(arg) => out.push_str(&arg.to_string()),
            None => {
                let placeholder = digits.chars().next().unwrap_or('0');
                ex.note(RuntimeFault::FormatInvalidPlaceholder { placeholder, index: start });
                out.push('%');
                out.push_str(&digits);
            }
        }
    }
    reply(out)
}
