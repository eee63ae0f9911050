//! Cenários de ponta a ponta sobre a VM

use crate::config_tree::{ConfigClass, ConfigTree, ConfigValue};
use crate::diagnostics::{MemorySink, Severity};
use crate::extension::{write_output, Extension};
use crate::network::{ConnectionState, Connector};
use crate::prelude::*;

fn vm_with(config: VmConfig) -> (VirtualMachine, MemorySink) {
    let sink = MemorySink::new();
    (VirtualMachine::new(config, Logger::new(sink.clone())), sink)
}

fn vm() -> (VirtualMachine, MemorySink) {
    vm_with(VmConfig::default())
}

fn code() -> CodeBuilder {
    CodeBuilder::new("test.sqf")
}

fn scalar(vm: &VirtualMachine, name: &str) -> Option<f64> {
    vm.global(name).and_then(|v| v.as_scalar())
}

fn boolean(vm: &VirtualMachine, name: &str) -> Option<bool> {
    vm.global(name).and_then(|v| v.as_bool())
}

fn string(vm: &VirtualMachine, name: &str) -> Option<String> {
    vm.global(name).and_then(|v| v.as_text().map(str::to_string))
}

fn object(vm: &VirtualMachine, name: &str) -> Option<ObjectRef> {
    vm.global(name).and_then(|v| v.as_object().cloned())
}

fn objects(vm: &VirtualMachine, name: &str) -> Vec<ObjectRef> {
    let items = vm.global(name).and_then(|v| v.as_array().map(|a| a.to_vec())).unwrap_or_default();
    items.iter().filter_map(|v| v.as_object().cloned()).collect()
}

fn vehicles() -> ConfigTree {
    let car = ConfigClass::new()
        .with_value("maxSpeed", ConfigValue::Number(120.0))
        .with_value("displayName", ConfigValue::Text("Car".to_string()))
        .with_value("seats", ConfigValue::Array(vec![ConfigValue::Number(1.0), ConfigValue::Number(3.0)]));
    let cfg = ConfigClass::new().with_class("Car", car);
    ConfigTree::new(ConfigClass::new().with_class("CfgVehicles", cfg))
}

// ═══════════════════════════════════════════════════════════════════════════
// FAULT POLICY
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_instruction_budget_terminates_endless_loop() {
    let (mut vm, sink) = vm_with(VmConfig::default().with_budget(100));
    // while {true} do {}
    let endless = code()
        .code(code().nular("true").build())
        .unary("while")
        .code(CodeBlock::default())
        .binary("do")
        .end()
        .build();

    let outcome = vm.execute_unscheduled(endless);

    assert_eq!(outcome.state, HandleState::Terminated);
    assert_eq!(outcome.executed, 100);
    assert_eq!(sink.count_code(60002), 1);
    assert_eq!(sink.count_code(60001), 1);
    assert!(vm.handle(outcome.id).and_then(|h| h.trace()).is_some());
}

#[test]
fn test_division_by_zero_falls_back_to_zero() {
    let (mut vm, sink) = vm();
    let outcome = vm.execute_unscheduled(code().push(1).push(0).binary("/").assign("x").end().build());
    assert_eq!(outcome.state, HandleState::Finished);
    assert_eq!(scalar(&vm, "x"), Some(0.0));
    assert_eq!(sink.count_code(60054), 1);
}

#[test]
fn test_select_index_faults() {
    let (mut vm, sink) = vm();
    let array = |b: CodeBuilder| b.push(1).push(2).push(3).make_array(3);
    let script = array(code())
        .push(1)
        .binary("select")
        .assign("a")
        .end();
    let script = array(script).push(3).binary("select").assign("b").end();
    let script = array(script).push(5).binary("select").assign("c").end();
    vm.execute_unscheduled(script.push(1).assign("after").end().build());

    assert_eq!(scalar(&vm, "a"), Some(2.0));
    assert!(vm.global("b").is_some_and(|v| v.is_nil()));
    // índice fora do intervalo descarta a instrução inteira
    assert!(vm.global("c").is_none());
    assert_eq!(scalar(&vm, "after"), Some(1.0));
    assert_eq!(sink.count_code(60013), 1);
    assert_eq!(sink.count_code(60009), 1);
    assert_eq!(sink.count(Severity::Error), 1);
}

#[test]
fn test_unknown_variable_warns_and_yields_nil() {
    let (mut vm, sink) = vm();
    vm.execute_unscheduled(code().get("nothing").assign("y").end().build());
    assert!(vm.global("y").is_some_and(|v| v.is_nil()));
    assert_eq!(sink.count_code(60070), 1);
}

#[test]
fn test_unary_type_mismatch_aborts_statement() {
    let (mut vm, sink) = vm();
    let script = code().push("a").unary("sqrt").assign("r").end().push(4).unary("sqrt").assign("s").end();
    let outcome = vm.execute_unscheduled(script.build());
    assert_eq!(outcome.state, HandleState::Finished);
    assert!(vm.global("r").is_none());
    assert_eq!(scalar(&vm, "s"), Some(2.0));
    assert_eq!(sink.count_code(60068), 1);
}

fn for_loop(from: f64, to: f64, body: CodeBlock) -> CodeBlock {
    code()
        .push("_i")
        .unary("for")
        .push(from)
        .binary("from")
        .push(to)
        .binary("to")
        .code(body)
        .binary("do")
        .end()
        .build()
}

#[test]
fn test_instruction_budget_counts_empty_loop_iterations() {
    for to in [1_000_000.0, 1e300] {
        let (mut vm, sink) = vm_with(VmConfig::default().with_budget(100));
        let outcome = vm.execute_unscheduled(for_loop(0.0, to, CodeBlock::default()));

        assert_eq!(outcome.state, HandleState::Terminated);
        assert_eq!(outcome.executed, 100);
        assert_eq!(sink.count_code(60002), 1);
    }
}

#[test]
fn test_for_loop_past_float_precision_stops() {
    let (mut vm, sink) = vm();
    vm.set_global("n", Value::from(0)).unwrap();
    let body = code().get("n").push(1).binary("+").assign("n").end().build();

    let outcome = vm.execute_unscheduled(for_loop(1e300, 1e301, body));

    assert_eq!(outcome.state, HandleState::Finished);
    assert_eq!(scalar(&vm, "n"), Some(1.0));
    assert_eq!(sink.count_code(60082), 1);
}

#[test]
fn test_huge_index_and_size_abort_the_statement() {
    let (mut vm, sink) = vm();
    let script = code()
        .push(1)
        .push(2)
        .make_array(2)
        .assign("a")
        .end()
        .get("a")
        .push(1e30)
        .push(0)
        .make_array(2)
        .binary("set")
        .end()
        .get("a")
        .push(1e18)
        .binary("resize")
        .end()
        .get("a")
        .push(2)
        .push(7)
        .make_array(2)
        .binary("set")
        .end()
        .get("a")
        .unary("count")
        .assign("n")
        .end()
        .build();
    let outcome = vm.execute_unscheduled(script);

    assert_eq!(outcome.state, HandleState::Finished);
    assert_eq!(scalar(&vm, "n"), Some(3.0));
    assert_eq!(sink.count_code(60009), 2);
    assert_eq!(sink.count(Severity::Error), 2);
}

#[test]
fn test_max_array_size_bounds_growth() {
    let config = VmConfig { max_array_size: 4, ..VmConfig::default() };
    let (mut vm, sink) = vm_with(config);
    let script = code()
        .make_array(0)
        .assign("a")
        .end()
        .get("a")
        .push(4)
        .binary("resize")
        .end()
        .get("a")
        .push(4)
        .push(1)
        .make_array(2)
        .binary("set")
        .end()
        .get("a")
        .unary("count")
        .assign("n")
        .end()
        .build();
    vm.execute_unscheduled(script);

    assert_eq!(scalar(&vm, "n"), Some(4.0));
    assert_eq!(sink.count_code(60009), 1);
}

#[test]
fn test_array_recursion_terminates_handle() {
    let (mut vm, sink) = vm();
    let script = code()
        .make_array(0)
        .assign("a")
        .end()
        .get("a")
        .get("a")
        .binary("pushBack")
        .end()
        .push(1)
        .assign("after")
        .end()
        .build();
    let outcome = vm.execute_unscheduled(script);

    assert_eq!(outcome.state, HandleState::Terminated);
    assert_eq!(sink.count_code(60018), 1);
    assert!(vm.global("after").is_none());
    assert_eq!(vm.global("a").and_then(|v| v.as_array().map(|a| a.len())), Some(0));
    assert!(vm.handle(outcome.id).and_then(|h| h.trace()).is_some());
}

#[test]
fn test_make_array_with_missing_operands_is_fatal() {
    let (mut vm, sink) = vm();
    let script = code().push(1).make_array(3).assign("x").end().push(1).assign("after").end().build();
    let outcome = vm.execute_unscheduled(script);

    assert_eq!(outcome.state, HandleState::Terminated);
    assert_eq!(sink.count_code(60071), 1);
    assert!(vm.global("x").is_none());
    assert!(vm.global("after").is_none());
}

#[test]
fn test_missing_operands() {
    let (mut vm, sink) = vm();
    let script = code()
        .push(1)
        .binary("+")
        .assign("a")
        .end()
        .binary("+")
        .assign("b")
        .end()
        .unary("typeName")
        .assign("c")
        .end()
        .push(1)
        .assign("after")
        .end()
        .build();
    let outcome = vm.execute_unscheduled(script);

    assert_eq!(outcome.state, HandleState::Finished);
    assert!(vm.global("a").is_none());
    assert!(vm.global("b").is_none());
    assert_eq!(string(&vm, "c").as_deref(), Some("NOTHING"));
    assert_eq!(scalar(&vm, "after"), Some(1.0));
    assert_eq!(sink.count_code(60074), 1);
    assert_eq!(sink.count_code(60072), 1);
    assert_eq!(sink.count_code(60073), 1);
}

#[test]
fn test_scope_name_is_set_once() {
    let (mut vm, sink) = vm();
    let script = code()
        .push("main")
        .unary("scopeName")
        .end()
        .push("again")
        .unary("scopeName")
        .end()
        .push(1)
        .assign("after")
        .end()
        .build();
    let outcome = vm.execute_unscheduled(script);

    assert_eq!(outcome.state, HandleState::Finished);
    assert_eq!(scalar(&vm, "after"), Some(1.0));
    assert_eq!(sink.count_code(60037), 1);
}

#[test]
fn test_select_range_faults() {
    let (mut vm, sink) = vm();
    let slice = |b: CodeBuilder, start: i32, count: i32| {
        b.push(1).push(2).push(3).make_array(3).push(start).push(count).make_array(2).binary("select")
    };
    let script = slice(code(), -1, 1).assign("a").end();
    let script = slice(script, 5, 1).assign("b").end();
    let script = slice(script, 0, -1).assign("c").end();
    let script = slice(script, 1, 5).assign("d").end();
    let outcome = vm.execute_unscheduled(script.build());

    assert_eq!(outcome.state, HandleState::Finished);
    assert!(vm.global("a").is_none());
    assert_eq!(vm.global("b").and_then(|v| v.as_array().map(|a| a.len())), Some(0));
    assert!(vm.global("c").is_none());
    assert_eq!(vm.global("d").map(|v| v.to_string()).as_deref(), Some("[2,3]"));
    assert_eq!(sink.count_code(60011), 1);
    assert_eq!(sink.count_code(60025), 1);
    assert_eq!(sink.count_code(60016), 1);
    assert_eq!(sink.count(Severity::Error), 2);
}

#[test]
fn test_weak_array_faults_keep_the_array() {
    let (mut vm, sink) = vm();
    let script = code()
        .push(1)
        .push(2)
        .push(3)
        .make_array(3)
        .assign("a")
        .end()
        .get("a")
        .push(-1)
        .binary("resize")
        .end()
        .get("a")
        .push(10)
        .binary("deleteAt")
        .assign("removed")
        .end()
        .make_array(0)
        .unary("selectMax")
        .assign("best")
        .end()
        .get("a")
        .unary("count")
        .assign("n")
        .end()
        .build();
    let outcome = vm.execute_unscheduled(script);

    assert_eq!(outcome.state, HandleState::Finished);
    assert_eq!(scalar(&vm, "n"), Some(3.0));
    assert!(vm.global("removed").is_some_and(|v| v.is_nil()));
    assert!(vm.global("best").is_some_and(|v| v.is_nil()));
    assert_eq!(sink.count_code(60017), 1);
    assert_eq!(sink.count_code(60010), 1);
    assert_eq!(sink.count_code(60050), 1);
    assert_eq!(sink.count(Severity::Error), 0);
}

#[test]
fn test_crew_and_captive_check_object_kinds() {
    let (mut vm, sink) = vm();
    let unit = vm.create_object(ObjectKind::Unit, "Man");
    let car = vm.create_object(ObjectKind::Vehicle, "Car");
    vm.set_global("u", unit.clone().into()).unwrap();
    vm.set_global("car", car.into()).unwrap();
    let script = code()
        .get("u")
        .unary("crew")
        .assign("c")
        .end()
        .get("car")
        .unary("captive")
        .assign("k")
        .end()
        .get("u")
        .unary("driver")
        .assign("d")
        .end()
        .build();
    let outcome = vm.execute_unscheduled(script);

    assert_eq!(outcome.state, HandleState::Finished);
    assert_eq!(vm.global("c").and_then(|v| v.as_array().map(|a| a.len())), Some(0));
    assert_eq!(boolean(&vm, "k"), Some(false));
    assert_eq!(object(&vm, "d"), Some(unit));
    assert_eq!(sink.count_code(60063), 2);
    assert_eq!(sink.count_code(60065), 1);
}

// ═══════════════════════════════════════════════════════════════════════════
// SCHEDULING
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_sleep_in_unscheduled_environment_is_rejected() {
    let (mut vm, sink) = vm();
    let script = code().push(1).unary("sleep").end().push(2).assign("x").end().build();
    let outcome = vm.execute_unscheduled(script);
    assert_eq!(outcome.state, HandleState::Finished);
    assert_eq!(scalar(&vm, "x"), Some(2.0));
    assert_eq!(sink.count_code(60021), 1);
}

#[test]
fn test_suspension_disabled() {
    let config = VmConfig { allow_suspension: false, ..VmConfig::default() };
    let (mut vm, sink) = vm_with(config);
    let id = vm.spawn(code().push(1).unary("sleep").end().push(2).assign("x").end().build());
    vm.run_turn();
    assert_eq!(vm.state(id), Some(HandleState::Finished));
    assert_eq!(scalar(&vm, "x"), Some(2.0));
    assert!(sink.contains("[60020]"));
}

#[test]
fn test_sleep_resumes_after_clock_advances() {
    let (mut vm, _) = vm();
    let id = vm.spawn(code().push(1).unary("sleep").end().nular("true").assign("done").end().build());

    vm.run_turn();
    assert_eq!(vm.state(id), Some(HandleState::Suspended));
    let report = vm.tick(0.5);
    assert_eq!(report.ran, 0);
    assert_eq!(vm.state(id), Some(HandleState::Suspended));
    let report = vm.tick(0.6);
    assert_eq!(report.finished, 1);
    assert_eq!(boolean(&vm, "done"), Some(true));
}

#[test]
fn test_wait_until_polls_each_turn() {
    let (mut vm, _) = vm();
    vm.set_global("ready", Value::from(false)).unwrap();
    let id = vm.spawn(
        code()
            .code(code().get("ready").build())
            .unary("waitUntil")
            .end()
            .nular("true")
            .assign("seen")
            .end()
            .build(),
    );

    vm.run_turn();
    vm.run_turn();
    assert_eq!(vm.state(id), Some(HandleState::Suspended));
    assert!(vm.global("seen").is_none());

    vm.set_global("ready", Value::from(true)).unwrap();
    vm.run_turn();
    assert_eq!(vm.state(id), Some(HandleState::Finished));
    assert_eq!(boolean(&vm, "seen"), Some(true));
}

#[test]
fn test_run_until_idle_jumps_to_next_wake() {
    let (mut vm, _) = vm();
    vm.spawn(code().push(30).unary("sleep").end().push(1).assign("late").end().build());
    vm.run_until_idle(10);
    assert!(vm.is_idle());
    assert!(vm.now() >= 30.0);
    assert_eq!(scalar(&vm, "late"), Some(1.0));
}

#[test]
fn test_terminate_twice_warns() {
    let (mut vm, sink) = vm();
    let id = vm.spawn(code().push(10).unary("sleep").end().build());
    vm.run_turn();

    assert_eq!(vm.terminate(id), Ok(HandleState::Terminated));
    assert_eq!(sink.count(Severity::Warning), 0);
    assert_eq!(vm.terminate(id), Ok(HandleState::Terminated));
    assert_eq!(sink.count_code(60027), 1);
    assert_eq!(vm.script_done(id), Ok(true));
}

#[test]
fn test_script_done_on_finished_handle() {
    let (mut vm, sink) = vm();
    let id = vm.spawn(code().push(1).end().build());
    assert_eq!(vm.script_done(id), Ok(false));
    vm.run_turn();
    assert_eq!(vm.script_done(id), Ok(true));
    assert_eq!(sink.count_code(60028), 1);
    assert_eq!(vm.reap(), 1);
    assert_eq!(vm.state(id), None);
}

#[test]
fn test_spawn_and_terminate_from_script() {
    let (mut vm, _) = vm();
    let sleeper = vm.spawn(code().push(100).unary("sleep").end().build());
    vm.run_turn();
    vm.set_global("h", Value::Script(Some(sleeper))).unwrap();

    let script = code()
        .get("h")
        .unary("terminate")
        .end()
        .get("h")
        .unary("scriptDone")
        .assign("done")
        .end()
        .push(5)
        .code(code().get("_this").assign("child").end().build())
        .binary("spawn")
        .assign("spawned")
        .end()
        .build();
    vm.execute_unscheduled(script);

    assert_eq!(vm.state(sleeper), Some(HandleState::Terminated));
    assert_eq!(boolean(&vm, "done"), Some(true));
    assert!(vm.global("child").is_none());
    vm.run_until_idle(5);
    assert_eq!(scalar(&vm, "child"), Some(5.0));
}

#[test]
fn test_script_terminating_itself_stops_before_next_instruction() {
    let (mut vm, _) = vm();
    let script = code()
        .get("me")
        .unary("terminate")
        .end()
        .push(1)
        .assign("after")
        .end()
        .build();
    let own = vm.spawn(script);
    vm.set_global("me", Value::Script(Some(own))).unwrap();
    vm.run_turn();

    assert_eq!(vm.state(own), Some(HandleState::Terminated));
    assert!(vm.global("after").is_none());
}

// ═══════════════════════════════════════════════════════════════════════════
// CONTROL FLOW
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_for_loop_sums_inclusive_range() {
    let (mut vm, _) = vm();
    let body = code().get("x").get("_i").binary("+").assign("x").end().build();
    let script = code()
        .push(0)
        .assign("x")
        .end()
        .push("_i")
        .unary("for")
        .push(1)
        .binary("from")
        .push(5)
        .binary("to")
        .code(body)
        .binary("do")
        .end()
        .build();
    vm.execute_unscheduled(script);
    assert_eq!(scalar(&vm, "x"), Some(15.0));
}

#[test]
fn test_for_loop_with_zero_step_does_no_work() {
    let (mut vm, sink) = vm();
    let script = code()
        .push("_i")
        .unary("for")
        .push(1)
        .binary("from")
        .push(5)
        .binary("to")
        .push(0)
        .binary("step")
        .code(code().push(1).assign("ran").end().build())
        .binary("do")
        .end()
        .build();
    let outcome = vm.execute_unscheduled(script);
    assert_eq!(outcome.state, HandleState::Finished);
    assert!(vm.global("ran").is_none());
    assert_eq!(sink.count_code(60082), 1);
}

#[test]
fn test_for_each_binds_item_and_index() {
    let (mut vm, _) = vm();
    let body = code()
        .get("sum")
        .get("_x")
        .binary("+")
        .assign("sum")
        .end()
        .get("_forEachIndex")
        .assign("last")
        .end()
        .build();
    let script = code()
        .push(0)
        .assign("sum")
        .end()
        .code(body)
        .push(1)
        .push(2)
        .push(3)
        .make_array(3)
        .binary("forEach")
        .end()
        .build();
    vm.execute_unscheduled(script);
    assert_eq!(scalar(&vm, "sum"), Some(6.0));
    assert_eq!(scalar(&vm, "last"), Some(2.0));
}

#[test]
fn test_if_then_else_value() {
    let (mut vm, _) = vm();
    let script = code()
        .nular("false")
        .unary("if")
        .code(code().push("yes").build())
        .code(code().push("no").build())
        .binary("else")
        .binary("then")
        .assign("answer")
        .end()
        .build();
    vm.execute_unscheduled(script);
    assert_eq!(string(&vm, "answer").as_deref(), Some("no"));
}

#[test]
fn test_exit_with_leaves_enclosing_loop() {
    let (mut vm, _) = vm();
    let body = code()
        .get("_i")
        .push(3)
        .binary("==")
        .unary("if")
        .code(code().get("_i").assign("stopped").end().build())
        .binary("exitWith")
        .end()
        .get("_i")
        .assign("last")
        .end()
        .build();
    let script = code()
        .push("_i")
        .unary("for")
        .push(1)
        .binary("from")
        .push(10)
        .binary("to")
        .code(body)
        .binary("do")
        .end()
        .push(1)
        .assign("after")
        .end()
        .build();
    vm.execute_unscheduled(script);
    assert_eq!(scalar(&vm, "stopped"), Some(3.0));
    assert_eq!(scalar(&vm, "last"), Some(2.0));
    assert_eq!(scalar(&vm, "after"), Some(1.0));
}

#[test]
fn test_break_out_delivers_value_to_named_scope_caller() {
    let (mut vm, _) = vm();
    let inner = code().push(5).push("main").binary("breakOut").end().push(2).assign("x").end().build();
    let script = code()
        .push("main")
        .unary("scopeName")
        .end()
        .push(1)
        .assign("x")
        .end()
        .code(inner)
        .unary("call")
        .end()
        .push(3)
        .assign("x")
        .end()
        .build();
    let outcome = vm.execute_unscheduled(script);
    assert_eq!(outcome.state, HandleState::Finished);
    assert_eq!(outcome.value.as_scalar(), Some(5.0));
    assert_eq!(scalar(&vm, "x"), Some(1.0));
}

#[test]
fn test_is_nil_code_runs_unscheduled() {
    let (mut vm, sink) = vm();
    let sleeper = code().push(1).unary("sleep").end().build();
    let id = vm.spawn(code().code(sleeper).unary("isNil").assign("r").end().build());
    vm.run_turn();
    assert_eq!(vm.state(id), Some(HandleState::Finished));
    assert_eq!(boolean(&vm, "r"), Some(true));
    assert_eq!(sink.count_code(60021), 1);
}

#[test]
fn test_call_binds_this_in_new_scope() {
    let (mut vm, _) = vm();
    let script = code()
        .push(4)
        .code(code().get("_this").push(2).binary("*").build())
        .binary("call")
        .assign("r")
        .end()
        .build();
    vm.execute_unscheduled(script);
    assert_eq!(scalar(&vm, "r"), Some(8.0));
}

// ═══════════════════════════════════════════════════════════════════════════
// BRIDGES
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_config_navigation() {
    let (mut vm, sink) = vm();
    vm.set_config_tree(vehicles());
    let car = |b: CodeBuilder| {
        b.nular("configFile").push("cfgvehicles").binary(">>").push("CAR").binary(">>")
    };
    let script = car(code()).push("maxSpeed").binary(">>").unary("getNumber").assign("speed").end();
    let script = car(script).unary("configName").assign("name").end();
    let script = car(script).push("maxSpeed").binary(">>").unary("getText").assign("text").end();
    let script = car(script).push("seats").binary(">>").unary("getArray").assign("seats").end();
    let script = car(script).push("Tank").binary(">>").unary("isNull").assign("missing").end();
    vm.execute_unscheduled(script.build());

    assert_eq!(scalar(&vm, "speed"), Some(120.0));
    assert_eq!(string(&vm, "name").as_deref(), Some("Car"));
    assert_eq!(string(&vm, "text").as_deref(), Some(""));
    assert_eq!(vm.global("seats").and_then(|v| v.as_array().map(|a| a.len())), Some(2));
    assert_eq!(boolean(&vm, "missing"), Some(true));
    assert_eq!(sink.count_code(60069), 1);
    assert_eq!(sink.count_code(60061), 1);
}

#[test]
fn test_create_vehicle_checks_class_names() {
    let (mut vm, sink) = vm();
    vm.set_config_tree(vehicles());
    let script = code()
        .push("Car")
        .push(1)
        .push(2)
        .push(0)
        .make_array(3)
        .binary("createVehicle")
        .assign("v")
        .end()
        .get("v")
        .unary("typeOf")
        .assign("kind")
        .end()
        .push("Tank")
        .push(0)
        .push(0)
        .push(0)
        .make_array(3)
        .binary("createVehicle")
        .assign("w")
        .end()
        .build();
    vm.execute_unscheduled(script);

    assert_eq!(string(&vm, "kind").as_deref(), Some("Car"));
    assert!(vm.global("w").is_some_and(|v| v.is_nil()));
    assert_eq!(sink.count_code(60061), 1);
}

struct Echo;

impl Extension for Echo {
    fn version(&mut self, out: &mut [u8]) {
        write_output(out, "0.1");
    }

    fn call(&mut self, function: &str, out: &mut [u8]) {
        write_output(out, &function.to_uppercase());
    }

    fn call_args(&mut self, function: &str, args: &[String], out: &mut [u8]) -> i32 {
        write_output(out, &format!("{}({})", function, args.join(";")));
        7
    }
}

#[test]
fn test_call_extension() {
    let (mut vm, sink) = vm();
    vm.set_extension_loader(|name: &str| -> Option<Box<dyn Extension>> {
        (name == "echo").then(|| Box::new(Echo) as Box<dyn Extension>)
    });
    let script = code()
        .push("echo")
        .push("hello")
        .binary("callExtension")
        .assign("plain")
        .end()
        .push("echo")
        .push("sum")
        .push(1)
        .push("a")
        .make_array(2)
        .make_array(2)
        .binary("callExtension")
        .assign("full")
        .end()
        .push("missing")
        .push("x")
        .binary("callExtension")
        .assign("none")
        .end()
        .build();
    vm.execute_unscheduled(script);

    assert_eq!(string(&vm, "plain").as_deref(), Some("HELLO"));
    let full = vm.global("full").and_then(|v| v.as_array().map(|a| a.to_vec())).unwrap_or_default();
    assert_eq!(full.len(), 3);
    assert_eq!(full[0].as_text(), Some("sum(1;\"a\")"));
    assert_eq!(full[1].as_scalar(), Some(7.0));
    assert_eq!(full[2].as_scalar(), Some(0.0));
    assert_eq!(string(&vm, "none").as_deref(), Some(""));
    assert!(vm.extensions().is_loaded("echo"));
    assert_eq!(sink.count_code(60040), 1);
}

struct Loopback;

impl Connector for Loopback {
    fn connect(&mut self, host: &str, _port: u16) -> ConnectionState {
        if host == "localhost" {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }
}

#[test]
fn test_network_commands() {
    let (mut vm, _) = vm_with(VmConfig::default().with_networking(true));
    vm.set_connector(Loopback);
    let script = code()
        .push("localhost:2302")
        .unary("connectTo")
        .assign("id")
        .end()
        .get("id")
        .unary("connectionStatus")
        .assign("before")
        .end()
        .get("id")
        .unary("disconnect")
        .assign("closed")
        .end()
        .get("id")
        .unary("connectionStatus")
        .assign("after")
        .end()
        .build();
    vm.execute_unscheduled(script);

    assert_eq!(scalar(&vm, "id"), Some(1.0));
    assert_eq!(string(&vm, "before").as_deref(), Some("CONNECTED"));
    assert_eq!(boolean(&vm, "closed"), Some(true));
    assert_eq!(string(&vm, "after").as_deref(), Some("DISCONNECTED"));
}

#[test]
fn test_networking_disabled_by_default() {
    let (mut vm, sink) = vm();
    vm.execute_unscheduled(code().push("localhost:2302").unary("connectTo").assign("id").end().build());
    assert_eq!(scalar(&vm, "id"), Some(-1.0));
    assert_eq!(sink.count_code(60045), 1);
}

// ═══════════════════════════════════════════════════════════════════════════
// OBJECTS
// ═══════════════════════════════════════════════════════════════════════════

fn kinds() -> ConfigTree {
    let vehicles = ConfigClass::new()
        .with_class("All", ConfigClass::new())
        .with_class("LandVehicle", ConfigClass::new().with_parent("All"))
        .with_class("Car", ConfigClass::new().with_parent("LandVehicle"))
        .with_class("Man", ConfigClass::new().with_parent("All"));
    let ammo = ConfigClass::new().with_class("Bullet", ConfigClass::new());
    ConfigTree::new(ConfigClass::new().with_class("CfgVehicles", vehicles).with_class("CfgAmmo", ammo))
}

fn place(object: &ObjectRef, position: [f64; 3]) {
    if let Some(mut data) = object.data_mut() {
        data.position = position;
    }
}

#[test]
fn test_seats_cargo_and_parents() {
    let (mut vm, _) = vm();
    let car = vm.create_object(ObjectKind::Vehicle, "Car");
    let truck = vm.create_object(ObjectKind::Vehicle, "Car");
    let [a, b, c, idle] = ["a", "b", "c", "idle"].map(|name| {
        let unit = vm.create_object(ObjectKind::Unit, "Man");
        vm.set_global(name, unit.clone().into()).unwrap();
        unit
    });
    vm.set_global("car", car.clone().into()).unwrap();
    vm.set_global("truck", truck.clone().into()).unwrap();

    let board = |script: CodeBuilder, unit: &str, how: &str, vehicle: &str| {
        script.get(unit).get(vehicle).binary(how).end()
    };
    let script = board(code(), "a", "moveInCargo", "car");
    let script = board(script, "b", "moveInDriver", "car");
    let script = board(script, "c", "moveInGunner", "car");
    let script = board(script, "a", "moveInDriver", "car");
    let script = script
        .get("car")
        .unary("crew")
        .assign("crew")
        .end()
        .get("car")
        .unary("driver")
        .assign("driver")
        .end()
        .get("car")
        .unary("commander")
        .assign("commander")
        .end()
        .get("a")
        .unary("vehicle")
        .assign("ride")
        .end()
        .get("c")
        .unary("objectParent")
        .assign("parent")
        .end()
        .get("idle")
        .unary("vehicle")
        .assign("self")
        .end()
        .get("idle")
        .unary("objectParent")
        .assign("orphan")
        .end()
        .get("a")
        .get("car")
        .binary("in")
        .assign("inside")
        .end();
    let script = board(script, "b", "moveInDriver", "truck")
        .get("car")
        .unary("driver")
        .assign("left")
        .end()
        .build();
    let outcome = vm.execute_unscheduled(script);

    assert_eq!(outcome.state, HandleState::Finished);
    assert_eq!(objects(&vm, "crew"), vec![b.clone(), c, a.clone()]);
    assert_eq!(object(&vm, "driver"), Some(b.clone()));
    assert!(object(&vm, "commander").is_some_and(|o| o.is_null()));
    assert_eq!(object(&vm, "ride"), Some(car.clone()));
    assert_eq!(object(&vm, "parent"), Some(car));
    assert_eq!(object(&vm, "self"), Some(idle));
    assert!(object(&vm, "orphan").is_some_and(|o| o.is_null()));
    assert_eq!(boolean(&vm, "inside"), Some(true));
    assert!(object(&vm, "left").is_some_and(|o| o.is_null()));
    assert_eq!(truck.data().and_then(|d| d.driver.clone()), Some(b));
    assert_eq!(vm.vehicle_of(&a).map(|v| v == truck), Some(false));
}

#[test]
fn test_damage_and_velocity() {
    let (mut vm, sink) = vm();
    let unit = vm.create_object(ObjectKind::Unit, "Man");
    vm.set_global("u", unit.into()).unwrap();
    let script = code()
        .get("u")
        .push(0.5)
        .binary("setDamage")
        .end()
        .get("u")
        .unary("damage")
        .assign("half")
        .end()
        .get("u")
        .unary("alive")
        .assign("breathing")
        .end()
        .get("u")
        .push(3)
        .binary("setDamage")
        .end()
        .get("u")
        .unary("getDammage")
        .assign("full")
        .end()
        .get("u")
        .unary("alive")
        .assign("still")
        .end()
        .get("u")
        .push(1)
        .push(2)
        .push(3)
        .make_array(3)
        .binary("setVelocity")
        .end()
        .get("u")
        .unary("velocity")
        .assign("speed")
        .end()
        .nular("objNull")
        .unary("damage")
        .assign("none")
        .end()
        .push(1)
        .assign("after")
        .end()
        .build();
    let outcome = vm.execute_unscheduled(script);

    assert_eq!(outcome.state, HandleState::Finished);
    assert_eq!(scalar(&vm, "half"), Some(0.5));
    assert_eq!(boolean(&vm, "breathing"), Some(true));
    assert_eq!(scalar(&vm, "full"), Some(1.0));
    assert_eq!(boolean(&vm, "still"), Some(false));
    assert_eq!(vm.global("speed").map(|v| v.to_string()).as_deref(), Some("[1,2,3]"));
    assert!(vm.global("none").is_none());
    assert_eq!(scalar(&vm, "after"), Some(1.0));
    assert_eq!(sink.count_code(60058), 1);
}

#[test]
fn test_sides_follow_groups() {
    let config = VmConfig { classname_checks: false, ..VmConfig::default() };
    let (mut vm, sink) = vm_with(config);
    let car = vm.create_object(ObjectKind::Vehicle, "Car");
    vm.set_global("car", car.into()).unwrap();
    let script = code()
        .nular("opfor")
        .unary("createGroup")
        .assign("g")
        .end()
        .get("g")
        .push("Man")
        .push(0)
        .push(0)
        .push(0)
        .make_array(3)
        .make_array(0)
        .push(0)
        .push("NONE")
        .make_array(5)
        .binary("createUnit")
        .assign("u")
        .end()
        .get("u")
        .get("car")
        .binary("moveInDriver")
        .end()
        .get("u")
        .unary("side")
        .assign("unit")
        .end()
        .get("g")
        .unary("side")
        .assign("group")
        .end()
        .get("car")
        .unary("side")
        .assign("vehicle")
        .end()
        .nular("objNull")
        .unary("side")
        .assign("null")
        .end()
        .nular("resistance")
        .unary("str")
        .assign("name")
        .end()
        .build();
    vm.execute_unscheduled(script);

    assert!(matches!(vm.global("unit"), Some(Value::Side(Side::East))));
    assert!(matches!(vm.global("group"), Some(Value::Side(Side::East))));
    assert!(matches!(vm.global("vehicle"), Some(Value::Side(Side::East))));
    assert!(matches!(vm.global("null"), Some(Value::Side(Side::Unknown))));
    assert_eq!(string(&vm, "name").as_deref(), Some("GUER"));
    assert_eq!(sink.count_code(60059), 1);
}

#[test]
fn test_is_kind_of_walks_parents() {
    let (mut vm, sink) = vm();
    vm.set_config_tree(kinds());
    let kind_of = |b: CodeBuilder, class: &str, base: &str, name: &str| {
        b.push(class).push(base).binary("isKindOf").assign(name).end()
    };
    let script = kind_of(code(), "Car", "LandVehicle", "car_land");
    let script = kind_of(script, "Car", "Bullet", "car_bullet");
    let script = kind_of(script, "bullet", "BULLET", "bullet");
    let script = script
        .push("Car")
        .push(0)
        .push(0)
        .push(0)
        .make_array(3)
        .binary("createVehicle")
        .push("All")
        .binary("isKindOf")
        .assign("object")
        .end()
        .push("Car")
        .push("All")
        .nular("configFile")
        .push("CfgVehicles")
        .binary(">>")
        .make_array(2)
        .binary("isKindOf")
        .assign("scoped")
        .end()
        .push("Tank")
        .push("All")
        .nular("configFile")
        .push("CfgVehicles")
        .binary(">>")
        .make_array(2)
        .binary("isKindOf")
        .assign("missing")
        .end()
        .build();
    vm.execute_unscheduled(script);

    assert_eq!(boolean(&vm, "car_land"), Some(true));
    assert_eq!(boolean(&vm, "car_bullet"), Some(false));
    assert_eq!(boolean(&vm, "bullet"), Some(true));
    assert_eq!(boolean(&vm, "object"), Some(true));
    assert_eq!(boolean(&vm, "scoped"), Some(true));
    assert_eq!(boolean(&vm, "missing"), Some(false));
    assert_eq!(sink.count_code(60061), 1);
}

#[test]
fn test_nearest_objects_sorted_and_filtered() {
    let (mut vm, _) = vm();
    vm.set_config_tree(kinds());
    let far_car = vm.create_object(ObjectKind::Vehicle, "Car");
    let car = vm.create_object(ObjectKind::Vehicle, "Car");
    let near_car = vm.create_object(ObjectKind::Vehicle, "Car");
    let man = vm.create_object(ObjectKind::Unit, "Man");
    let flyer = vm.create_object(ObjectKind::Unit, "Man");
    let gone = vm.create_object(ObjectKind::Vehicle, "Car");
    place(&far_car, [100.0, 0.0, 0.0]);
    place(&car, [10.0, 0.0, 0.0]);
    place(&near_car, [3.0, 0.0, 0.0]);
    place(&man, [1.0, 0.0, 0.0]);
    place(&flyer, [0.0, 0.0, 60.0]);
    place(&gone, [2.0, 0.0, 0.0]);
    gone.destroy();

    let nearest = |b: CodeBuilder, filter: &[&str], planar: bool, name: &str| {
        let b = b.push(0).push(0).push(0).make_array(3);
        let b = filter.iter().fold(b, |b, class| b.push(*class)).make_array(filter.len());
        let b = b.push(50);
        let b = if planar { b.nular("true").make_array(4) } else { b.make_array(3) };
        b.unary("nearestObjects").assign(name).end()
    };
    let script = nearest(code(), &[], false, "all");
    let script = nearest(script, &["LandVehicle"], false, "land");
    let script = nearest(script, &[], true, "flat");
    vm.execute_unscheduled(script.build());

    assert_eq!(objects(&vm, "all"), vec![man.clone(), near_car.clone(), car.clone()]);
    assert_eq!(objects(&vm, "land"), vec![near_car.clone(), car.clone()]);
    assert_eq!(objects(&vm, "flat"), vec![flyer, man, near_car, car]);
}

#[test]
fn test_registry_player_and_names() {
    let config = VmConfig { classname_checks: false, ..VmConfig::default() };
    let (mut vm, sink) = vm_with(config);
    let first = vm.create_object(ObjectKind::Unit, "Man");
    let second = vm.create_object(ObjectKind::Unit, "Man");
    vm.create_object(ObjectKind::Vehicle, "Car");
    vm.set_global("second", second.into()).unwrap();

    let script = code()
        .nular("player")
        .unary("isNull")
        .assign("nobody")
        .end()
        .build();
    vm.execute_unscheduled(script);
    assert_eq!(boolean(&vm, "nobody"), Some(true));

    vm.set_player(first.clone());
    let script = code()
        .nular("player")
        .assign("me")
        .end()
        .nular("allUnits")
        .unary("count")
        .assign("before")
        .end()
        .get("second")
        .unary("deleteVehicle")
        .end()
        .nular("allUnits")
        .unary("count")
        .assign("after")
        .end()
        .get("me")
        .push("hero")
        .binary("setVehicleVarName")
        .end()
        .get("me")
        .unary("vehicleVarName")
        .assign("name")
        .end()
        .get("me")
        .unary("str")
        .assign("shown")
        .end()
        .get("me")
        .push(3)
        .push(4)
        .make_array(2)
        .binary("doMove")
        .end()
        .get("me")
        .push(0)
        .push(0)
        .push(100)
        .make_array(3)
        .binary("distance2D")
        .assign("flat")
        .end()
        .push("Car")
        .push(0)
        .push(0)
        .push(0)
        .make_array(3)
        .binary("createVehicleLocal")
        .assign("local")
        .end()
        .get("local")
        .push(1)
        .push(1)
        .make_array(2)
        .binary("doMove")
        .end()
        .build();
    let outcome = vm.execute_unscheduled(script);

    assert_eq!(outcome.state, HandleState::Finished);
    assert_eq!(object(&vm, "me"), Some(first.clone()));
    assert_eq!(scalar(&vm, "before"), Some(2.0));
    assert_eq!(scalar(&vm, "after"), Some(1.0));
    assert_eq!(string(&vm, "name").as_deref(), Some("hero"));
    assert_eq!(string(&vm, "shown").as_deref(), Some("hero"));
    assert_eq!(first.data().map(|d| d.position), Some([3.0, 4.0, 0.0]));
    assert_eq!(scalar(&vm, "flat"), Some(5.0));
    assert!(object(&vm, "local").is_some_and(|o| o.kind() == ObjectKind::Vehicle));
    assert_eq!(sink.count_code(60064), 1);
    assert_eq!(vm.objects().count(), 3);
}
