//! Objetos, unidades e grupos
//!
//! Objetos são dados inertes (classe, posição, velocidade, dano, assentos,
//! carga, captura). Nulos e apagados respondem igual: `ExpectedNonNullValue`
//! na forma que cada comando usa. Quem está em qual veículo ou grupo é
//! descoberto varrendo o registro da VM, sem referências de volta.

use super::{flag, items, nil, num, reply, text, CommandRegistry};
use crate::diagnostics::RuntimeFault;
use crate::exec::{Exec, Reply};
use crate::fault::{
    expect_min_size, expect_size, expect_size_range, expect_sub_type, expect_types, expect_uniform, Checked,
    Diagnostics, Reporter, Strength,
};
use crate::value::{ObjectData, ObjectKind, ObjectRef, Side, Value};
use crate::vm::VirtualMachine;

use crate::value::ValueType::{
    Any, Array, Boolean, Config, Group, Object, Scalar, Script, Side as SideType, String as Str,
};

pub(super) fn register(table: &mut CommandRegistry) {
    table.add_nular("objNull", |_| reply(ObjectRef::null(ObjectKind::Vehicle)));
    table.add_nular("grpNull", |_| reply(ObjectRef::null(ObjectKind::Group)));
    table.add_nular("player", |ex| reply(ex.vm.player().clone()));
    for ty in [Object, Group] {
        table.add_unary("isNull", ty, |_, v| reply(object_of(&v).is_null()));
    }
    table.add_unary("isNull", Config, |_, v| reply(matches!(&v, Value::Config(c) if c.is_null())));
    table.add_unary("isNull", Script, |_, v| reply(matches!(v, Value::Script(None))));

    table.add_nular("west", |_| reply(Side::West));
    table.add_nular("blufor", |_| reply(Side::West));
    table.add_nular("east", |_| reply(Side::East));
    table.add_nular("opfor", |_| reply(Side::East));
    table.add_nular("independent", |_| reply(Side::Independent));
    table.add_nular("resistance", |_| reply(Side::Independent));
    table.add_nular("civilian", |_| reply(Side::Civilian));
    table.add_nular("sideUnknown", |_| reply(Side::Unknown));
    table.add_unary("side", Object, side);
    table.add_unary("side", Group, side);

    table.add_unary("typeOf", Object, type_of);
    table.add_binary("isKindOf", Object, Str, kind_of_object);
    table.add_binary("isKindOf", Str, Str, kind_of_class);
    table.add_binary("isKindOf", Str, Array, kind_of_in_config);
    table.add_unary("alive", Object, |ex, v| {
        let Some(damage) = object_of(&v).data().map(|d| d.damage) else {
            return ex.recover(
                RuntimeFault::ExpectedNonNullValue { strength: Strength::Weak },
                Reply::Value(Value::from(false)),
            );
        };
        reply(damage < 1.0)
    });
    table.add_unary("damage", Object, damage);
    table.add_unary("getDammage", Object, damage);
    table.add_binary("setDamage", Object, Scalar, set_damage);
    table.add_unary("vehicleVarName", Object, vehicle_var_name);
    table.add_binary("setVehicleVarName", Object, Str, set_vehicle_var_name);

    table.add_unary("getPos", Object, get_pos);
    table.add_unary("position", Object, get_pos);
    table.add_binary("setPos", Object, Array, set_pos);
    table.add_unary("velocity", Object, velocity);
    table.add_binary("setVelocity", Object, Array, set_velocity);
    table.add_binary("doMove", Object, Array, do_move);
    table.add_binary("doMove", Array, Array, do_move_all);
    table.add_binary("distance", Any, Any, |ex, l, r| measure(ex, "distance", l, r, 3));
    table.add_binary("distance2D", Any, Any, |ex, l, r| measure(ex, "distance2D", l, r, 2));
    table.add_unary("nearestObjects", Array, nearest_objects);
    table.add_nular("allUnits", |ex| {
        let units = ex.vm.objects().filter(|o| o.kind() == ObjectKind::Unit).cloned().map(Value::from);
        reply(units.collect::<Vec<_>>())
    });

    table.add_unary("crew", Object, crew);
    table.add_unary("driver", Object, |ex, v| seat_of(ex, v, Seat::Driver));
    table.add_unary("gunner", Object, |ex, v| seat_of(ex, v, Seat::Gunner));
    table.add_unary("commander", Object, |ex, v| seat_of(ex, v, Seat::Commander));
    table.add_unary("vehicle", Object, vehicle);
    table.add_unary("objectParent", Object, object_parent);
    table.add_unary("captive", Object, captive);
    table.add_binary("setCaptive", Object, Boolean, set_captive);
    table.add_binary("moveInCargo", Object, Object, |ex, l, r| board(ex, l, r, None));
    table.add_binary("moveInDriver", Object, Object, |ex, l, r| board(ex, l, r, Some(Seat::Driver)));
    table.add_binary("moveInGunner", Object, Object, |ex, l, r| board(ex, l, r, Some(Seat::Gunner)));
    table.add_binary("moveInCommander", Object, Object, |ex, l, r| board(ex, l, r, Some(Seat::Commander)));
    table.add_binary("in", Object, Object, in_vehicle);

    table.add_binary("createVehicle", Str, Array, create_vehicle);
    table.add_binary("createVehicleLocal", Str, Array, create_vehicle);
    table.add_unary("createVehicle", Array, create_vehicle_array);
    table.add_unary("deleteVehicle", Object, |ex, v| {
        let object = object_of(&v);
        if object.is_null() {
            ex.raise(RuntimeFault::ExpectedNonNullValue { strength: Strength::Weak })?;
            return nil();
        }
        object.destroy();
        ex.vm.forget_deleted();
        nil()
    });

    table.add_unary("createGroup", SideType, |ex, v| {
        let group = ex.vm.create_object(ObjectKind::Group, "Group");
        if let (Some(mut data), Value::Side(side)) = (group.data_mut(), &v) {
            data.side = *side;
        }
        reply(group)
    });
    table.add_unary("deleteGroup", Group, delete_group);
    table.add_unary("units", Group, |_, v| {
        let members = object_of(&v).data().map(|d| d.crew.clone()).unwrap_or_default();
        reply(members.into_iter().filter(|m| !m.is_null()).map(Value::from).collect::<Vec<_>>())
    });
    table.add_binary("createUnit", Group, Array, create_unit_in_group);
    table.add_binary("createUnit", Str, Array, create_unit);
}

fn object_of(value: &Value) -> ObjectRef {
    value.as_object().cloned().unwrap_or_else(|| ObjectRef::null(ObjectKind::Vehicle))
}

fn position_value(position: [f64; 3]) -> Value {
    Value::array(position.iter().copied().map(Value::from).collect())
}

/// `[x, y]` ou `[x, y, z]`; z ausente vira 0
fn read_position(ex: &mut Exec<'_>, value: &Value, min: usize) -> Checked<Option<[f64; 3]>> {
    let coords = items(value);
    if !expect_size_range(ex, &coords, min, 3, Strength::Strong)? {
        return Ok(None);
    }
    let types = vec![Scalar; coords.len()];
    if !expect_types(ex, &coords, &types, Strength::Strong)? {
        return Ok(None);
    }
    let mut out = [0.0; 3];
    for (slot, coord) in out.iter_mut().zip(&coords) {
        *slot = num(coord);
    }
    Ok(Some(out))
}

/// Posição aninhada em `args[outer]`, com o caminho completo nos diagnósticos
fn read_nested_position(ex: &mut Exec<'_>, outer: usize, value: &Value) -> Checked<Option<[f64; 3]>> {
    let coords = items(value);
    if !expect_size(ex, &coords, 3, Strength::Strong)? {
        return Ok(None);
    }
    for (i, coord) in coords.iter().enumerate() {
        if !expect_sub_type(ex, &[outer, i], coord, &[Scalar], Strength::Strong)? {
            return Ok(None);
        }
    }
    Ok(Some([num(&coords[0]), num(&coords[1]), num(&coords[2])]))
}

/// Posição de um array `[x, y(, z)]` ou de um objeto; outros valores dão `None`.
fn locate(ex: &mut Exec<'_>, value: &Value) -> Checked<Option<[f64; 3]>> {
    match value {
        Value::Array(_) => read_position(ex, value, 2),
        Value::Object(object) => match object.data().map(|d| d.position) {
            Some(position) => Ok(Some(position)),
            None => {
                ex.raise(RuntimeFault::ExpectedNonNullValue { strength: Strength::Strong })?;
                Ok(None)
            }
        },
        _ => Ok(None),
    }
}

fn span(a: [f64; 3], b: [f64; 3], dims: usize) -> f64 {
    a.iter().zip(&b).take(dims).map(|(x, y)| (x - y) * (x - y)).sum::<f64>().sqrt()
}

/// Classe precisa existir em `CfgVehicles` quando a verificação está ligada.
fn check_class(ex: &mut Exec<'_>, class_name: &str) -> Checked<bool> {
    if !ex.vm.config.classname_checks {
        return Ok(true);
    }
    let location = ex.location();
    let vm = &mut *ex.vm;
    let mut reporter = Reporter::new(&mut vm.logger, location);
    let found = vm.config_tree.lookup_checked(&mut reporter, &["CfgVehicles", class_name], Strength::Weak)?;
    if found.is_none() {
        reporter.note(RuntimeFault::ReturningNil);
        return Ok(false);
    }
    Ok(true)
}

fn spawn_object(ex: &mut Exec<'_>, kind: ObjectKind, class_name: &str, position: [f64; 3]) -> ObjectRef {
    let object = ex.vm.create_object(kind, class_name);
    if let Some(mut data) = object.data_mut() {
        data.position = position;
    }
    object
}

/// Nulos abortam a instrução; devolve o objeto vivo.
fn require(ex: &mut Exec<'_>, value: &Value) -> Checked<Option<ObjectRef>> {
    let object = object_of(value);
    if object.is_null() {
        ex.raise(RuntimeFault::ExpectedNonNullValue { strength: Strength::Strong })?;
        return Ok(None);
    }
    Ok(Some(object))
}

fn type_of(ex: &mut Exec<'_>, right: Value) -> Checked<Reply> {
    let object = object_of(&right);
    let Some(class_name) = object.data().map(|d| d.class_name.clone()) else {
        ex.raise(RuntimeFault::ExpectedNonNullValue { strength: Strength::Weak })?;
        ex.note(RuntimeFault::ReturningEmptyString);
        return reply("");
    };
    reply(class_name)
}

// ═══════════════════════════════════════════════════════════════════════════
// CLASSES
// ═══════════════════════════════════════════════════════════════════════════

/// Containers consultados por `"Class" isKindOf "Base"`
const KIND_CONTAINERS: [&str; 3] = ["CfgVehicles", "CfgAmmo", "CfgNonAiVehicles"];

/// Classes ausentes da config só casam com o próprio nome.
fn vehicle_kind_of(vm: &VirtualMachine, class_name: &str, base: &str) -> bool {
    vm.config_tree
        .is_kind_of(&["CfgVehicles"], class_name, base)
        .unwrap_or_else(|| class_name.eq_ignore_ascii_case(base))
}

fn kind_of_object(ex: &mut Exec<'_>, left: Value, right: Value) -> Checked<Reply> {
    let Some(class_name) = object_of(&left).data().map(|d| d.class_name.clone()) else {
        ex.raise(RuntimeFault::ExpectedNonNullValue { strength: Strength::Weak })?;
        ex.note(RuntimeFault::ReturningFalse);
        return reply(false);
    };
    reply(vehicle_kind_of(&*ex.vm, &class_name, text(&right)))
}

fn kind_of_class(ex: &mut Exec<'_>, left: Value, right: Value) -> Checked<Reply> {
    let (class_name, base) = (text(&left), text(&right));
    let tree = &ex.vm.config_tree;
    let found = KIND_CONTAINERS.iter().any(|c| tree.is_kind_of(&[*c], class_name, base) == Some(true));
    reply(found)
}

/// `"Class" isKindOf ["Base", configFile >> "CfgWeapons"]`
fn kind_of_in_config(ex: &mut Exec<'_>, left: Value, right: Value) -> Checked<Reply> {
    let args = items(&right);
    if !expect_size(ex, &args, 2, Strength::Strong)? {
        return nil();
    }
    if !expect_types(ex, &args, &[Str, Config], Strength::Strong)? {
        return nil();
    }
    let segments = match &args[1] {
        Value::Config(config) => config.segments(),
        _ => None,
    };
    let Some(container) = segments.map(|s| s.iter().map(|s| s.to_string()).collect::<Vec<_>>()) else {
        ex.raise(RuntimeFault::ExpectedNonNullValue { strength: Strength::Weak })?;
        ex.note(RuntimeFault::ReturningFalse);
        return reply(false);
    };
    let class_name = text(&left);
    let location = ex.location();
    let vm = &mut *ex.vm;
    let mut reporter = Reporter::new(&mut vm.logger, location);
    let path: Vec<&str> = container.iter().map(String::as_str).chain([class_name]).collect();
    if vm.config_tree.lookup_checked(&mut reporter, &path, Strength::Weak)?.is_none() {
        reporter.note(RuntimeFault::ReturningFalse);
        return reply(false);
    }
    reply(vm.config_tree.is_kind_of(&container, class_name, text(&args[0])) == Some(true))
}

// ═══════════════════════════════════════════════════════════════════════════
// STATE
// ═══════════════════════════════════════════════════════════════════════════

fn damage(ex: &mut Exec<'_>, right: Value) -> Checked<Reply> {
    let Some(object) = require(ex, &right)? else {
        return nil();
    };
    reply(object.data().map(|d| d.damage).unwrap_or_default())
}

/// Dano fica em `[0, 1]`; 1 mata.
fn set_damage(ex: &mut Exec<'_>, left: Value, right: Value) -> Checked<Reply> {
    let Some(object) = require(ex, &left)? else {
        return nil();
    };
    if let Some(mut data) = object.data_mut() {
        data.damage = num(&right).clamp(0.0, 1.0);
    }
    nil()
}

fn vehicle_var_name(ex: &mut Exec<'_>, right: Value) -> Checked<Reply> {
    let Some(object) = require(ex, &right)? else {
        return nil();
    };
    reply(object.data().map(|d| d.var_name.clone()).unwrap_or_default())
}

fn set_vehicle_var_name(ex: &mut Exec<'_>, left: Value, right: Value) -> Checked<Reply> {
    let Some(object) = require(ex, &left)? else {
        return nil();
    };
    if let Some(mut data) = object.data_mut() {
        data.var_name = text(&right).to_string();
    }
    nil()
}

fn side_of(vm: &VirtualMachine, object: &ObjectRef) -> Side {
    let member = match object.kind() {
        ObjectKind::Group => return object.data().map(|d| d.side).unwrap_or_default(),
        ObjectKind::Vehicle => object.data().and_then(|d| d.occupants().into_iter().next()),
        _ => Some(object.clone()),
    };
    member
        .and_then(|m| vm.group_of(&m))
        .and_then(|g| g.data().map(|d| d.side))
        .unwrap_or_default()
}

/// Grupos dão o próprio lado; unidades, o do grupo; veículos, o do primeiro ocupante.
fn side(ex: &mut Exec<'_>, right: Value) -> Checked<Reply> {
    let object = object_of(&right);
    if object.is_null() {
        return ex.recover(
            RuntimeFault::ExpectedNonNullValue { strength: Strength::Weak },
            Reply::Value(Value::from(Side::Unknown)),
        );
    }
    reply(side_of(&*ex.vm, &object))
}

// ═══════════════════════════════════════════════════════════════════════════
// POSITION
// ═══════════════════════════════════════════════════════════════════════════

fn get_pos(ex: &mut Exec<'_>, right: Value) -> Checked<Reply> {
    let Some(object) = require(ex, &right)? else {
        return nil();
    };
    reply(position_value(object.data().map(|d| d.position).unwrap_or_default()))
}

fn set_pos(ex: &mut Exec<'_>, left: Value, right: Value) -> Checked<Reply> {
    let object = object_of(&left);
    if object.is_null() {
        ex.raise(RuntimeFault::ExpectedNonNullValue { strength: Strength::Weak })?;
        return nil();
    }
    let coords = items(&right);
    if !expect_uniform(ex, &coords, Scalar, 3, Strength::Strong)? {
        return nil();
    }
    if let Some(mut data) = object.data_mut() {
        data.position = [num(&coords[0]), num(&coords[1]), num(&coords[2])];
    }
    nil()
}

fn velocity(ex: &mut Exec<'_>, right: Value) -> Checked<Reply> {
    let Some(object) = require(ex, &right)? else {
        return nil();
    };
    reply(position_value(object.data().map(|d| d.velocity).unwrap_or_default()))
}

fn set_velocity(ex: &mut Exec<'_>, left: Value, right: Value) -> Checked<Reply> {
    let object = object_of(&left);
    if object.is_null() {
        ex.raise(RuntimeFault::ExpectedNonNullValue { strength: Strength::Weak })?;
        return nil();
    }
    let coords = items(&right);
    if !expect_uniform(ex, &coords, Scalar, 3, Strength::Strong)? {
        return nil();
    }
    if let Some(mut data) = object.data_mut() {
        data.velocity = [num(&coords[0]), num(&coords[1]), num(&coords[2])];
    }
    nil()
}

/// Sem simulação, `doMove` coloca a unidade direto no destino.
fn do_move(ex: &mut Exec<'_>, left: Value, right: Value) -> Checked<Reply> {
    let Some(unit) = require(ex, &left)? else {
        return nil();
    };
    if unit.kind() != ObjectKind::Unit {
        ex.raise(RuntimeFault::ExpectedUnit { strength: Strength::Strong })?;
        return nil();
    }
    let Some(position) = read_position(ex, &right, 2)? else {
        return nil();
    };
    if let Some(mut data) = unit.data_mut() {
        data.position = position;
    }
    nil()
}

fn do_move_all(ex: &mut Exec<'_>, left: Value, right: Value) -> Checked<Reply> {
    let units = items(&left);
    for (i, unit) in units.iter().enumerate() {
        if !expect_sub_type(ex, &[i], unit, &[Object], Strength::Strong)? {
            return nil();
        }
    }
    for unit in units {
        do_move(ex, unit, right.clone())?;
    }
    nil()
}

/// Aceita posições `[x, y(, z)]` e objetos nos dois lados.
fn measure(ex: &mut Exec<'_>, operator: &str, left: Value, right: Value, dims: usize) -> Checked<Reply> {
    let mut ends = [[0.0; 3]; 2];
    for (slot, end) in ends.iter_mut().zip([&left, &right]) {
        if !matches!(end, Value::Array(_) | Value::Object(_)) {
            let fault = RuntimeFault::UnknownInputTypeCombinationBinary {
                operator: operator.to_string(),
                left: Some(left.value_type()),
                right: right.value_type(),
            };
            ex.raise(fault)?;
            return nil();
        }
        match locate(ex, end)? {
            Some(position) => *slot = position,
            None => return nil(),
        }
    }
    let [a, b] = ends;
    reply(span(a, b, dims))
}

/// `nearestObjects [center, ["Class", ...], radius, 2d]`, mais próximos primeiro
///
/// A lista vazia de classes aceita qualquer unidade ou veículo.
fn nearest_objects(ex: &mut Exec<'_>, right: Value) -> Checked<Reply> {
    let args = items(&right);
    if !expect_size_range(ex, &args, 3, 4, Strength::Strong)? {
        return nil();
    }
    if !expect_sub_type(ex, &[0], &args[0], &[Array, Object], Strength::Strong)? {
        return nil();
    }
    if !expect_types(ex, &args, &[Any, Array, Scalar, Boolean], Strength::Strong)? {
        return nil();
    }
    let filter = items(&args[1]);
    for (i, class_name) in filter.iter().enumerate() {
        if !expect_sub_type(ex, &[1, i], class_name, &[Str], Strength::Strong)? {
            return nil();
        }
    }
    let Some(center) = locate(ex, &args[0])? else {
        return nil();
    };
    let radius = num(&args[2]);
    let dims = if args.get(3).is_some_and(flag) { 2 } else { 3 };

    let vm = &*ex.vm;
    let mut found: Vec<(f64, ObjectRef)> = vm
        .objects()
        .filter(|o| o.kind() != ObjectKind::Group)
        .filter_map(|o| {
            let data = o.data()?;
            let matches = filter.is_empty() || filter.iter().any(|base| vehicle_kind_of(vm, &data.class_name, text(base)));
            let distance = span(center, data.position, dims);
            (matches && distance <= radius).then(|| (distance, o.clone()))
        })
        .collect();
    found.sort_by(|a, b| a.0.total_cmp(&b.0));
    reply(found.into_iter().map(|(_, o)| Value::from(o)).collect::<Vec<_>>())
}

// ═══════════════════════════════════════════════════════════════════════════
// CREW
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy)]
enum Seat {
    Driver,
    Gunner,
    Commander,
}

impl Seat {
    fn slot(self, data: &mut ObjectData) -> &mut Option<ObjectRef> {
        match self {
            Seat::Driver => &mut data.driver,
            Seat::Gunner => &mut data.gunner,
            Seat::Commander => &mut data.commander,
        }
    }
}

fn crew(ex: &mut Exec<'_>, right: Value) -> Checked<Reply> {
    let Some(object) = require(ex, &right)? else {
        return nil();
    };
    if object.kind() != ObjectKind::Vehicle {
        ex.raise(RuntimeFault::ExpectedVehicle { strength: Strength::Weak })?;
        ex.note(RuntimeFault::ReturningEmptyArray);
        return reply(Value::empty_array());
    }
    let members = object.data().map(|d| d.occupants()).unwrap_or_default();
    reply(members.into_iter().map(Value::from).collect::<Vec<_>>())
}

/// Unidades não têm assentos e respondem com elas mesmas.
fn seat_of(ex: &mut Exec<'_>, right: Value, seat: Seat) -> Checked<Reply> {
    let Some(object) = require(ex, &right)? else {
        return nil();
    };
    if object.kind() != ObjectKind::Vehicle {
        ex.raise(RuntimeFault::ExpectedVehicle { strength: Strength::Weak })?;
        return reply(object);
    }
    let occupant = object
        .data_mut()
        .and_then(|mut d| seat.slot(&mut d).clone())
        .filter(|o| !o.is_null())
        .unwrap_or_else(|| ObjectRef::null(ObjectKind::Unit));
    reply(occupant)
}

fn vehicle(ex: &mut Exec<'_>, right: Value) -> Checked<Reply> {
    let Some(object) = require(ex, &right)? else {
        return nil();
    };
    reply(ex.vm.vehicle_of(&object).unwrap_or(object))
}

fn object_parent(ex: &mut Exec<'_>, right: Value) -> Checked<Reply> {
    let Some(object) = require(ex, &right)? else {
        return nil();
    };
    reply(ex.vm.vehicle_of(&object).unwrap_or_else(|| ObjectRef::null(ObjectKind::Vehicle)))
}

fn expect_unit(ex: &mut Exec<'_>, object: &ObjectRef) -> Checked<bool> {
    if object.is_null() {
        ex.raise(RuntimeFault::ExpectedNonNullValue { strength: Strength::Strong })?;
        return Ok(false);
    }
    if object.kind() != ObjectKind::Unit {
        ex.raise(RuntimeFault::ExpectedUnit { strength: Strength::Weak })?;
        ex.note(RuntimeFault::ReturningFalse);
        return Ok(false);
    }
    Ok(true)
}

fn expect_vehicle(ex: &mut Exec<'_>, object: &ObjectRef) -> Checked<bool> {
    if object.is_null() {
        ex.raise(RuntimeFault::ExpectedNonNullValue { strength: Strength::Strong })?;
        return Ok(false);
    }
    if object.kind() != ObjectKind::Vehicle {
        ex.raise(RuntimeFault::ExpectedVehicle { strength: Strength::Weak })?;
        ex.note(RuntimeFault::ReturningFalse);
        return Ok(false);
    }
    Ok(true)
}

fn captive(ex: &mut Exec<'_>, right: Value) -> Checked<Reply> {
    let object = object_of(&right);
    if !expect_unit(ex, &object)? {
        return reply(false);
    }
    reply(object.data().is_some_and(|d| d.captive))
}

fn set_captive(ex: &mut Exec<'_>, left: Value, right: Value) -> Checked<Reply> {
    let object = object_of(&left);
    if !expect_unit(ex, &object)? {
        return nil();
    }
    if let Some(mut data) = object.data_mut() {
        data.captive = flag(&right);
    }
    nil()
}

/// `unit moveInCargo vehicle` e `unit moveInDriver vehicle`
///
/// Assento ocupado por outra unidade não muda nada. A unidade sai do
/// veículo onde estava antes de embarcar.
fn board(ex: &mut Exec<'_>, left: Value, right: Value, seat: Option<Seat>) -> Checked<Reply> {
    let (unit, vehicle) = (object_of(&left), object_of(&right));
    if !expect_unit(ex, &unit)? || !expect_vehicle(ex, &vehicle)? {
        return nil();
    }
    if let Some(seat) = seat {
        let taken = vehicle
            .data_mut()
            .and_then(|mut d| seat.slot(&mut d).clone())
            .is_some_and(|o| !o.is_null() && o != unit);
        if taken {
            return nil();
        }
    }
    if let Some(previous) = ex.vm.vehicle_of(&unit) {
        if let Some(mut data) = previous.data_mut() {
            data.remove_occupant(&unit);
        }
    }
    if let Some(mut data) = vehicle.data_mut() {
        match seat {
            Some(seat) => *seat.slot(&mut data) = Some(unit),
            None => data.crew.push(unit),
        }
    }
    nil()
}

/// `unit in vehicle`
fn in_vehicle(ex: &mut Exec<'_>, left: Value, right: Value) -> Checked<Reply> {
    let (unit, vehicle) = (object_of(&left), object_of(&right));
    if !expect_unit(ex, &unit)? || !expect_vehicle(ex, &vehicle)? {
        return reply(false);
    }
    reply(vehicle.data().is_some_and(|d| d.occupants().contains(&unit)))
}

// ═══════════════════════════════════════════════════════════════════════════
// CREATION
// ═══════════════════════════════════════════════════════════════════════════

/// `"Class" createVehicle [x, y, z]`
fn create_vehicle(ex: &mut Exec<'_>, left: Value, right: Value) -> Checked<Reply> {
    let coords = items(&right);
    if !expect_uniform(ex, &coords, Scalar, 3, Strength::Strong)? {
        return nil();
    }
    let class_name = text(&left);
    if !check_class(ex, class_name)? {
        return nil();
    }
    let position = [num(&coords[0]), num(&coords[1]), num(&coords[2])];
    reply(spawn_object(ex, ObjectKind::Vehicle, class_name, position))
}

/// `createVehicle [class, position, markers, placement, special]`
///
/// O objeto fica exatamente em `position`; `markers`, `placement` e
/// `special` são validados mas não têm efeito.
fn create_vehicle_array(ex: &mut Exec<'_>, right: Value) -> Checked<Reply> {
    let args = items(&right);
    if !expect_size_range(ex, &args, 4, 5, Strength::Strong)? {
        return nil();
    }
    if !expect_types(ex, &args, &[Str, Array, Array, Scalar, Str], Strength::Strong)? {
        return nil();
    }
    let Some(position) = read_nested_position(ex, 1, &args[1])? else {
        return nil();
    };
    let class_name = text(&args[0]);
    if !check_class(ex, class_name)? {
        return nil();
    }
    reply(spawn_object(ex, ObjectKind::Vehicle, class_name, position))
}

fn join_group(group: &ObjectRef, unit: &ObjectRef) {
    if let Some(mut data) = group.data_mut() {
        data.crew.push(unit.clone());
    }
}

/// `group createUnit [class, position, markers, placement, special]`
fn create_unit_in_group(ex: &mut Exec<'_>, left: Value, right: Value) -> Checked<Reply> {
    let group = object_of(&left);
    if group.is_null() {
        ex.raise(RuntimeFault::ExpectedNonNullValue { strength: Strength::Strong })?;
        return nil();
    }
    let args = items(&right);
    if !expect_size(ex, &args, 5, Strength::Strong)? {
        return nil();
    }
    if !expect_types(ex, &args, &[Str, Array, Array, Scalar, Str], Strength::Strong)? {
        return nil();
    }
    let Some(position) = read_nested_position(ex, 1, &args[1])? else {
        return nil();
    };
    let class_name = text(&args[0]);
    if !check_class(ex, class_name)? {
        return nil();
    }
    let unit = spawn_object(ex, ObjectKind::Unit, class_name, position);
    join_group(&group, &unit);
    reply(unit)
}

/// `"Class" createUnit [position, group, init, skill, rank]`; yields nothing
fn create_unit(ex: &mut Exec<'_>, left: Value, right: Value) -> Checked<Reply> {
    let args = items(&right);
    if !expect_min_size(ex, &args, 2, Strength::Strong)? {
        return nil();
    }
    if !expect_types(ex, &args, &[Array, Group, Str, Scalar, Str], Strength::Strong)? {
        return nil();
    }
    let Some(position) = read_nested_position(ex, 0, &args[0])? else {
        return nil();
    };
    let group = object_of(&args[1]);
    if group.is_null() {
        ex.raise(RuntimeFault::ExpectedNonNullValue { strength: Strength::Strong })?;
        return nil();
    }
    let class_name = text(&left);
    if !check_class(ex, class_name)? {
        return nil();
    }
    let unit = spawn_object(ex, ObjectKind::Unit, class_name, position);
    join_group(&group, &unit);
    nil()
}

fn delete_group(ex: &mut Exec<'_>, right: Value) -> Checked<Reply> {
    let group = object_of(&right);
    let Some(members) = group.data().map(|d| d.crew.iter().filter(|m| !m.is_null()).count()) else {
        ex.raise(RuntimeFault::ExpectedNonNullValue { strength: Strength::Weak })?;
        return nil();
    };
    if members > 0 {
        ex.raise(RuntimeFault::GroupNotEmpty { group: Value::Object(group.clone()).to_string() })?;
        return nil();
    }
    group.destroy();
    ex.vm.forget_deleted();
    nil()
}
