//! # Valores dinâmicos
//!
//! Todo valor manipulado pela VM é um [`Value`]. Arrays são referências
//! compartilhadas (mutação visível a todos os donos), por isso inserções
//! verificam auto-recursão antes de acontecer.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::config_tree::ConfigRef;
use crate::handle::HandleId;
use crate::instruction::CodeBlock;

/// Tipo de um valor, usado nas assinaturas de comandos e nos diagnósticos
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// Aceita qualquer valor (apenas em assinaturas)
    Any,
    Nil,
    Boolean,
    Scalar,
    String,
    Array,
    Config,
    Code,
    Script,
    Object,
    Group,
    Side,
    Marker,
    If,
    While,
    For,
}

impl ValueType {
    /// Nome canônico retornado por `typeName`
    pub fn name(self) -> &'static str {
        match self {
            ValueType::Any => "ANY",
            ValueType::Nil => "NOTHING",
            ValueType::Boolean => "BOOL",
            ValueType::Scalar => "SCALAR",
            ValueType::String => "STRING",
            ValueType::Array => "ARRAY",
            ValueType::Config => "CONFIG",
            ValueType::Code => "CODE",
            ValueType::Script => "SCRIPT",
            ValueType::Object => "OBJECT",
            ValueType::Group => "GROUP",
            ValueType::Side => "SIDE",
            ValueType::Marker => "MARKER",
            ValueType::If => "IF",
            ValueType::While => "WHILE",
            ValueType::For => "FOR",
        }
    }

    /// `true` se um valor do tipo `other` satisfaz esta expectativa
    #[inline]
    pub fn accepts(self, other: ValueType) -> bool {
        self == ValueType::Any || self == other
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Junta tipos no formato `SCALAR|STRING`.
pub fn join_types(types: &[ValueType]) -> String {
    types.iter().map(|t| t.name()).collect::<Vec<_>>().join("|")
}

// ═══════════════════════════════════════════════════════════════════════════
// OBJECTS
// ═══════════════════════════════════════════════════════════════════════════

/// Categoria de um objeto de simulação
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Unit,
    Vehicle,
    Group,
    Marker,
}

/// Facção de um grupo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Side {
    West,
    East,
    Independent,
    #[default]
    Civilian,
    Unknown,
}

impl Side {
    pub fn name(self) -> &'static str {
        match self {
            Side::West => "WEST",
            Side::East => "EAST",
            Side::Independent => "GUER",
            Side::Civilian => "CIV",
            Side::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Dados inertes de um objeto. Comportamento de simulação fica fora da VM.
#[derive(Debug, Clone)]
pub struct ObjectData {
    pub id: u64,
    pub class_name: String,
    /// Nome dado por `setVehicleVarName`; vazio se nunca definido
    pub var_name: String,
    pub position: [f64; 3],
    pub velocity: [f64; 3],
    /// 0 intacto, 1 destruído
    pub damage: f64,
    pub driver: Option<ObjectRef>,
    pub gunner: Option<ObjectRef>,
    pub commander: Option<ObjectRef>,
    /// Carga de veículos ou membros de grupos
    pub crew: Vec<ObjectRef>,
    pub captive: bool,
    /// Só significativo para grupos
    pub side: Side,
    /// Marcado por `deleteVehicle`; toda referência passa a ver o objeto como nulo
    pub deleted: bool,
}

impl ObjectData {
    /// Ocupantes na ordem de `crew`: motorista, atirador, comandante, carga
    pub fn occupants(&self) -> Vec<ObjectRef> {
        [&self.driver, &self.gunner, &self.commander]
            .into_iter()
            .flatten()
            .chain(self.crew.iter())
            .filter(|o| !o.is_null())
            .cloned()
            .collect()
    }

    /// Retira `unit` de qualquer assento ou da carga
    pub fn remove_occupant(&mut self, unit: &ObjectRef) {
        for seat in [&mut self.driver, &mut self.gunner, &mut self.commander] {
            if seat.as_ref() == Some(unit) {
                *seat = None;
            }
        }
        self.crew.retain(|o| o != unit);
    }
}

/// Referência a um objeto; `data == None` é o objeto nulo da categoria
#[derive(Debug, Clone)]
pub struct ObjectRef {
    kind: ObjectKind,
    data: Option<Rc<RefCell<ObjectData>>>,
}

impl ObjectRef {
    pub fn null(kind: ObjectKind) -> Self {
        Self { kind, data: None }
    }

    pub fn new(kind: ObjectKind, id: u64, class_name: impl Into<String>) -> Self {
        Self {
            kind,
            data: Some(Rc::new(RefCell::new(ObjectData {
                id,
                class_name: class_name.into(),
                var_name: String::new(),
                position: [0.0; 3],
                velocity: [0.0; 3],
                damage: 0.0,
                driver: None,
                gunner: None,
                commander: None,
                crew: Vec::new(),
                captive: false,
                side: Side::Civilian,
                deleted: false,
            }))),
        }
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn is_null(&self) -> bool {
        self.data.as_ref().is_none_or(|d| d.borrow().deleted)
    }

    /// Dados do objeto; `None` para nulos e apagados
    pub fn data(&self) -> Option<Ref<'_, ObjectData>> {
        self.data.as_ref().map(|d| d.borrow()).filter(|d| !d.deleted)
    }

    pub fn data_mut(&self) -> Option<RefMut<'_, ObjectData>> {
        self.data.as_ref().map(|d| d.borrow_mut()).filter(|d| !d.deleted)
    }

    /// Apaga o objeto para todas as referências (deleteVehicle).
    pub fn destroy(&self) {
        if let Some(data) = &self.data {
            let mut data = data.borrow_mut();
            data.deleted = true;
            data.driver = None;
            data.gunner = None;
            data.commander = None;
            data.crew.clear();
        }
    }

    pub fn value_type(&self) -> ValueType {
        match self.kind {
            ObjectKind::Unit | ObjectKind::Vehicle => ValueType::Object,
            ObjectKind::Group => ValueType::Group,
            ObjectKind::Marker => ValueType::Marker,
        }
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        match (&self.data, &other.data) {
            (Some(a), Some(b)) if Rc::ptr_eq(a, b) => true,
            _ => self.is_null() && other.is_null() && self.value_type() == other.value_type(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// ARRAYS
// ═══════════════════════════════════════════════════════════════════════════

/// Array compartilhado por referência
#[derive(Debug, Clone, Default)]
pub struct ArrayRef(Rc<RefCell<Vec<Value>>>);

impl ArrayRef {
    pub fn new(items: Vec<Value>) -> Self {
        Self(Rc::new(RefCell::new(items)))
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.borrow().get(index).cloned()
    }

    /// Cópia rasa dos elementos
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.borrow().clone()
    }

    pub fn borrow(&self) -> Ref<'_, Vec<Value>> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Vec<Value>> {
        self.0.borrow_mut()
    }

    pub fn ptr_eq(&self, other: &ArrayRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// `true` se inserir `value` neste array criaria um ciclo
    pub fn would_recurse(&self, value: &Value) -> bool {
        match value {
            Value::Array(candidate) => {
                let target = Rc::as_ptr(&self.0);
                candidate.reaches(target, &mut HashSet::new())
            }
            _ => false,
        }
    }

    fn reaches(
        &self,
        target: *const RefCell<Vec<Value>>,
        visited: &mut HashSet<*const RefCell<Vec<Value>>>,
    ) -> bool {
        let ptr = Rc::as_ptr(&self.0);
        if ptr == target {
            return true;
        }
        if !visited.insert(ptr) {
            return false;
        }
        self.0.borrow().iter().any(|item| match item {
            Value::Array(inner) => inner.reaches(target, visited),
            _ => false,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// CONTROL VALUES
// ═══════════════════════════════════════════════════════════════════════════

/// Parâmetros de um `for "_i" from a to b step s`
#[derive(Debug, Clone, PartialEq)]
pub struct ForSpec {
    pub variable: Rc<str>,
    pub from: f64,
    pub to: f64,
    pub step: f64,
}

/// Valores intermediários das construções de controle (`if`, `while`, `for`)
#[derive(Debug, Clone)]
pub enum ControlValue {
    If(bool),
    While(Rc<CodeBlock>),
    For(ForSpec),
}

// ═══════════════════════════════════════════════════════════════════════════
// VALUE
// ═══════════════════════════════════════════════════════════════════════════

/// Valor dinâmico
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Nil,
    Boolean(bool),
    Scalar(f64),
    Text(Rc<str>),
    Array(ArrayRef),
    Config(ConfigRef),
    Code(Rc<CodeBlock>),
    /// `None` é o handle vazio (`scriptNull`)
    Script(Option<HandleId>),
    Object(ObjectRef),
    Side(Side),
    Control(ControlValue),
}

impl Value {
    pub fn text(s: impl AsRef<str>) -> Self {
        Value::Text(Rc::from(s.as_ref()))
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(ArrayRef::new(items))
    }

    pub fn empty_array() -> Self {
        Value::array(Vec::new())
    }

    pub fn code(block: CodeBlock) -> Self {
        Value::Code(Rc::new(block))
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Nil => ValueType::Nil,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Scalar(_) => ValueType::Scalar,
            Value::Text(_) => ValueType::String,
            Value::Array(_) => ValueType::Array,
            Value::Config(_) => ValueType::Config,
            Value::Code(_) => ValueType::Code,
            Value::Script(_) => ValueType::Script,
            Value::Object(obj) => obj.value_type(),
            Value::Side(_) => ValueType::Side,
            Value::Control(ControlValue::If(_)) => ValueType::If,
            Value::Control(ControlValue::While(_)) => ValueType::While,
            Value::Control(ControlValue::For(_)) => ValueType::For,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_code(&self) -> Option<&Rc<CodeBlock>> {
        match self {
            Value::Code(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Igualdade estrutural (`isEqualTo`): arrays comparados elemento a elemento
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Scalar(a), Value::Scalar(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                if a.ptr_eq(b) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y))
            }
            (Value::Config(a), Value::Config(b)) => a == b,
            (Value::Code(a), Value::Code(b)) => Rc::ptr_eq(a, b),
            (Value::Script(a), Value::Script(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Side(a), Value::Side(b)) => a == b,
            _ => false,
        }
    }

    /// Copia arrays recursivamente; o resto é clonado como está.
    pub fn deep_copy(&self) -> Value {
        match self {
            Value::Array(items) => {
                Value::array(items.borrow().iter().map(Value::deep_copy).collect())
            }
            other => other.clone(),
        }
    }

    /// Formatação de `str`: strings entre aspas, o resto como em [`fmt::Display`]
    pub fn to_script_string(&self) -> String {
        match self {
            Value::Text(s) => format!("\"{}\"", s.replace('"', "\"\"")),
            other => other.to_string(),
        }
    }
}

fn format_scalar(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("any"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Scalar(n) => f.write_str(&format_scalar(*n)),
            Value::Text(s) => f.write_str(s),
            Value::Array(items) => {
                let rendered: Vec<String> =
                    items.borrow().iter().map(Value::to_script_string).collect();
                write!(f, "[{}]", rendered.join(","))
            }
            Value::Config(cfg) => write!(f, "{}", cfg),
            Value::Code(code) => write!(f, "{{<{} instructions>}}", code.len()),
            Value::Script(Some(id)) => write!(f, "<script {}>", id.0),
            Value::Script(None) => f.write_str("<NULL-script>"),
            Value::Object(obj) => match obj.data() {
                Some(data) if !data.var_name.is_empty() => f.write_str(&data.var_name),
                Some(data) => write!(f, "{}#{}", data.class_name, data.id),
                None => f.write_str("<NULL-object>"),
            },
            Value::Side(side) => write!(f, "{}", side),
            Value::Control(ctl) => match ctl {
                ControlValue::If(b) => write!(f, "<if {}>", b),
                ControlValue::While(_) => f.write_str("<while>"),
                ControlValue::For(spec) => write!(f, "<for {}>", spec.variable),
            },
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Scalar(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Scalar(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Scalar(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::text(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(Rc::from(s))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::array(items)
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Value::Object(obj)
    }
}

impl From<Side> for Value {
    fn from(side: Side) -> Self {
        Value::Side(side)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_formatting() {
        assert_eq!(Value::from(3.0).to_string(), "3");
        assert_eq!(Value::from(2.5).to_string(), "2.5");
        assert_eq!(Value::from(-1.0).to_string(), "-1");
    }

    #[test]
    fn test_array_formatting_quotes_strings() {
        let v = Value::array(vec![1.into(), "a".into(), Value::array(vec![true.into()])]);
        assert_eq!(v.to_string(), "[1,\"a\",[true]]");
    }

    #[test]
    fn test_direct_self_insert_is_recursion() {
        let arr = ArrayRef::new(vec![]);
        assert!(arr.would_recurse(&Value::Array(arr.clone())));
    }

    #[test]
    fn test_nested_self_insert_is_recursion() {
        let outer = ArrayRef::new(vec![]);
        let inner = ArrayRef::new(vec![Value::Array(outer.clone())]);
        assert!(outer.would_recurse(&Value::Array(inner)));
    }

    #[test]
    fn test_sibling_insert_is_not_recursion() {
        let a = ArrayRef::new(vec![1.into()]);
        let b = ArrayRef::new(vec![Value::Array(a.clone())]);
        let c = ArrayRef::new(vec![]);
        assert!(!c.would_recurse(&Value::Array(b)));
        assert!(!c.would_recurse(&Value::from(1)));
    }

    #[test]
    fn test_equals_is_structural_for_arrays() {
        let a = Value::array(vec![1.into(), "x".into()]);
        let b = Value::array(vec![1.into(), "x".into()]);
        assert!(a.equals(&b));
        assert!(!a.equals(&Value::array(vec![1.into()])));
    }

    #[test]
    fn test_object_null_equality() {
        let a = ObjectRef::null(ObjectKind::Unit);
        let b = ObjectRef::null(ObjectKind::Vehicle);
        assert_eq!(a, b);
        let g = ObjectRef::null(ObjectKind::Group);
        assert_ne!(a, g);
        assert_eq!(a.value_type(), ValueType::Object);
    }

    #[test]
    fn test_destroy_is_seen_by_every_reference() {
        let a = ObjectRef::new(ObjectKind::Vehicle, 1, "Car");
        let b = a.clone();
        a.destroy();
        assert!(b.is_null());
        assert!(b.data().is_none());
        assert_eq!(b, ObjectRef::null(ObjectKind::Unit));
    }

    #[test]
    fn test_occupants_are_ordered_by_seat() {
        let car = ObjectRef::new(ObjectKind::Vehicle, 1, "Car");
        let (a, b, c) = (
            ObjectRef::new(ObjectKind::Unit, 2, "Man"),
            ObjectRef::new(ObjectKind::Unit, 3, "Man"),
            ObjectRef::new(ObjectKind::Unit, 4, "Man"),
        );
        if let Some(mut data) = car.data_mut() {
            data.crew.push(a.clone());
            data.commander = Some(b.clone());
            data.driver = Some(c.clone());
        }
        let seen = car.data().map(|d| d.occupants()).unwrap_or_default();
        assert_eq!(seen, vec![c.clone(), b.clone(), a.clone()]);

        if let Some(mut data) = car.data_mut() {
            data.remove_occupant(&b);
        }
        let seen = car.data().map(|d| d.occupants()).unwrap_or_default();
        assert_eq!(seen, vec![c, a]);
    }

    #[test]
    fn test_side_values() {
        assert_eq!(Value::from(Side::Independent).to_string(), "GUER");
        assert_eq!(Value::from(Side::West).value_type(), ValueType::Side);
        assert!(Value::from(Side::East).equals(&Value::from(Side::East)));
        assert!(!Value::from(Side::East).equals(&Value::from(Side::West)));
    }

    #[test]
    fn test_var_name_replaces_display() {
        let car = ObjectRef::new(ObjectKind::Vehicle, 7, "Car");
        assert_eq!(Value::from(car.clone()).to_string(), "Car#7");
        if let Some(mut data) = car.data_mut() {
            data.var_name = "truck1".into();
        }
        assert_eq!(Value::from(car).to_string(), "truck1");
    }

    #[test]
    fn test_type_accepts() {
        assert!(ValueType::Any.accepts(ValueType::Scalar));
        assert!(ValueType::Scalar.accepts(ValueType::Scalar));
        assert!(!ValueType::Scalar.accepts(ValueType::String));
        assert_eq!(join_types(&[ValueType::Scalar, ValueType::String]), "SCALAR|STRING");
    }
}
