//! Instruções e blocos de código
//!
//! O fluxo é pós-fixo (RPN): operandos primeiro, operador depois. Os estágios
//! de compilação externos produzem [`CodeBlock`]s; [`CodeBuilder`] monta blocos
//! à mão para hosts e testes.

use std::fmt;
use std::rc::Rc;

use crate::diagnostics::LocationInfo;
use crate::value::Value;

/// Operação de uma instrução
#[derive(Debug, Clone)]
pub enum Op {
    Push(Value),
    GetVariable(Rc<str>),
    AssignTo(Rc<str>),
    AssignToLocal(Rc<str>),
    MakeArray(usize),
    CallNular(Rc<str>),
    CallUnary(Rc<str>),
    CallBinary(Rc<str>),
    EndStatement,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Push(v) => write!(f, "push {}", v.to_script_string()),
            Op::GetVariable(n) => write!(f, "getVariable {}", n),
            Op::AssignTo(n) => write!(f, "assignTo {}", n),
            Op::AssignToLocal(n) => write!(f, "assignToLocal {}", n),
            Op::MakeArray(n) => write!(f, "makeArray {}", n),
            Op::CallNular(n) => write!(f, "callNular {}", n),
            Op::CallUnary(n) => write!(f, "callUnary {}", n),
            Op::CallBinary(n) => write!(f, "callBinary {}", n),
            Op::EndStatement => f.write_str("endStatement"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Instruction {
    pub op: Op,
    pub location: LocationInfo,
}

impl Instruction {
    pub fn new(op: Op, location: LocationInfo) -> Self {
        Self { op, location }
    }
}

/// Sequência imutável de instruções
#[derive(Debug, Clone, Default)]
pub struct CodeBlock {
    instructions: Vec<Instruction>,
}

impl CodeBlock {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Índice logo após o primeiro `EndStatement` a partir de `from`
    pub fn statement_end(&self, from: usize) -> usize {
        self.instructions[from.min(self.len())..]
            .iter()
            .position(|i| matches!(i.op, Op::EndStatement))
            .map(|offset| from + offset + 1)
            .unwrap_or(self.len())
    }
}

/// Construtor fluente de [`CodeBlock`]
///
/// Cada instrução recebe uma coluna crescente; `end()` fecha a instrução e
/// avança uma linha.
#[derive(Debug, Clone)]
pub struct CodeBuilder {
    path: Rc<str>,
    line: usize,
    col: usize,
    instructions: Vec<Instruction>,
}

impl CodeBuilder {
    pub fn new(path: impl Into<Rc<str>>) -> Self {
        Self { path: path.into(), line: 1, col: 0, instructions: Vec::new() }
    }

    pub fn at(mut self, line: usize, col: usize) -> Self {
        self.line = line;
        self.col = col;
        self
    }

    fn emit(mut self, op: Op) -> Self {
        let location = LocationInfo::new(Rc::clone(&self.path), self.line, self.col);
        self.instructions.push(Instruction::new(op, location));
        self.col += 1;
        self
    }

    pub fn push(self, value: impl Into<Value>) -> Self {
        self.emit(Op::Push(value.into()))
    }

    pub fn code(self, block: CodeBlock) -> Self {
        self.emit(Op::Push(Value::code(block)))
    }

    pub fn get(self, name: &str) -> Self {
        self.emit(Op::GetVariable(Rc::from(name)))
    }

    pub fn assign(self, name: &str) -> Self {
        self.emit(Op::AssignTo(Rc::from(name)))
    }

    pub fn assign_local(self, name: &str) -> Self {
        self.emit(Op::AssignToLocal(Rc::from(name)))
    }

    pub fn make_array(self, count: usize) -> Self {
        self.emit(Op::MakeArray(count))
    }

    pub fn nular(self, op: &str) -> Self {
        self.emit(Op::CallNular(Rc::from(op)))
    }

    pub fn unary(self, op: &str) -> Self {
        self.emit(Op::CallUnary(Rc::from(op)))
    }

    pub fn binary(self, op: &str) -> Self {
        self.emit(Op::CallBinary(Rc::from(op)))
    }

    pub fn end(self) -> Self {
        let mut next = self.emit(Op::EndStatement);
        next.line += 1;
        next.col = 0;
        next
    }

    pub fn build(self) -> CodeBlock {
        CodeBlock::new(self.instructions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_locations() {
        let code = CodeBuilder::new("t.sqf").push(1).push(2).binary("+").end().push(3).build();
        assert_eq!(code.len(), 5);
        let last = code.get(4).map(|i| i.location.clone());
        assert_eq!(last, Some(LocationInfo::new("t.sqf", 2, 0)));
    }

    #[test]
    fn test_statement_end() {
        let code = CodeBuilder::new("t.sqf").push(1).end().push(2).push(3).end().build();
        assert_eq!(code.statement_end(0), 2);
        assert_eq!(code.statement_end(2), 5);
        assert_eq!(code.statement_end(5), 5);
    }

    #[test]
    fn test_op_display() {
        assert_eq!(Op::Push(Value::from("a")).to_string(), "push \"a\"");
        assert_eq!(Op::MakeArray(2).to_string(), "makeArray 2");
    }
}
