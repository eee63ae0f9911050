//! Source locations for diagnostics.
//!
//! Four artifacts can describe where something happened: a preprocessed file
//! cursor, a syntax tree node, a raw position marker and a compiled
//! instruction. All of them collapse into one [`LocationInfo`].

use std::fmt;
use std::rc::Rc;

use crate::instruction::Instruction;

/// `{path, line, col}` with a stable rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationInfo {
    pub path: Rc<str>,
    pub line: usize,
    pub col: usize,
}

impl LocationInfo {
    pub fn new(path: impl Into<Rc<str>>, line: usize, col: usize) -> Self {
        Self { path: path.into(), line, col }
    }

    /// Location for events raised by the host rather than by a script
    pub fn host() -> Self {
        Self::new("<host>", 0, 0)
    }

    /// `[path][L<line>|C<col>]`
    pub fn format(&self) -> String {
        format!("[{}][L{}|C{}]", self.path, self.line, self.col)
    }
}

impl Default for LocationInfo {
    fn default() -> Self {
        Self::new("", 0, 0)
    }
}

impl fmt::Display for LocationInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

/// Cursor of the preprocessor over one file
#[derive(Debug, Clone)]
pub struct PreprocessedFile {
    pub path: Rc<str>,
    pub line: usize,
    pub col: usize,
    pub offset: usize,
}

/// Node produced by the script or config parser
#[derive(Debug, Clone)]
pub struct SyntaxNode {
    pub kind: String,
    pub path: Rc<str>,
    pub line: usize,
    pub col: usize,
    pub offset: usize,
    pub length: usize,
}

/// Raw position marker emitted by the preprocessor into its output
#[derive(Debug, Clone)]
pub struct PositionMarker {
    pub path: Rc<str>,
    pub line: usize,
    pub col: usize,
}

impl From<&PreprocessedFile> for LocationInfo {
    fn from(file: &PreprocessedFile) -> Self {
        Self::new(Rc::clone(&file.path), file.line, file.col)
    }
}

impl From<&SyntaxNode> for LocationInfo {
    fn from(node: &SyntaxNode) -> Self {
        Self::new(Rc::clone(&node.path), node.line, node.col)
    }
}

impl From<&PositionMarker> for LocationInfo {
    fn from(marker: &PositionMarker) -> Self {
        Self::new(Rc::clone(&marker.path), marker.line, marker.col)
    }
}

impl From<&Instruction> for LocationInfo {
    fn from(instruction: &Instruction) -> Self {
        instruction.location.clone()
    }
}
