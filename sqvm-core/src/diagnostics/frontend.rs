//! Message families of the compilation stages.
//!
//! Preprocessing, assembly and parsing happen outside the engine, but their
//! messages travel through the same [`Logger`](super::Logger) so hosts see one
//! code space.

use std::fmt;

use super::event::FaultMeta;
use super::Severity::{Error, Warning};

// ═══════════════════════════════════════════════════════════════════════════
// PREPROCESSOR (10xxx)
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum PreprocessorMessage {
    ArgCountMismatch,
    UnexpectedDataAfterInclude,
    RecursiveInclude { include_tree: String },
    IncludeFailed { line: String, reason: String },
    MacroDefinedTwice { macro_name: String },
    MacroNotFound { macro_name: String },
    UnexpectedIfdef,
    UnexpectedIfndef,
    UnexpectedElse,
    UnexpectedEndif,
    MissingEndif,
    UnknownInstruction { instruction: String },
    EmptyArgument,
}

impl PreprocessorMessage {
    pub fn meta(&self) -> FaultMeta {
        use PreprocessorMessage::*;
        match self {
            ArgCountMismatch => FaultMeta::new("ArgCountMismatch", Error, 10001),
            UnexpectedDataAfterInclude => FaultMeta::new("UnexpectedDataAfterInclude", Warning, 10002),
            RecursiveInclude { .. } => FaultMeta::new("RecursiveInclude", Error, 10003),
            IncludeFailed { .. } => FaultMeta::new("IncludeFailed", Error, 10004),
            MacroDefinedTwice { .. } => FaultMeta::new("MacroDefinedTwice", Warning, 10005),
            MacroNotFound { .. } => FaultMeta::new("MacroNotFound", Warning, 10006),
            UnexpectedIfdef => FaultMeta::new("UnexpectedIfdef", Error, 10007),
            UnexpectedIfndef => FaultMeta::new("UnexpectedIfndef", Error, 10008),
            UnexpectedElse => FaultMeta::new("UnexpectedElse", Error, 10009),
            UnexpectedEndif => FaultMeta::new("UnexpectedEndif", Error, 10010),
            MissingEndif => FaultMeta::new("MissingEndif", Error, 10011),
            UnknownInstruction { .. } => FaultMeta::new("UnknownInstruction", Error, 10012),
            EmptyArgument => FaultMeta::new("EmptyArgument", Warning, 10013),
        }
    }
}

impl fmt::Display for PreprocessorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use PreprocessorMessage::*;
        match self {
            ArgCountMismatch => f.write_str("Macro argument count does not match the definition."),
            UnexpectedDataAfterInclude => f.write_str("Unexpected data after include path."),
            RecursiveInclude { include_tree } => {
                write!(f, "Recursive include detected. Include tree: {}", include_tree)
            }
            IncludeFailed { line, reason } => {
                write!(f, "Failed to include '{}': {}", line, reason)
            }
            MacroDefinedTwice { macro_name } => {
                write!(f, "Macro '{}' defined twice.", macro_name)
            }
            MacroNotFound { macro_name } => {
                write!(f, "Macro '{}' not found.", macro_name)
            }
            UnexpectedIfdef => f.write_str("Unexpected #ifdef."),
            UnexpectedIfndef => f.write_str("Unexpected #ifndef."),
            UnexpectedElse => f.write_str("Unexpected #else."),
            UnexpectedEndif => f.write_str("Unexpected #endif."),
            MissingEndif => f.write_str("Missing #endif."),
            UnknownInstruction { instruction } => {
                write!(f, "Unknown preprocessor instruction '{}'.", instruction)
            }
            EmptyArgument => f.write_str("Empty macro argument."),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// ASSEMBLY (20xxx)
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum AssemblyMessage {
    ExpectedSemicolon,
    NoViableAlternativeInstructions,
    NoViableAlternativeArg,
    ExpectedEndStatement,
    ExpectedCallNular,
    ExpectedNularOperator,
    UnknownNularOperator { operator: String },
    ExpectedCallUnary,
    ExpectedUnaryOperator,
    UnknownUnaryOperator { operator: String },
    ExpectedCallBinary,
    ExpectedBinaryOperator,
    UnknownBinaryOperator { operator: String },
    ExpectedAssignTo,
    ExpectedVariableName,
    ExpectedAssignToLocal,
    ExpectedGetVariable,
    ExpectedMakeArray,
    ExpectedInteger,
    ExpectedPush,
    ExpectedTypeName,
    NumberOutOfRange,
}

impl AssemblyMessage {
    pub fn meta(&self) -> FaultMeta {
        use AssemblyMessage::*;
        match self {
            ExpectedSemicolon => FaultMeta::new("ExpectedSemicolon", Error, 20001),
            NoViableAlternativeInstructions => FaultMeta::new("NoViableAlternativeInstructions", Error, 20002),
            NoViableAlternativeArg => FaultMeta::new("NoViableAlternativeArg", Error, 20003),
            ExpectedEndStatement => FaultMeta::new("ExpectedEndStatement", Error, 20004),
            ExpectedCallNular => FaultMeta::new("ExpectedCallNular", Error, 20005),
            ExpectedNularOperator => FaultMeta::new("ExpectedNularOperator", Error, 20006),
            UnknownNularOperator { .. } => FaultMeta::new("UnknownNularOperator", Error, 20007),
            ExpectedCallUnary => FaultMeta::new("ExpectedCallUnary", Error, 20008),
            ExpectedUnaryOperator => FaultMeta::new("ExpectedUnaryOperator", Error, 20009),
            UnknownUnaryOperator { .. } => FaultMeta::new("UnknownUnaryOperator", Error, 20010),
            ExpectedCallBinary => FaultMeta::new("ExpectedCallBinary", Error, 20011),
            ExpectedBinaryOperator => FaultMeta::new("ExpectedBinaryOperator", Error, 20012),
            UnknownBinaryOperator { .. } => FaultMeta::new("UnknownBinaryOperator", Error, 20013),
            ExpectedAssignTo => FaultMeta::new("ExpectedAssignTo", Error, 20014),
            ExpectedVariableName => FaultMeta::new("ExpectedVariableName", Error, 20015),
            ExpectedAssignToLocal => FaultMeta::new("ExpectedAssignToLocal", Error, 20016),
            ExpectedGetVariable => FaultMeta::new("ExpectedGetVariable", Error, 20017),
            ExpectedMakeArray => FaultMeta::new("ExpectedMakeArray", Error, 20018),
            ExpectedInteger => FaultMeta::new("ExpectedInteger", Error, 20019),
            ExpectedPush => FaultMeta::new("ExpectedPush", Error, 20020),
            ExpectedTypeName => FaultMeta::new("ExpectedTypeName", Error, 20021),
            NumberOutOfRange => FaultMeta::new("NumberOutOfRange", Warning, 20022),
        }
    }
}

impl fmt::Display for AssemblyMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use AssemblyMessage::*;
        match self {
            UnknownNularOperator { operator } => write!(f, "Unknown nular operator '{}'.", operator),
            UnknownUnaryOperator { operator } => write!(f, "Unknown unary operator '{}'.", operator),
            UnknownBinaryOperator { operator } => write!(f, "Unknown binary operator '{}'.", operator),
            NumberOutOfRange => f.write_str("Number out of range. Value was clamped."),
            NoViableAlternativeInstructions | NoViableAlternativeArg => {
                f.write_str("No viable alternative.")
            }
            other => write!(f, "{}.", split_camel(other.meta().name)),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// SCRIPT PARSER (30xxx)
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum ScriptMessage {
    ExpectedStatementTerminator,
    NoViableAlternativeStatement,
    MissingUnderscoreOnPrivateVariable { variable: String },
    ExpectedBinaryExpression,
    MissingRightArgument { operator: String },
    MissingRoundClosingBracket,
    MissingCurlyClosingBracket,
    MissingSquareClosingBracket,
    NoViableAlternativePrimaryExpression,
    EmptyNumber,
    ExpectedScript,
    EndOfFile,
}

impl ScriptMessage {
    pub fn meta(&self) -> FaultMeta {
        use ScriptMessage::*;
        match self {
            ExpectedStatementTerminator => FaultMeta::new("ExpectedStatementTerminator", Error, 30001),
            NoViableAlternativeStatement => FaultMeta::new("NoViableAlternativeStatement", Error, 30002),
            MissingUnderscoreOnPrivateVariable { .. } => {
                FaultMeta::new("MissingUnderscoreOnPrivateVariable", Error, 30003)
            }
            ExpectedBinaryExpression => FaultMeta::new("ExpectedBinaryExpression", Error, 30004),
            MissingRightArgument { .. } => FaultMeta::new("MissingRightArgument", Error, 30005),
            MissingRoundClosingBracket => FaultMeta::new("MissingRoundClosingBracket", Error, 30006),
            MissingCurlyClosingBracket => FaultMeta::new("MissingCurlyClosingBracket", Error, 30007),
            MissingSquareClosingBracket => FaultMeta::new("MissingSquareClosingBracket", Error, 30008),
            NoViableAlternativePrimaryExpression => {
                FaultMeta::new("NoViableAlternativePrimaryExpression", Error, 30009)
            }
            EmptyNumber => FaultMeta::new("EmptyNumber", Error, 30010),
            ExpectedScript => FaultMeta::new("ExpectedScript", Error, 30011),
            EndOfFile => FaultMeta::new("EndOfFile", Error, 30012),
        }
    }
}

impl fmt::Display for ScriptMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ScriptMessage::*;
        match self {
            MissingUnderscoreOnPrivateVariable { variable } => {
                write!(f, "Private variable '{}' is missing its leading underscore.", variable)
            }
            MissingRightArgument { operator } => {
                write!(f, "Missing right argument for operator '{}'.", operator)
            }
            EndOfFile => f.write_str("Unexpected end of file."),
            other => write!(f, "{}.", split_camel(other.meta().name)),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// CONFIG PARSER (40xxx)
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigMessage {
    ExpectedStatementTerminator,
    NoViableAlternativeNode,
    ExpectedIdentifier,
    MissingRoundClosingBracket,
    MissingCurlyOpeningBracket,
    MissingCurlyClosingBracket,
    MissingSquareClosingBracket,
    MissingEqualSign,
    ExpectedArray,
    ExpectedValue,
    NoViableAlternativeValue,
    EndOfFileNotReached,
}

impl ConfigMessage {
    pub fn meta(&self) -> FaultMeta {
        use ConfigMessage::*;
        match self {
            ExpectedStatementTerminator => FaultMeta::new("ExpectedStatementTerminator", Error, 40001),
            NoViableAlternativeNode => FaultMeta::new("NoViableAlternativeNode", Error, 40002),
            ExpectedIdentifier => FaultMeta::new("ExpectedIdentifier", Error, 40003),
            MissingRoundClosingBracket => FaultMeta::new("MissingRoundClosingBracket", Error, 40004),
            MissingCurlyOpeningBracket => FaultMeta::new("MissingCurlyOpeningBracket", Error, 40005),
            MissingCurlyClosingBracket => FaultMeta::new("MissingCurlyClosingBracket", Error, 40006),
            MissingSquareClosingBracket => FaultMeta::new("MissingSquareClosingBracket", Error, 40007),
            MissingEqualSign => FaultMeta::new("MissingEqualSign", Error, 40008),
            ExpectedArray => FaultMeta::new("ExpectedArray", Error, 40009),
            ExpectedValue => FaultMeta::new("ExpectedValue", Error, 40010),
            NoViableAlternativeValue => FaultMeta::new("NoViableAlternativeValue", Error, 40011),
            EndOfFileNotReached => FaultMeta::new("EndOfFileNotReached", Error, 40012),
        }
    }
}

impl fmt::Display for ConfigMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.", split_camel(self.meta().name))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// LINTING (50xxx)
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum LintingMessage {
    UnassignedVariable { variable: String },
}

impl LintingMessage {
    pub fn meta(&self) -> FaultMeta {
        match self {
            LintingMessage::UnassignedVariable { .. } => FaultMeta::new("UnassignedVariable", Warning, 50001),
        }
    }
}

impl fmt::Display for LintingMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LintingMessage::UnassignedVariable { variable } => {
                write!(f, "Variable '{}' is read but never assigned.", variable)
            }
        }
    }
}

/// `ExpectedCallNular` → `Expected call nular`
fn split_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 8);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_ascii_uppercase() && i > 0 {
            out.push(' ');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_camel() {
        assert_eq!(split_camel("ExpectedCallNular"), "Expected call nular");
    }

    #[test]
    fn test_family_code_ranges() {
        assert_eq!(PreprocessorMessage::EmptyArgument.meta().code, 10013);
        assert_eq!(AssemblyMessage::NumberOutOfRange.meta().severity, Warning);
        assert_eq!(ScriptMessage::EndOfFile.meta().code, 30012);
        assert_eq!(ConfigMessage::EndOfFileNotReached.meta().code, 40012);
        assert_eq!(
            LintingMessage::UnassignedVariable { variable: "_x".into() }.meta().code,
            50001
        );
    }

    #[test]
    fn test_config_message_text() {
        assert_eq!(ConfigMessage::MissingEqualSign.to_string(), "Missing equal sign.");
    }
}
