//! # Runtime fault catalogue (60xxx)
//!
//! Uma condição verificada é um único variant. As condições que existem nas
//! duas formas carregam um [`Strength`]: a forma forte aborta, a fraca
//! continua com um valor de fallback. [`RuntimeFault::meta`] é a única tabela
//! que associa `(condição, força)` a nome, severidade e código.

use std::fmt;

use super::event::FaultMeta;
use super::Severity::{Error, Fatal, Info, Verbose, Warning};
use crate::fault::Strength;
use crate::value::{join_types, ValueType};

/// Tamanho esperado de um array: exato ou intervalo fechado
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeExpectation {
    Exact(usize),
    Range { min: usize, max: usize },
}

impl fmt::Display for SizeExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeExpectation::Exact(n) => write!(f, "{}", n),
            SizeExpectation::Range { min, max } => write!(f, "{}..{}", min, max),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeFault {
    Stacktrace { trace: String },
    MaximumInstructionCountReached { maximum: u64 },
    ExpectedArraySizeMismatch { expected: SizeExpectation, got: usize, strength: Strength },
    ExpectedMinimumArraySizeMismatch { expected: usize, got: usize, strength: Strength },
    ExpectedArrayTypeMismatch {
        position: usize,
        expected: Vec<ValueType>,
        got: ValueType,
        strength: Strength,
    },
    IndexOutOfRange { range: usize, index: usize, strength: Strength },
    NegativeIndex { strength: Strength },
    IndexEqualsRange { range: usize, index: usize },
    ReturningNil,
    ReturningEmptyArray,
    NegativeSize { strength: Strength },
    ArrayRecursion,
    InfoMessage { source: String, message: String },
    SuspensionDisabled,
    SuspensionInUnscheduledEnvironment,
    ReturningConfigNull,
    AssertFailed,
    StartIndexExceedsToIndex { from: usize, to: usize, strength: Strength },
    MagicVariableTypeMismatch { variable: String, expected: Vec<ValueType>, got: ValueType },
    ScriptHandleAlreadyTerminated,
    ScriptHandleAlreadyFinished,
    ExtensionLoaded { name: String, version: String },
    ExtensionNotTerminatingVersionString { name: String },
    ExtensionNotTerminatingCallExtensionBufferString { name: String },
    ExtensionNotTerminatingCallExtensionArgBufferString { name: String },
    LibraryNameContainsPath { name: String },
    ReturningEmptyString,
    ExtensionRuntimeError { name: String, what: String },
    FileNotFound { filename: String },
    ScopeNameAlreadySet,
    ScriptNameAlreadySet,
    ReturningEmptyScriptHandle,
    ReturningErrorCode { error_code: String },
    ExpectedSubArrayTypeMismatch {
        position: Vec<usize>,
        expected: Vec<ValueType>,
        got: ValueType,
        strength: Strength,
    },
    ErrorMessage { source: String, message: String },
    FileSystemDisabled,
    NetworkingDisabled,
    AlreadyConnected,
    NetworkingFormatMismatch { provided: String },
    FailedToEstablishConnection,
    ExpectedArrayToHaveElements { strength: Strength },
    ClipboardDisabled,
    FailedToCopyToClipboard,
    FormatInvalidPlaceholder { placeholder: char, index: usize },
    ZeroDivisor,
    MarkerNotExisting { marker: String },
    ReturningDefaultArray { size: usize },
    ReturningScalarZero,
    ExpectedNonNullValue { strength: Strength },
    ConfigEntryNotFound { path: Vec<String>, name: String, strength: Strength },
    ExpectedVehicle { strength: Strength },
    ExpectedUnit { strength: Strength },
    ReturningFalse,
    MarkerAlreadyExisting { marker: String },
    InvalidMarkerShape { shape: String },
    TypeMismatch { expected: Vec<ValueType>, got: ValueType, strength: Strength },
    VariableNotFound { variable: String },
    StackCorruptionMissingValues { expected: usize, got: usize },
    NoValueFoundForRightArgument { operator: String, strength: Strength },
    NoValueFoundForLeftArgument { operator: String, strength: Strength },
    UnknownInputTypeCombinationBinary { operator: String, left: Option<ValueType>, right: ValueType },
    FoundNoValue,
    CallstackFoundNoValue { callstack: String, strength: Strength },
    GroupNotEmpty { group: String },
    ForStepVariableTypeMismatch { variable: String, expected: ValueType, got: ValueType },
    ForStepNoWorkShouldBeDone { step: f64, from: f64, to: f64 },
}

macro_rules! paired {
    ($strength:expr, $name:literal, $code:literal) => {
        $strength.pick(
            FaultMeta::new($name, Error, $code),
            FaultMeta::new(concat!($name, "Weak"), Warning, $code + 1),
        )
    };
}

impl RuntimeFault {
    pub fn meta(&self) -> FaultMeta {
        use RuntimeFault::*;
        match self {
            Stacktrace { .. } => FaultMeta::new("Stacktrace", Fatal, 60001),
            MaximumInstructionCountReached { .. } => {
                FaultMeta::new("MaximumInstructionCountReached", Fatal, 60002)
            }
            ExpectedArraySizeMismatch { strength, .. } => {
                paired!(strength, "ExpectedArraySizeMismatch", 60003)
            }
            ExpectedMinimumArraySizeMismatch { strength, .. } => {
                paired!(strength, "ExpectedMinimumArraySizeMismatch", 60005)
            }
            ExpectedArrayTypeMismatch { strength, .. } => {
                paired!(strength, "ExpectedArrayTypeMismatch", 60007)
            }
            IndexOutOfRange { strength, .. } => paired!(strength, "IndexOutOfRange", 60009),
            NegativeIndex { strength } => paired!(strength, "NegativeIndex", 60011),
            IndexEqualsRange { .. } => FaultMeta::new("IndexEqualsRange", Warning, 60013),
            ReturningNil => FaultMeta::new("ReturningNil", Verbose, 60014),
            ReturningEmptyArray => FaultMeta::new("ReturningEmptyArray", Verbose, 60015),
            NegativeSize { strength } => paired!(strength, "NegativeSize", 60016),
            ArrayRecursion => FaultMeta::new("ArrayRecursion", Fatal, 60018),
            InfoMessage { .. } => FaultMeta::new("InfoMessage", Info, 60019),
            SuspensionDisabled => FaultMeta::new("SuspensionDisabled", Error, 60020),
            SuspensionInUnscheduledEnvironment => {
                FaultMeta::new("SuspensionInUnscheduledEnvironment", Error, 60021)
            }
            ReturningConfigNull => FaultMeta::new("ReturningConfigNull", Verbose, 60022),
            AssertFailed => FaultMeta::new("AssertFailed", Error, 60023),
            StartIndexExceedsToIndex { strength, .. } => {
                paired!(strength, "StartIndexExceedsToIndex", 60024)
            }
            MagicVariableTypeMismatch { .. } => {
                FaultMeta::new("MagicVariableTypeMismatch", Error, 60026)
            }
            ScriptHandleAlreadyTerminated => {
                FaultMeta::new("ScriptHandleAlreadyTerminated", Warning, 60027)
            }
            ScriptHandleAlreadyFinished => FaultMeta::new("ScriptHandleAlreadyFinished", Warning, 60028),
            ExtensionLoaded { .. } => FaultMeta::new("ExtensionLoaded", Verbose, 60029),
            ExtensionNotTerminatingVersionString { .. } => {
                FaultMeta::new("ExtensionNotTerminatingVersionString", Warning, 60030)
            }
            ExtensionNotTerminatingCallExtensionBufferString { .. } => {
                FaultMeta::new("ExtensionNotTerminatingCallExtensionBufferString", Warning, 60031)
            }
            ExtensionNotTerminatingCallExtensionArgBufferString { .. } => {
                FaultMeta::new("ExtensionNotTerminatingCallExtensionArgBufferString", Warning, 60032)
            }
            LibraryNameContainsPath { .. } => FaultMeta::new("LibraryNameContainsPath", Warning, 60033),
            ReturningEmptyString => FaultMeta::new("ReturningEmptyString", Verbose, 60034),
            ExtensionRuntimeError { .. } => FaultMeta::new("ExtensionRuntimeError", Warning, 60035),
            FileNotFound { .. } => FaultMeta::new("FileNotFound", Warning, 60036),
            ScopeNameAlreadySet => FaultMeta::new("ScopeNameAlreadySet", Error, 60037),
            ScriptNameAlreadySet => FaultMeta::new("ScriptNameAlreadySet", Warning, 60038),
            ReturningEmptyScriptHandle => FaultMeta::new("ReturningEmptyScriptHandle", Verbose, 60039),
            ReturningErrorCode { .. } => FaultMeta::new("ReturningErrorCode", Verbose, 60040),
            ExpectedSubArrayTypeMismatch { strength, .. } => {
                paired!(strength, "ExpectedSubArrayTypeMismatch", 60041)
            }
            ErrorMessage { .. } => FaultMeta::new("ErrorMessage", Error, 60043),
            FileSystemDisabled => FaultMeta::new("FileSystemDisabled", Warning, 60044),
            NetworkingDisabled => FaultMeta::new("NetworkingDisabled", Warning, 60045),
            AlreadyConnected => FaultMeta::new("AlreadyConnected", Error, 60046),
            NetworkingFormatMismatch { .. } => FaultMeta::new("NetworkingFormatMismatch", Error, 60047),
            FailedToEstablishConnection => {
                FaultMeta::new("FailedToEstablishConnection", Warning, 60048)
            }
            ExpectedArrayToHaveElements { strength } => {
                paired!(strength, "ExpectedArrayToHaveElements", 60049)
            }
            ClipboardDisabled => FaultMeta::new("ClipboardDisabled", Warning, 60051),
            FailedToCopyToClipboard => FaultMeta::new("FailedToCopyToClipboard", Warning, 60052),
            FormatInvalidPlaceholder { .. } => FaultMeta::new("FormatInvalidPlaceholder", Warning, 60053),
            ZeroDivisor => FaultMeta::new("ZeroDivisor", Warning, 60054),
            MarkerNotExisting { .. } => FaultMeta::new("MarkerNotExisting", Warning, 60055),
            ReturningDefaultArray { .. } => FaultMeta::new("ReturningDefaultArray", Verbose, 60056),
            ReturningScalarZero => FaultMeta::new("ReturningScalarZero", Verbose, 60057),
            ExpectedNonNullValue { strength } => paired!(strength, "ExpectedNonNullValue", 60058),
            ConfigEntryNotFound { strength, .. } => paired!(strength, "ConfigEntryNotFound", 60060),
            ExpectedVehicle { strength } => paired!(strength, "ExpectedVehicle", 60062),
            ExpectedUnit { strength } => paired!(strength, "ExpectedUnit", 60064),
            ReturningFalse => FaultMeta::new("ReturningFalse", Verbose, 60066),
            MarkerAlreadyExisting { .. } => FaultMeta::new("MarkerAlreadyExisting", Warning, 60067),
            TypeMismatch { strength, .. } => paired!(strength, "TypeMismatch", 60068),
            VariableNotFound { .. } => FaultMeta::new("VariableNotFound", Warning, 60070),
            StackCorruptionMissingValues { .. } => {
                FaultMeta::new("StackCorruptionMissingValues", Fatal, 60071)
            }
            NoValueFoundForRightArgument { strength, .. } => {
                paired!(strength, "NoValueFoundForRightArgument", 60072)
            }
            NoValueFoundForLeftArgument { strength, .. } => {
                paired!(strength, "NoValueFoundForLeftArgument", 60074)
            }
            UnknownInputTypeCombinationBinary { .. } => {
                FaultMeta::new("UnknownInputTypeCombinationBinary", Error, 60076)
            }
            FoundNoValue => FaultMeta::new("FoundNoValue", Error, 60077),
            CallstackFoundNoValue { strength, .. } => paired!(strength, "CallstackFoundNoValue", 60078),
            GroupNotEmpty { .. } => FaultMeta::new("GroupNotEmpty", Warning, 60080),
            ForStepVariableTypeMismatch { .. } => {
                FaultMeta::new("ForStepVariableTypeMismatch", Warning, 60081)
            }
            ForStepNoWorkShouldBeDone { .. } => {
                FaultMeta::new("ForStepNoWorkShouldBeDone", Warning, 60082)
            }
            InvalidMarkerShape { .. } => FaultMeta::new("InvalidMarkerShape", Warning, 60083),
        }
    }
}

impl fmt::Display for RuntimeFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use RuntimeFault::*;
        match self {
            Stacktrace { trace } => write!(f, "Stacktrace:\n{}", trace),
            MaximumInstructionCountReached { maximum } => {
                write!(f, "Maximum instruction count of {} reached.", maximum)
            }
            ExpectedArraySizeMismatch { expected, got, .. } => {
                write!(f, "Array size mismatch. Expected {} elements, got {}.", expected, got)
            }
            ExpectedMinimumArraySizeMismatch { expected, got, .. } => write!(
                f,
                "Array size mismatch. Expected at least {} elements, got {}.",
                expected, got
            ),
            ExpectedArrayTypeMismatch { position, expected, got, .. } => write!(
                f,
                "Array element type mismatch at position {}. Expected {}, got {}.",
                position,
                join_types(expected),
                got
            ),
            IndexOutOfRange { range, index, .. } => {
                write!(f, "Index out of range. Range: {}, Index: {}.", range, index)
            }
            NegativeIndex { .. } => f.write_str("Negative index provided."),
            IndexEqualsRange { range, index } => write!(
                f,
                "Index equals range. Range: {}, Index: {}. Result is nil.",
                range, index
            ),
            ReturningNil => f.write_str("Returning nil."),
            ReturningEmptyArray => f.write_str("Returning empty array."),
            NegativeSize { .. } => f.write_str("Negative size provided."),
            ArrayRecursion => f.write_str("Array recursion detected. An array cannot contain itself."),
            InfoMessage { source, message } => write!(f, "[{}] {}", source, message),
            SuspensionDisabled => f.write_str("Suspension is disabled for this VM."),
            SuspensionInUnscheduledEnvironment => {
                f.write_str("Cannot suspend in unscheduled environment.")
            }
            ReturningConfigNull => f.write_str("Returning configNull."),
            AssertFailed => f.write_str("Assert failed."),
            StartIndexExceedsToIndex { from, to, .. } => write!(
                f,
                "Start index exceeds end index. From: {}, To: {}.",
                from, to
            ),
            MagicVariableTypeMismatch { variable, expected, got } => write!(
                f,
                "Magic variable '{}' has wrong type. Expected {}, got {}.",
                variable,
                join_types(expected),
                got
            ),
            ScriptHandleAlreadyTerminated => f.write_str("Script handle was already terminated."),
            ScriptHandleAlreadyFinished => f.write_str("Script handle has already finished."),
            ExtensionLoaded { name, version } => {
                write!(f, "Extension '{}' loaded. Version: {}", name, version)
            }
            ExtensionNotTerminatingVersionString { name } => write!(
                f,
                "Extension '{}' did not terminate its version string. Output was truncated.",
                name
            ),
            ExtensionNotTerminatingCallExtensionBufferString { name } => write!(
                f,
                "Extension '{}' did not terminate its output buffer. Output was truncated.",
                name
            ),
            ExtensionNotTerminatingCallExtensionArgBufferString { name } => write!(
                f,
                "Extension '{}' did not terminate its argument call output buffer. Output was truncated.",
                name
            ),
            LibraryNameContainsPath { name } => write!(
                f,
                "Library name '{}' contains a path. Loading anyway.",
                name
            ),
            ReturningEmptyString => f.write_str("Returning empty string."),
            ExtensionRuntimeError { name, what } => {
                write!(f, "Extension '{}' raised an error: {}", name, what)
            }
            FileNotFound { filename } => write!(f, "File '{}' not found.", filename),
            ScopeNameAlreadySet => f.write_str("Scope name was already set."),
            ScriptNameAlreadySet => f.write_str("Script name was already set."),
            ReturningEmptyScriptHandle => f.write_str("Returning empty script handle."),
            ReturningErrorCode { error_code } => write!(f, "Returning error code {}.", error_code),
            ExpectedSubArrayTypeMismatch { position, expected, got, .. } => {
                let path: Vec<String> = position.iter().map(|p| p.to_string()).collect();
                write!(
                    f,
                    "Sub-array element type mismatch at [{}]. Expected {}, got {}.",
                    path.join(","),
                    join_types(expected),
                    got
                )
            }
            ErrorMessage { source, message } => write!(f, "[{}] {}", source, message),
            FileSystemDisabled => f.write_str("File system access is disabled."),
            NetworkingDisabled => f.write_str("Networking is disabled."),
            AlreadyConnected => f.write_str("Already connected."),
            NetworkingFormatMismatch { provided } => write!(
                f,
                "Invalid network target '{}'. Expected 'host:port'.",
                provided
            ),
            FailedToEstablishConnection => f.write_str("Failed to establish connection."),
            ExpectedArrayToHaveElements { .. } => f.write_str("Expected array to have elements."),
            ClipboardDisabled => f.write_str("Clipboard access is disabled."),
            FailedToCopyToClipboard => f.write_str("Failed to copy to clipboard."),
            FormatInvalidPlaceholder { placeholder, index } => write!(
                f,
                "Invalid format placeholder '{}' at index {}.",
                placeholder, index
            ),
            ZeroDivisor => f.write_str("Division by zero."),
            MarkerNotExisting { marker } => write!(f, "Marker '{}' does not exist.", marker),
            ReturningDefaultArray { size } => write!(f, "Returning default array of size {}.", size),
            ReturningScalarZero => f.write_str("Returning scalar zero."),
            ExpectedNonNullValue { .. } => f.write_str("Expected non-null value."),
            ConfigEntryNotFound { path, name, .. } => {
                write!(f, "Config entry '{}' not found in '{}'.", name, path.join(" >> "))
            }
            ExpectedVehicle { .. } => f.write_str("Expected vehicle."),
            ExpectedUnit { .. } => f.write_str("Expected unit."),
            ReturningFalse => f.write_str("Returning false."),
            MarkerAlreadyExisting { marker } => write!(f, "Marker '{}' already exists.", marker),
            InvalidMarkerShape { shape } => write!(f, "Invalid marker shape '{}'.", shape),
            TypeMismatch { expected, got, .. } => write!(
                f,
                "Type mismatch. Expected {}, got {}.",
                join_types(expected),
                got
            ),
            VariableNotFound { variable } => write!(f, "Variable '{}' not found.", variable),
            StackCorruptionMissingValues { expected, got } => write!(
                f,
                "Stack corruption. Expected {} values, found {}.",
                expected, got
            ),
            NoValueFoundForRightArgument { operator, .. } => {
                write!(f, "No value found for right argument of '{}'.", operator)
            }
            NoValueFoundForLeftArgument { operator, .. } => {
                write!(f, "No value found for left argument of '{}'.", operator)
            }
            UnknownInputTypeCombinationBinary { operator, left, right } => match left {
                Some(left) => write!(
                    f,
                    "Unknown input type combination for '{}'. Left: {}, Right: {}.",
                    operator, left, right
                ),
                None => write!(
                    f,
                    "Unknown input type combination for '{}'. Right: {}.",
                    operator, right
                ),
            },
            FoundNoValue => f.write_str("Found no value."),
            CallstackFoundNoValue { callstack, .. } => {
                write!(f, "Callstack '{}' found no value.", callstack)
            }
            GroupNotEmpty { group } => write!(f, "Group '{}' is not empty.", group),
            ForStepVariableTypeMismatch { variable, expected, got } => write!(
                f,
                "Loop variable '{}' changed type. Expected {}, got {}.",
                variable, expected, got
            ),
            ForStepNoWorkShouldBeDone { step, from, to } => write!(
                f,
                "For-loop does no work. Step: {}, From: {}, To: {}.",
                step, from, to
            ),
        }
    }
}
