//! Eventos de diagnóstico e as famílias de mensagens que carregam.

use std::fmt;

use super::frontend::{AssemblyMessage, ConfigMessage, LintingMessage, PreprocessorMessage, ScriptMessage};
use super::location::LocationInfo;
use super::runtime::RuntimeFault;
use super::Severity;

/// Metadados fixos de um tipo de mensagem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultMeta {
    pub name: &'static str,
    pub severity: Severity,
    pub code: u32,
}

impl FaultMeta {
    pub const fn new(name: &'static str, severity: Severity, code: u32) -> Self {
        Self { name, severity, code }
    }
}

/// Uma mensagem de qualquer subsistema
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Preprocessor(PreprocessorMessage),
    Assembly(AssemblyMessage),
    Script(ScriptMessage),
    Config(ConfigMessage),
    Linting(LintingMessage),
    Runtime(RuntimeFault),
}

impl Message {
    pub fn meta(&self) -> FaultMeta {
        match self {
            Message::Preprocessor(m) => m.meta(),
            Message::Assembly(m) => m.meta(),
            Message::Script(m) => m.meta(),
            Message::Config(m) => m.meta(),
            Message::Linting(m) => m.meta(),
            Message::Runtime(m) => m.meta(),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Preprocessor(m) => m.fmt(f),
            Message::Assembly(m) => m.fmt(f),
            Message::Script(m) => m.fmt(f),
            Message::Config(m) => m.fmt(f),
            Message::Linting(m) => m.fmt(f),
            Message::Runtime(m) => m.fmt(f),
        }
    }
}

macro_rules! impl_into_message {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Message {
                fn from(m: $ty) -> Self {
                    Message::$variant(m)
                }
            }
        )*
    };
}

impl_into_message! {
    PreprocessorMessage => Preprocessor,
    AssemblyMessage => Assembly,
    ScriptMessage => Script,
    ConfigMessage => Config,
    LintingMessage => Linting,
    RuntimeFault => Runtime,
}

/// Registro imutável de uma anomalia. A mensagem só é formatada quando
/// [`DiagnosticEvent::format_message`] ou [`DiagnosticEvent::render`] é chamado.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticEvent {
    message: Message,
    location: LocationInfo,
}

impl DiagnosticEvent {
    pub fn new(message: impl Into<Message>, location: LocationInfo) -> Self {
        Self { message: message.into(), location }
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn location(&self) -> &LocationInfo {
        &self.location
    }

    pub fn name(&self) -> &'static str {
        self.message.meta().name
    }

    pub fn severity(&self) -> Severity {
        self.message.meta().severity
    }

    pub fn code(&self) -> u32 {
        self.message.meta().code
    }

    /// Texto da mensagem em uma linha, sem prefixos
    pub fn format_message(&self) -> String {
        self.message.to_string()
    }

    /// `[ERR][path][L1|C2] [60009] text`
    pub fn render(&self) -> String {
        format!(
            "{}{} [{}] {}",
            self.severity().tag(),
            self.location.format(),
            self.code(),
            self.format_message()
        )
    }
}
