//! # 📣 Diagnostics: pipeline de eventos
//!
//! Cada anomalia detectada pela VM (ou pelos estágios de compilação externos)
//! vira um [`DiagnosticEvent`]: severidade, código estável, localização e uma
//! mensagem renderizada sob demanda.
//!
//! ```text
//! RuntimeFault / FrontendMessage
//!        │  (meta: nome, severidade, código)
//!        ▼
//! DiagnosticEvent ──► Logger ──(nível habilitado?)──► LogSink
//! ```
//!
//! A habilitação de níveis afeta apenas a observabilidade, nunca o fluxo
//! de controle (abortar/continuar é decidido pela política de falhas).

pub mod event;
pub mod frontend;
pub mod location;
pub mod runtime;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use event::{DiagnosticEvent, Message};
pub use frontend::{AssemblyMessage, ConfigMessage, LintingMessage, PreprocessorMessage, ScriptMessage};
pub use location::{LocationInfo, PositionMarker, PreprocessedFile, SyntaxNode};
pub use runtime::{RuntimeFault, SizeExpectation};

/// Nível de severidade, em ordem crescente
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Trace,
    Verbose,
    Info,
    Warning,
    Error,
    Fatal,
}

impl Severity {
    pub const ALL: [Severity; 6] = [
        Severity::Trace,
        Severity::Verbose,
        Severity::Info,
        Severity::Warning,
        Severity::Error,
        Severity::Fatal,
    ];

    /// Rótulo de largura fixa que abre cada linha renderizada
    pub fn tag(self) -> &'static str {
        match self {
            Severity::Fatal => "[FAT]",
            Severity::Error => "[ERR]",
            Severity::Warning => "[WRN]",
            Severity::Info => "[INF]",
            Severity::Verbose => "[VBS]",
            Severity::Trace => "[TRC]",
        }
    }

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Trace => "trace",
            Severity::Verbose => "verbose",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        };
        f.write_str(name)
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Severity::Trace),
            "verbose" => Ok(Severity::Verbose),
            "info" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            "fatal" => Ok(Severity::Fatal),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

/// Um bit de habilitação por severidade. Padrão: todos habilitados.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLevels {
    enabled: [bool; 6],
}

impl Default for LogLevels {
    fn default() -> Self {
        Self { enabled: [true; 6] }
    }
}

impl LogLevels {
    /// Habilita `minimum` e tudo acima dele
    pub fn from_minimum(minimum: Severity) -> Self {
        let mut levels = Self { enabled: [false; 6] };
        for severity in Severity::ALL {
            levels.enabled[severity.index()] = severity >= minimum;
        }
        levels
    }

    pub fn is_enabled(&self, severity: Severity) -> bool {
        self.enabled[severity.index()]
    }

    pub fn set_enabled(&mut self, severity: Severity, enabled: bool) {
        self.enabled[severity.index()] = enabled;
    }
}

/// Destino final das mensagens renderizadas
pub trait LogSink {
    fn log(&mut self, severity: Severity, message: &str);
}

/// Descarta tudo
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl LogSink for NullSink {
    fn log(&mut self, _severity: Severity, _message: &str) {}
}

/// Uma linha que chegou a um [`MemorySink`].
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub severity: Severity,
    pub message: String,
}

/// Sink em memória; clones compartilham o mesmo buffer
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    records: Rc<RefCell<Vec<LogRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.borrow().clone()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.records.borrow().iter().filter(|r| r.severity == severity).count()
    }

    /// Quantos registros trazem o código `[code]`
    pub fn count_code(&self, code: u32) -> usize {
        let needle = format!("[{}]", code);
        self.records.borrow().iter().filter(|r| r.message.contains(&needle)).count()
    }

    pub fn contains(&self, fragment: &str) -> bool {
        self.records.borrow().iter().any(|r| r.message.contains(fragment))
    }

    pub fn clear(&self) {
        self.records.borrow_mut().clear();
    }
}

impl LogSink for MemorySink {
    fn log(&mut self, severity: Severity, message: &str) {
        self.records.borrow_mut().push(LogRecord { severity, message: message.to_string() });
    }
}

/// Logger mínimo: bits de habilitação + um sink
pub struct Logger {
    levels: LogLevels,
    sink: Box<dyn LogSink>,
    emitted: [u64; 6],
}

impl Logger {
    pub fn new(sink: impl LogSink + 'static) -> Self {
        Self { levels: LogLevels::default(), sink: Box::new(sink), emitted: [0; 6] }
    }

    pub fn silent() -> Self {
        Self::new(NullSink)
    }

    pub fn with_levels(mut self, levels: LogLevels) -> Self {
        self.levels = levels;
        self
    }

    pub fn levels(&self) -> LogLevels {
        self.levels
    }

    pub fn set_levels(&mut self, levels: LogLevels) {
        self.levels = levels;
    }

    pub fn is_enabled(&self, severity: Severity) -> bool {
        self.levels.is_enabled(severity)
    }

    pub fn set_enabled(&mut self, severity: Severity, enabled: bool) {
        self.levels.set_enabled(severity, enabled);
    }

    /// Escreve texto cru se o nível estiver habilitado.
    pub fn log(&mut self, severity: Severity, message: &str) {
        if self.is_enabled(severity) {
            self.emitted[severity.index()] += 1;
            self.sink.log(severity, message);
        }
    }

    /// Renderiza e escreve um evento; só formata para níveis habilitados.
    pub fn emit(&mut self, event: &DiagnosticEvent) {
        let severity = event.severity();
        if self.is_enabled(severity) {
            let text = event.render();
            self.log(severity, &text);
        }
    }

    /// Quantas mensagens deste nível chegaram ao sink
    pub fn emitted(&self, severity: Severity) -> u64 {
        self.emitted[severity.index()]
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("levels", &self.levels)
            .field("emitted", &self.emitted)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order() {
        assert!(Severity::Trace < Severity::Verbose);
        assert!(Severity::Verbose < Severity::Info);
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Fatal);
    }

    #[test]
    fn test_severity_tags() {
        assert_eq!(Severity::Fatal.tag(), "[FAT]");
        assert_eq!(Severity::Verbose.tag(), "[VBS]");
        assert_eq!("warn".parse::<Severity>(), Ok(Severity::Warning));
        assert!("loud".parse::<Severity>().is_err());
    }

    #[test]
    fn test_levels_from_minimum() {
        let levels = LogLevels::from_minimum(Severity::Warning);
        assert!(!levels.is_enabled(Severity::Info));
        assert!(levels.is_enabled(Severity::Warning));
        assert!(levels.is_enabled(Severity::Fatal));
    }

    #[test]
    fn test_disabled_level_is_not_forwarded() {
        let sink = MemorySink::new();
        let mut logger = Logger::new(sink.clone());
        logger.set_enabled(Severity::Info, false);
        logger.log(Severity::Info, "hidden");
        logger.log(Severity::Warning, "shown");
        assert_eq!(sink.records().len(), 1);
        assert_eq!(logger.emitted(Severity::Info), 0);
        assert_eq!(logger.emitted(Severity::Warning), 1);
    }
}
