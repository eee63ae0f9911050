//! # Política de falhas
//!
//! Toda operação verificada passa por aqui: emite o evento (respeitando os
//! níveis habilitados) e decide o desfecho a partir da severidade do tipo.
//!
//! | Severidade | Desfecho |
//! |---|---|
//! | fatal | aborta o handle inteiro ([`Abort::Handle`]) |
//! | error | aborta a instrução corrente ([`Abort::Statement`]) |
//! | warning e abaixo | continua com o fallback |
//!
//! A habilitação de um nível nunca muda o desfecho.

use crate::diagnostics::{DiagnosticEvent, LocationInfo, Logger, Message, RuntimeFault, Severity, SizeExpectation};
use crate::value::{Value, ValueType};

/// Qual forma de uma condição o ponto de chamada usa
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strength {
    Strong,
    Weak,
}

impl Strength {
    #[inline]
    pub fn pick<T>(self, strong: T, weak: T) -> T {
        match self {
            Strength::Strong => strong,
            Strength::Weak => weak,
        }
    }
}

/// Sinal de aborto propagado com `?`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Abort {
    /// A instrução corrente avalia para Nil; o script continua
    Statement,
    /// O handle é terminado
    Handle,
}

impl Abort {
    pub fn for_severity(severity: Severity) -> Option<Abort> {
        match severity {
            Severity::Fatal => Some(Abort::Handle),
            Severity::Error => Some(Abort::Statement),
            _ => None,
        }
    }
}

pub type Checked<T> = Result<T, Abort>;

/// Tudo que sabe onde está e tem um logger
pub trait Diagnostics {
    fn location(&self) -> LocationInfo;
    fn logger(&mut self) -> &mut Logger;

    /// Emite a mensagem e devolve a severidade.
    fn emit(&mut self, message: impl Into<Message>) -> Severity {
        let event = DiagnosticEvent::new(message, self.location());
        let severity = event.severity();
        self.logger().emit(&event);
        severity
    }

    /// Emite e converte a severidade em desfecho.
    fn raise(&mut self, message: impl Into<Message>) -> Checked<()> {
        match Abort::for_severity(self.emit(message)) {
            Some(abort) => Err(abort),
            None => Ok(()),
        }
    }

    /// Weak faults yield `fallback`; strong ones abort.
    fn recover<T>(&mut self, message: impl Into<Message>, fallback: T) -> Checked<T> {
        self.raise(message).map(|()| fallback)
    }

    /// Para mensagens que nunca abortam (follow-ups verbose, info).
    fn note(&mut self, message: impl Into<Message>) {
        self.emit(message);
    }
}

/// Diagnostics sobre um logger emprestado, numa localização fixa
pub struct Reporter<'a> {
    logger: &'a mut Logger,
    location: LocationInfo,
}

impl<'a> Reporter<'a> {
    pub fn new(logger: &'a mut Logger, location: LocationInfo) -> Self {
        Self { logger, location }
    }
}

impl Diagnostics for Reporter<'_> {
    fn location(&self) -> LocationInfo {
        self.location.clone()
    }

    fn logger(&mut self) -> &mut Logger {
        &mut *self.logger
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// ARRAY SHAPE CHECKS
// ═══════════════════════════════════════════════════════════════════════════
//
// `Ok(true)` = forma válida, `Ok(false)` = violação fraca (use o fallback),
// `Err(_)` = violação forte.

pub fn expect_size<D: Diagnostics + ?Sized>(
    d: &mut D,
    items: &[Value],
    expected: usize,
    strength: Strength,
) -> Checked<bool> {
    if items.len() == expected {
        return Ok(true);
    }
    d.recover(
        RuntimeFault::ExpectedArraySizeMismatch {
            expected: SizeExpectation::Exact(expected),
            got: items.len(),
            strength,
        },
        false,
    )
}

pub fn expect_size_range<D: Diagnostics + ?Sized>(
    d: &mut D,
    items: &[Value],
    min: usize,
    max: usize,
    strength: Strength,
) -> Checked<bool> {
    if (min..=max).contains(&items.len()) {
        return Ok(true);
    }
    d.recover(
        RuntimeFault::ExpectedArraySizeMismatch {
            expected: SizeExpectation::Range { min, max },
            got: items.len(),
            strength,
        },
        false,
    )
}

pub fn expect_min_size<D: Diagnostics + ?Sized>(
    d: &mut D,
    items: &[Value],
    min: usize,
    strength: Strength,
) -> Checked<bool> {
    if items.len() >= min {
        return Ok(true);
    }
    d.recover(
        RuntimeFault::ExpectedMinimumArraySizeMismatch { expected: min, got: items.len(), strength },
        false,
    )
}

pub fn expect_not_empty<D: Diagnostics + ?Sized>(
    d: &mut D,
    items: &[Value],
    strength: Strength,
) -> Checked<bool> {
    if !items.is_empty() {
        return Ok(true);
    }
    d.recover(RuntimeFault::ExpectedArrayToHaveElements { strength }, false)
}

/// Confere `items[i]` contra `types[i]` em toda posição presente nos dois.
pub fn expect_types<D: Diagnostics + ?Sized>(
    d: &mut D,
    items: &[Value],
    types: &[ValueType],
    strength: Strength,
) -> Checked<bool> {
    for (position, (item, expected)) in items.iter().zip(types).enumerate() {
        let got = item.value_type();
        if !expected.accepts(got) {
            return d.recover(
                RuntimeFault::ExpectedArrayTypeMismatch {
                    position,
                    expected: vec![*expected],
                    got,
                    strength,
                },
                false,
            );
        }
    }
    Ok(true)
}

/// Exatamente `count` elementos, todos do tipo `ty`.
pub fn expect_uniform<D: Diagnostics + ?Sized>(
    d: &mut D,
    items: &[Value],
    ty: ValueType,
    count: usize,
    strength: Strength,
) -> Checked<bool> {
    if !expect_size(d, items, count, strength)? {
        return Ok(false);
    }
    let types = vec![ty; count];
    expect_types(d, items, &types, strength)
}

/// Tipo de um elemento dentro de array aninhado, reportado com o caminho completo.
pub fn expect_sub_type<D: Diagnostics + ?Sized>(
    d: &mut D,
    path: &[usize],
    item: &Value,
    expected: &[ValueType],
    strength: Strength,
) -> Checked<bool> {
    let got = item.value_type();
    if expected.iter().any(|t| t.accepts(got)) {
        return Ok(true);
    }
    d.recover(
        RuntimeFault::ExpectedSubArrayTypeMismatch {
            position: path.to_vec(),
            expected: expected.to_vec(),
            got,
            strength,
        },
        false,
    )
}

/// Valida um índice de leitura sobre `len` elementos.
///
/// Índice igual ao tamanho é sempre um warning com resultado `None`.
pub fn expect_index<D: Diagnostics + ?Sized>(
    d: &mut D,
    len: usize,
    index: f64,
    strength: Strength,
) -> Checked<Option<usize>> {
    if index < 0.0 {
        return d.recover(RuntimeFault::NegativeIndex { strength }, None);
    }
    let index = index.floor() as usize;
    if index < len {
        Ok(Some(index))
    } else if index == len {
        d.recover(RuntimeFault::IndexEqualsRange { range: len, index }, None)
    } else {
        d.recover(RuntimeFault::IndexOutOfRange { range: len, index, strength }, None)
    }
}
