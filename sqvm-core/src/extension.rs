//! # Extensões nativas
//!
//! Uma extensão é carregada por nome através de um [`ExtensionLoader`]
//! fornecido pelo host e chamada por um protocolo de buffer limitado: a
//! extensão escreve texto terminado em NUL em `out`.
//!
//! - nome com separador de caminho → `LibraryNameContainsPath` (warning, carrega mesmo assim)
//! - buffer sem terminador → warning, saída truncada ao tamanho do buffer
//! - panic dentro da extensão → `ExtensionRuntimeError`, nunca atravessa a VM

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::diagnostics::RuntimeFault;
use crate::fault::{Checked, Diagnostics};

/// Lado nativo do protocolo
pub trait Extension {
    /// Escreve a versão terminada em NUL em `out`.
    fn version(&mut self, out: &mut [u8]);

    /// `"ext" callExtension "function"`
    fn call(&mut self, function: &str, out: &mut [u8]);

    /// `"ext" callExtension ["function", [args]]`; o retorno é o código de erro
    fn call_args(&mut self, function: &str, args: &[String], out: &mut [u8]) -> i32;
}

pub trait ExtensionLoader {
    /// `None` quando nenhuma biblioteca responde por `name`
    fn load(&mut self, name: &str) -> Option<Box<dyn Extension>>;
}

impl<F> ExtensionLoader for F
where
    F: FnMut(&str) -> Option<Box<dyn Extension>>,
{
    fn load(&mut self, name: &str) -> Option<Box<dyn Extension>> {
        self(name)
    }
}

/// Copia `text` para `out` com terminador, truncando se não couber.
pub fn write_output(out: &mut [u8], text: &str) {
    let Some(room) = out.len().checked_sub(1) else {
        return;
    };
    let bytes = text.as_bytes();
    let n = bytes.len().min(room);
    out[..n].copy_from_slice(&bytes[..n]);
    out[n] = 0;
}

/// Texto até o primeiro NUL; `false` se não houver nenhum.
fn read_output(out: &[u8]) -> (String, bool) {
    match out.iter().position(|b| *b == 0) {
        Some(end) => (String::from_utf8_lossy(&out[..end]).into_owned(), true),
        None => (String::from_utf8_lossy(out).into_owned(), false),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

struct Loaded {
    library: Box<dyn Extension>,
    version: String,
}

pub struct ExtensionRegistry {
    loader: Option<Box<dyn ExtensionLoader>>,
    loaded: HashMap<String, Loaded>,
    buffer_size: usize,
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.loaded.keys().collect();
        names.sort();
        f.debug_struct("ExtensionRegistry")
            .field("loaded", &names)
            .field("buffer_size", &self.buffer_size)
            .field("has_loader", &self.loader.is_some())
            .finish()
    }
}

impl ExtensionRegistry {
    pub fn new(buffer_size: usize) -> Self {
        Self { loader: None, loaded: HashMap::new(), buffer_size: buffer_size.max(1) }
    }

    pub fn set_loader(&mut self, loader: impl ExtensionLoader + 'static) {
        self.loader = Some(Box::new(loader));
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.contains_key(name)
    }

    pub fn version(&self, name: &str) -> Option<&str> {
        self.loaded.get(name).map(|l| l.version.as_str())
    }

    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }

    /// Carrega `name` uma vez e diz se ficou disponível.
    pub fn load<D: Diagnostics + ?Sized>(&mut self, d: &mut D, name: &str) -> Checked<bool> {
        if self.loaded.contains_key(name) {
            return Ok(true);
        }
        if name.contains(['/', '\\']) {
            d.raise(RuntimeFault::LibraryNameContainsPath { name: name.to_string() })?;
        }
        let library = self.loader.as_mut().and_then(|loader| loader.load(name));
        let Some(mut library) = library else {
            d.raise(RuntimeFault::FileNotFound { filename: name.to_string() })?;
            return Ok(false);
        };

        let mut out = vec![0u8; self.buffer_size];
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| library.version(&mut out))) {
            let what = panic_message(payload);
            d.raise(RuntimeFault::ExtensionRuntimeError { name: name.to_string(), what })?;
            return Ok(false);
        }
        let (version, terminated) = read_output(&out);
        if !terminated {
            d.raise(RuntimeFault::ExtensionNotTerminatingVersionString { name: name.to_string() })?;
        }
        d.note(RuntimeFault::ExtensionLoaded { name: name.to_string(), version: version.clone() });
        self.loaded.insert(name.to_string(), Loaded { library, version });
        Ok(true)
    }

    /// `callExtension` com uma função simples. Falhas dão `""`.
    pub fn call<D: Diagnostics + ?Sized>(&mut self, d: &mut D, name: &str, function: &str) -> Checked<String> {
        if !self.load(d, name)? {
            return Ok(String::new());
        }
        let mut out = vec![0u8; self.buffer_size];
        let Some(loaded) = self.loaded.get_mut(name) else {
            return Ok(String::new());
        };
        let outcome = catch_unwind(AssertUnwindSafe(|| loaded.library.call(function, &mut out)));
        if let Err(payload) = outcome {
            let what = panic_message(payload);
            d.raise(RuntimeFault::ExtensionRuntimeError { name: name.to_string(), what })?;
            return Ok(String::new());
        }
        let (text, terminated) = read_output(&out);
        if !terminated {
            d.raise(RuntimeFault::ExtensionNotTerminatingCallExtensionBufferString { name: name.to_string() })?;
        }
        Ok(text)
    }

    /// `callExtension` com argumentos: `(saída, código de erro)`. Falhas dão `("", 0)`.
    pub fn call_args<D: Diagnostics + ?Sized>(
        &mut self,
        d: &mut D,
        name: &str,
        function: &str,
        args: &[String],
    ) -> Checked<(String, i32)> {
        if !self.load(d, name)? {
            return Ok((String::new(), 0));
        }
        let mut out = vec![0u8; self.buffer_size];
        let Some(loaded) = self.loaded.get_mut(name) else {
            return Ok((String::new(), 0));
        };
        let outcome = catch_unwind(AssertUnwindSafe(|| loaded.library.call_args(function, args, &mut out)));
        let code = match outcome {
            Ok(code) => code,
            Err(payload) => {
                let what = panic_message(payload);
                d.raise(RuntimeFault::ExtensionRuntimeError { name: name.to_string(), what })?;
                return Ok((String::new(), 0));
            }
        };
        let (text, terminated) = read_output(&out);
        if !terminated {
            d.raise(RuntimeFault::ExtensionNotTerminatingCallExtensionArgBufferString {
                name: name.to_string(),
            })?;
        }
        Ok((text, code))
    }
}
