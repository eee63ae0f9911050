//! # Config tree
//!
//! Árvore hierárquica de classes endereçada por caminho (`CfgVehicles >> Car >> maxSpeed`).
//! Nomes de classes e entradas são comparados sem diferenciar maiúsculas, mas
//! guardam a grafia original para `configName`.
//!
//! Valores de script apontam para nós por [`ConfigRef`], que guarda apenas o
//! caminho: a árvore pertence à VM e pode ser trocada pelo host.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::diagnostics::RuntimeFault;
use crate::fault::{Checked, Diagnostics, Strength};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Number(f64),
    Text(String),
    Array(Vec<ConfigValue>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigEntry {
    Class(ConfigClass),
    Value(ConfigValue),
}

impl ConfigEntry {
    pub fn as_class(&self) -> Option<&ConfigClass> {
        match self {
            ConfigEntry::Class(c) => Some(c),
            ConfigEntry::Value(_) => None,
        }
    }

    pub fn as_value(&self) -> Option<&ConfigValue> {
        match self {
            ConfigEntry::Value(v) => Some(v),
            ConfigEntry::Class(_) => None,
        }
    }
}

/// Classe com entradas em ordem de declaração
///
/// `parent` nomeia uma classe irmã (`class Car: LandVehicle`); só `isKindOf`
/// segue essa ligação.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigClass {
    entries: Vec<(String, ConfigEntry)>,
    parent: Option<String>,
}

impl ConfigClass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&ConfigEntry> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, entry)| entry)
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut ConfigEntry> {
        self.entries
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, entry)| entry)
    }

    /// Grafia declarada
    pub fn key_of(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(key, _)| key.as_str())
    }

    /// Insere ou substitui uma entrada, mantendo a posição original.
    pub fn insert(&mut self, name: impl Into<String>, entry: ConfigEntry) {
        let name = name.into();
        match self.get_mut(&name) {
            Some(existing) => *existing = entry,
            None => self.entries.push((name, entry)),
        }
    }

    pub fn with_class(mut self, name: impl Into<String>, class: ConfigClass) -> Self {
        self.insert(name, ConfigEntry::Class(class));
        self
    }

    pub fn with_value(mut self, name: impl Into<String>, value: ConfigValue) -> Self {
        self.insert(name, ConfigEntry::Value(value));
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn set_parent(&mut self, parent: impl Into<String>) {
        self.parent = Some(parent.into());
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &ConfigEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigTree {
    root: ConfigClass,
}

impl ConfigTree {
    pub fn new(root: ConfigClass) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &ConfigClass {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut ConfigClass {
        &mut self.root
    }

    /// Resolve `path` a partir da raiz. Caminho vazio é a própria raiz.
    pub fn lookup<S: AsRef<str>>(&self, path: &[S]) -> Option<ConfigEntryRef<'_>> {
        let mut class = &self.root;
        let Some((last, parents)) = path.split_last() else {
            return Some(ConfigEntryRef::Class(class));
        };
        for segment in parents {
            class = class.get(segment.as_ref())?.as_class()?;
        }
        match class.get(last.as_ref())? {
            ConfigEntry::Class(c) => Some(ConfigEntryRef::Class(c)),
            ConfigEntry::Value(v) => Some(ConfigEntryRef::Value(v)),
        }
    }

    /// Lookup que reporta `ConfigEntryNotFound` no primeiro segmento ausente.
    ///
    /// A forma fraca devolve `Ok(None)`; a forte aborta a instrução.
    pub fn lookup_checked<'t, D, S>(
        &'t self,
        d: &mut D,
        path: &[S],
        strength: Strength,
    ) -> Checked<Option<ConfigEntryRef<'t>>>
    where
        D: Diagnostics + ?Sized,
        S: AsRef<str>,
    {
        let mut class = &self.root;
        for (depth, segment) in path.iter().enumerate() {
            let found = class.get(segment.as_ref());
            let last = depth + 1 == path.len();
            match found {
                Some(ConfigEntry::Class(c)) if !last => class = c,
                Some(ConfigEntry::Class(c)) => return Ok(Some(ConfigEntryRef::Class(c))),
                Some(ConfigEntry::Value(v)) if last => return Ok(Some(ConfigEntryRef::Value(v))),
                _ => {
                    let walked = path[..depth].iter().map(|s| s.as_ref().to_string()).collect();
                    return d.recover(
                        RuntimeFault::ConfigEntryNotFound {
                            path: walked,
                            name: segment.as_ref().to_string(),
                            strength,
                        },
                        None,
                    );
                }
            }
        }
        Ok(Some(ConfigEntryRef::Class(class)))
    }

    /// `class_name` é `base` ou herda dela dentro de `container`?
    ///
    /// `None` se o container ou a classe não existem. Um pai que não resolve
    /// encerra a busca.
    pub fn is_kind_of<S: AsRef<str>>(&self, container: &[S], class_name: &str, base: &str) -> Option<bool> {
        let Some(ConfigEntryRef::Class(container)) = self.lookup(container) else {
            return None;
        };
        let mut current = container.get(class_name)?.as_class()?;
        let mut name = container.key_of(class_name)?;
        // uma cadeia sem ciclo visita cada classe no máximo uma vez
        for _ in 0..=container.len() {
            if name.eq_ignore_ascii_case(base) {
                return Some(true);
            }
            let Some(parent) = current.parent() else {
                return Some(false);
            };
            match container.get(parent).and_then(ConfigEntry::as_class) {
                Some(next) => {
                    current = next;
                    name = parent;
                }
                None => return Some(parent.eq_ignore_ascii_case(base)),
            }
        }
        Some(false)
    }

    /// Grafia canônica de cada segmento; `None` se o caminho não resolve
    pub fn canonical_path<S: AsRef<str>>(&self, path: &[S]) -> Option<Vec<String>> {
        let mut class = &self.root;
        let mut out = Vec::with_capacity(path.len());
        for (depth, segment) in path.iter().enumerate() {
            out.push(class.key_of(segment.as_ref())?.to_string());
            if depth + 1 < path.len() {
                class = class.get(segment.as_ref())?.as_class()?;
            }
        }
        Some(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigEntryRef<'t> {
    Class(&'t ConfigClass),
    Value(&'t ConfigValue),
}

// ═══════════════════════════════════════════════════════════════════════════
// CONFIG REF (valor de script)
// ═══════════════════════════════════════════════════════════════════════════

/// Caminho para um nó; `path == None` é `configNull`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigRef {
    path: Option<Rc<[Rc<str>]>>,
}

impl ConfigRef {
    pub fn null() -> Self {
        Self { path: None }
    }

    /// `configFile`
    pub fn root() -> Self {
        Self { path: Some(Rc::from(Vec::<Rc<str>>::new())) }
    }

    pub fn from_path(segments: Vec<String>) -> Self {
        let path: Vec<Rc<str>> = segments.into_iter().map(Rc::from).collect();
        Self { path: Some(Rc::from(path)) }
    }

    pub fn is_null(&self) -> bool {
        self.path.is_none()
    }

    pub fn segments(&self) -> Option<&[Rc<str>]> {
        self.path.as_deref()
    }

    /// Estende o caminho em um segmento. Nulo continua nulo.
    pub fn child(&self, name: &str) -> Self {
        match &self.path {
            Some(path) => {
                let mut next: Vec<Rc<str>> = path.to_vec();
                next.push(Rc::from(name));
                Self { path: Some(Rc::from(next)) }
            }
            None => Self::null(),
        }
    }

    /// Último segmento; vazio para a raiz e para o nulo
    pub fn name(&self) -> &str {
        self.path.as_deref().and_then(<[_]>::last).map(|s| &**s).unwrap_or("")
    }
}

impl fmt::Display for ConfigRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            None => f.write_str("<NULL-config>"),
            Some(path) if path.is_empty() => f.write_str("bin\\config.bin"),
            Some(path) => {
                let joined: Vec<&str> = path.iter().map(|s| &**s).collect();
                write!(f, "bin\\config.bin/{}", joined.join("/"))
            }
        }
    }
}
