//! # Escopos de variáveis
//!
//! Arena de frames endereçados por [`FrameId`]. O frame global é o índice 0,
//! pertence à VM e é compartilhado por todos os handles. Frames locais formam
//! cadeias (`parent`) que nunca incluem o global.
//!
//! Resolução:
//! - nomes com `_` (privados) só existem na cadeia local;
//! - os demais procuram primeiro na cadeia local (sombreamento) e depois no global.

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::ScopeError;
use crate::value::Value;

pub const PRIVATE_MARKER: char = '_';

#[inline]
pub fn is_private(name: &str) -> bool {
    name.starts_with(PRIVATE_MARKER)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(usize);

impl FrameId {
    pub const GLOBAL: FrameId = FrameId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct ScopeFrame {
    parent: Option<FrameId>,
    name: Option<Rc<str>>,
    variables: HashMap<Rc<str>, Value>,
}

impl ScopeFrame {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

#[derive(Debug)]
pub struct Scopes {
    global: ScopeFrame,
    /// `FrameId(n)` vive em `locals[n - 1]`
    locals: Vec<Option<ScopeFrame>>,
    free: Vec<usize>,
}

impl Default for Scopes {
    fn default() -> Self {
        Self::new()
    }
}

impl Scopes {
    pub fn new() -> Self {
        Self { global: ScopeFrame::default(), locals: Vec::new(), free: Vec::new() }
    }

    pub fn global(&self) -> &ScopeFrame {
        &self.global
    }

    /// Abre um frame local. Pai `GLOBAL` conta como "sem pai".
    pub fn push_frame(&mut self, parent: Option<FrameId>) -> FrameId {
        let parent = parent.filter(|p| *p != FrameId::GLOBAL);
        let frame = ScopeFrame { parent, ..ScopeFrame::default() };
        match self.free.pop() {
            Some(slot) => {
                self.locals[slot] = Some(frame);
                FrameId(slot + 1)
            }
            None => {
                self.locals.push(Some(frame));
                FrameId(self.locals.len())
            }
        }
    }

    pub fn pop_frame(&mut self, id: FrameId) -> Result<(), ScopeError> {
        if id == FrameId::GLOBAL {
            return Err(ScopeError::GlobalFrame);
        }
        match self.locals.get_mut(id.0 - 1).and_then(Option::take) {
            Some(_) => {
                self.free.push(id.0 - 1);
                Ok(())
            }
            None => Err(ScopeError::UnknownFrame(id.0)),
        }
    }

    pub fn frame(&self, id: FrameId) -> Option<&ScopeFrame> {
        match id.0 {
            0 => Some(&self.global),
            n => self.locals.get(n - 1).and_then(Option::as_ref),
        }
    }

    fn frame_mut(&mut self, id: FrameId) -> Option<&mut ScopeFrame> {
        match id.0 {
            0 => Some(&mut self.global),
            n => self.locals.get_mut(n - 1).and_then(Option::as_mut),
        }
    }

    /// Frames locais vivos (o global não conta)
    pub fn live_frames(&self) -> usize {
        self.locals.iter().filter(|f| f.is_some()).count()
    }

    /// Procura `name` na cadeia local a partir de `head`.
    fn holder(&self, head: Option<FrameId>, name: &str) -> Option<FrameId> {
        let mut cursor = head;
        while let Some(id) = cursor {
            let frame = self.frame(id)?;
            if frame.variables.contains_key(name) {
                return Some(id);
            }
            cursor = frame.parent;
        }
        None
    }

    pub fn resolve(&self, head: Option<FrameId>, name: &str) -> Option<Value> {
        if let Some(id) = self.holder(head, name) {
            return self.frame(id).and_then(|f| f.variables.get(name)).cloned();
        }
        if is_private(name) {
            return None;
        }
        self.global.variables.get(name).cloned()
    }

    /// Atribui respeitando a cadeia: quem já declara o nome recebe o valor.
    ///
    /// Sem dono, nomes públicos vão para o global quando `allow_global`;
    /// o resto vai para `head`. Retorna onde o valor ficou.
    pub fn assign(
        &mut self,
        head: Option<FrameId>,
        name: &str,
        value: Value,
        allow_global: bool,
    ) -> Option<FrameId> {
        let target = match self.holder(head, name) {
            Some(id) => id,
            None if !is_private(name) && allow_global => FrameId::GLOBAL,
            None => head?,
        };
        let frame = self.frame_mut(target)?;
        frame.variables.insert(Rc::from(name), value);
        Some(target)
    }

    /// Declara em `frame` sem consultar a cadeia (`private`)
    pub fn declare(&mut self, frame: FrameId, name: &str, value: Value) -> Result<(), ScopeError> {
        let target = self.frame_mut(frame).ok_or(ScopeError::UnknownFrame(frame.0))?;
        target.variables.insert(Rc::from(name), value);
        Ok(())
    }

    pub fn set_global(&mut self, name: &str, value: Value) {
        self.global.variables.insert(Rc::from(name), value);
    }

    pub fn set_scope_name(&mut self, id: FrameId, name: &str) -> Result<(), ScopeError> {
        let frame = self.frame_mut(id).ok_or(ScopeError::UnknownFrame(id.0))?;
        if let Some(existing) = &frame.name {
            return Err(ScopeError::NameAlreadySet(existing.to_string()));
        }
        frame.name = Some(Rc::from(name));
        Ok(())
    }

    pub fn scope_name(&self, id: FrameId) -> Option<&str> {
        self.frame(id).and_then(ScopeFrame::name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_names_never_reach_global() {
        let mut scopes = Scopes::new();
        let local = scopes.push_frame(None);
        scopes.set_global("_hidden", Value::from(1));
        assert!(scopes.resolve(Some(local), "_hidden").is_none());
    }

    #[test]
    fn test_public_assignment_goes_global() {
        let mut scopes = Scopes::new();
        let local = scopes.push_frame(None);
        let landed = scopes.assign(Some(local), "score", Value::from(10), true);
        assert_eq!(landed, Some(FrameId::GLOBAL));
        assert_eq!(scopes.global().get("score").and_then(Value::as_scalar), Some(10.0));
    }

    #[test]
    fn test_local_shadows_global() {
        let mut scopes = Scopes::new();
        scopes.set_global("x", Value::from(1));
        let local = scopes.push_frame(None);
        scopes.declare(local, "x", Value::from(2)).unwrap();
        assert_eq!(scopes.resolve(Some(local), "x").and_then(|v| v.as_scalar()), Some(2.0));
        scopes.assign(Some(local), "x", Value::from(3), true);
        assert_eq!(scopes.global().get("x").and_then(Value::as_scalar), Some(1.0));
    }

    #[test]
    fn test_private_assignment_updates_outer_frame() {
        let mut scopes = Scopes::new();
        let outer = scopes.push_frame(None);
        scopes.declare(outer, "_a", Value::from(1)).unwrap();
        let inner = scopes.push_frame(Some(outer));
        assert_eq!(scopes.assign(Some(inner), "_a", Value::from(5), true), Some(outer));
        assert_eq!(scopes.assign(Some(inner), "_b", Value::from(6), true), Some(inner));
        scopes.pop_frame(inner).unwrap();
        assert!(scopes.resolve(Some(outer), "_b").is_none());
        assert_eq!(scopes.resolve(Some(outer), "_a").and_then(|v| v.as_scalar()), Some(5.0));
    }

    #[test]
    fn test_scope_name_set_once() {
        let mut scopes = Scopes::new();
        let frame = scopes.push_frame(None);
        assert!(scopes.set_scope_name(frame, "main").is_ok());
        assert_eq!(
            scopes.set_scope_name(frame, "other"),
            Err(ScopeError::NameAlreadySet("main".to_string()))
        );
        assert_eq!(scopes.scope_name(frame), Some("main"));
    }

    #[test]
    fn test_frame_slots_are_reused() {
        let mut scopes = Scopes::new();
        let a = scopes.push_frame(None);
        scopes.pop_frame(a).unwrap();
        let b = scopes.push_frame(None);
        assert_eq!(a, b);
        assert_eq!(scopes.live_frames(), 1);
        assert_eq!(scopes.pop_frame(FrameId::GLOBAL), Err(ScopeError::GlobalFrame));
    }
}
