//! # Escalonador cooperativo
//!
//! Keeps live handles, the run queue and the simulated clock. Nothing here
//! executes instructions: the VM takes a handle out with [`Scheduler::take`],
//! runs it to the next suspension point and hands it back with [`Scheduler::restore`].
//!
//! A handle that is out is not in the map, so it never runs twice in one
//! turn and is never observed half-way.

use std::collections::{HashMap, VecDeque};

use crate::handle::{HandleId, HandleState, ScriptHandle};

#[derive(Debug, Default)]
pub struct Scheduler {
    handles: HashMap<HandleId, ScriptHandle>,
    queue: VecDeque<HandleId>,
    next_id: u64,
    clock: f64,
    turns: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate_id(&mut self) -> HandleId {
        self.next_id += 1;
        HandleId(self.next_id)
    }

    /// Registers a handle and queues it for the next turn.
    pub fn insert(&mut self, handle: ScriptHandle) {
        let id = handle.id();
        tracing::debug!(handle = id.0, "handle scheduled");
        self.handles.insert(id, handle);
        self.queue.push_back(id);
    }

    /// Removes a handle for execution.
    pub fn take(&mut self, id: HandleId) -> Option<ScriptHandle> {
        self.handles.remove(&id)
    }

    /// Puts a handle back after it ran. Absorbed handles stay for inspection.
    pub fn restore(&mut self, handle: ScriptHandle) {
        self.handles.insert(handle.id(), handle);
    }

    pub fn get(&self, id: HandleId) -> Option<&ScriptHandle> {
        self.handles.get(&id)
    }

    pub fn get_mut(&mut self, id: HandleId) -> Option<&mut ScriptHandle> {
        self.handles.get_mut(&id)
    }

    pub fn contains(&self, id: HandleId) -> bool {
        self.handles.contains_key(&id)
    }

    pub fn now(&self) -> f64 {
        self.clock
    }

    pub fn advance(&mut self, dt: f64) {
        if dt > 0.0 {
            self.clock += dt;
        }
    }

    pub fn turns(&self) -> u64 {
        self.turns
    }

    /// Drains the queue for one turn, keeping only handles that can still run.
    ///
    /// Handles whose wake condition is not met are requeued immediately and
    /// left out of the batch.
    pub fn begin_turn(&mut self) -> Vec<HandleId> {
        self.turns += 1;
        let now = self.clock;
        let pending: Vec<HandleId> = self.queue.drain(..).collect();
        let mut batch = Vec::with_capacity(pending.len());
        for id in pending {
            let Some(handle) = self.handles.get(&id) else { continue };
            if handle.is_absorbed() {
                continue;
            }
            if handle.is_ready(now) {
                batch.push(id);
            } else {
                self.queue.push_back(id);
            }
        }
        batch
    }

    /// Queues a handle for the next turn if it is still alive.
    pub fn requeue(&mut self, id: HandleId) {
        let alive = self.handles.get(&id).is_some_and(|h| !h.is_absorbed());
        if alive && !self.queue.contains(&id) {
            self.queue.push_back(id);
        }
    }

    /// Handles still waiting for a turn
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Drops absorbed handles and returns how many were removed.
    pub fn reap(&mut self) -> usize {
        let before = self.handles.len();
        self.handles.retain(|_, h| !h.is_absorbed());
        let removed = before - self.handles.len();
        if removed > 0 {
            tracing::debug!(removed, "reaped absorbed handles");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// `true` when no live handle remains
    pub fn is_idle(&self) -> bool {
        self.handles.values().all(ScriptHandle::is_absorbed)
    }

    /// Earliest `sleep` wake-up among suspended handles
    pub fn next_wake(&self) -> Option<f64> {
        self.handles
            .values()
            .filter(|h| h.state() == HandleState::Suspended)
            .filter_map(|h| match h.wake() {
                Some(crate::handle::WakeCondition::At(t)) => Some(t),
                _ => None,
            })
            .reduce(f64::min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callstack::{CallFrame, Environment, FrameKind};
    use crate::diagnostics::LocationInfo;
    use crate::handle::WakeCondition;
    use crate::instruction::CodeBlock;
    use crate::scope::FrameId;
    use std::rc::Rc;

    fn handle(s: &mut Scheduler) -> ScriptHandle {
        let id = s.allocate_id();
        let frame = CallFrame::new(
            FrameKind::Block,
            Rc::new(CodeBlock::default()),
            FrameId::GLOBAL,
            Environment::Scheduled,
            LocationInfo::host(),
        );
        ScriptHandle::new(id, frame)
    }

    #[test]
    fn test_ids_are_unique() {
        let mut s = Scheduler::new();
        let a = s.allocate_id();
        let b = s.allocate_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_sleeping_handle_waits_for_clock() {
        let mut s = Scheduler::new();
        let mut h = handle(&mut s);
        let id = h.id();
        h.transition(HandleState::Running);
        h.transition(HandleState::Suspended);
        h.wake = Some(WakeCondition::At(2.0));
        s.insert(h);

        assert!(s.begin_turn().is_empty());
        assert_eq!(s.next_wake(), Some(2.0));
        s.advance(2.0);
        assert_eq!(s.begin_turn(), vec![id]);
    }

    #[test]
    fn test_reap_drops_only_absorbed() {
        let mut s = Scheduler::new();
        let mut done = handle(&mut s);
        done.transition(HandleState::Finished);
        let live = handle(&mut s);
        let live_id = live.id();
        s.insert(done);
        s.insert(live);
        assert_eq!(s.reap(), 1);
        assert!(s.contains(live_id));
        assert!(!s.is_idle());
    }
}
