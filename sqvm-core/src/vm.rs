//! # Virtual machine
//!
//! Owns everything handles share: the global frame, the scheduler, the config
//! tree, extensions and network sessions. Handles only keep indices into them.
//!
//! ```text
//! host ──spawn──► Scheduler ──run_turn──► Exec (one handle at a time)
//!                     ▲                        │
//!                     └──────── restore ───────┘
//! ```

use std::rc::Rc;

use serde::Serialize;

use crate::callstack::{CallFrame, Environment, FrameKind, FrameSnapshot};
use crate::config::VmConfig;
use crate::config_tree::{ConfigEntryRef, ConfigTree};
use crate::diagnostics::{LocationInfo, Logger, RuntimeFault};
use crate::error::{VmError, VmResult};
use crate::exec::Exec;
use crate::extension::{ExtensionLoader, ExtensionRegistry};
use crate::fault::{Checked, Diagnostics, Reporter, Strength};
use crate::handle::{HandleId, HandleState, ScriptHandle};
use crate::instruction::CodeBlock;
use crate::network::{ConnectionState, Connector, SessionId, SessionTable};
use crate::scheduler::Scheduler;
use crate::scope::{is_private, Scopes};
use crate::value::{ObjectKind, ObjectRef, Value};

/// Result of a synchronous run
#[derive(Debug, Clone)]
pub struct ScriptOutcome {
    pub id: HandleId,
    pub state: HandleState,
    pub value: Value,
    pub executed: u64,
}

/// Summary of one scheduler turn
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TurnReport {
    pub turn: u64,
    /// Handles that got the executor this turn
    pub ran: usize,
    pub finished: usize,
    pub terminated: usize,
    pub suspended: usize,
    pub instructions: u64,
}

#[derive(Debug)]
pub struct VirtualMachine {
    pub(crate) config: VmConfig,
    pub(crate) logger: Logger,
    pub(crate) scopes: Scopes,
    pub(crate) scheduler: Scheduler,
    pub(crate) config_tree: ConfigTree,
    pub(crate) extensions: ExtensionRegistry,
    pub(crate) network: SessionTable,
    /// Objects created by scripts or the host; deleted ones leave in `forget_deleted`
    objects: Vec<ObjectRef>,
    player: ObjectRef,
    next_object_id: u64,
}

impl VirtualMachine {
    /// The logger takes its enabled levels from `config.log_levels`.
    pub fn new(config: VmConfig, logger: Logger) -> Self {
        let logger = logger.with_levels(config.log_levels);
        let extensions = ExtensionRegistry::new(config.extension_buffer_size);
        Self {
            config,
            logger,
            scopes: Scopes::new(),
            scheduler: Scheduler::new(),
            config_tree: ConfigTree::default(),
            extensions,
            network: SessionTable::new(),
            objects: Vec::new(),
            player: ObjectRef::null(ObjectKind::Unit),
            next_object_id: 0,
        }
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn logger_mut(&mut self) -> &mut Logger {
        &mut self.logger
    }

    // ═══════════════════════════════════════════════════════════════════════
    // OBJECTS
    // ═══════════════════════════════════════════════════════════════════════

    /// Creates and registers an object at the origin.
    pub fn create_object(&mut self, kind: ObjectKind, class_name: &str) -> ObjectRef {
        self.next_object_id += 1;
        let object = ObjectRef::new(kind, self.next_object_id, class_name);
        self.objects.push(object.clone());
        object
    }

    /// Live objects in creation order
    pub fn objects(&self) -> impl Iterator<Item = &ObjectRef> {
        self.objects.iter().filter(|o| !o.is_null())
    }

    /// Drops deleted objects from the registry.
    pub(crate) fn forget_deleted(&mut self) {
        self.objects.retain(|o| !o.is_null());
    }

    /// Vehicle holding `unit` in a seat or in cargo
    pub fn vehicle_of(&self, unit: &ObjectRef) -> Option<ObjectRef> {
        self.objects()
            .filter(|o| o.kind() == ObjectKind::Vehicle && o != &unit)
            .find(|o| o.data().is_some_and(|d| d.occupants().contains(unit)))
            .cloned()
    }

    /// Group listing `unit` as a member
    pub fn group_of(&self, unit: &ObjectRef) -> Option<ObjectRef> {
        self.objects()
            .filter(|o| o.kind() == ObjectKind::Group)
            .find(|o| o.data().is_some_and(|d| d.crew.contains(unit)))
            .cloned()
    }

    /// Unit returned by `player`; `objNull` until the host sets one
    pub fn player(&self) -> &ObjectRef {
        &self.player
    }

    pub fn set_player(&mut self, unit: ObjectRef) {
        self.player = unit;
    }

    fn host_reporter(&mut self) -> Reporter<'_> {
        Reporter::new(&mut self.logger, LocationInfo::host())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // HANDLES
    // ═══════════════════════════════════════════════════════════════════════

    /// Builds a handle whose root frame runs `code`. `_this` is declared when given.
    fn create_handle(
        &mut self,
        code: Rc<CodeBlock>,
        this: Option<Value>,
        environment: Environment,
        origin: LocationInfo,
    ) -> ScriptHandle {
        let id = self.scheduler.allocate_id();
        let scope = self.scopes.push_frame(None);
        if let Some(this) = this {
            if let Err(e) = self.scopes.declare(scope, "_this", this) {
                tracing::warn!(error = %e, "could not bind _this");
            }
        }
        let root = CallFrame::new(FrameKind::Block, code, scope, environment, origin);
        ScriptHandle::new(id, root)
    }

    /// Queues a scheduled handle (`spawn` from scripts)
    pub(crate) fn spawn_code(&mut self, code: Rc<CodeBlock>, this: Value, origin: LocationInfo) -> HandleId {
        let handle = self.create_handle(code, Some(this), Environment::Scheduled, origin);
        let id = handle.id();
        self.scheduler.insert(handle);
        id
    }

    /// Queues `code` in a scheduled environment. It runs on the next turn.
    pub fn spawn(&mut self, code: CodeBlock) -> HandleId {
        let handle = self.create_handle(Rc::new(code), None, Environment::Scheduled, LocationInfo::host());
        let id = handle.id();
        self.scheduler.insert(handle);
        id
    }

    /// Like [`spawn`](Self::spawn), with `_this` bound in the root scope.
    pub fn spawn_with(&mut self, this: Value, code: CodeBlock) -> HandleId {
        self.spawn_code(Rc::new(code), this, LocationInfo::host())
    }

    /// Runs `code` to completion right now, in an unscheduled environment.
    ///
    /// Suspension points raise `SuspensionInUnscheduledEnvironment` and the
    /// script keeps going. The handle stays inspectable until [`reap`](Self::reap).
    pub fn execute_unscheduled(&mut self, code: CodeBlock) -> ScriptOutcome {
        let mut handle =
            self.create_handle(Rc::new(code), None, Environment::Unscheduled, LocationInfo::host());
        handle.transition(HandleState::Running);
        Exec::new(self, &mut handle).run();
        if !handle.is_absorbed() {
            // only a misbehaving controller gets here
            handle.callstack.unwind(&mut self.scopes);
            handle.transition(HandleState::Terminated);
        }
        let outcome = ScriptOutcome {
            id: handle.id(),
            state: handle.state(),
            value: handle.result().clone(),
            executed: handle.executed(),
        };
        self.scheduler.restore(handle);
        outcome
    }

    /// Gives every ready handle the executor once, in queue order.
    pub fn run_turn(&mut self) -> TurnReport {
        let batch = self.scheduler.begin_turn();
        let mut report = TurnReport { turn: self.scheduler.turns(), ..TurnReport::default() };
        for id in batch {
            let Some(mut handle) = self.scheduler.take(id) else {
                continue;
            };
            let before = handle.executed();
            handle.wake = None;
            handle.transition(HandleState::Running);
            Exec::new(self, &mut handle).run();

            report.ran += 1;
            report.instructions += handle.executed() - before;
            match handle.state() {
                HandleState::Finished => report.finished += 1,
                HandleState::Terminated => report.terminated += 1,
                HandleState::Suspended => report.suspended += 1,
                HandleState::Created | HandleState::Running => {}
            }
            self.scheduler.restore(handle);
            self.scheduler.requeue(id);
        }
        tracing::debug!(
            turn = report.turn,
            ran = report.ran,
            instructions = report.instructions,
            "scheduler turn"
        );
        report
    }

    /// Advances the clock by `dt` seconds, then runs one turn.
    pub fn tick(&mut self, dt: f64) -> TurnReport {
        self.advance_time(dt);
        self.run_turn()
    }

    /// Runs turns until every handle is absorbed or `max_turns` is reached.
    ///
    /// When only sleepers remain the clock jumps to the earliest wake-up.
    pub fn run_until_idle(&mut self, max_turns: usize) -> usize {
        let mut turns = 0;
        while turns < max_turns && !self.scheduler.is_idle() {
            let report = self.run_turn();
            turns += 1;
            if report.ran == 0 {
                match self.next_wake() {
                    Some(at) => self.advance_time(at - self.now()),
                    None => break,
                }
            }
        }
        turns
    }

    /// Earliest timed wake-up among suspended handles
    pub fn next_wake(&self) -> Option<f64> {
        self.scheduler.next_wake()
    }

    pub fn advance_time(&mut self, dt: f64) {
        self.scheduler.advance(dt);
    }

    /// Simulated clock, in seconds
    pub fn now(&self) -> f64 {
        self.scheduler.now()
    }

    pub fn state(&self, id: HandleId) -> Option<HandleState> {
        self.scheduler.get(id).map(ScriptHandle::state)
    }

    pub fn handle(&self, id: HandleId) -> Option<&ScriptHandle> {
        self.scheduler.get(id)
    }

    /// Terminates a handle from the host.
    ///
    /// Absorbed handles keep their state and get a warning.
    pub fn terminate(&mut self, id: HandleId) -> VmResult<HandleState> {
        self.terminate_at(id, LocationInfo::host())
    }

    pub(crate) fn terminate_at(&mut self, id: HandleId, location: LocationInfo) -> VmResult<HandleState> {
        let handle = self.scheduler.get_mut(id).ok_or(VmError::UnknownHandle(id.0))?;
        let mut reporter = Reporter::new(&mut self.logger, location);
        match handle.state() {
            HandleState::Finished => {
                reporter.note(RuntimeFault::ScriptHandleAlreadyFinished);
            }
            HandleState::Terminated => {
                reporter.note(RuntimeFault::ScriptHandleAlreadyTerminated);
            }
            _ => {
                handle.callstack.unwind(&mut self.scopes);
                handle.transition(HandleState::Terminated);
            }
        }
        Ok(handle.state())
    }

    /// Whether the handle is absorbed. Asking about an absorbed handle warns.
    pub fn script_done(&mut self, id: HandleId) -> VmResult<bool> {
        let state = self.state(id).ok_or(VmError::UnknownHandle(id.0))?;
        let mut reporter = self.host_reporter();
        match state {
            HandleState::Finished => reporter.note(RuntimeFault::ScriptHandleAlreadyFinished),
            HandleState::Terminated => reporter.note(RuntimeFault::ScriptHandleAlreadyTerminated),
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Drops absorbed handles.
    pub fn reap(&mut self) -> usize {
        self.scheduler.reap()
    }

    /// Handles still tracked, absorbed ones included until reaped
    pub fn handle_count(&self) -> usize {
        self.scheduler.len()
    }

    /// `true` when every handle is finished or terminated
    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    /// Serialisable view of a handle's call stack
    pub fn snapshot(&self, id: HandleId) -> Option<Vec<FrameSnapshot>> {
        self.scheduler.get(id).map(|h| h.callstack.snapshot())
    }

    pub fn snapshot_json(&self, id: HandleId) -> Option<serde_json::Value> {
        self.snapshot(id).and_then(|frames| serde_json::to_value(frames).ok())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // GLOBALS
    // ═══════════════════════════════════════════════════════════════════════

    pub fn set_global(&mut self, name: &str, value: Value) -> VmResult<()> {
        if is_private(name) {
            return Err(VmError::PrivateGlobal(name.to_string()));
        }
        self.scopes.set_global(name, value);
        Ok(())
    }

    pub fn global(&self, name: &str) -> Option<Value> {
        self.scopes.global().get(name).cloned()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // BRIDGES
    // ═══════════════════════════════════════════════════════════════════════

    pub fn set_config_tree(&mut self, tree: ConfigTree) {
        self.config_tree = tree;
    }

    pub fn config_tree(&self) -> &ConfigTree {
        &self.config_tree
    }

    /// Path lookup reported at the host location.
    pub fn lookup_config<S: AsRef<str>>(
        &mut self,
        path: &[S],
        strength: Strength,
    ) -> Checked<Option<ConfigEntryRef<'_>>> {
        let mut reporter = Reporter::new(&mut self.logger, LocationInfo::host());
        self.config_tree.lookup_checked(&mut reporter, path, strength)
    }

    pub fn set_extension_loader(&mut self, loader: impl ExtensionLoader + 'static) {
        self.extensions.set_loader(loader);
    }

    pub fn load_extension(&mut self, name: &str) -> bool {
        let mut reporter = Reporter::new(&mut self.logger, LocationInfo::host());
        self.extensions.load(&mut reporter, name).unwrap_or(false)
    }

    pub fn extensions(&self) -> &ExtensionRegistry {
        &self.extensions
    }

    pub fn set_connector(&mut self, connector: impl Connector + 'static) {
        self.network.set_connector(connector);
    }

    /// `None` when networking is disabled or the target is rejected
    pub fn connect(&mut self, target: &str) -> Option<SessionId> {
        let enabled = self.config.networking_enabled;
        let mut reporter = Reporter::new(&mut self.logger, LocationInfo::host());
        self.network.connect(&mut reporter, enabled, target).ok().flatten()
    }

    pub fn connection_status(&self, id: SessionId) -> Option<ConnectionState> {
        self.network.status(id)
    }

    pub fn network_mut(&mut self) -> &mut SessionTable {
        &mut self.network
    }
}
