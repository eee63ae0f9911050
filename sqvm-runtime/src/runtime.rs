//! Main runtime implementation

use std::path::Path;

use serde::Serialize;
use sqvm_core::prelude::*;

use crate::config::RuntimeConfig;
use crate::error::RuntimeResult;
use crate::loader::ConfigTreeLoader;
use crate::logger::TracingSink;

/// Totals of one [`ScriptRuntime::run`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub turns: usize,
    pub finished: usize,
    pub terminated: usize,
    pub instructions: u64,
    /// Finished or terminated handles dropped after their turn
    pub reaped: usize,
    /// Whether every handle is absorbed at the end
    pub idle: bool,
}

/// Main runtime: a VM wired to `tracing`
#[derive(Debug)]
pub struct ScriptRuntime {
    config: RuntimeConfig,
    vm: VirtualMachine,
}

impl ScriptRuntime {
    pub fn new(config: RuntimeConfig) -> Self {
        let vm = VirtualMachine::new(config.effective_vm_config(), Logger::new(TracingSink));
        Self { config, vm }
    }

    /// Loads `sqvm.toml` and the config tree it references.
    pub fn from_config_file(path: impl AsRef<Path>) -> RuntimeResult<Self> {
        let config = RuntimeConfig::from_file(path.as_ref())?;
        let tree = match &config.config_tree {
            Some(tree_path) => Some(ConfigTreeLoader::load_file(tree_path)?),
            None => None,
        };
        let mut runtime = Self::new(config);
        if let Some(tree) = tree {
            runtime.vm.set_config_tree(tree);
        }
        Ok(runtime)
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn vm(&self) -> &VirtualMachine {
        &self.vm
    }

    pub fn vm_mut(&mut self) -> &mut VirtualMachine {
        &mut self.vm
    }

    pub fn load_config_tree(&mut self, path: impl AsRef<Path>) -> RuntimeResult<()> {
        let tree = ConfigTreeLoader::load_file(path)?;
        self.vm.set_config_tree(tree);
        Ok(())
    }

    /// Queues `code` to run on the next turn.
    pub fn spawn(&mut self, code: CodeBlock) -> HandleId {
        self.vm.spawn(code)
    }

    /// Runs `code` to completion, unscheduled.
    pub fn execute(&mut self, code: CodeBlock) -> ScriptOutcome {
        self.vm.execute_unscheduled(code)
    }

    /// Drives turns until the VM is idle or `max_turns` turns ran.
    ///
    /// Absorbed handles are reaped after every turn. When only sleepers
    /// remain the simulated clock jumps to the next wake-up.
    pub fn run(&mut self, max_turns: usize) -> RunSummary {
        let mut summary = RunSummary::default();
        while summary.turns < max_turns && !self.vm.is_idle() {
            let report = self.vm.run_turn();
            summary.turns += 1;
            summary.finished += report.finished;
            summary.terminated += report.terminated;
            summary.instructions += report.instructions;
            summary.reaped += self.vm.reap();
            if report.ran == 0 {
                let Some(wake) = self.vm.next_wake() else {
                    break;
                };
                self.vm.advance_time((wake - self.vm.now()).max(0.0));
            }
        }
        summary.idle = self.vm.is_idle();
        tracing::info!(
            turns = summary.turns,
            finished = summary.finished,
            terminated = summary.terminated,
            instructions = summary.instructions,
            reaped = summary.reaped,
            idle = summary.idle,
            "run complete"
        );
        summary
    }

    /// JSON view of a handle's call stack
    pub fn snapshot_json(&self, id: HandleId) -> RuntimeResult<String> {
        let frames = self.vm.snapshot(id).unwrap_or_default();
        Ok(serde_json::to_string_pretty(&frames)?)
    }
}
