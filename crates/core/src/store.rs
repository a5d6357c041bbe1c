// VMScope - Live VM Debug State Monitor
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::snapshot::{Generations, MonitorSnapshot};
use crate::{Category, CoreDump, DebugProvider, MonitorError, MonitorResult, Registers, StackFrame};
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, warn};

pub(crate) struct WorkerHandle {
    category: Category,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct StoreState {
    registers: Option<Registers>,
    stack: Vec<StackFrame>,
    dump: Option<Arc<CoreDump>>,
    live: bool,
    running: bool,
    stop: bool,
    // Bumped by every start; a worker only serves the run it was spawned for.
    run: u64,
    generations: Generations,
    workers: Vec<WorkerHandle>,
}

/// Last-known debug values of one VM plus the lifecycle of the workers
/// filling them in.
///
/// Every field sits behind one mutex. No method calls another locking method
/// while holding it, so the lock never needs to be re-entered.
pub(crate) struct SnapshotStore {
    vm: String,
    state: Mutex<StoreState>,
}

impl SnapshotStore {
    /// Seeds liveness with one synchronous enumeration so an idle handle
    /// already answers `live()` correctly.
    pub fn new(vm: String, provider: &dyn DebugProvider) -> Self {
        let live = provider.is_running(&vm);
        debug!("VM '{}' live at construction: {}", vm, live);
        Self {
            vm,
            state: Mutex::new(StoreState {
                live,
                ..Default::default()
            }),
        }
    }

    /// Idle copy of the values; flags and workers stay behind.
    pub fn copy_idle(&self) -> Self {
        let state = self.state.lock();
        Self {
            vm: self.vm.clone(),
            state: Mutex::new(StoreState {
                registers: state.registers.clone(),
                stack: state.stack.clone(),
                dump: state.dump.clone(),
                live: state.live,
                generations: state.generations,
                ..Default::default()
            }),
        }
    }

    pub fn vm(&self) -> &str {
        &self.vm
    }

    pub fn registers(&self) -> Option<Registers> {
        self.state.lock().registers.clone()
    }

    pub fn stack(&self) -> Vec<StackFrame> {
        self.state.lock().stack.clone()
    }

    pub fn dump(&self) -> Option<Arc<CoreDump>> {
        self.state.lock().dump.clone()
    }

    pub fn live(&self) -> bool {
        self.state.lock().live
    }

    pub fn generation(&self, category: Category) -> u64 {
        self.state.lock().generations.get(category)
    }

    /// Applies a worker's result unless its run is over. Returns `false` when
    /// the worker has to exit; the result is dropped in that case.
    fn publish(&self, run: u64, category: Category, apply: impl FnOnce(&mut StoreState)) -> bool {
        let mut state = self.state.lock();
        if state.stop || state.run != run {
            return false;
        }
        apply(&mut state);
        state.generations.bump(category);
        true
    }

    pub fn set_registers(&self, run: u64, registers: Option<Registers>) -> bool {
        self.publish(run, Category::Registers, |state| state.registers = registers)
    }

    pub fn set_stack(&self, run: u64, stack: Vec<StackFrame>) -> bool {
        self.publish(run, Category::Stack, |state| state.stack = stack)
    }

    pub fn set_dump(&self, run: u64, dump: Option<Arc<CoreDump>>) -> bool {
        self.publish(run, Category::Memory, |state| state.dump = dump)
    }

    pub fn set_live(&self, run: u64, live: bool) -> bool {
        self.publish(run, Category::Liveness, |state| state.live = live)
    }

    /// Whether a worker spawned for `run` has to exit.
    pub fn should_stop(&self, run: u64) -> bool {
        let state = self.state.lock();
        state.stop || state.run != run
    }

    pub fn request_stop(&self) {
        self.state.lock().stop = true;
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    #[cfg(test)]
    pub fn worker_count(&self) -> usize {
        self.state.lock().workers.len()
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        let state = self.state.lock();
        MonitorSnapshot {
            vm: self.vm.clone(),
            live: state.live,
            running: state.running,
            registers: state.registers.clone(),
            stack: state.stack.clone(),
            memory_size: state.dump.as_ref().map(|d| d.memory_size()),
            generations: state.generations,
        }
    }

    /// Idle -> Running. `spawn` is called once per category while the lock is
    /// held, so a concurrent `stop` sees either no workers or all of them.
    ///
    /// Returns `Ok(false)` when already running.
    pub fn start<F>(&self, mut spawn: F) -> MonitorResult<bool>
    where
        F: FnMut(Category, u64) -> io::Result<JoinHandle<()>>,
    {
        let failed = {
            let mut state = self.state.lock();
            if state.running {
                return Ok(false);
            }
            state.stop = false;
            state.running = true;
            state.run = state.run.wrapping_add(1);
            let run = state.run;

            let mut failed = None;
            for category in Category::ALL {
                match spawn(category, run) {
                    Ok(handle) => state.workers.push(WorkerHandle { category, handle }),
                    Err(source) => {
                        failed = Some((category, source));
                        break;
                    }
                }
            }
            failed
        };

        match failed {
            None => Ok(true),
            Some((category, source)) => {
                // Unwind the partial run before reporting.
                self.stop();
                Err(MonitorError::Spawn {
                    vm: self.vm.clone(),
                    category,
                    source,
                })
            }
        }
    }

    /// Running -> Idle. Joins outside the lock; returns the number of workers joined.
    pub fn stop(&self) -> usize {
        let (workers, run) = {
            let mut state = self.state.lock();
            state.stop = true;
            (std::mem::take(&mut state.workers), state.run)
        };

        let joined = workers.len();
        for worker in workers {
            if worker.handle.join().is_err() {
                warn!("{} worker for VM '{}' panicked", worker.category, self.vm);
            }
        }

        let mut state = self.state.lock();
        // A start that slipped in while we were joining owns the flag now.
        if state.run == run {
            state.running = false;
        }
        joined
    }
}
