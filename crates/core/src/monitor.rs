// VMScope - Live VM Debug State Monitor
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::snapshot::MonitorSnapshot;
use crate::store::SnapshotStore;
use crate::sync::write_both;
use crate::{Category, CoreDump, DebugProvider, MonitorConfig, MonitorResult, Registers, StackFrame};
use parking_lot::RwLock;
use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info};

static SCRATCH_SEQ: AtomicU64 = AtomicU64::new(0);

/// What a handle owns. Assignment and swap exchange this wholesale.
struct Inner {
    store: Arc<SnapshotStore>,
    provider: Arc<dyn DebugProvider>,
    config: MonitorConfig,
}

/// Live view of one VM's debug state.
///
/// `start` spawns one polling thread per [`Category`]; each loops on
/// "check stop, query the provider, store the result" with no pause in
/// between. The accessors return copies of the latest values and may be
/// called from any thread at any time.
///
/// The handle behaves like a value:
/// - `clone()` gives an idle handle holding the values seen at copy time;
///   workers are never shared or duplicated.
/// - `swap`/`assign` exchange the complete state of two handles (workers
///   included) under both handles' locks, taken in a deadlock-free way.
/// - dropping a handle stops and joins its workers.
///
/// Categories are updated independently. Registers may be from a newer poll
/// than the memory dump; use [`Monitor::generation`] to see how fresh each is.
///
/// `stop` waits for every in-flight provider call to return. There is no
/// timeout, so a hung provider delays shutdown indefinitely.
pub struct Monitor {
    inner: RwLock<Arc<Inner>>,
}

impl Monitor {
    pub fn new(vm: impl Into<String>, provider: Arc<dyn DebugProvider>) -> Self {
        Self::with_config(vm, provider, MonitorConfig::default())
    }

    pub fn with_config(
        vm: impl Into<String>,
        provider: Arc<dyn DebugProvider>,
        config: MonitorConfig,
    ) -> Self {
        let store = SnapshotStore::new(vm.into(), provider.as_ref());
        Self::from_inner(Inner {
            store: Arc::new(store),
            provider,
            config,
        })
    }

    fn from_inner(inner: Inner) -> Self {
        Self {
            inner: RwLock::new(Arc::new(inner)),
        }
    }

    fn current(&self) -> Arc<Inner> {
        Arc::clone(&*self.inner.read())
    }

    pub fn vm_name(&self) -> String {
        self.inner.read().store.vm().to_string()
    }

    pub fn live(&self) -> bool {
        self.inner.read().store.live()
    }

    pub fn registers(&self) -> Option<Registers> {
        self.inner.read().store.registers()
    }

    pub fn stack(&self) -> Vec<StackFrame> {
        self.inner.read().store.stack()
    }

    /// Latest memory dump, shared rather than copied.
    pub fn dump(&self) -> Option<Arc<CoreDump>> {
        self.inner.read().store.dump()
    }

    pub fn is_running(&self) -> bool {
        self.inner.read().store.is_running()
    }

    pub fn generation(&self, category: Category) -> u64 {
        self.inner.read().store.generation(category)
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        self.inner.read().store.snapshot()
    }

    /// Spawns the four polling workers. No-op while already running.
    pub fn start(&self) -> MonitorResult<()> {
        let inner = self.current();
        let started = inner
            .store
            .start(|category, run| spawn_worker(&inner, category, run))?;
        if started {
            info!("Monitoring VM '{}'", inner.store.vm());
        }
        Ok(())
    }

    /// Asks the workers to exit after their current query, without waiting.
    /// `stop` still has to be called to join them.
    pub fn request_stop(&self) {
        self.inner.read().store.request_stop();
    }

    /// Signals the workers and joins them. No-op while idle.
    ///
    /// When two `stop` calls race, only one of them gets the workers to join.
    /// The other returns at once and the handle already reports idle while
    /// the first is still joining. Those old workers never publish into a
    /// run started afterwards.
    pub fn stop(&self) {
        let inner = self.current();
        let joined = inner.store.stop();
        if joined > 0 {
            info!(
                "Stopped monitoring VM '{}' ({} workers joined)",
                inner.store.vm(),
                joined
            );
        }
    }

    /// Exchanges the complete state of two handles.
    pub fn swap(&self, other: &Monitor) {
        if std::ptr::eq(self, other) {
            return;
        }
        let (mut mine, mut theirs) = write_both(&self.inner, &other.inner);
        std::mem::swap(&mut *mine, &mut *theirs);
    }

    /// Takes over `other`'s state, workers included. The state this handle
    /// held before is dropped, which stops its workers.
    pub fn assign(&self, other: Monitor) {
        self.swap(&other);
    }

    /// Becomes an idle copy of `other`.
    pub fn assign_from(&self, other: &Monitor) {
        self.assign(other.clone());
    }
}

#[cfg(test)]
impl Monitor {
    pub(crate) fn worker_count(&self) -> usize {
        self.inner.read().store.worker_count()
    }
}

impl Clone for Monitor {
    fn clone(&self) -> Self {
        let inner = self.inner.read();
        Self::from_inner(Inner {
            store: Arc::new(inner.store.copy_idle()),
            provider: Arc::clone(&inner.provider),
            config: inner.config.clone(),
        })
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        let inner = Arc::clone(self.inner.get_mut());
        let joined = inner.store.stop();
        if joined > 0 {
            debug!(
                "Dropped monitor for VM '{}' joined {} workers",
                inner.store.vm(),
                joined
            );
        }
    }
}

impl fmt::Debug for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("Monitor")
            .field("vm", &inner.store.vm())
            .field("running", &inner.store.is_running())
            .field("config", &inner.config)
            .finish()
    }
}

fn spawn_worker(inner: &Inner, category: Category, run: u64) -> io::Result<JoinHandle<()>> {
    let store = Arc::clone(&inner.store);
    let provider = Arc::clone(&inner.provider);
    let name = format!("{}-{}", inner.config.thread_name, category);
    // Builder::spawn panics on interior NULs instead of returning an error.
    if name.contains('\0') {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("thread name {:?} contains a NUL byte", name),
        ));
    }
    let builder = thread::Builder::new().name(name);

    match category {
        Category::Registers => builder.spawn(move || {
            poll(
                &store,
                run,
                category,
                || provider.registers(store.vm()),
                SnapshotStore::set_registers,
            )
        }),
        Category::Stack => builder.spawn(move || {
            poll(
                &store,
                run,
                category,
                || provider.stack(store.vm()),
                SnapshotStore::set_stack,
            )
        }),
        Category::Memory => {
            let scratch = scratch_path(&inner.config, store.vm());
            builder.spawn(move || {
                poll(
                    &store,
                    run,
                    category,
                    || provider.dump(store.vm(), &scratch),
                    SnapshotStore::set_dump,
                );
                if scratch.exists() {
                    if let Err(e) = fs::remove_file(&scratch) {
                        debug!("Could not remove scratch dump {:?}: {}", scratch, e);
                    }
                }
            })
        }
        Category::Liveness => builder.spawn(move || {
            poll(
                &store,
                run,
                category,
                || provider.is_running(store.vm()),
                SnapshotStore::set_live,
            )
        }),
    }
}

/// Worker body. The query runs without the store lock held; its result is
/// only stored if the run is still current when it returns.
fn poll<T>(
    store: &SnapshotStore,
    run: u64,
    category: Category,
    mut query: impl FnMut() -> T,
    publish: impl Fn(&SnapshotStore, u64, T) -> bool,
) {
    debug!("{} worker for VM '{}' started (run {})", category, store.vm(), run);
    let mut polls: u64 = 0;
    while !store.should_stop(run) {
        let value = query();
        if !publish(store, run, value) {
            break;
        }
        polls += 1;
    }
    debug!(
        "{} worker for VM '{}' exiting after {} polls",
        category,
        store.vm(),
        polls
    );
}

fn scratch_path(config: &MonitorConfig, vm: &str) -> PathBuf {
    let vm: String = vm
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    config.scratch_dir().join(format!(
        "{}-{}-{}-{}.core",
        config.thread_name,
        vm,
        process::id(),
        SCRATCH_SEQ.fetch_add(1, Ordering::Relaxed)
    ))
}
