// VMScope - Live VM Debug State Monitor
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::debug;
use vmscope_core::{Category, CoreDump, DebugProvider, Registers, StackFrame, VmInfo};

/// One recorded poll of every category.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct ReplayFrame {
    #[serde(default)]
    pub registers: Option<Registers>,
    #[serde(default)]
    pub stack: Vec<StackFrame>,
    #[serde(default)]
    pub memory: Option<Vec<u8>>,
}

/// A recorded debug session, as JSON.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct ReplaySession {
    /// VMs reported by liveness enumeration
    #[serde(default)]
    pub running: Vec<VmInfo>,
    /// Simulated debugger latency per query
    #[serde(default)]
    pub latency_ms: u64,
    #[serde(default)]
    pub frames: Vec<ReplayFrame>,
}

impl ReplaySession {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = fs::File::open(&path)
            .with_context(|| format!("Failed to open session at {:?}", path.as_ref()))?;
        serde_json::from_reader(f).context("Failed to parse recorded session JSON")
    }
}

/// Debug provider that plays a recorded session back.
///
/// Each category walks the frames on its own cursor and wraps around, so the
/// categories drift apart the same way live polling does.
pub struct ReplayProvider {
    session: ReplaySession,
    registers_at: AtomicUsize,
    stack_at: AtomicUsize,
    memory_at: AtomicUsize,
}

impl ReplayProvider {
    pub fn new(session: ReplaySession) -> Self {
        Self {
            session,
            registers_at: AtomicUsize::new(0),
            stack_at: AtomicUsize::new(0),
            memory_at: AtomicUsize::new(0),
        }
    }

    fn delay(&self) {
        if self.session.latency_ms > 0 {
            thread::sleep(Duration::from_millis(self.session.latency_ms));
        }
    }

    fn next_frame(&self, category: Category, vm: &str) -> Option<&ReplayFrame> {
        self.delay();
        if self.session.frames.is_empty() || !self.is_running(vm) {
            return None;
        }
        let cursor = match category {
            Category::Registers => &self.registers_at,
            Category::Stack => &self.stack_at,
            Category::Memory => &self.memory_at,
            Category::Liveness => return None,
        };
        let at = cursor.fetch_add(1, Ordering::Relaxed);
        self.session.frames.get(at % self.session.frames.len())
    }
}

impl DebugProvider for ReplayProvider {
    fn registers(&self, vm: &str) -> Option<Registers> {
        self.next_frame(Category::Registers, vm)?.registers.clone()
    }

    fn stack(&self, vm: &str) -> Vec<StackFrame> {
        self.next_frame(Category::Stack, vm)
            .map(|frame| frame.stack.clone())
            .unwrap_or_default()
    }

    fn dump(&self, vm: &str, scratch: &Path) -> Option<Arc<CoreDump>> {
        let memory = self.next_frame(Category::Memory, vm)?.memory.as_ref()?;
        // Same round trip as a real dump: write the image out, load it back.
        if let Err(e) = fs::write(scratch, memory) {
            debug!("Failed to write scratch dump {:?}: {}", scratch, e);
            return None;
        }
        match CoreDump::from_file(scratch) {
            Ok(dump) => Some(Arc::new(dump)),
            Err(e) => {
                debug!("Failed to read scratch dump {:?}: {}", scratch, e);
                None
            }
        }
    }

    fn running_vms(&self) -> Vec<VmInfo> {
        self.session.running.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SESSION: &str = r#"{
        "running": [{ "name": "alpha" }],
        "frames": [
            { "registers": [{ "name": "eax", "value": 1 }], "memory": [1, 2, 3] },
            { "registers": [{ "name": "eax", "value": 2 }] }
        ]
    }"#;

    #[test]
    fn test_categories_cycle_independently() {
        let session: ReplaySession = serde_json::from_str(SESSION).unwrap();
        let provider = ReplayProvider::new(session);

        let eax = |p: &ReplayProvider| p.registers("alpha").unwrap().get("eax");
        assert_eq!(eax(&provider), Some(1));
        assert_eq!(eax(&provider), Some(2));
        assert_eq!(eax(&provider), Some(1));

        // the stack cursor has not moved
        assert!(provider.stack("alpha").is_empty());
        assert_eq!(provider.stack_at.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_stopped_vm_yields_nothing() {
        let session: ReplaySession = serde_json::from_str(SESSION).unwrap();
        let provider = ReplayProvider::new(session);
        assert!(!provider.is_running("beta"));
        assert!(provider.registers("beta").is_none());
        assert!(provider.stack("beta").is_empty());
    }

    #[test]
    fn test_dump_round_trips_through_scratch() {
        let session: ReplaySession = serde_json::from_str(SESSION).unwrap();
        let provider = ReplayProvider::new(session);
        let scratch = std::env::temp_dir().join(format!(
            "vmscope-replay-test-{}.core",
            std::process::id()
        ));

        let dump = provider.dump("alpha", &scratch).unwrap();
        assert_eq!(dump.bytes(), &[1, 2, 3]);
        // second frame has no memory
        assert!(provider.dump("alpha", &scratch).is_none());

        let _ = fs::remove_file(&scratch);
    }

    #[test]
    fn test_unknown_session_field_rejected() {
        assert!(serde_json::from_str::<ReplaySession>(r#"{ "vms": [] }"#).is_err());
    }
}
