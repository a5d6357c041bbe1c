// VMScope - Live VM Debug State Monitor
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::{CoreDump, Registers, StackFrame};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// A VM reported by liveness enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmInfo {
    pub name: String,
    #[serde(default)]
    pub uuid: Option<String>,
}

impl VmInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uuid: None,
        }
    }
}

/// Source of debug data for a virtual machine.
///
/// Every call is synchronous and may block for as long as the underlying
/// debugger takes. Failures are reported as empty values (`None`, an empty
/// stack); the monitor does not tell them apart from "no data yet".
pub trait DebugProvider: Send + Sync {
    fn registers(&self, vm: &str) -> Option<Registers>;

    fn stack(&self, vm: &str) -> Vec<StackFrame>;

    /// Takes a memory dump. `scratch` is a path the provider may write the
    /// dump to before loading it; it belongs to the calling worker.
    fn dump(&self, vm: &str, scratch: &Path) -> Option<Arc<CoreDump>>;

    fn running_vms(&self) -> Vec<VmInfo>;

    fn is_running(&self, vm: &str) -> bool {
        self.running_vms().iter().any(|info| info.name == vm)
    }
}
