// VMScope - Live VM Debug State Monitor
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod memory;
pub mod monitor;
pub mod provider;
pub mod registers;
pub mod snapshot;
pub mod stack;
mod store;
mod sync;


use serde::{Deserialize, Serialize};
use std::fmt;

pub use memory::CoreDump;
pub use monitor::Monitor;
pub use provider::{DebugProvider, VmInfo};
pub use registers::{Register, Registers};
pub use snapshot::{Generations, MonitorSnapshot};
pub use stack::{FarPointer, StackFrame};
pub use vmscope_config::MonitorConfig;

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Failed to spawn {category} worker for VM '{vm}': {source}")]
    Spawn {
        vm: String,
        category: Category,
        source: std::io::Error,
    },
}

pub type MonitorResult<T> = Result<T, MonitorError>;

/// One independently polled slice of the VM's debug state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Registers,
    Stack,
    Memory,
    Liveness,
}

impl Category {
    /// Spawn order of the workers.
    pub const ALL: [Category; 4] = [
        Category::Registers,
        Category::Stack,
        Category::Memory,
        Category::Liveness,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Category::Registers => "registers",
            Category::Stack => "stack",
            Category::Memory => "memory",
            Category::Liveness => "liveness",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
