// VMScope - Live VM Debug State Monitor
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Segment:offset address as printed by the VM debugger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FarPointer {
    pub segment: u16,
    pub offset: u64,
}

impl FarPointer {
    pub fn new(segment: u16, offset: u64) -> Self {
        Self { segment, offset }
    }
}

impl fmt::Display for FarPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}:{:016X}", self.segment, self.offset)
    }
}

/// One entry of the guest call stack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
    /// SS:BP of this frame
    pub bp: FarPointer,
    /// SS:BP of the caller
    pub ret_bp: FarPointer,
    /// CS:IP the frame returns to
    pub ret_ip: FarPointer,
    /// First four argument slots
    #[serde(default)]
    pub args: [u32; 4],
    /// CS:IP inside this frame
    pub ip: FarPointer,
}
