use crate::{Category, Registers, StackFrame};
use serde::{Deserialize, Serialize};

/// Per-category write counters. Each successful store write bumps the
/// counter of its category, so a reader can tell a fresh value from a stale one.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Generations {
    pub registers: u64,
    pub stack: u64,
    pub memory: u64,
    pub liveness: u64,
}

impl Generations {
    pub fn get(&self, category: Category) -> u64 {
        match category {
            Category::Registers => self.registers,
            Category::Stack => self.stack,
            Category::Memory => self.memory,
            Category::Liveness => self.liveness,
        }
    }

    pub(crate) fn bump(&mut self, category: Category) {
        let slot = match category {
            Category::Registers => &mut self.registers,
            Category::Stack => &mut self.stack,
            Category::Memory => &mut self.memory,
            Category::Liveness => &mut self.liveness,
        };
        *slot = slot.wrapping_add(1);
    }
}

/// Everything a monitor knows about its VM, read under a single lock.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MonitorSnapshot {
    pub vm: String,
    pub live: bool,
    pub running: bool,
    pub registers: Option<Registers>,
    pub stack: Vec<StackFrame>,
    /// Size of the last memory dump, if one was taken
    pub memory_size: Option<usize>,
    pub generations: Generations,
}
