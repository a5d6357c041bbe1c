// VMScope - Live VM Debug State Monitor
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Register {
    pub name: String,
    pub value: u64,
}

/// CPU register set as reported by the debugger.
/// Keeps the reporting order, which is the order a view should show them in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Registers {
    registers: Vec<Register>,
}

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a register, overwriting an existing entry with the same name
    /// (case-insensitive) in place.
    pub fn set(&mut self, name: impl Into<String>, value: u64) {
        let name = name.into();
        match self
            .registers
            .iter_mut()
            .find(|r| r.name.eq_ignore_ascii_case(&name))
        {
            Some(reg) => reg.value = value,
            None => self.registers.push(Register { name, value }),
        }
    }

    pub fn get(&self, name: &str) -> Option<u64> {
        self.registers
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
            .map(|r| r.value)
    }

    pub fn all(&self) -> impl Iterator<Item = (&str, u64)> {
        self.registers.iter().map(|r| (r.name.as_str(), r.value))
    }

    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for Registers {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        let mut regs = Self::new();
        for (name, value) in iter {
            regs.set(name, value);
        }
        regs
    }
}
