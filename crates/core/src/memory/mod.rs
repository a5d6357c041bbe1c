// VMScope - Live VM Debug State Monitor
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::fs;
use std::io;
use std::path::Path;

/// Immutable memory image of the guest.
///
/// Dumps are expensive to take, so the monitor hands them out behind an
/// `Arc` and never mutates one after construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoreDump {
    data: Vec<u8>,
}

impl CoreDump {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Reads a dump a provider wrote to its scratch file.
    pub fn from_file(path: &Path) -> io::Result<Self> {
        let data = fs::read(path)?;
        tracing::debug!("Read {} byte core dump from {:?}", data.len(), path);
        Ok(Self::new(data))
    }

    pub fn memory_size(&self) -> usize {
        self.data.len()
    }

    /// Up to `len` bytes starting at `offset`; shorter (or empty) near the end of the image.
    pub fn read_memory(&self, offset: usize, len: usize) -> &[u8] {
        if offset >= self.data.len() {
            return &[];
        }
        let end = offset.saturating_add(len).min(self.data.len());
        &self.data[offset..end]
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn test_read_memory_clamps() {
        let dump = CoreDump::new((0u8..32).collect());
        assert_eq!(dump.read_memory(0, 4), &[0, 1, 2, 3]);
        assert_eq!(dump.read_memory(30, 8), &[30, 31]);
        assert!(dump.read_memory(32, 8).is_empty());
        assert!(dump.read_memory(usize::MAX, usize::MAX).is_empty());
        assert_eq!(dump.read_memory(4, usize::MAX).len(), 28);
    }

    #[test]
    fn test_from_file() {
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let path = std::env::temp_dir().join(format!("vmscope-dump-{}.core", nonce));
        fs::write(&path, [0xde, 0xad, 0xbe, 0xef]).unwrap();

        let dump = CoreDump::from_file(&path).unwrap();
        assert_eq!(dump.memory_size(), 4);
        assert_eq!(dump.bytes(), &[0xde, 0xad, 0xbe, 0xef]);

        let _ = fs::remove_file(&path);
        assert!(CoreDump::from_file(&path).is_err());
    }
}
