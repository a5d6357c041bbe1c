// VMScope - Live VM Debug State Monitor
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::io::{self, Write};
use vmscope_core::Monitor;

/// Memory window navigation, bound to the keys `a` `s` `d` `f` `g`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerKey {
    ScrollUp,
    ScrollDown,
    PageUp,
    PageDown,
    Home,
}

impl PagerKey {
    pub fn from_char(key: char) -> Option<Self> {
        match key {
            'a' => Some(PagerKey::ScrollUp),
            's' => Some(PagerKey::ScrollDown),
            'd' => Some(PagerKey::PageUp),
            'f' => Some(PagerKey::PageDown),
            'g' => Some(PagerKey::Home),
            _ => None,
        }
    }

    /// Parses a key script such as "ssfa". Whitespace is ignored.
    pub fn parse_script(script: &str) -> Result<Vec<Self>, char> {
        script
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| Self::from_char(c).ok_or(c))
            .collect()
    }
}

/// Scroll state of the memory window.
#[derive(Debug, Clone)]
pub struct MemoryPager {
    offset: usize,
    bytes_per_line: usize,
    lines: usize,
    total: usize,
    pending: Vec<PagerKey>,
}

impl MemoryPager {
    pub fn new(bytes_per_line: usize, lines: usize) -> Self {
        Self {
            offset: 0,
            bytes_per_line: bytes_per_line.max(1),
            lines: lines.max(1),
            total: 0,
            pending: Vec::new(),
        }
    }

    /// Keys to replay as soon as a non-empty dump is paged.
    pub fn queue_keys(&mut self, keys: Vec<PagerKey>) {
        self.pending = keys;
    }

    pub fn has_pending_keys(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn press(&mut self, key: PagerKey) {
        match key {
            PagerKey::ScrollUp => self.scroll_up(1),
            PagerKey::ScrollDown => self.scroll_down(1),
            PagerKey::PageUp => self.page_up(),
            PagerKey::PageDown => self.page_down(),
            PagerKey::Home => self.home(),
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn bytes_per_line(&self) -> usize {
        self.bytes_per_line
    }

    /// Bytes shown at once.
    pub fn window(&self) -> usize {
        self.bytes_per_line * self.lines
    }

    /// Size of the dump being paged. Pulls the offset back if the dump shrank.
    pub fn set_total(&mut self, total: usize) {
        self.total = total;
        if self.offset >= total {
            self.offset = total.saturating_sub(1) / self.bytes_per_line * self.bytes_per_line;
        }
        if total > 0 {
            for key in std::mem::take(&mut self.pending) {
                self.press(key);
            }
        }
    }

    pub fn scroll_up(&mut self, lines: usize) {
        let step = self.bytes_per_line.saturating_mul(lines);
        self.offset = self.offset.saturating_sub(step);
    }

    /// Never moves past the last byte of the dump.
    pub fn scroll_down(&mut self, lines: usize) {
        let step = self.bytes_per_line.saturating_mul(lines);
        let next = self.offset.saturating_add(step);
        if next < self.total {
            self.offset = next;
        }
    }

    pub fn page_up(&mut self) {
        self.scroll_up(self.lines);
    }

    pub fn page_down(&mut self) {
        self.scroll_down(self.lines);
    }

    pub fn home(&mut self) {
        self.offset = 0;
    }
}

/// Hex + ASCII rendering of `bytes`, which start at dump offset `start`.
pub fn hex_lines(bytes: &[u8], start: usize, bytes_per_line: usize) -> Vec<String> {
    let bytes_per_line = bytes_per_line.max(1);
    bytes
        .chunks(bytes_per_line)
        .enumerate()
        .map(|(i, chunk)| {
            let mut line = format!("{:016X}: ", start + i * bytes_per_line);
            for b in chunk {
                line.push_str(&format!("{:02X} ", b));
            }
            for _ in chunk.len()..bytes_per_line {
                line.push_str("   ");
            }
            line.push_str("| ");
            line.extend(chunk.iter().map(|&b| {
                if b.is_ascii_graphic() {
                    b as char
                } else {
                    '.'
                }
            }));
            line
        })
        .collect()
}

/// Writes one refresh of the view.
pub fn render<W: Write>(
    out: &mut W,
    monitor: &Monitor,
    pager: &mut MemoryPager,
    max_stack_frames: usize,
) -> io::Result<()> {
    writeln!(
        out,
        "== VM: {} [{}] ==",
        monitor.vm_name(),
        if monitor.live() { "live" } else { "not running" }
    )?;

    writeln!(out, "CPU Registers:")?;
    match monitor.registers() {
        Some(regs) => {
            for (name, value) in regs.all() {
                writeln!(out, "  {:>6}: {:#018X}", name.to_uppercase(), value)?;
            }
        }
        None => writeln!(out, "  (no data)")?,
    }

    writeln!(out, "Stack:")?;
    writeln!(
        out,
        "  {:<21} | {:<21} | {:<21} | {:<10} | {:<10} | {:<10} | {:<10} | CS:EIP",
        "SS:BP", "Ret SS:BP", "Ret CS:EIP", "Arg 0", "Arg 1", "Arg 2", "Arg 3"
    )?;
    for frame in monitor.stack().iter().take(max_stack_frames) {
        writeln!(
            out,
            "  {} | {} | {} | {:#010X} | {:#010X} | {:#010X} | {:#010X} | {}",
            frame.bp,
            frame.ret_bp,
            frame.ret_ip,
            frame.args[0],
            frame.args[1],
            frame.args[2],
            frame.args[3],
            frame.ip
        )?;
    }

    writeln!(out, "Memory:")?;
    match monitor.dump() {
        Some(dump) if dump.memory_size() > 0 => {
            pager.set_total(dump.memory_size());
            let bytes = dump.read_memory(pager.offset(), pager.window());
            for line in hex_lines(bytes, pager.offset(), pager.bytes_per_line()) {
                writeln!(out, "  {}", line)?;
            }
        }
        _ => writeln!(out, "  (no data)")?,
    }
    writeln!(out)?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_lines() {
        let bytes: Vec<u8> = b"Hi!\n\x00ABC".to_vec();
        let lines = hex_lines(&bytes, 0x20, 4);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "0000000000000020: 48 69 21 0A | Hi!.");
        assert_eq!(lines[1], "0000000000000024: 00 41 42 43 | .ABC");
    }

    #[test]
    fn test_hex_lines_pads_short_line() {
        let lines = hex_lines(&[0x41], 0, 4);
        assert_eq!(lines, vec!["0000000000000000: 41          | A".to_string()]);
    }

    #[test]
    fn test_pager_scroll_bounds() {
        let mut pager = MemoryPager::new(16, 4);
        pager.set_total(100);

        pager.scroll_down(1);
        assert_eq!(pager.offset(), 16);
        pager.page_down();
        assert_eq!(pager.offset(), 80);
        // 80 + 64 would pass the end
        pager.page_down();
        assert_eq!(pager.offset(), 80);
        pager.scroll_down(1);
        assert_eq!(pager.offset(), 96);

        pager.page_up();
        assert_eq!(pager.offset(), 32);
        pager.scroll_up(10);
        assert_eq!(pager.offset(), 0);

        pager.scroll_down(3);
        pager.home();
        assert_eq!(pager.offset(), 0);
    }

    #[test]
    fn test_pager_follows_shrinking_dump() {
        let mut pager = MemoryPager::new(16, 4);
        pager.set_total(256);
        pager.scroll_down(10);
        assert_eq!(pager.offset(), 160);

        pager.set_total(40);
        assert_eq!(pager.offset(), 32);
        pager.set_total(0);
        assert_eq!(pager.offset(), 0);
    }

    #[test]
    fn test_queued_keys_wait_for_dump() {
        let mut pager = MemoryPager::new(16, 2);
        pager.queue_keys(PagerKey::parse_script("ss").unwrap());
        pager.set_total(0);
        assert!(pager.has_pending_keys());
        assert_eq!(pager.offset(), 0);

        pager.set_total(64);
        assert!(!pager.has_pending_keys());
        assert_eq!(pager.offset(), 32);
    }

    #[test]
    fn test_key_bindings() {
        let keys = PagerKey::parse_script("a s d\tf g").unwrap();
        assert_eq!(
            keys,
            vec![
                PagerKey::ScrollUp,
                PagerKey::ScrollDown,
                PagerKey::PageUp,
                PagerKey::PageDown,
                PagerKey::Home,
            ]
        );
        assert_eq!(PagerKey::parse_script("sq"), Err('q'));

        let mut pager = MemoryPager::new(16, 4);
        pager.set_total(256);
        for (key, expected) in [
            (PagerKey::PageDown, 64),
            (PagerKey::ScrollDown, 80),
            (PagerKey::ScrollUp, 64),
            (PagerKey::PageUp, 0),
            (PagerKey::PageDown, 64),
            (PagerKey::Home, 0),
        ] {
            pager.press(key);
            assert_eq!(pager.offset(), expected, "after {:?}", key);
        }
    }

    #[test]
    fn test_pager_ignores_scroll_without_dump() {
        let mut pager = MemoryPager::new(8, 2);
        pager.scroll_down(1);
        assert_eq!(pager.offset(), 0);
        assert_eq!(pager.window(), 16);
    }
}
