//! Register access interface.

use std::collections::HashMap;

/// 32-bit register access to a card's BAR0.
///
/// Tests access registers, method ports and VRAM through this trait. Every
/// access is synchronous and uncached: a read after a write observes the
/// write, in program order.
pub trait Mmio {
    /// Read a 32-bit word at the given BAR0 offset.
    fn read32(&mut self, offset: u32) -> u32;

    /// Write a 32-bit word at the given BAR0 offset.
    fn write32(&mut self, offset: u32, value: u32);
}

impl<M: Mmio + ?Sized> Mmio for &mut M {
    fn read32(&mut self, offset: u32) -> u32 {
        (**self).read32(offset)
    }

    fn write32(&mut self, offset: u32, value: u32) {
        (**self).write32(offset, value);
    }
}

/// Sparse register file: reads return the last value written, or zero.
///
/// Records every access in order, which is what unit tests of register
/// sequences care about.
#[derive(Debug, Default, Clone)]
pub struct RegisterFile {
    regs: HashMap<u32, u32>,
    /// Every write, in order.
    pub writes: Vec<(u32, u32)>,
    /// Every read offset, in order.
    pub reads: Vec<u32>,
}

impl RegisterFile {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset a register without recording a write.
    pub fn preset(&mut self, offset: u32, value: u32) {
        self.regs.insert(offset, value);
    }

    /// Current value of a register without recording a read.
    #[must_use]
    pub fn peek(&self, offset: u32) -> u32 {
        self.regs.get(&offset).copied().unwrap_or(0)
    }

    /// Offsets written, in order, with duplicates.
    #[must_use]
    pub fn write_offsets(&self) -> Vec<u32> {
        self.writes.iter().map(|&(offset, _)| offset).collect()
    }
}

impl Mmio for RegisterFile {
    fn read32(&mut self, offset: u32) -> u32 {
        self.reads.push(offset);
        self.peek(offset)
    }

    fn write32(&mut self, offset: u32, value: u32) {
        self.writes.push((offset, value));
        self.regs.insert(offset, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwritten_registers_read_zero() {
        let mut regs = RegisterFile::new();
        assert_eq!(regs.read32(0x40_0100), 0);
        assert_eq!(regs.reads, vec![0x40_0100]);
    }

    #[test]
    fn reads_return_last_write() {
        let mut regs = RegisterFile::new();
        regs.write32(0x40_0104, 0x1234_5678);
        regs.write32(0x40_0104, 0x0000_0042);
        assert_eq!(regs.read32(0x40_0104), 0x42);
        assert_eq!(regs.write_offsets(), vec![0x40_0104, 0x40_0104]);
    }

    #[test]
    fn preset_is_not_recorded() {
        let mut regs = RegisterFile::new();
        regs.preset(0x00_0000, 0x0001_0100);
        assert!(regs.writes.is_empty());
        assert_eq!(regs.peek(0x00_0000), 0x0001_0100);
    }

    #[test]
    fn mutable_reference_forwards() {
        fn poke(mut mmio: impl Mmio) {
            mmio.write32(0x200, 0xffff_ffff);
        }
        let mut regs = RegisterFile::new();
        poke(&mut regs);
        assert_eq!(regs.peek(0x200), 0xffff_ffff);
    }
}
