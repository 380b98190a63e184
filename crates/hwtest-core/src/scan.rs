//! Writable-bit scans.

use std::fmt;

use crate::Mmio;

/// A register that did not hold the bits a scan expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitScanMismatch {
    pub offset: u32,
    pub written: u32,
    pub expected: u32,
    pub read: u32,
}

impl fmt::Display for BitScanMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scan {:06x}: wrote {:08x}, expected {:08x}, read {:08x}",
            self.offset, self.written, self.expected, self.read
        )
    }
}

/// Check which bits of a register are writable.
///
/// `all1` is the value read back after writing all ones, `all0` after
/// writing zero. Each bit is then walked as a lone one and a lone zero, and
/// must read back as `all1` where written one and `all0` where written zero.
/// The register's previous value is restored afterwards, pass or fail.
pub fn bit_scan<M: Mmio + ?Sized>(
    mmio: &mut M,
    offset: u32,
    all1: u32,
    all0: u32,
) -> Result<(), BitScanMismatch> {
    let saved = mmio.read32(offset);
    let result = scan_patterns(mmio, offset, all1, all0);
    mmio.write32(offset, saved);
    result
}

fn scan_patterns<M: Mmio + ?Sized>(
    mmio: &mut M,
    offset: u32,
    all1: u32,
    all0: u32,
) -> Result<(), BitScanMismatch> {
    let patterns = [u32::MAX, 0]
        .into_iter()
        .chain((0..32).map(|n| 1u32 << n))
        .chain((0..32).map(|n| !(1u32 << n)));
    for written in patterns {
        let expected = (all1 & written) | (all0 & !written);
        mmio.write32(offset, written);
        let read = mmio.read32(offset);
        if read != expected {
            return Err(BitScanMismatch {
                offset,
                written,
                expected,
                read,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Register that keeps only the bits in `mask`.
    struct Masked {
        mask: u32,
        value: u32,
    }

    impl Mmio for Masked {
        fn read32(&mut self, _offset: u32) -> u32 {
            self.value
        }

        fn write32(&mut self, _offset: u32, value: u32) {
            self.value = value & self.mask;
        }
    }

    #[test]
    fn matching_mask_passes_and_restores() {
        let mut reg = Masked {
            mask: 0x0fff_0fff,
            value: 0x0123_0456,
        };
        assert_eq!(bit_scan(&mut reg, 0x40_068c, 0x0fff_0fff, 0), Ok(()));
        assert_eq!(reg.value, 0x0123_0456);
    }

    #[test]
    fn extra_writable_bit_is_reported() {
        let mut reg = Masked {
            mask: 0x0000_01ff,
            value: 0,
        };
        let err = bit_scan(&mut reg, 0x40_06a0, 0x113, 0).unwrap_err();
        assert_eq!(err.written, u32::MAX);
        assert_eq!(err.read, 0x1ff);
        assert_eq!(err.expected, 0x113);
    }
}
