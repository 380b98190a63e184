//! A software NV1 behind the [`Mmio`] interface.
//!
//! PGRAPH and PFB registers go through the oracle's register rules, method
//! ports through its method dispatch, and the single-pixel draws it issues
//! land in VRAM. Scenarios run against it exactly as against a real card.

use hwtest_core::Mmio;
use hwtest_core::bits::bit;
use tracing::debug;

use crate::oracle::{
    DrawOp, Prediction, blit_pixels, bytes_per_pixel, method, mmio_read, mmio_write,
    pixel_offset, point_pixels, vram_size,
};
use crate::regs::{PMC_BOOT_0, PMC_ENABLE, VRAM_BASE, decode_method};
use crate::state::EngineState;

/// PMC_BOOT_0 of an NV1.
pub const NV1_BOOT_0: u32 = 0x0001_0100;

/// PMC_ENABLE at power-on: every engine enabled.
const PMC_ENABLE_DEFAULT: u32 = 0x1111_1111;

/// PFB_BOOT_0 of a 4 MiB board.
const PFB_BOOT_DEFAULT: u32 = 2;

/// PMC_ENABLE bit holding PGRAPH out of reset.
const PMC_ENABLE_PGRAPH: u32 = 12;

#[derive(Debug, Clone)]
pub struct SimulatedCard {
    state: EngineState,
    pmc_enable: u32,
    vram: Vec<u8>,
}

impl Default for SimulatedCard {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedCard {
    #[must_use]
    pub fn new() -> Self {
        let state = EngineState {
            pfb_boot: PFB_BOOT_DEFAULT,
            ..EngineState::default()
        };
        let vram = vec![0; vram_size(state.pfb_boot) as usize];
        Self {
            state,
            pmc_enable: PMC_ENABLE_DEFAULT,
            vram,
        }
    }

    /// Current engine state, including hidden state a dump cannot reach
    /// without side effects.
    #[must_use]
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Mark the engine busy, as after a draw that locks it up.
    pub fn hang(&mut self) {
        self.state.status = 1;
    }

    fn reset_pgraph(&mut self) {
        self.state = EngineState {
            pfb_config: self.state.pfb_config,
            pfb_boot: self.state.pfb_boot,
            ..EngineState::default()
        };
    }

    fn vram_range(&self, offset: u32) -> Option<usize> {
        let addr = offset.checked_sub(VRAM_BASE)? as usize;
        (addr + 4 <= self.vram.len()).then_some(addr)
    }

    fn read_pixel(&self, addr: u32) -> u32 {
        let cpp = bytes_per_pixel(self.state.pfb_config) as usize;
        let addr = addr as usize;
        self.vram
            .get(addr..addr + cpp)
            .map_or(0, |bytes| {
                bytes
                    .iter()
                    .rev()
                    .fold(0, |acc, &b| acc << 8 | u32::from(b))
            })
    }

    fn write_pixel(&mut self, addr: u32, pixel: u32) {
        let cpp = bytes_per_pixel(self.state.pfb_config) as usize;
        let addr = addr as usize;
        if let Some(bytes) = self.vram.get_mut(addr..addr + cpp) {
            bytes.copy_from_slice(&pixel.to_le_bytes()[..cpp]);
        }
    }

    fn pixels_at(&self, x: u32, y: u32) -> ([u32; 2], [u32; 2]) {
        let addrs = [0, 1].map(|buffer| pixel_offset(&self.state, x, y, buffer));
        (addrs, addrs.map(|addr| self.read_pixel(addr)))
    }

    fn draw(&mut self, op: DrawOp) {
        let (addrs, pixels) = match op {
            DrawOp::Point { x, y } => {
                let (addrs, dst) = self.pixels_at(x, y);
                (addrs, point_pixels(&self.state, x, y, dst))
            }
            DrawOp::Blit { src, dst } => {
                let (_, spixels) = self.pixels_at(src.0, src.1);
                let (addrs, dpixels) = self.pixels_at(dst.0, dst.1);
                (addrs, blit_pixels(&self.state, src, dst, spixels, dpixels))
            }
        };
        let buffers = if bit(self.state.pfb_config, 12) { 2 } else { 1 };
        for (&addr, &pixel) in addrs.iter().zip(&pixels).take(buffers) {
            self.write_pixel(addr, pixel);
        }
    }

    fn submit(&mut self, cls: u32, mthd: u32, value: u32) {
        let effect = method(&mut self.state, cls, mthd, value);
        debug!("method {cls:02x}:{mthd:04x} = {value:08x} -> {effect:?}");
        if let Some(op) = effect.draw {
            self.draw(op);
        }
        if effect.prediction == Prediction::Hang {
            self.hang();
        }
    }
}

impl Mmio for SimulatedCard {
    fn read32(&mut self, offset: u32) -> u32 {
        match offset {
            PMC_BOOT_0 => NV1_BOOT_0,
            PMC_ENABLE => self.pmc_enable,
            _ => match self.vram_range(offset) {
                Some(addr) => {
                    let mut word = [0; 4];
                    word.copy_from_slice(&self.vram[addr..addr + 4]);
                    u32::from_le_bytes(word)
                }
                None => mmio_read(&mut self.state, offset),
            },
        }
    }

    fn write32(&mut self, offset: u32, value: u32) {
        if offset == PMC_ENABLE {
            if !bit(value, PMC_ENABLE_PGRAPH) {
                self.reset_pgraph();
            }
            self.pmc_enable = value;
        } else if let Some(addr) = self.vram_range(offset) {
            self.vram[addr..addr + 4].copy_from_slice(&value.to_le_bytes());
        } else if let Some((cls, mthd)) = decode_method(offset) {
            self.submit(cls, mthd, value);
        } else {
            mmio_write(&mut self.state, offset, value);
        }
    }
}
