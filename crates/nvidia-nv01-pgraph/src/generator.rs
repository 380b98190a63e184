//! Random engine state generator.

use hwtest_core::Mmio;
use rand::Rng;

use crate::regs::{
    ACCESS_WRITE_FLAGS, BETA_MASK, CANVAS_CONFIG_MASK, CANVAS_MAX_MASK, CLIP_MASK, CLIPRECT_CTRL_MASK,
    CLIPRECT_MASK, COLOR_MASK, CTX_CONTROL_MASK, CTX_SWITCH_0_MASK, CTX_SWITCH_1_MASK, DEBUG_MASK,
    EDGEFILL_MASK, INVALID_EN_MASK, NOTIFY_MASK, PATTERN_A_MASK, PATTERN_CONFIG_MASK,
    PATTERN_RGB_MASK, PFB_BOOT_0, PFB_CONFIG_0, PFB_CONFIG_RANDOM, ROP_MASK, SUBDIVIDE_MASK,
    VALID_MASK, VTX_BETA_MASK, XY_MISC_0_MASK, XY_MISC_1_MASK, XY_MISC_4_MASK,
};
use crate::state::EngineState;

/// INTR_EN bits the generator sets. Bit 8 is writable but never generated.
const GEN_INTR_EN_MASK: u32 = 0x1111_1011;

/// Draw a random, loadable engine state.
///
/// Every field is masked to its writable bits. INTR, INVALID, STATUS and
/// the trap registers start clear; ACCESS has all write flags and enables
/// set with a random bound class. The PFB fields keep the card's live
/// configuration except for the width, depth and dual-buffer bits.
pub fn generate_state<R, M>(rng: &mut R, card: &mut M) -> EngineState
where
    R: Rng + ?Sized,
    M: Mmio + ?Sized,
{
    let mut state = EngineState::new();
    for (reg, mask) in state.debug.iter_mut().zip(DEBUG_MASK) {
        *reg = rng.random::<u32>() & mask;
    }
    state.intr = 0;
    state.invalid = 0;
    state.intr_en = rng.random::<u32>() & GEN_INTR_EN_MASK;
    state.invalid_en = rng.random::<u32>() & INVALID_EN_MASK;
    state.ctx_switch[0] = rng.random::<u32>() & CTX_SWITCH_0_MASK;
    state.ctx_control = rng.random::<u32>() & CTX_CONTROL_MASK;
    for i in 0..state.vtx_x.len() {
        state.vtx_x[i] = rng.random();
        state.vtx_y[i] = rng.random();
    }
    for beta in &mut state.vtx_beta {
        *beta = rng.random::<u32>() & VTX_BETA_MASK;
    }
    for i in 0..2 {
        state.iclip[i] = rng.random::<u32>() & CLIP_MASK;
        state.uclip_min[i] = rng.random::<u32>() & CLIP_MASK;
        state.uclip_max[i] = rng.random::<u32>() & CLIP_MASK;
        state.pattern_mono_rgb[i] = rng.random::<u32>() & PATTERN_RGB_MASK;
        state.pattern_mono_a[i] = rng.random::<u32>() & PATTERN_A_MASK;
        state.pattern_mono_bitmap[i] = rng.random();
        state.bitmap_color[i] = rng.random::<u32>() & COLOR_MASK;
    }
    state.pattern_config = rng.random::<u32>() & PATTERN_CONFIG_MASK;
    state.rop = rng.random::<u32>() & ROP_MASK;
    state.plane = rng.random::<u32>() & COLOR_MASK;
    state.chroma = rng.random::<u32>() & COLOR_MASK;
    state.beta = rng.random::<u32>() & BETA_MASK;
    state.canvas_config = rng.random::<u32>() & CANVAS_CONFIG_MASK;
    state.xy_misc_0 = rng.random::<u32>() & XY_MISC_0_MASK;
    state.xy_misc_1 = rng.random::<u32>() & XY_MISC_1_MASK;
    state.xy_misc_4[0] = rng.random::<u32>() & XY_MISC_4_MASK;
    state.xy_misc_4[1] = rng.random::<u32>() & XY_MISC_4_MASK;
    state.valid = rng.random::<u32>() & VALID_MASK;
    state.misc32 = rng.random();
    state.subdivide = rng.random::<u32>() & SUBDIVIDE_MASK;
    state.edgefill = rng.random::<u32>() & EDGEFILL_MASK;
    state.ctx_switch[1] = rng.random::<u32>() & CTX_SWITCH_1_MASK;
    state.notify = rng.random::<u32>() & NOTIFY_MASK;
    state.dst_canvas_min = rng.random();
    state.dst_canvas_max = rng.random::<u32>() & CANVAS_MAX_MASK;
    state.cliprect_min[0] = rng.random::<u32>() & CLIPRECT_MASK;
    state.cliprect_min[1] = rng.random::<u32>() & CLIPRECT_MASK;
    state.cliprect_max[0] = rng.random::<u32>() & CLIPRECT_MASK;
    state.cliprect_max[1] = rng.random::<u32>() & CLIPRECT_MASK;
    state.cliprect_ctrl = rng.random::<u32>() & CLIPRECT_CTRL_MASK;
    state.access = (rng.random::<u32>() & 0x0001_f000) | ACCESS_WRITE_FLAGS | 0x111;
    state.status = 0;
    state.trap_addr = 0;
    state.trap_data = 0;
    state.pfb_config = rng.random::<u32>() & PFB_CONFIG_RANDOM;
    state.pfb_config |= card.read32(PFB_CONFIG_0) & !(PFB_CONFIG_RANDOM | 1);
    state.pfb_boot = card.read32(PFB_BOOT_0);
    state
}
