//! Loading an engine state into a card and dumping it back out.
//!
//! Both sequences go through plain MMIO. Ordering matters: side effects of
//! earlier writes (the context switch, the user clip pair shift) are overwritten
//! by the later writes of the fields they disturb.

use hwtest_core::Mmio;
use tracing::warn;

use crate::regs::{
    ACCESS, ACCESS_PARKED, BETA, BITMAP_COLOR, CANVAS_CONFIG, CHROMA, CLIPRECT_CTRL, CTX_CONTROL,
    CTX_SWITCH_0, CTX_SWITCH_1, DEBUG, DST_CANVAS_MAX, DST_CANVAS_MIN, EDGEFILL, ICLIP, INTR,
    INTR_EN, INVALID, INVALID_EN, MISC32, NOTIFY, PATTERN_CONFIG, PATTERN_MONO_BITMAP, PFB_BOOT_0,
    PFB_CONFIG_0, PLANE, PMC_ENABLE, PMC_ENABLE_PGRAPH_RESET, ROP, STATUS, SUBDIVIDE, TRAP_ADDR,
    TRAP_DATA, UCLIP, VALID, VTX_BETA, VTX_X, VTX_Y, XY_MISC_0, XY_MISC_1, XY_MISC_4,
    cliprect_max, cliprect_min, pattern_mono_a, pattern_mono_rgb,
};
use crate::state::EngineState;

/// Status polls before the engine is declared locked up.
pub const LOCKUP_POLLS: u32 = 100_000;

/// A dumped state and how the dump went.
#[derive(Debug, Clone)]
pub struct DumpOutcome {
    pub state: EngineState,
    /// The engine stayed busy and was reset before reading.
    pub recovered: bool,
}

/// Pulse the PGRAPH reset line in PMC_ENABLE.
pub fn reset_pgraph<M: Mmio + ?Sized>(card: &mut M) {
    card.write32(PMC_ENABLE, PMC_ENABLE_PGRAPH_RESET);
    card.write32(PMC_ENABLE, 0xffff_ffff);
}

/// Reset PGRAPH and write every loadable field of `state`.
pub fn load_state<M: Mmio + ?Sized>(card: &mut M, state: &EngineState) {
    reset_pgraph(card);
    card.write32(ACCESS, ACCESS_PARKED);
    card.write32(INTR, 0xffff_ffff);
    card.write32(INVALID, 0xffff_ffff);
    card.write32(INTR_EN, state.intr_en);
    card.write32(INVALID_EN, state.invalid_en);
    card.write32(CTX_SWITCH_0, state.ctx_switch[0]);
    card.write32(CTX_CONTROL, state.ctx_control);
    for i in 0..2 {
        card.write32(ICLIP + i as u32 * 4, state.iclip[i]);
        card.write32(UCLIP + i as u32 * 8, state.uclip_min[i]);
        card.write32(UCLIP + 4 + i as u32 * 8, state.uclip_max[i]);
    }
    for i in 0..state.vtx_x.len() {
        card.write32(VTX_X + i as u32 * 4, state.vtx_x[i]);
        card.write32(VTX_Y + i as u32 * 4, state.vtx_y[i]);
    }
    for (i, &beta) in state.vtx_beta.iter().enumerate() {
        card.write32(VTX_BETA + i as u32 * 4, beta);
    }
    card.write32(BITMAP_COLOR[0], state.bitmap_color[0]);
    card.write32(BITMAP_COLOR[1], state.bitmap_color[1]);
    card.write32(ROP, state.rop);
    card.write32(BETA, state.beta);
    for i in 0..2 {
        card.write32(pattern_mono_rgb(i), state.pattern_mono_rgb[i]);
        card.write32(pattern_mono_a(i), state.pattern_mono_a[i]);
        card.write32(PATTERN_MONO_BITMAP[i], state.pattern_mono_bitmap[i]);
    }
    card.write32(PATTERN_CONFIG, state.pattern_config);
    card.write32(PLANE, state.plane);
    card.write32(CHROMA, state.chroma);
    card.write32(DST_CANVAS_MIN, state.dst_canvas_min);
    card.write32(DST_CANVAS_MAX, state.dst_canvas_max);
    card.write32(CANVAS_CONFIG, state.canvas_config);
    for i in 0..2 {
        card.write32(cliprect_min(i), state.cliprect_min[i]);
        card.write32(cliprect_max(i), state.cliprect_max[i]);
    }
    card.write32(CLIPRECT_CTRL, state.cliprect_ctrl);
    card.write32(XY_MISC_0, state.xy_misc_0);
    card.write32(XY_MISC_1, state.xy_misc_1);
    card.write32(XY_MISC_4[0], state.xy_misc_4[0]);
    card.write32(XY_MISC_4[1], state.xy_misc_4[1]);
    card.write32(VALID, state.valid);
    card.write32(MISC32, state.misc32);
    card.write32(SUBDIVIDE, state.subdivide);
    card.write32(EDGEFILL, state.edgefill);
    card.write32(CTX_SWITCH_1, state.ctx_switch[1]);
    card.write32(NOTIFY, state.notify);
    for (reg, value) in DEBUG.into_iter().zip(state.debug) {
        card.write32(reg, value);
    }
    card.write32(ACCESS, state.access);
    card.write32(PFB_CONFIG_0, state.pfb_config);
}

/// Wait for the engine to go idle, recovering it with a reset if it never
/// does. Returns the last STATUS read and whether a reset happened.
fn wait_idle<M: Mmio + ?Sized>(card: &mut M) -> (u32, bool) {
    let mut polls = 0;
    loop {
        let status = card.read32(STATUS);
        if status == 0 {
            return (0, false);
        }
        polls += 1;
        if polls > LOCKUP_POLLS {
            warn!("PGRAPH locked up [{status:08x}], resetting");
            let intr_en = card.read32(INTR_EN);
            let invalid_en = card.read32(INVALID_EN);
            let ctx_control = card.read32(CTX_CONTROL);
            let access = card.read32(ACCESS);
            reset_pgraph(card);
            card.write32(INTR_EN, intr_en);
            card.write32(INVALID_EN, invalid_en);
            card.write32(CTX_CONTROL, ctx_control);
            card.write32(ACCESS, access);
            return (status, true);
        }
    }
}

/// Read the whole engine state back from the card.
///
/// A persistent lockup shows up as a non-zero `status` in the result.
pub fn dump_state<M: Mmio + ?Sized>(card: &mut M) -> DumpOutcome {
    let mut state = EngineState::new();
    let (status, recovered) = wait_idle(card);
    state.status = status;
    state.access = card.read32(ACCESS);
    // Read before anything that touches the clip registers.
    state.xy_misc_1 = card.read32(XY_MISC_1);
    card.write32(ACCESS, ACCESS_PARKED);
    state.trap_addr = card.read32(TRAP_ADDR);
    state.trap_data = card.read32(TRAP_DATA);
    state.intr = card.read32(INTR) & !0x100;
    state.invalid = card.read32(INVALID);
    state.intr_en = card.read32(INTR_EN);
    state.invalid_en = card.read32(INVALID_EN);
    state.ctx_switch[0] = card.read32(CTX_SWITCH_0);
    state.ctx_control = card.read32(CTX_CONTROL) & !0x0010_0000;
    for i in 0..2 {
        state.iclip[i] = card.read32(ICLIP + i as u32 * 4);
        state.uclip_min[i] = card.read32(UCLIP + i as u32 * 8);
        state.uclip_max[i] = card.read32(UCLIP + 4 + i as u32 * 8);
    }
    for i in 0..state.vtx_x.len() {
        state.vtx_x[i] = card.read32(VTX_X + i as u32 * 4);
        state.vtx_y[i] = card.read32(VTX_Y + i as u32 * 4);
    }
    for i in 0..state.vtx_beta.len() {
        state.vtx_beta[i] = card.read32(VTX_BETA + i as u32 * 4);
    }
    state.bitmap_color[0] = card.read32(BITMAP_COLOR[0]);
    state.bitmap_color[1] = card.read32(BITMAP_COLOR[1]);
    state.rop = card.read32(ROP);
    state.plane = card.read32(PLANE);
    state.beta = card.read32(BETA);
    for i in 0..2 {
        state.pattern_mono_rgb[i] = card.read32(pattern_mono_rgb(i));
        state.pattern_mono_a[i] = card.read32(pattern_mono_a(i));
        state.pattern_mono_bitmap[i] = card.read32(PATTERN_MONO_BITMAP[i]);
    }
    state.pattern_config = card.read32(PATTERN_CONFIG);
    state.chroma = card.read32(CHROMA);
    state.canvas_config = card.read32(CANVAS_CONFIG);
    state.dst_canvas_min = card.read32(DST_CANVAS_MIN);
    state.dst_canvas_max = card.read32(DST_CANVAS_MAX);
    for i in 0..2 {
        state.cliprect_min[i] = card.read32(cliprect_min(i));
        state.cliprect_max[i] = card.read32(cliprect_max(i));
    }
    state.cliprect_ctrl = card.read32(CLIPRECT_CTRL);
    state.valid = card.read32(VALID);
    state.misc32 = card.read32(MISC32);
    state.subdivide = card.read32(SUBDIVIDE);
    state.edgefill = card.read32(EDGEFILL);
    state.xy_misc_0 = card.read32(XY_MISC_0);
    state.xy_misc_4[0] = card.read32(XY_MISC_4[0]);
    state.xy_misc_4[1] = card.read32(XY_MISC_4[1]);
    state.ctx_switch[1] = card.read32(CTX_SWITCH_1);
    state.notify = card.read32(NOTIFY);
    for (i, reg) in DEBUG.into_iter().enumerate() {
        state.debug[i] = card.read32(reg);
    }
    state.pfb_config = card.read32(PFB_CONFIG_0);
    state.pfb_boot = card.read32(PFB_BOOT_0);
    DumpOutcome { state, recovered }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hwtest_core::RegisterFile;

    #[test]
    fn load_starts_with_reset_pulse_and_parks_access() {
        let mut card = RegisterFile::new();
        load_state(&mut card, &EngineState::default());
        assert_eq!(
            &card.writes[..5],
            &[
                (PMC_ENABLE, 0xffff_efff),
                (PMC_ENABLE, 0xffff_ffff),
                (ACCESS, ACCESS_PARKED),
                (INTR, 0xffff_ffff),
                (INVALID, 0xffff_ffff),
            ]
        );
    }

    #[test]
    fn load_ends_with_access_then_pfb_config() {
        let state = EngineState {
            access: 0x0f01_2111,
            pfb_config: 0x0000_1230,
            ..EngineState::default()
        };
        let mut card = RegisterFile::new();
        load_state(&mut card, &state);
        let tail = &card.writes[card.writes.len() - 2..];
        assert_eq!(tail, &[(ACCESS, 0x0f01_2111), (PFB_CONFIG_0, 0x0000_1230)]);
    }

    #[test]
    fn load_writes_clips_before_vertices() {
        let mut card = RegisterFile::new();
        load_state(&mut card, &EngineState::default());
        let offsets = card.write_offsets();
        let pos = |reg| offsets.iter().position(|&o| o == reg);
        assert!(pos(UCLIP + 0xc) < pos(VTX_X));
        assert!(pos(VTX_Y + 17 * 4) < pos(VTX_BETA));
        assert!(pos(XY_MISC_1) > pos(VTX_X));
        assert!(pos(XY_MISC_4[1]) > pos(ICLIP + 4));
    }

    #[test]
    fn dump_reads_access_and_xy_misc_1_before_parking() {
        let mut card = RegisterFile::new();
        card.preset(ACCESS, 0x0f00_d111);
        card.preset(XY_MISC_1, 0x0300_0001);
        let dump = dump_state(&mut card);
        assert!(!dump.recovered);
        assert_eq!(dump.state.access, 0x0f00_d111);
        assert_eq!(dump.state.xy_misc_1, 0x0300_0001);
        assert_eq!(&card.reads[..3], &[STATUS, ACCESS, XY_MISC_1]);
        assert_eq!(card.writes[0], (ACCESS, ACCESS_PARKED));
    }

    #[test]
    fn dump_masks_volatile_bits() {
        let mut card = RegisterFile::new();
        card.preset(INTR, 0x1000_0101);
        card.preset(CTX_CONTROL, 0x0111_0000);
        let state = dump_state(&mut card).state;
        assert_eq!(state.intr, 0x1000_0001);
        assert_eq!(state.ctx_control, 0x0101_0000);
    }

    #[test]
    fn stuck_status_triggers_reset_and_restore() {
        let mut card = RegisterFile::new();
        card.preset(STATUS, 1);
        card.preset(INTR_EN, 0x1111_0000);
        card.preset(ACCESS, 0x0f00_1111);
        let dump = dump_state(&mut card);
        assert!(dump.recovered);
        assert_eq!(dump.state.status, 1);
        assert_eq!(
            &card.writes[..4],
            &[
                (PMC_ENABLE, 0xffff_efff),
                (PMC_ENABLE, 0xffff_ffff),
                (INTR_EN, 0x1111_0000),
                (INVALID_EN, 0),
            ]
        );
    }
}
