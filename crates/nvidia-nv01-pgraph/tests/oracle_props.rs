use hwtest_core::RegisterFile;
use nvidia_nv01_pgraph::oracle::{
    method, mmio_read, mmio_write, readable_registers, relative_registers,
};
use nvidia_nv01_pgraph::regs::{
    self, BETA_MASK, CANVAS_CONFIG_MASK, CLIP_MASK, CLIPRECT_CTRL_MASK, CLIPRECT_MASK,
    COLOR_MASK, CTX_CONTROL_MASK, CTX_SWITCH_0_MASK, CTX_SWITCH_1_MASK, DEBUG_MASK,
    EDGEFILL_MASK, INTR_EN_MASK, INVALID_EN_MASK, NOTIFY_MASK, PATTERN_CONFIG_MASK, ROP_MASK,
    SUBDIVIDE_MASK, VALID_MASK, VTX_BETA_MASK, XY_MISC_0_MASK, XY_MISC_1_MASK, XY_MISC_4_MASK,
};
use nvidia_nv01_pgraph::{EngineState, generate_state};
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn generated(seed: u64) -> EngineState {
    let mut card = RegisterFile::new();
    card.preset(regs::PFB_CONFIG_0, 0x0000_0200);
    card.preset(regs::PFB_BOOT_0, 2);
    generate_state(&mut StdRng::seed_from_u64(seed), &mut card)
}

fn within(value: u32, mask: u32) -> bool {
    value & !mask == 0
}

/// Every masked field holds only writable bits.
fn assert_masked(state: &EngineState) {
    for (v, m) in state.debug.iter().zip(DEBUG_MASK) {
        assert!(within(*v, m), "debug {v:08x}");
    }
    assert!(within(state.intr_en, INTR_EN_MASK));
    assert!(within(state.invalid_en, INVALID_EN_MASK));
    assert!(within(state.ctx_switch[0], CTX_SWITCH_0_MASK));
    assert!(within(state.ctx_switch[1], CTX_SWITCH_1_MASK));
    assert!(within(state.ctx_control, CTX_CONTROL_MASK));
    assert!(within(state.notify, NOTIFY_MASK));
    for axis in 0..2 {
        assert!(within(state.iclip[axis], CLIP_MASK));
        assert!(within(state.uclip_min[axis], CLIP_MASK));
        assert!(within(state.uclip_max[axis], CLIP_MASK));
        assert!(within(state.xy_misc_4[axis], XY_MISC_4_MASK));
        assert!(within(state.cliprect_min[axis], CLIPRECT_MASK));
        assert!(within(state.cliprect_max[axis], CLIPRECT_MASK));
        assert!(within(state.bitmap_color[axis], COLOR_MASK));
    }
    assert!(state.vtx_beta.iter().all(|&b| within(b, VTX_BETA_MASK)));
    assert!(within(state.pattern_config, PATTERN_CONFIG_MASK));
    assert!(within(state.rop, ROP_MASK));
    assert!(within(state.plane, COLOR_MASK));
    assert!(within(state.chroma, COLOR_MASK));
    assert!(within(state.beta, BETA_MASK));
    assert!(within(state.canvas_config, CANVAS_CONFIG_MASK));
    assert!(within(state.cliprect_ctrl, CLIPRECT_CTRL_MASK));
    assert!(within(state.xy_misc_0, XY_MISC_0_MASK));
    assert!(within(state.xy_misc_1, XY_MISC_1_MASK), "{:08x}", state.xy_misc_1);
    assert!(within(state.valid, VALID_MASK));
    assert!(within(state.subdivide, SUBDIVIDE_MASK));
    assert!(within(state.edgefill, EDGEFILL_MASK));
    assert!(within(state.access, regs::ACCESS_MASK | regs::ACCESS_WRITE_FLAGS));
}

proptest! {
    #[test]
    fn register_writes_keep_fields_masked(seed in any::<u64>(), pick in any::<prop::sample::Index>(), value in any::<u32>()) {
        let mut offsets = readable_registers();
        offsets.extend(relative_registers());
        let offset = offsets[pick.index(offsets.len())];
        let mut state = generated(seed);
        mmio_write(&mut state, offset, value);
        assert_masked(&state);
    }

    #[test]
    fn methods_are_deterministic(seed in any::<u64>(), cls in 1u32..0x20, mthd in 0u32..0x800, value in any::<u32>()) {
        let orig = generated(seed);
        let mut a = orig.clone();
        let mut b = orig;
        let ea = method(&mut a, cls, mthd * 4, value);
        let eb = method(&mut b, cls, mthd * 4, value);
        prop_assert_eq!(ea, eb);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn soft_reset_is_idempotent(seed in any::<u64>()) {
        let mut once = generated(seed);
        once.reset();
        let mut twice = once.clone();
        twice.reset();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn reads_outside_user_clip_have_no_side_effects(seed in any::<u64>(), pick in any::<prop::sample::Index>()) {
        let offsets = readable_registers();
        let offset = offsets[pick.index(offsets.len())];
        prop_assume!(!(regs::UCLIP..regs::UCLIP + 0x10).contains(&offset));
        let orig = generated(seed);
        let mut state = orig.clone();
        mmio_read(&mut state, offset);
        prop_assert_eq!(state, orig);
    }
}

#[test]
fn generated_states_are_masked() {
    for seed in 0..256 {
        assert_masked(&generated(seed));
    }
}
