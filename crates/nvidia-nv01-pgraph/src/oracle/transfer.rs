//! The image-from-CPU data walk.
//!
//! Each data word of an IFC or BITMAP transfer advances a hidden cursor
//! across the destination: slot 0/1 hold the current span ends, slot 2 the
//! pixels left in the row, slot 3 the row width, slot 4 the row origin. The
//! sign of slot 2 (latched in `xy_misc_4` bits 28-29) decides whether the
//! walk continues along the row or wraps to the next one.

use hwtest_core::bits::{bit, extract, set_bit};

use super::color::{cpp_in, expand_mono};
use super::geometry::{bump_vtxid, iclip_fixup, vtx_add, vtx_cmp, vtx_fixup};
use super::method::Prediction;
use crate::regs::class;
use crate::state::{EngineState, X, Y};

/// Row wraps in one data word before the engine is considered hung.
pub const WALK_LIMIT: u32 = 10_000;

/// VALID bits an image transfer needs: source size, destination size and
/// origin.
const TRANSFER_VALID: u32 = 0x0003_8038;

/// Predict a data word of an image transfer.
///
/// The word always lands in `misc32` (bit-reversed per byte for BITMAP in
/// LSB-first mode). If an IFC or BITMAP object is bound it also steps the
/// destination walk.
pub fn ifc_data(state: &mut EngineState, value: u32, bitmap: bool) -> Prediction {
    state.misc32 = if bitmap {
        expand_mono(state, value)
    } else {
        value
    };
    set_bit(&mut state.xy_misc_1, 24, false);
    let prediction = walk(state);
    if state.intr != 0 {
        state.access &= !0x101;
    }
    prediction
}

fn out_of_range_bits(state: &EngineState) -> bool {
    state.xy_misc_4[X] & 0xf0 != 0 || state.xy_misc_4[Y] & 0xf0 != 0
}

fn check_setup(state: &mut EngineState) {
    if state.valid & TRANSFER_VALID != TRANSFER_VALID {
        state.intr |= 1 << 16;
    }
    if out_of_range_bits(state) {
        state.intr |= 1 << 12;
    }
}

/// Step X of the span by `steps` pixels from the other span end, clamping
/// to the row end when the row is exhausted.
fn advance_x(state: &mut EngineState, vidx: usize, steps: u32) {
    state.vtx_x[2] = state.vtx_x[2].wrapping_sub(steps);
    vtx_cmp(state, X, 2);
    vtx_add(state, X, vidx, vidx, state.vtx_x[vidx ^ 1], steps, false);
    if bit(state.xy_misc_4[X], 28) {
        vtx_add(state, X, vidx, vidx, state.vtx_x[2], state.vtx_x[vidx], false);
    }
}

fn walk(state: &mut EngineState) -> Prediction {
    let cls = state.class();
    if cls != class::IFC && cls != class::BITMAP {
        return Prediction::Exact;
    }
    let steps = if cls == class::BITMAP {
        0x20
    } else {
        4 / cpp_in(state.ctx_switch[0])
    };
    if state.valid & 0x1100_0000 != 0 && bit(state.ctx_switch[0], 7) {
        state.intr |= 1 << 16;
    }
    if bit(state.canvas_config, 24) {
        state.intr |= 1 << 20;
    }
    if bit(state.cliprect_ctrl, 8) {
        state.intr |= 1 << 24;
    }
    if bit(state.xy_misc_0, 12) {
        check_setup(state);
        return Prediction::Exact;
    }

    if bit(state.xy_misc_1, 0) {
        check_setup(state);
    } else {
        // First word: compute the far corner and start the first row.
        state.vtx_x[6] = state.vtx_x[4].wrapping_add(state.vtx_x[5]);
        state.vtx_y[6] = state.vtx_y[4].wrapping_add(state.vtx_y[5]);
        for n in [14, 18, 20] {
            set_bit(&mut state.xy_misc_1, n, false);
        }
        if state.valid & TRANSFER_VALID != TRANSFER_VALID {
            state.intr |= 1 << 16;
            if out_of_range_bits(state) {
                state.intr |= 1 << 12;
            }
            return Prediction::Exact;
        }
        iclip_fixup(state, X, state.vtx_x[6], false);
        iclip_fixup(state, Y, state.vtx_y[6], false);
        set_bit(&mut state.xy_misc_1, 0, true);
        if bit(state.edgefill, 8) {
            return Prediction::Unmodeled;
        }
        state.set_cursor(0);
        state.vtx_y[2] = state.vtx_y[3].wrapping_add(1);
        vtx_cmp(state, Y, 2);
        vtx_fixup(state, Y, 0, 0, true, Some(4), 0);
        vtx_fixup(state, X, 0, 0, true, Some(4), 0);
        state.vtx_x[2] = state.vtx_x[3];
        advance_x(state, 1, steps);
        let xy4 = state.xy_misc_4;
        if xy4[X] & 0xc0 != 0 || xy4[Y] & 0xf0 != 0 || xy4[X] & 0x30 == 0x30 {
            state.intr |= 1 << 12;
        }
    }

    let mut wraps = 0;
    loop {
        let mut vidx = extract(state.xy_misc_0, 28, 1) as usize;
        if bit(state.edgefill, 8) {
            return Prediction::Unmodeled;
        }
        if state.intr != 0 {
            bump_vtxid(state);
            if bit(state.xy_misc_4[X], 29) {
                state.vtx_x[2] = state.vtx_x[2].wrapping_sub(steps);
                vtx_cmp(state, X, 2);
            } else if bit(state.xy_misc_4[Y], 28) {
                state.vtx_y[2] = state.vtx_y[2].wrapping_add(1);
            }
            return Prediction::Exact;
        }
        if bit(state.xy_misc_4[X], 29) {
            bump_vtxid(state);
        } else {
            // Row exhausted: move to the next row.
            state.set_cursor(0);
            vidx = 1;
            let mut check_y = false;
            if bit(state.xy_misc_4[Y], 28) {
                state.vtx_y[2] = state.vtx_y[2].wrapping_add(1);
                vtx_add(state, Y, 0, 0, state.vtx_y[0], state.vtx_y[1], true);
                check_y = true;
            } else {
                state.vtx_x[4] = state.vtx_x[4].wrapping_add(state.vtx_x[3]);
                state.vtx_y[2] = state.vtx_y[3].wrapping_add(1);
                vtx_fixup(state, Y, 0, 0, true, Some(4), 0);
            }
            vtx_cmp(state, Y, 2);
            vtx_fixup(state, X, 0, 0, true, Some(4), 0);
            if bit(state.xy_misc_4[X], 28) {
                vtx_add(state, X, vidx, vidx, state.vtx_x[vidx ^ 1], !state.vtx_x[2], true);
                state.vtx_x[2] = state.vtx_x[2].wrapping_add(state.vtx_x[3]);
                vtx_cmp(state, X, 2);
                if bit(state.xy_misc_4[X], 28) {
                    vtx_add(state, X, vidx, vidx, state.vtx_x[2], state.vtx_x[vidx], false);
                    if state.xy_misc_4[X] & 0x30 == 0x30 {
                        state.intr |= 1 << 12;
                    }
                    check_y = true;
                } else if state.xy_misc_4[X] & 0x20 != 0 {
                    state.intr |= 1 << 12;
                }
                if state.xy_misc_4[Y] & 0x10 != 0 && check_y {
                    state.intr |= 1 << 12;
                }
                wraps += 1;
                if wraps > WALK_LIMIT {
                    return Prediction::Hang;
                }
                continue;
            }
            state.vtx_x[2] = state.vtx_x[3];
        }
        advance_x(state, vidx, steps);
        return Prediction::Exact;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// An IFC transfer of a 4x1 A8R8G8B8 image at the canvas origin, ready
    /// for its first data word.
    fn ifc_4x1() -> EngineState {
        let mut state = EngineState {
            access: 0x0f01_1111,
            ctx_switch: [1 << 9, 0],
            dst_canvas_max: 0x0100_0400,
            valid: TRANSFER_VALID,
            ..EngineState::default()
        };
        state.vtx_x[3] = 4;
        state.vtx_y[3] = 1u32.wrapping_neg();
        state.vtx_x[5] = 4;
        state.vtx_y[5] = 1;
        state
    }

    #[test]
    fn data_without_image_object_only_latches_word() {
        let mut state = EngineState {
            access: 0x0f00_8111,
            xy_misc_1: 0x0100_0000,
            ctx_switch: [1 << 14, 0],
            ..EngineState::default()
        };
        let before = state.clone();
        assert_eq!(ifc_data(&mut state, 0x0000_0001, true), Prediction::Exact);
        assert_eq!(state.misc32, 0x0000_0080);
        assert_eq!(state.xy_misc_1, 0);
        assert_eq!(state.vtx_x, before.vtx_x);
    }

    #[test]
    fn empty_image_reports_missing_setup() {
        let mut state = ifc_4x1();
        state.valid = 0;
        state.xy_misc_0 = 0x1000;
        assert_eq!(ifc_data(&mut state, 0, false), Prediction::Exact);
        assert_eq!(state.intr, 1 << 16);
        assert_eq!(state.access & 0x101, 0);
    }

    #[test]
    fn first_word_starts_the_row() {
        let mut state = ifc_4x1();
        assert_eq!(ifc_data(&mut state, 0xdead_beef, false), Prediction::Exact);
        assert_eq!(state.intr, 0);
        assert_eq!(state.misc32, 0xdead_beef);
        assert_eq!(state.iclip, [4, 1]);
        assert_eq!(state.xy_misc_1 & 0x0002_2001, 0x0002_2001);
        assert_eq!(&state.vtx_x[..3], &[2, 1, 2]);
        assert_eq!(state.cursor(), 1);

        assert_eq!(ifc_data(&mut state, 0, false), Prediction::Exact);
        assert_eq!(&state.vtx_x[..3], &[2, 3, 1]);
        assert_eq!(state.cursor(), 0);
        assert_eq!(state.access & 0x101, 0x101);
    }

    #[test]
    fn edgefill_start_is_unmodeled() {
        let mut state = ifc_4x1();
        state.edgefill = 0x100;
        assert_eq!(ifc_data(&mut state, 0, false), Prediction::Unmodeled);
    }

    #[test]
    fn zero_width_rows_hang() {
        let mut state = ifc_4x1();
        state.xy_misc_1 = 1;
        state.set_cursor(1);
        state.vtx_x[2] = u32::MAX;
        state.vtx_x[3] = 0;
        state.xy_misc_4[X] |= 1 << 28;
        assert_eq!(ifc_data(&mut state, 0, false), Prediction::Hang);
    }
}
