//! Vertex RAM, clip bounds and per-vertex status.
//!
//! Every vertex write lands in one of 18 slots per axis and updates a 4-bit
//! group of status in `xy_misc_4` for the sub-slot it was written through:
//! carry out of the add, 16-bit overflow, and where the value sits relative
//! to the current clip bounds.

use hwtest_core::bits::{bit, extract, extract_signed, insert, sext, set_bit};

use crate::regs::{CLIP_MASK, class};
use crate::state::EngineState;

/// Clip status bits, per sub-slot.
pub const CSTAT_BELOW_MIN: u32 = 1;
pub const CSTAT_AT_MIN: u32 = 2;
pub const CSTAT_ABOVE_MAX: u32 = 4;
pub const CSTAT_AT_MAX: u32 = 8;

/// Effective inclusive clip bounds per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipBounds {
    pub min: [i32; 2],
    pub max: [i32; 2],
}

/// Number of vertex slots the cursor cycles through for a class.
#[must_use]
pub fn vertex_count(cls: u32) -> usize {
    match cls {
        class::POINT | class::LINE | class::LIN | class::RECT => 2,
        class::TRI => 3,
        class::TEXLIN | class::TEXLINBETA | class::BLIT => 4,
        class::TEXQUAD | class::TEXQUADBETA => 9,
        class::IFC | class::BITMAP | class::IFM | class::ITM => 2,
        _ => 16,
    }
}

/// Signed canvas origin along `axis`.
#[must_use]
pub fn canvas_origin(state: &EngineState, axis: usize) -> i32 {
    extract_signed(state.dst_canvas_min, 16 * axis as u32, 16)
}

fn fract_coords(state: &EngineState) -> bool {
    bit(state.xy_misc_1, 25)
}

/// Intersect canvas, user clip and inclusive clip.
///
/// The user clip applies when armed by a write (`xy_misc_1` bit 12/16),
/// the inclusive clip likewise (bit 13/17). Textured classes see the bounds
/// clamped to the range their coordinates can express.
#[must_use]
pub fn clip_bounds(state: &EngineState) -> ClipBounds {
    let tex = class::is_tex(state.class());
    let fract = fract_coords(state);
    let mut bounds = ClipBounds {
        min: [0; 2],
        max: [0; 2],
    };
    for axis in 0..2 {
        let shift = 16 * axis as u32;
        let mut min = canvas_origin(state, axis);
        let mut max = extract(state.dst_canvas_max, shift, 12) as i32;
        if bit(state.xy_misc_1, 12 + 4 * axis as u32) {
            min = min.max(sext(state.uclip_min[axis], 18));
            max = max.min(sext(state.uclip_max[axis], 18));
        }
        if bit(state.xy_misc_1, 13 + 4 * axis as u32) {
            max = max.min(sext(state.iclip[axis], 18));
        }
        if tex {
            if fract {
                min = fract_clamp(min);
                max = fract_clamp(max);
            } else {
                min = min.clamp(-0x8000, 0x7fff);
                max = max.clamp(-0x8000, 0x7fff);
            }
        }
        bounds.min[axis] = min;
        bounds.max[axis] = max;
    }
    bounds
}

/// Fractional texture bounds saturate to the positive 12-bit range.
fn fract_clamp(v: i32) -> i32 {
    if (0..0x800).contains(&v) { v } else { 0x7ff }
}

/// Integer coordinate a stored vertex value represents for clipping.
#[must_use]
pub fn clip_coord(state: &EngineState, value: u32) -> i32 {
    if class::is_tex(state.class()) {
        let v = sext(value, 31);
        if fract_coords(state) { v >> 19 } else { v >> 15 }
    } else {
        sext(value, 18)
    }
}

/// Where `value` sits relative to the current bounds along `axis`.
#[must_use]
pub fn clip_status(state: &EngineState, axis: usize, value: u32) -> u32 {
    let bounds = clip_bounds(state);
    let c = clip_coord(state, value);
    let (min, max) = (bounds.min[axis], bounds.max[axis]);
    let mut cstat = 0;
    if c < min {
        cstat |= CSTAT_BELOW_MIN;
    }
    if c == min {
        cstat |= CSTAT_AT_MIN;
    }
    if c > max {
        cstat |= CSTAT_ABOVE_MAX;
    }
    if c == max {
        cstat |= CSTAT_AT_MAX;
    }
    cstat
}

/// Record the status of a vertex write through sub-slot `sub`.
pub fn set_xym2(
    state: &mut EngineState,
    axis: usize,
    sub: usize,
    carry: bool,
    oob: bool,
    cstat: u32,
) {
    let sub = sub as u32 & 3;
    let xy4 = &mut state.xy_misc_4[axis];
    set_bit(xy4, sub, carry);
    set_bit(xy4, 4 + sub, oob);
    insert(xy4, 8 + 4 * sub, 4, cstat);
}

fn out_of_range(state: &EngineState, value: u32) -> bool {
    !class::is_tex(state.class()) && !(-0x8000..=0x7fff).contains(&(value as i32))
}

/// `vtx[axis][idx] = a + b + carry_in`, with status through sub-slot `sub`.
pub fn vtx_add(
    state: &mut EngineState,
    axis: usize,
    idx: usize,
    sub: usize,
    a: u32,
    b: u32,
    carry_in: bool,
) {
    let sum = u64::from(a) + u64::from(b) + u64::from(carry_in);
    let value = sum as u32;
    let carry = sum >> 32 != 0;
    state.vtx_mut(axis)[idx] = value;
    let oob = out_of_range(state, value);
    let cstat = clip_status(state, axis, value);
    set_xym2(state, axis, sub, carry, oob, cstat);
}

/// Write a vertex coordinate, absolute or relative to a base.
///
/// Relative writes add the base slot's current value, or the canvas origin
/// when no base slot is given.
pub fn vtx_fixup(
    state: &mut EngineState,
    axis: usize,
    idx: usize,
    value: u32,
    rel: bool,
    base: Option<usize>,
    sub: usize,
) {
    let base = match (rel, base) {
        (false, _) => 0,
        (true, Some(slot)) => state.vtx(axis)[slot],
        (true, None) => canvas_origin(state, axis) as u32,
    };
    vtx_add(state, axis, idx, sub, base, value, false);
}

/// Latch the sign of `vtx[axis][idx]` into `xy_misc_4` bits 28-29:
/// bit 28 negative, bit 29 positive, neither for zero.
pub fn vtx_cmp(state: &mut EngineState, axis: usize, idx: usize) {
    let v = state.vtx(axis)[idx] as i32;
    let sign = match v.signum() {
        -1 => 1,
        1 => 2,
        _ => 0,
    };
    insert(&mut state.xy_misc_4[axis], 28, 2, sign);
}

/// Store a method-supplied coordinate. 16-bit coordinates of textured
/// classes are kept as fixed point shifted left by 15.
pub fn set_vtx(state: &mut EngineState, axis: usize, idx: usize, coord: i32, is32: bool) {
    let value = if class::is_tex(state.class()) && !is32 {
        (coord << 15) as u32
    } else {
        coord as u32
    };
    state.vtx_mut(axis)[idx] = value;
    let oob = out_of_range(state, value);
    let cstat = clip_status(state, axis, value);
    set_xym2(state, axis, idx & 3, false, oob, cstat);
}

/// Advance the vertex cursor, wrapping at the class's vertex count.
pub fn bump_vtxid(state: &mut EngineState) {
    let count = vertex_count(state.class());
    let next = (state.cursor() + 1) % count;
    state.set_cursor(next);
}

fn relative_to_canvas(state: &EngineState, axis: usize, value: u32, rel: bool) -> u32 {
    if rel {
        (canvas_origin(state, axis) as u32).wrapping_add(value)
    } else {
        value
    }
}

/// Write an inclusive clip bound and arm it.
pub fn iclip_fixup(state: &mut EngineState, axis: usize, value: u32, rel: bool) {
    state.iclip[axis] = relative_to_canvas(state, axis, value, rel) & CLIP_MASK;
    set_bit(&mut state.xy_misc_1, 13 + 4 * axis as u32, true);
}

/// Push a user clip bound through the per-axis pair: the old maximum
/// becomes the minimum and `value` the new maximum, whichever register was
/// written. The axis is armed by a maximum write and disarmed by a minimum
/// write.
pub fn uclip_fixup(state: &mut EngineState, axis: usize, which: usize, value: u32, rel: bool) {
    let v = relative_to_canvas(state, axis, value, rel) & CLIP_MASK;
    state.uclip_min[axis] = state.uclip_max[axis];
    state.uclip_max[axis] = v;
    set_bit(&mut state.xy_misc_1, 12 + 4 * axis as u32, which == 1);
}

/// The clip object's point and size methods.
///
/// The point goes through vertex slot 15 and becomes the user clip
/// minimum, disarming the user clip until a size arrives. The size is added
/// to slot 15, saturating to the 18-bit range, and becomes the maximum.
pub fn set_clip(state: &mut EngineState, is_size: bool, value: u32) {
    for axis in 0..2 {
        let half = extract(value, 16 * axis as u32, 16);
        let arm = 12 + 4 * axis as u32;
        if is_size {
            let origin = i64::from(state.vtx(axis)[15] as i32);
            let end = (origin + i64::from(half)).clamp(-0x2_0000, 0x1_ffff);
            state.uclip_max[axis] = end as u32 & CLIP_MASK;
            set_bit(&mut state.xy_misc_1, arm, true);
        } else {
            let coord = sext(half, 16);
            vtx_fixup(state, axis, 15, coord as u32, false, None, 1);
            state.uclip_min[axis] = coord as u32 & CLIP_MASK;
            set_bit(&mut state.xy_misc_1, arm, false);
        }
    }
}

/// VALID bits a draw needs before it is accepted.
#[must_use]
pub fn required_valid(cls: u32, poly: bool) -> u32 {
    if poly {
        return match cls {
            class::LINE | class::LIN | class::TRI => 0x0000_1001,
            _ => 0,
        };
    }
    match cls {
        class::POINT => 0x0000_1001,
        class::LINE | class::LIN => 0x0000_3003,
        class::TRI => 0x0000_7007,
        class::RECT => 0x0000_3103,
        class::TEXLIN | class::TEXLINBETA => 0x0000_f00f,
        class::TEXQUAD | class::TEXQUADBETA => 0x001f_f1ff,
        class::BLIT => 0x0000_f10f,
        class::IFC | class::BITMAP | class::IFM | class::ITM => 0x0003_8038,
        _ => 0,
    }
}

/// Interrupt bits a draw would raise in the current state.
#[must_use]
pub fn draw_errors(state: &EngineState, poly: bool) -> u32 {
    let mut intr = 0;
    if state.valid & 0x1100_0000 != 0 && bit(state.ctx_switch[0], 7) {
        intr |= 1 << 16;
    }
    if bit(state.canvas_config, 24) {
        intr |= 1 << 20;
    }
    if bit(state.cliprect_ctrl, 8) {
        intr |= 1 << 24;
    }
    let need = required_valid(state.class(), poly);
    if state.valid & need != need {
        intr |= 1 << 16;
    }
    if state.xy_misc_4[0] & 0xf0 != 0 || state.xy_misc_4[1] & 0xf0 != 0 {
        intr |= 1 << 12;
    }
    intr
}

/// Validate and consume the vertex state for a draw.
///
/// Returns whether the draw is accepted. Rejected draws raise their errors
/// and drop the ACCESS enables.
pub fn prep_draw(state: &mut EngineState, poly: bool) -> bool {
    let errors = draw_errors(state, poly);
    if !poly {
        state.valid &= !0x00ff_ffff;
    }
    state.intr |= errors;
    if errors != 0 {
        state.access &= !0x101;
    }
    errors == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{X, Y};

    fn point_state() -> EngineState {
        EngineState {
            access: 0x0f00_8111,
            dst_canvas_min: 0,
            dst_canvas_max: 0x0100_0400,
            ..EngineState::default()
        }
    }

    #[test]
    fn canvas_only_bounds() {
        let state = point_state();
        let b = clip_bounds(&state);
        assert_eq!(b.min, [0, 0]);
        assert_eq!(b.max, [0x400, 0x100]);
    }

    #[test]
    fn clip_status_at_edges() {
        let state = point_state();
        assert_eq!(clip_status(&state, X, 0), CSTAT_AT_MIN);
        assert_eq!(clip_status(&state, X, 0x400), CSTAT_AT_MAX);
        assert_eq!(clip_status(&state, X, 0x123), 0);
        assert_eq!(clip_status(&state, X, 0x3_ffff), CSTAT_BELOW_MIN);
        assert_eq!(clip_status(&state, Y, 0x101), CSTAT_ABOVE_MAX);
    }

    #[test]
    fn armed_user_and_inclusive_clips_narrow_bounds() {
        let mut state = point_state();
        state.uclip_min = [0x10, 0x3_fff0];
        state.uclip_max = [0x200, 0x80];
        state.iclip = [0x1f0, 0x3_ffff];
        state.xy_misc_1 = 0x0001_3000;
        let b = clip_bounds(&state);
        assert_eq!(b.min, [0x10, 0]);
        assert_eq!(b.max, [0x1f0, 0x80]);
    }

    #[test]
    fn textured_bounds_clamp() {
        let mut state = point_state();
        state.access = 0x0f00_d111;
        state.dst_canvas_min = 0x8000_8000;
        state.dst_canvas_max = 0x0fff_0fff;
        let b = clip_bounds(&state);
        assert_eq!(b.min, [-0x8000, -0x8000]);
        state.xy_misc_1 = 0x0200_0000;
        let b = clip_bounds(&state);
        assert_eq!(b.min, [0x7ff, 0x7ff]);
        assert_eq!(b.max, [0x7ff, 0x7ff]);
    }

    #[test]
    fn relative_fixup_adds_canvas_origin() {
        let mut state = point_state();
        state.dst_canvas_min = 0x0020_0010;
        vtx_fixup(&mut state, X, 5, 0x30, true, None, 1);
        vtx_fixup(&mut state, Y, 5, 0xffff_ffff, true, None, 1);
        assert_eq!(state.vtx_x[5], 0x40);
        assert_eq!(state.vtx_y[5], 0x1f);
        // 0x20 + 0xffffffff carries out.
        assert_eq!(state.xy_misc_4[Y] & 0x2, 0x2);
        assert_eq!(state.xy_misc_4[X] & 0x2, 0);
    }

    #[test]
    fn add_flags_out_of_range_for_untextured() {
        let mut state = point_state();
        vtx_add(&mut state, X, 0, 0, 0x7fff, 1, false);
        assert_eq!(state.vtx_x[0], 0x8000);
        assert_eq!(state.xy_misc_4[X] & 0x10, 0x10);
        state.access = 0x0f00_e111;
        vtx_add(&mut state, X, 0, 0, 0x7fff, 1, false);
        assert_eq!(state.xy_misc_4[X] & 0x10, 0);
    }

    #[test]
    fn set_xym2_touches_only_its_sub_slot() {
        let mut state = point_state();
        state.xy_misc_4 = [0x30ff_ffff, 0];
        set_xym2(&mut state, X, 2, false, false, 0x5);
        assert_eq!(state.xy_misc_4[X], 0x30f5_ffbb);
        assert_eq!(state.xy_misc_4[Y], 0);
    }

    #[test]
    fn cmp_latches_sign() {
        let mut state = point_state();
        state.vtx_x[2] = 0xffff_fff0;
        vtx_cmp(&mut state, X, 2);
        assert_eq!(state.xy_misc_4[X] >> 28, 1);
        state.vtx_x[2] = 5;
        vtx_cmp(&mut state, X, 2);
        assert_eq!(state.xy_misc_4[X] >> 28, 2);
        state.vtx_x[2] = 0;
        vtx_cmp(&mut state, X, 2);
        assert_eq!(state.xy_misc_4[X] >> 28, 0);
    }

    #[test]
    fn cursor_wraps_per_class() {
        let mut state = point_state();
        state.set_cursor(1);
        bump_vtxid(&mut state);
        assert_eq!(state.cursor(), 0);
        state.access = 0x0f00_b111;
        state.set_cursor(2);
        bump_vtxid(&mut state);
        assert_eq!(state.cursor(), 0);
        state.access = 0x0f01_e111;
        state.set_cursor(8);
        bump_vtxid(&mut state);
        assert_eq!(state.cursor(), 0);
    }

    #[test]
    fn uclip_writes_shift_through_pair() {
        let mut state = point_state();
        state.uclip_max[Y] = 0x55;
        state.dst_canvas_min = 0xfff0_0000;
        uclip_fixup(&mut state, Y, 1, 0x20, true);
        assert_eq!(state.uclip_min[Y], 0x55);
        assert_eq!(state.uclip_max[Y], 0x10);
        assert_eq!(state.xy_misc_1, 1 << 16);
        uclip_fixup(&mut state, Y, 0, 0x30, false);
        assert_eq!((state.uclip_min[Y], state.uclip_max[Y]), (0x10, 0x30));
        assert_eq!(state.xy_misc_1, 0);
        state.xy_misc_1 = 1 << 16;
        iclip_fixup(&mut state, X, 0xffff_ffff, false);
        assert_eq!(state.iclip[X], 0x3_ffff);
        assert_eq!(state.xy_misc_1, 1 << 16 | 1 << 13);
    }

    #[test]
    fn clip_point_then_size() {
        let mut state = point_state();
        state.access = 0x0f00_5111;
        set_clip(&mut state, false, 0xfff0_0010);
        assert_eq!(state.uclip_min, [0x10, 0x3_fff0]);
        assert_eq!(state.vtx_x[15], 0x10);
        assert_eq!(state.vtx_y[15], 0xffff_fff0);
        set_clip(&mut state, true, 0x0020_0100);
        assert_eq!(state.uclip_max, [0x110, 0x10]);
        assert_eq!(state.xy_misc_1 & 0x0001_1000, 0x0001_1000);
    }

    #[test]
    fn clip_size_saturates() {
        let mut state = point_state();
        state.vtx_x[15] = 0x7fff_0000;
        set_clip(&mut state, true, 0x0000_ffff);
        assert_eq!(state.uclip_max[X], 0x1_ffff);
    }

    #[test]
    fn rejected_draw_drops_enables() {
        let mut state = point_state();
        state.valid = 0x1000;
        assert!(!prep_draw(&mut state, false));
        assert_eq!(state.intr, 1 << 16);
        assert_eq!(state.access & 0x101, 0);
        assert_eq!(state.valid, 0);
    }

    #[test]
    fn accepted_draw_consumes_validity() {
        let mut state = point_state();
        state.valid = 0x0100_1001;
        assert!(prep_draw(&mut state, false));
        assert_eq!(state.intr, 0);
        assert_eq!(state.valid, 0x0100_0000);
    }
}
