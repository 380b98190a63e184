//! Raster operations checked against framebuffer contents: a single solid
//! point and the origin pixel of a blit.

use hwtest_core::bits::{bit, insert};
use nvidia_nv01_pgraph::oracle::{
    self, DrawOp, blit_pixels, bytes_per_pixel, expand_color, pixel_offset, point_pixels,
    to_a1r10g10b10,
};
use nvidia_nv01_pgraph::regs::{VRAM_BASE, class};
use nvidia_nv01_pgraph::{EngineState, X, Y};

use super::simple_mthd::quiet_state;
use super::{Scenario, Step, StepOutcome};

pub(super) const SCENARIOS: &[Scenario] = &[
    Scenario {
        name: "simple",
        iterations: 100_000,
        step: simple,
    },
    Scenario {
        name: "blit",
        iterations: 100_000,
        step: blit,
    },
];

/// Operations with a fixed source/destination combination.
const PLAIN_OPS: [u32; 23] = [
    0x00, 0x0f, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d,
    0x0e, 0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x17,
];

/// Beta blends; only tried on 16 and 32 bpp surfaces.
const BLEND_OPS: [u32; 5] = [0x18, 0x19, 0x1a, 0x1b, 0x1c];

/// A state that rasters into a 1024-wide canvas at the origin, with the
/// draw under test likely to be accepted.
fn raster_state(step: &mut Step<'_>, cls: u32) -> EngineState {
    let mut orig = quiet_state(step);
    orig.dst_canvas_min = 0;
    orig.dst_canvas_max = 0x0100_0400;
    orig.xy_misc_1 &= 0xfff0_0cff;
    orig.ctx_switch[0] &= !0x1f;
    if step.coin() {
        orig.ctx_switch[0] |= step.pick(&PLAIN_OPS);
    } else {
        orig.ctx_switch[0] |= step.pick(&BLEND_OPS);
        orig.pfb_config |= 0x200;
    }
    orig.pattern_config = step.below(3);
    if step.coin() {
        orig.xy_misc_4[X] &= !0xf0;
        orig.xy_misc_4[Y] &= !0xf0;
    }
    orig.valid &= !0x1100_0000;
    insert(&mut orig.access, 12, 5, cls);
    insert(&mut orig.pfb_config, 4, 3, 3);
    orig
}

/// Pull the cliprects onto the drawn pixel now and then, so both sides of
/// each edge get exercised.
fn nudge_cliprects(step: &mut Step<'_>, state: &mut EngineState, x: u32, y: u32) {
    for (is_max, shift, coord) in [(false, 0, x), (false, 16, y), (true, 0, x), (true, 16, y)] {
        if step.coin() {
            let idx = step.below(2) as usize;
            let rect = if is_max {
                &mut state.cliprect_max[idx]
            } else {
                &mut state.cliprect_min[idx]
            };
            insert(rect, shift, 16, coord);
        }
    }
}

/// A random chroma key rarely matches the solid colour, so half the time
/// use the colour itself, with a flipped alpha or colour bit on top.
fn nudge_chroma(step: &mut Step<'_>, state: &mut EngineState) {
    if !step.coin() {
        return;
    }
    let mut key = to_a1r10g10b10(expand_color(state, state.misc32));
    key ^= u32::from(step.coin()) << 30;
    if step.coin() {
        key ^= 1 << step.below(30);
    }
    state.chroma = key;
}

fn pixel_mask(state: &EngineState) -> u32 {
    u32::MAX >> (32 - bytes_per_pixel(state.pfb_config) * 8)
}

fn read_pixel(step: &mut Step<'_>, addr: u32, mask: u32) -> u32 {
    step.read(VRAM_BASE + (addr & !3)) >> ((addr & 3) * 8) & mask
}

/// Byte offsets of `(x, y)` in both framebuffers.
fn pixel_addrs(state: &EngineState, x: u32, y: u32) -> [u32; 2] {
    [pixel_offset(state, x, y, 0), pixel_offset(state, x, y, 1)]
}

/// Fill the words holding both pixels with noise and read the pixels back.
fn seed_pixels(step: &mut Step<'_>, addrs: [u32; 2], mask: u32) -> [u32; 2] {
    for addr in addrs {
        let noise = step.word();
        step.write(VRAM_BASE + (addr & !3), noise);
    }
    addrs.map(|addr| read_pixel(step, addr, mask))
}

/// Dump the card, read the destination pixels and compare both.
fn check(
    step: &mut Step<'_>,
    orig: &EngineState,
    exp: &EngineState,
    effect: oracle::MethodEffect,
    addrs: [u32; 2],
    before: [u32; 2],
    expected: [u32; 2],
) -> StepOutcome {
    let mask = pixel_mask(exp);
    let real = step.dump();
    let mut got = addrs.map(|addr| read_pixel(step, addr, mask));
    // Without dual buffering the second address aliases other memory.
    if !bit(exp.pfb_config, 12) {
        got[1] = expected[1];
    }
    let mismatch = (got != expected).then(|| {
        format!(
            "pixels {:08x}/{:08x}: expected {:08x}/{:08x}, read {:08x}/{:08x}",
            before[0], before[1], expected[0], expected[1], got[0], got[1]
        )
    });
    step.compare(orig, exp, &real, effect.prediction, mismatch)
}

/// A single point in the solid colour.
fn simple(step: &mut Step<'_>) -> StepOutcome {
    let mut orig = raster_state(step, class::POINT);
    let x = step.word() & 0x3ff;
    let y = step.word() & 0xff;
    nudge_cliprects(step, &mut orig, x, y);
    nudge_chroma(step, &mut orig);
    step.load(&orig);

    let mask = pixel_mask(&orig);
    let addrs = pixel_addrs(&orig, x, y);
    let before = seed_pixels(step, addrs, mask);
    let value = y << 16 | x;
    step.stimulate(0x48_0400, value);

    let mut exp = orig.clone();
    let effect = oracle::method(&mut exp, class::POINT, 0x400, value);
    let expected = match effect.draw {
        Some(DrawOp::Point { x, y }) => point_pixels(&exp, x, y, before),
        _ => before,
    };
    check(step, &orig, &exp, effect, addrs, before, expected)
}

/// A 1x1 blit from a source to the right of the destination, which may
/// lie beyond the canvas edge.
fn blit(step: &mut Step<'_>) -> StepOutcome {
    let mut orig = raster_state(step, class::BLIT);
    orig.xy_misc_4[X] &= !0xf000;
    orig.xy_misc_4[Y] &= !0xf000;
    orig.valid |= 0xf10f;
    let x = step.word() & 0x1ff;
    let y = step.word() & 0xff;
    let sx = (step.word() & 0x3ff) + 0x200;
    let sy = step.word() & 0xff;
    orig.vtx_x[0] = sx;
    orig.vtx_y[0] = sy;
    orig.vtx_x[1] = x;
    orig.vtx_y[1] = y;
    orig.set_cursor(2);
    nudge_cliprects(step, &mut orig, x, y);
    nudge_chroma(step, &mut orig);
    step.load(&orig);

    let mask = pixel_mask(&orig);
    let addrs = pixel_addrs(&orig, x, y);
    let saddrs = pixel_addrs(&orig, sx, sy);
    let before = seed_pixels(step, addrs, mask);
    let source = seed_pixels(step, saddrs, mask);
    // The source words may share a word with the destination pixels.
    let before = if saddrs.iter().any(|s| addrs.iter().any(|d| s & !3 == d & !3)) {
        addrs.map(|addr| read_pixel(step, addr, mask))
    } else {
        before
    };
    let value = 0x1_0001;
    step.stimulate(0x50_0308, value);

    let mut exp = orig.clone();
    let effect = oracle::method(&mut exp, class::BLIT, 0x308, value);
    let expected = match effect.draw {
        Some(DrawOp::Blit { src, dst }) => blit_pixels(&exp, src, dst, source, before),
        _ => before,
    };
    check(step, &orig, &exp, effect, addrs, before, expected)
}
