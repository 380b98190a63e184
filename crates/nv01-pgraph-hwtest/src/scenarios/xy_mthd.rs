//! Methods that move vertices: clip rectangles, 16- and 32-bit vertex
//! writes, image sizes and the image data walk.

use hwtest_core::bits::insert;
use nvidia_nv01_pgraph::regs::class;
use nvidia_nv01_pgraph::{EngineState, X, Y};

use super::simple_mthd::quiet_state;
use super::{Scenario, Step, StepOutcome};

pub(super) const SCENARIOS: &[Scenario] = &[
    Scenario {
        name: "clip",
        iterations: 100_000,
        step: clip,
    },
    Scenario {
        name: "vtx",
        iterations: 100_000,
        step: vtx,
    },
    Scenario {
        name: "vtx_x32",
        iterations: 100_000,
        step: vtx_x32,
    },
    Scenario {
        name: "vtx_y32",
        iterations: 100_000,
        step: vtx_y32,
    },
    Scenario {
        name: "ifc_size_in",
        iterations: 100_000,
        step: ifc_size_in,
    },
    Scenario {
        name: "ifc_size_out",
        iterations: 100_000,
        step: ifc_size_out,
    },
    Scenario {
        name: "pitch",
        iterations: 100_000,
        step: pitch,
    },
    Scenario {
        name: "rect",
        iterations: 100_000,
        step: rect,
    },
    Scenario {
        name: "ifc_data",
        iterations: 1_000_000,
        step: ifc_data,
    },
];

/// `(method address, mask of randomized offset bits)` for the 16-bit
/// vertex methods of the non-textured classes.
const VTX_METHODS: [(u32, u32); 25] = [
    (0x50_0300, 0),
    (0x51_0304, 0),
    (0x52_0310, 0),
    (0x53_0308, 0),
    (0x54_0308, 0),
    (0x50_0304, 0),
    (0x4c_0400, 0x78),
    (0x4b_0310, 0),
    (0x4b_0504, 0x70),
    (0x49_0400, 0x78),
    (0x4a_0400, 0x78),
    (0x48_0400, 0x7c),
    (0x48_0504, 0x78),
    (0x49_0404, 0x78),
    (0x4a_0404, 0x78),
    (0x4b_0314, 0),
    (0x4b_0318, 0),
    (0x4b_0508, 0x70),
    (0x4b_050c, 0x70),
    (0x49_0500, 0x7c),
    (0x4a_0500, 0x7c),
    (0x49_0604, 0x78),
    (0x4a_0604, 0x78),
    (0x4b_0400, 0x7c),
    (0x4b_0584, 0x78),
];

const VTX_X32_METHODS: [(u32, u32); 6] = [
    (0x48_0480, 0x78),
    (0x49_0480, 0x78),
    (0x4a_0480, 0x78),
    (0x49_0580, 0x78),
    (0x4a_0580, 0x78),
    (0x4b_0480, 0x78),
];

fn rebind(state: &mut EngineState, cls: u32) {
    insert(&mut state.access, 12, 5, cls);
}

fn method_from(step: &mut Step<'_>, table: &[(u32, u32)]) -> u32 {
    let (addr, mask) = step.pick(table);
    addr | (step.word() & mask)
}

/// Push a generated state towards ones where draws get accepted: most
/// vertices valid, no out-of-range status, no pending source errors.
fn vertex_ready(step: &mut Step<'_>, state: &mut EngineState) {
    if step.coin() {
        state.valid |= 0x1f_f1ff;
    }
    if step.coin() {
        state.valid |= 0x03_3033;
    }
    if step.coin() {
        state.xy_misc_4[X] &= !0xf0;
        state.xy_misc_4[Y] &= !0xf0;
    }
    if step.coin() {
        state.valid &= !0x1100_0000;
        state.xy_misc_1 &= !0x330;
    }
    if step.coin() {
        state.valid &= !0x00_f00f;
    }
}

/// A state for the vertex scenarios: half the time with a solid class
/// bound, then nudged towards acceptable draws.
fn vertex_state(step: &mut Step<'_>) -> EngineState {
    let mut orig = quiet_state(step);
    if step.coin() {
        let cls = class::POINT + step.below(4);
        rebind(&mut orig, cls);
    }
    vertex_ready(step, &mut orig);
    orig
}

/// The clip object; a size sent while BLIT is bound would start a real
/// blit, so the class is unbound for those.
fn clip(step: &mut Step<'_>) -> StepOutcome {
    let is_size = step.below(2);
    let value = step.word();
    let mut orig = quiet_state(step);
    if step.coin() {
        for axis in [X, Y] {
            let high = if step.coin() { 0 } else { 0x7fff };
            insert(&mut orig.vtx_mut(axis)[15], 16, 15, high);
        }
    }
    if is_size == 1 && orig.class() == class::BLIT {
        rebind(&mut orig, 0);
    }
    step.submit(&orig, class::CLIP, 0x300 + is_size * 4, value)
}

fn vtx(step: &mut Step<'_>) -> StepOutcome {
    let value = step.word();
    let orig = vertex_state(step);
    let addr = match step.below(27) {
        25 => {
            let beta = step.below(2);
            let idx = step.below(4);
            let fract = step.below(2);
            (0x4d_0310 + idx * 4) | beta << 20 | fract << 6
        }
        26 => {
            let beta = step.below(2);
            let idx = step.below(9);
            let fract = step.below(2);
            (0x4e_0310 + idx * 4) | beta << 20 | fract << 6
        }
        n => {
            let (addr, mask) = VTX_METHODS[n as usize];
            addr | (step.word() & mask)
        }
    };
    step.submit_addr(&orig, addr, value)
}

fn vtx_x32(step: &mut Step<'_>) -> StepOutcome {
    let value = step.word();
    let mut orig = quiet_state(step);
    if step.coin() {
        let cls = class::LINE + step.below(3);
        rebind(&mut orig, cls);
    }
    let addr = if step.below(7) == 0 {
        0x4b_0320 + 8 * step.below(3)
    } else {
        method_from(step, &VTX_X32_METHODS)
    };
    step.submit_addr(&orig, addr, value)
}

fn vtx_y32(step: &mut Step<'_>) -> StepOutcome {
    let value = step.word();
    let orig = vertex_state(step);
    let addr = if step.below(7) == 0 {
        0x4b_0324 + 8 * step.below(3)
    } else {
        method_from(step, &VTX_X32_METHODS) | 4
    };
    step.submit_addr(&orig, addr, value)
}

fn ifc_size_in(step: &mut Step<'_>) -> StepOutcome {
    let mut value = step.word();
    let mut orig = quiet_state(step);
    if step.below(4) == 0 {
        let cls = if step.coin() { class::BITMAP } else { class::ITM };
        rebind(&mut orig, cls);
    }
    if step.below(4) == 0 {
        value &= 0x00ff_00ff;
    }
    if step.below(4) == 0 {
        value &= 0xffff_000f;
    }
    let addr = step.pick(&[0x51_030c, 0x52_0318, 0x53_030c]);
    step.submit_addr(&orig, addr, value)
}

fn ifc_size_out(step: &mut Step<'_>) -> StepOutcome {
    let value = step.word();
    let orig = quiet_state(step);
    let addr = if step.coin() { 0x52_0314 } else { 0x51_0308 };
    step.submit_addr(&orig, addr, value)
}

fn pitch(step: &mut Step<'_>) -> StepOutcome {
    let value = step.word();
    let orig = quiet_state(step);
    let cls = if step.coin() { class::ITM } else { class::IFM };
    step.submit(&orig, cls, 0x310, value)
}

fn rect(step: &mut Step<'_>) -> StepOutcome {
    let value = step.word();
    let mut orig = quiet_state(step);
    vertex_ready(step, &mut orig);
    let addr = match step.below(3) {
        0 => 0x50_0308,
        1 => 0x54_030c,
        _ => 0x4c_0404 | (step.word() & 0x78),
    };
    step.submit_addr(&orig, addr, value)
}

/// Image data words, mostly with an IFC or BITMAP object bound and a
/// small image near the canvas origin so the walk wraps rows often.
fn ifc_data(step: &mut Step<'_>) -> StepOutcome {
    let value = step.word();
    let mut orig = quiet_state(step);
    if step.below(4) != 0 {
        orig.valid = 0x1f_f1ff;
    }
    if step.below(4) != 0 {
        orig.xy_misc_4[X] &= !0xf0;
        orig.xy_misc_4[Y] &= !0xf0;
    }
    if step.below(4) != 0 {
        orig.valid &= !0x1100_0000;
        orig.xy_misc_1 &= !0x330;
    }
    for j in 0..6 {
        for axis in [X, Y] {
            if step.coin() {
                let v = &mut orig.vtx_mut(axis)[j];
                *v = (*v & 0xff).wrapping_sub(0x80);
            }
        }
    }
    if step.below(4) != 0 {
        let cls = class::IFC + step.below(2);
        rebind(&mut orig, cls);
    }
    let addr = match step.below(3) {
        0 => 0x51_0400 | (step.word() & 0x7c),
        1 => 0x52_0400 | (step.word() & 0x7c),
        _ => 0x53_0040 | (step.word() & 0x3c),
    };
    step.submit_addr(&orig, addr, value)
}
