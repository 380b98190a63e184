//! State round trips and plain register accesses on a loaded state.

use hwtest_core::bits::{bit, sext};
use nvidia_nv01_pgraph::EngineState;
use nvidia_nv01_pgraph::oracle::{
    Prediction, Reg, clip_bounds, mmio_read, mmio_write, readable_registers,
    relative_registers,
};
use nvidia_nv01_pgraph::regs::{DEBUG, ICLIP, UCLIP, VTX_COUNT, VTX_X, XY_MISC_4, class};

use super::{Scenario, Step, StepOutcome};

pub(super) const SCENARIOS: &[Scenario] = &[
    Scenario {
        name: "state",
        iterations: 1000,
        step: round_trip,
    },
    Scenario {
        name: "soft_reset",
        iterations: 10_000,
        step: soft_reset,
    },
    Scenario {
        name: "mmio_read",
        iterations: 10_000,
        step: read,
    },
    Scenario {
        name: "mmio_write",
        iterations: 10_000,
        step: write,
    },
    Scenario {
        name: "mmio_vtx_write",
        iterations: 10_000,
        step: vtx_write,
    },
    Scenario {
        name: "mmio_iclip_write",
        iterations: 10_000,
        step: iclip_write,
    },
    Scenario {
        name: "mmio_uclip_write",
        iterations: 10_000,
        step: uclip_write,
    },
    Scenario {
        name: "clip_status",
        iterations: 10_000,
        step: clip_status,
    },
];

/// Offset of a relative-write alias from its absolute register.
const REL: u32 = 0x100;

/// A generated state must survive load and dump unchanged.
fn round_trip(step: &mut Step<'_>) -> StepOutcome {
    let orig = step.random_state();
    step.load(&orig);
    step.verify(&orig, &orig, Prediction::Exact)
}

fn soft_reset(step: &mut Step<'_>) -> StepOutcome {
    let orig = step.random_state();
    step.load(&orig);
    let mut exp = orig.clone();
    let value = exp.debug[0] | 1;
    step.stimulate(DEBUG[0], value);
    mmio_write(&mut exp, DEBUG[0], value);
    step.verify(&orig, &exp, Prediction::Exact)
}

fn read(step: &mut Step<'_>) -> StepOutcome {
    let orig = step.random_state();
    let offset = step.pick(&readable_registers());
    step.load(&orig);
    let mut exp = orig.clone();
    let _ = step.read(offset);
    mmio_read(&mut exp, offset);
    step.verify(&orig, &exp, Prediction::Exact)
}

/// Registers whose writes the write scenario checks, relative aliases
/// included. Interrupt acknowledges, status, trap and PFB registers are
/// left alone.
fn writable_registers() -> Vec<u32> {
    readable_registers()
        .into_iter()
        .chain(relative_registers())
        .filter(|&offset| {
            !matches!(
                Reg::decode(offset),
                Some(
                    Reg::Intr
                        | Reg::Invalid
                        | Reg::Status
                        | Reg::TrapAddr
                        | Reg::TrapData
                        | Reg::PfbConfig
                        | Reg::PfbBoot
                ) | None
            )
        })
        .collect()
}

fn write_one(step: &mut Step<'_>, orig: &EngineState, offset: u32) -> StepOutcome {
    let value = step.word();
    step.load(orig);
    let mut exp = orig.clone();
    step.stimulate(offset, value);
    mmio_write(&mut exp, offset, value);
    step.verify(orig, &exp, Prediction::Exact)
}

fn write(step: &mut Step<'_>) -> StepOutcome {
    let orig = step.random_state();
    let offset = step.pick(&writable_registers());
    write_one(step, &orig, offset)
}

/// Slots 16 and 17 are rarely touched by methods, so half the writes
/// target them, and half run with a random enable/class combination.
fn vtx_write(step: &mut Step<'_>) -> StepOutcome {
    let mut idx = step.below(VTX_COUNT as u32);
    let axis = step.below(2);
    let rel = step.below(2);
    let mut orig = step.random_state();
    if step.coin() {
        idx = 0x10 | (idx & 1);
    }
    if step.coin() {
        orig.access = 0x0f00_d111 + (step.word() & 0x1_1000);
    }
    write_one(step, &orig, VTX_X + idx * 4 + axis * 0x80 + rel * REL)
}

fn iclip_write(step: &mut Step<'_>) -> StepOutcome {
    let axis = step.below(2);
    let rel = step.below(2);
    let orig = step.random_state();
    write_one(step, &orig, ICLIP + axis * 4 + rel * REL)
}

fn uclip_write(step: &mut Step<'_>) -> StepOutcome {
    let axis = step.below(2);
    let which = step.below(2);
    let rel = step.below(2);
    let orig = step.random_state();
    write_one(step, &orig, UCLIP + axis * 8 + which * 4 + rel * REL)
}

/// Find the clip bounds the engine uses by bisecting over vertex writes:
/// the largest coordinate reported at or below the minimum and the largest
/// not above the maximum.
fn clip_status(step: &mut Step<'_>) -> StepOutcome {
    let axis = step.below(2) as usize;
    let exp = step.random_state();
    let tex = class::is_tex(exp.class());
    step.load(&exp);
    let bounds = clip_bounds(&exp);
    let (start, bits) = if tex {
        (0x4000_0000u32, 15..=30)
    } else {
        (0x2_0000, 0..=17)
    };
    let vtx = VTX_X + axis as u32 * 0x80;
    let status = XY_MISC_4[axis];
    let (mut min, mut max) = (start, start);
    for n in bits.rev() {
        step.write(vtx, min ^ 1 << n);
        if step.read(status) & 0x300 != 0 {
            min ^= 1 << n;
        }
        step.write(vtx, max ^ 1 << n);
        if step.read(status) & 0x400 == 0 {
            max ^= 1 << n;
        }
    }
    let (found_min, found_max) = if tex {
        let shift = if bit(exp.xy_misc_1, 25) { 19 } else { 15 };
        (sext(min, 31) >> shift, sext(max, 31) >> shift)
    } else {
        (sext(min, 18), sext(max, 18))
    };
    let (exp_min, exp_max) = (bounds.min[axis], bounds.max[axis]);
    if found_min == exp_min && found_max == exp_max {
        StepOutcome::Pass
    } else {
        step.fail(format!(
            "class {:02x} axis {axis}: bounds {found_min}..={found_max}, expected {exp_min}..={exp_max}",
            exp.class()
        ))
    }
}
