//! Register scans: which bits of each register are writable, without
//! loading a generated state first.

use nvidia_nv01_pgraph::oracle::{access_write, beta_write};
use nvidia_nv01_pgraph::regs::{
    ACCESS, BETA, BITMAP_COLOR, CANVAS_CONFIG, CHROMA, CLIPRECT_CTRL, CTX_CONTROL, CTX_SWITCH_0,
    CTX_SWITCH_1, DEBUG, DST_CANVAS_MAX, DST_CANVAS_MIN, EDGEFILL, ICLIP, INTR_EN, INVALID_EN,
    MISC32, NOTIFY, PATTERN_CONFIG, PATTERN_MONO_BITMAP, PLANE, ROP, SUBDIVIDE, UCLIP, VALID,
    VTX_BETA, VTX_BETA_COUNT, VTX_COUNT, VTX_X, VTX_Y, XY_MISC_0, XY_MISC_1, XY_MISC_4,
    cliprect_max, cliprect_min, pattern_mono_a, pattern_mono_rgb,
};

use super::{Scenario, Step, StepOutcome};

pub(super) const SCENARIOS: &[Scenario] = &[
    Scenario {
        name: "access",
        iterations: 1000,
        step: access,
    },
    Scenario {
        name: "debug",
        iterations: 1,
        step: debug,
    },
    Scenario {
        name: "control",
        iterations: 1,
        step: control,
    },
    Scenario {
        name: "canvas",
        iterations: 1,
        step: canvas,
    },
    Scenario {
        name: "vtx",
        iterations: 1,
        step: vtx,
    },
    Scenario {
        name: "clip",
        iterations: 1000,
        step: clip,
    },
    Scenario {
        name: "context",
        iterations: 1000,
        step: context,
    },
    Scenario {
        name: "vstate",
        iterations: 1,
        step: vstate,
    },
];

/// ACCESS with every enable and write flag set, class 0.
const ACCESS_OPEN: u32 = 0x0f00_0111;

fn outcome(result: Result<(), StepOutcome>) -> StepOutcome {
    result.err().unwrap_or(StepOutcome::Pass)
}

fn scan_all(step: &mut Step<'_>, regs: &[(u32, u32)]) -> Result<(), StepOutcome> {
    step.write(ACCESS, ACCESS_OPEN);
    for &(offset, all1) in regs {
        step.bit_scan(offset, all1, 0)?;
    }
    Ok(())
}

/// ACCESS only takes the fields whose write flag (bits 24-27) is set.
fn access(step: &mut Step<'_>) -> StepOutcome {
    let before = step.read(ACCESS);
    let value = step.word();
    step.stimulate(ACCESS, value);
    outcome(step.expect_read(ACCESS, access_write(before, value)))
}

fn debug(step: &mut Step<'_>) -> StepOutcome {
    outcome(scan_all(
        step,
        &[
            (DEBUG[0], 0x1111_1110),
            (DEBUG[1], 0x3111_1101),
            (DEBUG[2], 0x1111_1111),
        ],
    ))
}

fn control(step: &mut Step<'_>) -> StepOutcome {
    outcome(scan_all(
        step,
        &[
            (INTR_EN, 0x1111_1111),
            (INVALID_EN, 0x0001_1111),
            (CTX_SWITCH_0, 0x807f_ffff),
            (CTX_CONTROL, 0x1101_0103),
        ],
    ))
}

fn canvas(step: &mut Step<'_>) -> StepOutcome {
    let run = |step: &mut Step<'_>| -> Result<(), StepOutcome> {
        scan_all(step, &[(CANVAS_CONFIG, 0x0111_1011)])?;
        step.stimulate(DST_CANVAS_MIN, 0x7fff_7fff);
        step.expect_read(DST_CANVAS_MIN, 0x7fff_7fff)?;
        step.bit_scan(DST_CANVAS_MIN, 0xffff_ffff, 0)?;
        step.bit_scan(DST_CANVAS_MAX, 0x0fff_0fff, 0)?;
        for i in 0..2 {
            step.bit_scan(cliprect_min(i), 0x0fff_0fff, 0)?;
            step.bit_scan(cliprect_max(i), 0x0fff_0fff, 0)?;
        }
        step.bit_scan(CLIPRECT_CTRL, 0x113, 0)
    };
    outcome(run(step))
}

fn vtx(step: &mut Step<'_>) -> StepOutcome {
    let run = |step: &mut Step<'_>| -> Result<(), StepOutcome> {
        step.write(ACCESS, ACCESS_OPEN);
        for i in 0..VTX_COUNT as u32 {
            step.bit_scan(VTX_X + i * 4, 0xffff_ffff, 0)?;
            step.bit_scan(VTX_Y + i * 4, 0xffff_ffff, 0)?;
            if i < VTX_BETA_COUNT as u32 {
                step.bit_scan(VTX_BETA + i * 4, 0x01ff_ffff, 0)?;
            }
        }
        Ok(())
    };
    outcome(run(step))
}

/// The inclusive clip is a plain register; each user clip axis is a pair
/// where every write pushes the previous max down into min.
fn clip(step: &mut Step<'_>) -> StepOutcome {
    let run = |step: &mut Step<'_>| -> Result<(), StepOutcome> {
        if step.iteration == 0 {
            scan_all(step, &[(ICLIP, 0x0003_ffff), (ICLIP + 4, 0x0003_ffff)])?;
        } else {
            step.write(ACCESS, ACCESS_OPEN);
        }
        let axis = step.below(2);
        let (min, max) = (UCLIP + axis * 8, UCLIP + 4 + axis * 8);
        let [v0, v1, v2] = [step.word(), step.word(), step.word()];
        step.write(min, v0);
        step.stimulate(max, v1);
        step.expect_read(min, v0 & 0x3_ffff)?;
        step.expect_read(max, v1 & 0x3_ffff)?;
        let third = if step.coin() { min } else { max };
        step.stimulate(third, v2);
        step.expect_read(min, v1 & 0x3_ffff)?;
        step.expect_read(max, v2 & 0x3_ffff)
    };
    outcome(run(step))
}

fn context(step: &mut Step<'_>) -> StepOutcome {
    let run = |step: &mut Step<'_>| -> Result<(), StepOutcome> {
        if step.iteration == 0 {
            scan_all(
                step,
                &[
                    (pattern_mono_rgb(0), 0x3fff_ffff),
                    (pattern_mono_a(0), 0xff),
                    (pattern_mono_rgb(1), 0x3fff_ffff),
                    (pattern_mono_a(1), 0xff),
                    (PATTERN_MONO_BITMAP[0], 0xffff_ffff),
                    (PATTERN_MONO_BITMAP[1], 0xffff_ffff),
                    (PATTERN_CONFIG, 3),
                    (BITMAP_COLOR[0], 0x7fff_ffff),
                    (BITMAP_COLOR[1], 0x7fff_ffff),
                    (ROP, 0xff),
                    (PLANE, 0x7fff_ffff),
                    (CHROMA, 0x7fff_ffff),
                    (CTX_SWITCH_1, 0xffff),
                    (NOTIFY, 0x0011_ffff),
                ],
            )?;
        }
        // Negative betas clamp to zero.
        let value = step.word();
        step.stimulate(BETA, value);
        step.expect_read(BETA, beta_write(value))
    };
    outcome(run(step))
}

fn vstate(step: &mut Step<'_>) -> StepOutcome {
    outcome(scan_all(
        step,
        &[
            (XY_MISC_0, 0xf1ff_11ff),
            (XY_MISC_1, 0x0317_7331),
            (XY_MISC_4[0], 0x30ff_ffff),
            (XY_MISC_4[1], 0x30ff_ffff),
            (VALID, 0x111f_f1ff),
            (MISC32, 0xffff_ffff),
            (SUBDIVIDE, 0xffff_00ff),
            (EDGEFILL, 0xffff_0113),
        ],
    ))
}
