//! Methods that set a single piece of context: colours, patterns, beta,
//! texture subdivision.

use nvidia_nv01_pgraph::EngineState;
use nvidia_nv01_pgraph::regs::class;

use super::{Scenario, Step, StepOutcome};

pub(super) const SCENARIOS: &[Scenario] = &[
    Scenario {
        name: "beta",
        iterations: 10_000,
        step: beta,
    },
    Scenario {
        name: "rop",
        iterations: 10_000,
        step: rop,
    },
    Scenario {
        name: "chroma_plane",
        iterations: 10_000,
        step: chroma_plane,
    },
    Scenario {
        name: "pattern_shape",
        iterations: 10_000,
        step: pattern_shape,
    },
    Scenario {
        name: "pattern_mono_color",
        iterations: 10_000,
        step: pattern_mono_color,
    },
    Scenario {
        name: "pattern_mono_bitmap",
        iterations: 10_000,
        step: pattern_mono_bitmap,
    },
    Scenario {
        name: "solid_color",
        iterations: 10_000,
        step: solid_color,
    },
    Scenario {
        name: "subdivide",
        iterations: 10_000,
        step: subdivide,
    },
    Scenario {
        name: "vtx_beta",
        iterations: 10_000,
        step: vtx_beta,
    },
    Scenario {
        name: "bitmap_color",
        iterations: 10_000,
        step: bitmap_color,
    },
];

/// A generated state with no notify pending or requested, so the method
/// under test is the only thing that can raise an interrupt.
pub(super) fn quiet_state(step: &mut Step<'_>) -> EngineState {
    let mut orig = step.random_state();
    orig.notify &= !0x11_0000;
    orig
}

fn beta(step: &mut Step<'_>) -> StepOutcome {
    let value = step.word();
    let orig = quiet_state(step);
    step.submit(&orig, class::BETA, 0x300, value)
}

fn rop(step: &mut Step<'_>) -> StepOutcome {
    let mut value = step.word();
    if step.coin() {
        value &= 0xff;
    }
    let orig = quiet_state(step);
    step.submit(&orig, class::ROP, 0x300, value)
}

fn chroma_plane(step: &mut Step<'_>) -> StepOutcome {
    let cls = if step.coin() {
        class::PLANE
    } else {
        class::CHROMA
    };
    let value = step.word();
    let orig = quiet_state(step);
    step.submit(&orig, cls, 0x304, value)
}

fn pattern_shape(step: &mut Step<'_>) -> StepOutcome {
    let mut value = step.word();
    if step.coin() {
        value &= 0xf;
    }
    let orig = quiet_state(step);
    step.submit(&orig, class::PATTERN, 0x308, value)
}

fn pattern_mono_color(step: &mut Step<'_>) -> StepOutcome {
    let idx = step.below(2);
    let value = step.word();
    let orig = quiet_state(step);
    step.submit(&orig, class::PATTERN, 0x310 + idx * 4, value)
}

fn pattern_mono_bitmap(step: &mut Step<'_>) -> StepOutcome {
    let idx = step.below(2);
    let value = step.word();
    let orig = quiet_state(step);
    step.submit(&orig, class::PATTERN, 0x318 + idx * 4, value)
}

/// The solid colour has a dedicated method on every solid class, and is
/// also interleaved with the vertices of the colour point, line and
/// triangle variants.
fn solid_color(step: &mut Step<'_>) -> StepOutcome {
    let (cls, mthd) = match step.below(5) {
        0 => (class::POINT + step.below(5), 0x304),
        1 => (class::POINT, 0x500 | (step.word() & 0x78)),
        2 => (class::LINE + step.below(2), 0x600 | (step.word() & 0x78)),
        3 => (class::TRI, 0x500 | (step.word() & 0x70)),
        _ => (class::TRI, 0x580 | (step.word() & 0x78)),
    };
    let value = step.word();
    let orig = quiet_state(step);
    step.submit(&orig, cls, mthd, value)
}

fn subdivide(step: &mut Step<'_>) -> StepOutcome {
    let beta = step.below(2);
    let quad = step.below(2);
    let cls = class::TEXLIN + beta * 0x10 + quad;
    let value = step.word();
    let orig = quiet_state(step);
    step.submit(&orig, cls, 0x304, value)
}

fn vtx_beta(step: &mut Step<'_>) -> StepOutcome {
    let quad = step.below(2);
    let idx = step.below(if quad == 1 { 5 } else { 2 });
    let cls = class::TEXLINBETA + quad;
    let value = step.word();
    let orig = quiet_state(step);
    step.submit(&orig, cls, 0x380 + idx * 4, value)
}

fn bitmap_color(step: &mut Step<'_>) -> StepOutcome {
    let idx = step.below(2);
    let value = step.word();
    let orig = quiet_state(step);
    step.submit(&orig, class::BITMAP, 0x308 + idx * 4, value)
}
