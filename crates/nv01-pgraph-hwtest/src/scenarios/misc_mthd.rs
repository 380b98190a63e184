//! Methods every class shares, and methods no class has.

use std::sync::OnceLock;

use nvidia_nv01_pgraph::oracle::is_legal_method;
use nvidia_nv01_pgraph::regs::CLASSES;

use super::{Scenario, Step, StepOutcome};

pub(super) const SCENARIOS: &[Scenario] = &[
    Scenario {
        name: "invalid",
        iterations: INVALID_PAIRS * INVALID_REPEATS,
        step: invalid,
    },
    Scenario {
        name: "ctx_switch",
        iterations: 10_000,
        step: ctx_switch,
    },
    Scenario {
        name: "notify",
        iterations: 10_000,
        step: notify,
    },
];

/// Method offsets a class can be sent.
const METHODS: u32 = 0x800;

/// Number of (class, method) pairs no class implements.
const INVALID_PAIRS: u32 = 40_029;

/// Random states each invalid pair is checked against.
const INVALID_REPEATS: u32 = 10;

/// Every (class, method offset) pair the engine rejects, in class then
/// offset order.
fn invalid_pairs() -> &'static [(u32, u32)] {
    static PAIRS: OnceLock<Vec<(u32, u32)>> = OnceLock::new();
    PAIRS.get_or_init(|| {
        CLASSES
            .iter()
            .flat_map(|&cls| (0..METHODS).map(move |m| (cls, m * 4)))
            .filter(|&(cls, mthd)| !is_legal_method(cls, mthd))
            .collect()
    })
}

/// Any method a class does not implement raises INVALID bit 0.
///
/// Iterations walk every rejected pair once before repeating any, so a
/// scaled-down run still reaches the early pairs of every pass.
fn invalid(step: &mut Step<'_>) -> StepOutcome {
    let pairs = invalid_pairs();
    let (cls, mthd) = pairs[step.iteration as usize % pairs.len()];
    let mut orig = step.random_state();
    orig.notify &= !0x11_0000;
    step.submit(&orig, cls, mthd, 0)
}

fn ctx_switch(step: &mut Step<'_>) -> StepOutcome {
    let value = step.word();
    let cls = step.pick(&CLASSES);
    let mut orig = step.random_state();
    orig.notify &= !0x1_0000;
    step.submit(&orig, cls, 0, value)
}

/// Notify is checked against whatever notify state was generated,
/// including one already pending.
fn notify(step: &mut Step<'_>) -> StepOutcome {
    let mut value = step.word();
    if step.coin() {
        value &= 0xf;
    }
    let cls = step.pick(&CLASSES);
    let orig = step.random_state();
    step.submit(&orig, cls, 0x104, value)
}
