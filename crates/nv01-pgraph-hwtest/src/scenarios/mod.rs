//! Scenario groups and the per-iteration context they run in.
//!
//! A scenario is one kind of stimulus. Each iteration draws a fresh random
//! engine state, loads it, applies the stimulus, predicts the result with
//! the oracle and compares it against a dump of the card.

mod misc_mthd;
mod rop;
mod scan;
mod simple_mthd;
mod state;
mod xy_mthd;

use std::fmt;

use hwtest_core::{Mmio, bit_scan};
use nvidia_nv01_pgraph::oracle::{self, Method, Prediction, VtxKind};
use nvidia_nv01_pgraph::regs::{class, method_addr};
use nvidia_nv01_pgraph::{
    EngineState, FieldMismatch, compare_states, diff_states, dump_state, generate_state,
    load_state,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, warn};

/// One kind of stimulus, run for `iterations` independent iterations.
pub struct Scenario {
    pub name: &'static str,
    pub iterations: u32,
    pub step: fn(&mut Step<'_>) -> StepOutcome,
}

impl fmt::Debug for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("iterations", &self.iterations)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct Group {
    pub name: &'static str,
    pub scenarios: &'static [Scenario],
}

/// Every group, in run order.
pub const GROUPS: &[Group] = &[
    Group {
        name: "scan",
        scenarios: scan::SCENARIOS,
    },
    Group {
        name: "state",
        scenarios: state::SCENARIOS,
    },
    Group {
        name: "misc_mthd",
        scenarios: misc_mthd::SCENARIOS,
    },
    Group {
        name: "simple_mthd",
        scenarios: simple_mthd::SCENARIOS,
    },
    Group {
        name: "xy_mthd",
        scenarios: xy_mthd::SCENARIOS,
    },
    Group {
        name: "rop",
        scenarios: rop::SCENARIOS,
    },
];

#[must_use]
pub fn find_group(name: &str) -> Option<&'static Group> {
    GROUPS.iter().find(|g| g.name == name)
}

/// The write a failing iteration was checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stimulus {
    pub offset: u32,
    pub value: u32,
}

impl fmt::Display for Stimulus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06x} <- {:08x}", self.offset, self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub stimulus: Option<Stimulus>,
    pub message: String,
    pub diff: Vec<FieldMismatch>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Pass,
    /// The iteration was not checked, for the given reason.
    Skip(&'static str),
    Fail(Failure),
}

/// Context of a single iteration: the card and the iteration's private
/// random stream.
pub struct Step<'a> {
    card: &'a mut dyn Mmio,
    rng: StdRng,
    /// Index of this iteration within its scenario.
    pub iteration: u32,
    stimulus: Option<Stimulus>,
}

impl<'a> Step<'a> {
    pub fn new(card: &'a mut dyn Mmio, seed: u64, iteration: u32) -> Self {
        Self {
            card,
            rng: StdRng::seed_from_u64(seed),
            iteration,
            stimulus: None,
        }
    }

    pub fn word(&mut self) -> u32 {
        self.rng.random()
    }

    pub fn coin(&mut self) -> bool {
        self.rng.random_bool(0.5)
    }

    /// Uniform in `0..n`.
    pub fn below(&mut self, n: u32) -> u32 {
        self.rng.random_range(0..n)
    }

    pub fn pick<T: Copy>(&mut self, items: &[T]) -> T {
        items[self.rng.random_range(0..items.len())]
    }

    pub fn read(&mut self, offset: u32) -> u32 {
        self.card.read32(offset)
    }

    /// A setup write that is not itself under test.
    pub fn write(&mut self, offset: u32, value: u32) {
        self.card.write32(offset, value);
    }

    /// The write under test; failures report it.
    pub fn stimulate(&mut self, offset: u32, value: u32) {
        let stimulus = Stimulus { offset, value };
        debug!("stimulus {stimulus}");
        self.stimulus = Some(stimulus);
        self.card.write32(offset, value);
    }

    pub fn random_state(&mut self) -> EngineState {
        generate_state(&mut self.rng, &mut *self.card)
    }

    pub fn load(&mut self, state: &EngineState) {
        load_state(&mut *self.card, state);
    }

    pub fn dump(&mut self) -> EngineState {
        let dump = dump_state(&mut *self.card);
        if dump.recovered {
            match self.stimulus {
                Some(s) => warn!("engine locked up after {s}, reset"),
                None => warn!("engine locked up, reset"),
            }
        }
        dump.state
    }

    pub fn fail(&self, message: impl Into<String>) -> StepOutcome {
        StepOutcome::Fail(Failure {
            stimulus: self.stimulus,
            message: message.into(),
            diff: Vec::new(),
        })
    }

    /// Check which bits of a register are writable.
    pub fn bit_scan(&mut self, offset: u32, all1: u32, all0: u32) -> Result<(), StepOutcome> {
        bit_scan(&mut *self.card, offset, all1, all0).map_err(|m| {
            self.stimulus = Some(Stimulus {
                offset: m.offset,
                value: m.written,
            });
            self.fail(m.to_string())
        })
    }

    /// Read back `offset` and fail unless it holds `expected`.
    pub fn expect_read(&mut self, offset: u32, expected: u32) -> Result<(), StepOutcome> {
        let read = self.read(offset);
        if read == expected {
            Ok(())
        } else {
            Err(self.fail(format!(
                "{offset:06x}: expected {expected:08x}, read {read:08x}"
            )))
        }
    }

    /// Compare an already dumped state against the prediction.
    pub fn compare(
        &self,
        orig: &EngineState,
        exp: &EngineState,
        real: &EngineState,
        prediction: Prediction,
        pixel_mismatch: Option<String>,
    ) -> StepOutcome {
        if !prediction.comparable(real.status) {
            return StepOutcome::Skip(match prediction {
                Prediction::Unmodeled => "outside the model",
                _ => "engine locked up",
            });
        }
        if !compare_states(orig, exp, real, pixel_mismatch.is_some()) {
            return StepOutcome::Pass;
        }
        StepOutcome::Fail(Failure {
            stimulus: self.stimulus,
            message: pixel_mismatch.unwrap_or_else(|| "state mismatch".to_string()),
            diff: diff_states(exp, real),
        })
    }

    /// Dump the card and compare it against the prediction.
    pub fn verify(
        &mut self,
        orig: &EngineState,
        exp: &EngineState,
        prediction: Prediction,
    ) -> StepOutcome {
        let real = self.dump();
        self.compare(orig, exp, &real, prediction, None)
    }

    /// Load `orig`, submit one method and check the result.
    pub fn submit(&mut self, orig: &EngineState, cls: u32, mthd: u32, value: u32) -> StepOutcome {
        let mut exp = orig.clone();
        let effect = oracle::method(&mut exp, cls, mthd, value);
        if draw_locks_up(&exp, cls, mthd) {
            return StepOutcome::Skip("draw would lock up the engine");
        }
        self.load(orig);
        self.stimulate(method_addr(cls, mthd), value);
        self.verify(orig, &exp, effect.prediction)
    }

    /// Submit to a full method address as the scenarios spell them.
    pub fn submit_addr(&mut self, orig: &EngineState, addr: u32, value: u32) -> StepOutcome {
        self.submit(orig, addr >> 16 & 0x1f, addr & 0x1ffc, value)
    }
}

fn is_draw(cls: u32, mthd: u32) -> bool {
    matches!(
        Method::decode(cls, mthd),
        Some(
            Method::Vtx(VtxKind { draw: true, .. })
                | Method::VtxY32 { draw: true, .. }
                | Method::Rect { draw: true }
        )
    )
}

/// Any draw with an image class bound wedges the engine before it can be
/// dumped. Other draws that may hang are sent and judged on STATUS.
fn draw_locks_up(exp: &EngineState, cls: u32, mthd: u32) -> bool {
    is_draw(cls, mthd) && class::is_image_in(exp.class())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hwtest_core::RegisterFile;
    use nvidia_nv01_pgraph::SimulatedCard;
    use nvidia_nv01_pgraph::regs::VALID_MASK;

    #[test]
    fn group_and_scenario_names_are_unique() {
        let mut names: Vec<_> = GROUPS.iter().map(|g| g.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), GROUPS.len());
        for group in GROUPS {
            let mut names: Vec<_> = group.scenarios.iter().map(|s| s.name).collect();
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), group.scenarios.len(), "{}", group.name);
        }
    }

    #[test]
    fn groups_cover_the_suite() {
        let counts: Vec<_> = GROUPS.iter().map(|g| (g.name, g.scenarios.len())).collect();
        assert_eq!(
            counts,
            [
                ("scan", 8),
                ("state", 8),
                ("misc_mthd", 3),
                ("simple_mthd", 10),
                ("xy_mthd", 9),
                ("rop", 2),
            ]
        );
    }

    #[test]
    fn same_seed_gives_same_stream() {
        let mut a = RegisterFile::new();
        let mut b = RegisterFile::new();
        let mut sa = Step::new(&mut a, 42, 0);
        let mut sb = Step::new(&mut b, 42, 0);
        for _ in 0..16 {
            assert_eq!(sa.word(), sb.word());
        }
    }

    #[test]
    fn bit_scan_failure_reports_the_write() {
        let mut card = RegisterFile::new();
        let mut step = Step::new(&mut card, 1, 0);
        let Err(StepOutcome::Fail(failure)) = step.bit_scan(0x40_0080, 0x1111_1110, 0) else {
            panic!("a plain register file keeps every bit");
        };
        assert_eq!(
            failure.stimulus,
            Some(Stimulus {
                offset: 0x40_0080,
                value: u32::MAX
            })
        );
        assert!(failure.diff.is_empty());
    }

    #[test]
    fn image_class_draws_are_known_hangs() {
        let state = EngineState {
            access: 0x0f01_1111,
            ..EngineState::default()
        };
        assert!(draw_locks_up(&state, class::POINT, 0x400));
        assert!(!draw_locks_up(&state, class::POINT, 0x304));
    }

    #[test]
    fn triangle_and_rect_draws_are_not_skipped_up_front() {
        for access in [0x0f00_b111, 0x0f00_c111] {
            let state = EngineState {
                access,
                ..EngineState::default()
            };
            assert!(!draw_locks_up(&state, class::TRI, 0x318));
            assert!(!draw_locks_up(&state, class::RECT, 0x404));
        }
    }

    #[test]
    fn accepted_triangle_draws_reach_the_card() {
        const DRAW_ERRORS: u32 = 0x0111_1000;
        let mut card = SimulatedCard::new();
        let mut accepted = 0;
        for seed in 0..200 {
            let mut step = Step::new(&mut card, seed, 0);
            let mut orig = step.random_state();
            orig.access = 0x0f00_b111;
            orig.intr &= !DRAW_ERRORS;
            orig.valid = (orig.valid | 0x00ff_ffff) & !0x1100_0000 & VALID_MASK;
            orig.canvas_config &= !(1 << 24);
            orig.cliprect_ctrl &= !(1 << 8);
            orig.xy_misc_4 = orig.xy_misc_4.map(|v| v & !0xf0);
            let value = step.word();
            let mut exp = orig.clone();
            let effect = oracle::method(&mut exp, class::TRI, 0x318, value);
            assert_eq!(effect.prediction, Prediction::MayHang);
            if exp.intr & DRAW_ERRORS != 0 {
                continue;
            }
            accepted += 1;
            let outcome = step.submit(&orig, class::TRI, 0x318, value);
            assert_eq!(outcome, StepOutcome::Pass, "seed {seed}");
            assert_eq!(
                step.stimulus,
                Some(Stimulus {
                    offset: method_addr(class::TRI, 0x318),
                    value
                })
            );
        }
        assert!(accepted > 0);
    }
}
