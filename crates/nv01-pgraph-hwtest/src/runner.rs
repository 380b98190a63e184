//! Scenario selection, the prerequisite check and the iteration loop.

use hwtest_core::bits::{bit, extract};
use hwtest_core::{Mmio, TestOutcome};
use nvidia_nv01_pgraph::regs::{PMC_BOOT_0, PMC_ENABLE, PMC_ENABLE_PFB_BIT};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{HwtestError, Result};
use crate::report::{FailureReport, Report, ScenarioReport};
use crate::scenarios::{GROUPS, Group, Scenario, Step, StepOutcome, find_group};

/// Chipset number of the NV1 in PMC_BOOT_0.
const NV1_CHIPSET: u32 = 0x01;

/// Check the card is an NV1 with its memory controller running, then
/// enable every engine.
pub fn prepare<M: Mmio + ?Sized>(card: &mut M) -> TestOutcome {
    let boot0 = card.read32(PMC_BOOT_0);
    let chipset = extract(boot0, 16, 4);
    if chipset != NV1_CHIPSET {
        info!("chipset {chipset:02x} is not an NV1");
        return TestOutcome::NotApplicable;
    }
    if !bit(card.read32(PMC_ENABLE), PMC_ENABLE_PFB_BIT) {
        warn!("memory controller not up");
        return TestOutcome::Unprepared;
    }
    card.write32(PMC_ENABLE, 0xffff_ffff);
    TestOutcome::Pass
}

fn fnv1a(s: &str) -> u64 {
    s.bytes().fold(0xcbf2_9ce4_8422_2325, |h, b| {
        (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
    })
}

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Seed of iteration `iteration` of the scenario with qualified name `id`.
///
/// Each iteration gets its own stream so any one of them replays alone.
#[must_use]
pub fn iteration_seed(seed: u64, id: &str, iteration: u32) -> u64 {
    splitmix64(splitmix64(seed ^ fnv1a(id)) ^ u64::from(iteration))
}

/// A scenario picked for the run, with the group it belongs to.
#[derive(Debug, Clone, Copy)]
pub struct Selected {
    pub group: &'static Group,
    pub scenario: &'static Scenario,
}

impl Selected {
    /// `group.scenario`; scenario names alone repeat across groups.
    #[must_use]
    pub fn id(&self) -> String {
        format!("{}.{}", self.group.name, self.scenario.name)
    }

    fn matches(&self, filter: &str) -> bool {
        match filter.split_once('.') {
            Some((group, name)) => group == self.group.name && name == self.scenario.name,
            None => filter == self.scenario.name,
        }
    }
}

/// Resolve the group and scenario filters of `config`.
///
/// A scenario filter is either `group.name` or a bare name, which matches
/// that name in every selected group.
pub fn select(config: &Config) -> Result<Vec<Selected>> {
    let groups = if config.groups.is_empty() {
        GROUPS.iter().collect()
    } else {
        config
            .groups
            .iter()
            .map(|name| find_group(name).ok_or_else(|| HwtestError::UnknownGroup(name.clone())))
            .collect::<Result<Vec<_>>>()?
    };
    let all: Vec<Selected> = groups
        .into_iter()
        .flat_map(|group| {
            group
                .scenarios
                .iter()
                .map(move |scenario| Selected { group, scenario })
        })
        .collect();
    if config.scenarios.is_empty() {
        return Ok(all);
    }
    for filter in &config.scenarios {
        if !all.iter().any(|s| s.matches(filter)) {
            return Err(HwtestError::UnknownScenario(filter.clone()));
        }
    }
    Ok(all
        .into_iter()
        .filter(|s| config.scenarios.iter().any(|f| s.matches(f)))
        .collect())
}

/// Run one scenario to completion or to its first failing iteration.
pub fn run_scenario(card: &mut dyn Mmio, config: &Config, selected: Selected) -> ScenarioReport {
    let id = selected.id();
    let iterations = config.scaled_iterations(selected.scenario.iterations);
    let range = match config.iteration {
        Some(i) => i..i + 1,
        None => 0..iterations,
    };
    let mut report = ScenarioReport {
        group: selected.group.name,
        name: selected.scenario.name,
        outcome: TestOutcome::Pass,
        iterations: 0,
        skipped: 0,
        failure: None,
    };
    for iteration in range {
        let seed = iteration_seed(config.seed, &id, iteration);
        let mut step = Step::new(card, seed, iteration);
        let outcome = (selected.scenario.step)(&mut step);
        report.iterations += 1;
        match outcome {
            StepOutcome::Pass => {}
            StepOutcome::Skip(_) => report.skipped += 1,
            StepOutcome::Fail(failure) => {
                match failure.stimulus {
                    Some(s) => error!(
                        "{id}: iteration {iteration} failed after {s}: {}",
                        failure.message
                    ),
                    None => error!("{id}: iteration {iteration} failed: {}", failure.message),
                }
                report.outcome = TestOutcome::Fail;
                report.failure = Some(FailureReport {
                    iteration,
                    seed,
                    stimulus: failure.stimulus,
                    message: failure.message,
                    diff: failure.diff,
                });
                break;
            }
        }
    }
    if report.skipped > 0 {
        warn!(
            "{id}: skipped {} of {} iterations",
            report.skipped, report.iterations
        );
    }
    info!("{id}: {}", report.outcome);
    report
}

/// Check the card, then run every selected scenario against it.
pub fn run(card: &mut dyn Mmio, config: &Config) -> Result<Report> {
    let selected = select(config)?;
    if let Some(iteration) = config.iteration {
        for s in &selected {
            let iterations = config.scaled_iterations(s.scenario.iterations);
            if iteration >= iterations {
                return Err(HwtestError::IterationOutOfRange {
                    scenario: s.id(),
                    iteration,
                    iterations,
                });
            }
        }
    }
    let mut report = Report::new(config.seed);
    let prep = prepare(card);
    if prep != TestOutcome::Pass {
        report.outcome = prep;
        return Ok(report);
    }
    info!(
        "running {} scenarios with seed {:#x}",
        selected.len(),
        config.seed
    );
    for s in selected {
        report.push(run_scenario(card, config, s));
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hwtest_core::RegisterFile;
    use nvidia_nv01_pgraph::{NV1_BOOT_0, SimulatedCard};

    fn config(groups: &[&str], scenarios: &[&str]) -> Config {
        Config {
            groups: groups.iter().map(ToString::to_string).collect(),
            scenarios: scenarios.iter().map(ToString::to_string).collect(),
            ..Config::default()
        }
    }

    fn pmc(boot0: u32, enable: u32) -> RegisterFile {
        let mut card = RegisterFile::new();
        card.preset(PMC_BOOT_0, boot0);
        card.preset(PMC_ENABLE, enable);
        card
    }

    #[test]
    fn other_chips_are_not_applicable() {
        let mut card = pmc(0x2004_00a1, !0);
        assert_eq!(prepare(&mut card), TestOutcome::NotApplicable);
    }

    #[test]
    fn memory_controller_must_be_up() {
        let mut card = pmc(NV1_BOOT_0, 0);
        assert_eq!(prepare(&mut card), TestOutcome::Unprepared);
        assert_eq!(card.peek(PMC_ENABLE), 0);
    }

    #[test]
    fn prepare_enables_every_engine() {
        let mut card = pmc(NV1_BOOT_0, 1 << 24);
        assert_eq!(prepare(&mut card), TestOutcome::Pass);
        assert_eq!(card.peek(PMC_ENABLE), 0xffff_ffff);
    }

    #[test]
    fn iteration_seeds_are_distinct_and_stable() {
        let a = iteration_seed(1, "state.state", 0);
        assert_eq!(a, iteration_seed(1, "state.state", 0));
        assert_ne!(a, iteration_seed(1, "state.state", 1));
        assert_ne!(a, iteration_seed(2, "state.state", 0));
        assert_ne!(a, iteration_seed(1, "state.soft_reset", 0));
    }

    #[test]
    fn empty_filters_select_everything() {
        let selected = select(&Config::default()).unwrap();
        let total: usize = GROUPS.iter().map(|g| g.scenarios.len()).sum();
        assert_eq!(selected.len(), total);
    }

    #[test]
    fn bare_names_match_in_every_group() {
        let ids: Vec<_> = select(&config(&[], &["clip"]))
            .unwrap()
            .iter()
            .map(Selected::id)
            .collect();
        assert_eq!(ids, ["scan.clip", "xy_mthd.clip"]);
        let ids: Vec<_> = select(&config(&[], &["xy_mthd.clip"]))
            .unwrap()
            .iter()
            .map(Selected::id)
            .collect();
        assert_eq!(ids, ["xy_mthd.clip"]);
    }

    #[test]
    fn unknown_names_are_errors() {
        assert!(matches!(
            select(&config(&["raster"], &[])),
            Err(HwtestError::UnknownGroup(_))
        ));
        assert!(matches!(
            select(&config(&["rop"], &["clip"])),
            Err(HwtestError::UnknownScenario(_))
        ));
    }

    #[test]
    fn replayed_iteration_must_exist() {
        let mut card = SimulatedCard::new();
        let config = Config {
            iteration: Some(1),
            ..config(&["scan"], &["debug"])
        };
        assert!(matches!(
            run(&mut card, &config),
            Err(HwtestError::IterationOutOfRange { iteration: 1, .. })
        ));
    }

    #[test]
    fn unprepared_card_runs_nothing() {
        let mut card = pmc(NV1_BOOT_0, 0);
        let report = run(&mut card, &config(&["state"], &[])).unwrap();
        assert_eq!(report.outcome, TestOutcome::Unprepared);
        assert!(report.scenarios.is_empty());
    }

    #[test]
    fn plain_register_file_fails_the_debug_scan() {
        let mut card = pmc(NV1_BOOT_0, !0);
        let report = run(&mut card, &config(&["scan"], &["debug"])).unwrap();
        assert_eq!(report.outcome, TestOutcome::Fail);
        let failure = report.scenarios[0].failure.as_ref().unwrap();
        assert_eq!(failure.iteration, 0);
        assert!(failure.stimulus.is_some());
    }
}
