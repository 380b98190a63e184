//! Expected versus observed state comparison.

use std::fmt::{self, Write as _};

use serde::Serialize;
use tracing::error;

use crate::state::EngineState;

/// One field whose dumped value differs from the prediction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldMismatch {
    pub field: String,
    pub expected: u32,
    pub observed: u32,
}

impl fmt::Display for FieldMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: expected {:08x}, real {:08x}",
            self.field, self.expected, self.observed
        )
    }
}

/// Every compared field that differs, in report order.
///
/// The trap registers are not compared: they latch whatever the last
/// faulting access was and are reported but never predicted.
#[must_use]
pub fn diff_states(expected: &EngineState, observed: &EngineState) -> Vec<FieldMismatch> {
    expected
        .fields()
        .into_iter()
        .zip(observed.fields())
        .filter(|(e, o)| e.value != o.value)
        .map(|(e, o)| FieldMismatch {
            field: e.label(),
            expected: e.value,
            observed: o.value,
        })
        .collect()
}

/// Side-by-side table of the loaded, predicted and dumped states.
///
/// Rows that differ are marked with `*`.
#[must_use]
pub fn render_table(orig: &EngineState, expected: &EngineState, observed: &EngineState) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<24} {:>8} {:>8} {:>8}", "", "orig", "expected", "real");
    for ((o, e), r) in orig
        .fields()
        .into_iter()
        .zip(expected.fields())
        .zip(observed.fields())
    {
        let mark = if e.value == r.value { ' ' } else { '*' };
        let _ = writeln!(
            out,
            "{:<24} {:08x} {:08x} {:08x} {mark}",
            o.label(),
            o.value,
            e.value,
            r.value
        );
    }
    let _ = writeln!(
        out,
        "{:<24} {:08x} {:08x} {:08x}",
        "TRAP_ADDR", orig.trap_addr, expected.trap_addr, observed.trap_addr
    );
    let _ = writeln!(
        out,
        "{:<24} {:08x} {:08x} {:08x}",
        "TRAP_DATA", orig.trap_data, expected.trap_data, observed.trap_data
    );
    out
}

/// Compare a prediction against the dumped state and log what broke.
///
/// Returns `true` if anything differs, including a pixel mismatch the
/// caller already found.
pub fn compare_states(
    orig: &EngineState,
    expected: &EngineState,
    observed: &EngineState,
    pixel_mismatch: bool,
) -> bool {
    let mismatches = diff_states(expected, observed);
    for m in &mismatches {
        error!("{m}");
    }
    let broke = pixel_mismatch || !mismatches.is_empty();
    if broke {
        error!("state after stimulus:\n{}", render_table(orig, expected, observed));
    }
    broke
}
