//! NV01 PGRAPH state model and oracle.
//!
//! PGRAPH is the 2D/3D drawing engine of the NVIDIA NV1. This crate holds
//! everything a register-level regression test needs to know about it:
//! the full engine state, how to load it into a card and dump it back, and
//! a bit-precise prediction of what any single register access or object
//! method does to that state.
//!
//! A test generates a random state, loads it, applies one stimulus to the
//! card and the same stimulus to [`oracle`] on a copy, dumps the card and
//! compares. [`SimulatedCard`] runs the oracle behind the same interface.

mod card;
mod compare;
mod generator;
mod load;
pub mod oracle;
pub mod regs;
mod state;

pub use card::{NV1_BOOT_0, SimulatedCard};
pub use compare::{FieldMismatch, compare_states, diff_states, render_table};
pub use generator::generate_state;
pub use load::{DumpOutcome, LOCKUP_POLLS, dump_state, load_state, reset_pgraph};
pub use state::{EngineState, Field, X, Y};
