//! Core traits and types for register-level hardware regression tests.
//!
//! A test talks to a card through 32-bit MMIO only. Whether the other side
//! is silicon behind a PCI BAR or a software model is invisible to it.

pub mod bits;
mod mmio;
mod outcome;
mod scan;

pub use mmio::{Mmio, RegisterFile};
pub use outcome::TestOutcome;
pub use scan::{BitScanMismatch, bit_scan};
