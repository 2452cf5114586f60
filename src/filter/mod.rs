//! Landmark noise filtering.

pub mod baseline;

pub use baseline::{Baseline, BaselineFilter, FilterOutcome};
