//! Per-well economic calculators.
//!
//! This crate turns validated models from `econ-core` into monthly series:
//! - Criteria date resolution and the capex scheduler
//! - Escalation of scalar and monthly values
//! - Shut-in multipliers and the wellhead to sales volume chain
//! - Fixed, variable, water disposal and carbon expenses
//! - Severance and ad valorem taxes, including the Pennsylvania impact fee
//! - Econ limit (cutoff) determination

pub mod capex;
pub mod cutoff;
pub mod dates;
pub mod escalation;
pub mod expense;
pub mod ownership;
pub mod schedule;
pub mod shut_in;
pub mod tax;
pub mod volume;

pub use capex::{CapexSchedule, CapexScheduler, SchedulePass};
pub use cutoff::determine_cutoff;
pub use dates::{DateResolver, ReferenceData, ResolvedDate};
pub use expense::{ExpenseCalculator, StreamContext};
pub use tax::TaxCalculator;
pub use volume::VolumeCalculator;

use thiserror::Error;

/// Errors produced by the calculators.
#[derive(Debug, Error, PartialEq)]
pub enum CalcError {
    /// An escalated capex amount could not be represented as a decimal.
    #[error("non-finite escalated amount in capex row (column {column})")]
    NonFinite { column: usize },
}

/// Elementwise product of two equal-length series; the shorter one bounds the output.
pub fn mul(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x * y).collect()
}
