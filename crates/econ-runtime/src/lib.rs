//! Evaluation runtime: per-well pipeline, group pipeline and the batch runner.
//!
//! Wells are evaluated independently (in parallel when the run allows it).
//! Groups then aggregate their members, run group economics once and hand
//! each member its allocated share. Any single failure is reported in the
//! [`BatchReport`] without stopping the rest of the batch.

pub mod batch;
pub mod error;
pub mod group;
pub mod pipeline;
pub mod revenue;
pub mod scenario;

pub use batch::{run_batch, BatchReport, Failure, GroupReport, Outcome, WellReport, WellSummary};
pub use error::EvalError;
pub use group::{evaluate_group, GroupInput, GroupResult, Member};
pub use pipeline::evaluate_well;
pub use revenue::{FlatPriceRevenue, RevenueSource};
pub use scenario::{load_scenario, parse_scenario, Scenario, ScenarioError, ScenarioFormat};
