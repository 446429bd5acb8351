//! Batch runner: every well, then every group, with per-item failure isolation.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{error, info, info_span, warn};

use econ_core::{WellInput, WellResult};

use crate::error::EvalError;
use crate::group::{evaluate_group, GroupResult, Member};
use crate::pipeline::evaluate_well;
use crate::scenario::Scenario;

/// Why a well or group produced no result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    pub message: String,
    /// `false` for panics and other failures the engine did not anticipate.
    pub expected: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome<T> {
    Ok(T),
    Failed(Failure),
}

impl<T> Outcome<T> {
    pub fn ok(&self) -> Option<&T> {
        match self {
            Outcome::Ok(v) => Some(v),
            Outcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Outcome::Ok(_) => None,
            Outcome::Failed(f) => Some(f),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WellReport {
    pub well_id: String,
    pub outcome: Outcome<WellResult>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupReport {
    pub group_id: String,
    pub outcome: Outcome<GroupResult>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub wells: Vec<WellReport>,
    pub groups: Vec<GroupReport>,
}

impl BatchReport {
    pub fn failed(&self) -> usize {
        let w = self.wells.iter().filter(|r| r.outcome.failure().is_some());
        let g = self.groups.iter().filter(|r| r.outcome.failure().is_some());
        w.count() + g.count()
    }
}

/// Totals printed per well.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WellSummary {
    pub well_id: String,
    pub unecon: bool,
    pub cutoff_date: NaiveDate,
    pub capex: f64,
    pub expenses: f64,
    pub taxes: f64,
    pub net_cash_flow: f64,
}

impl WellSummary {
    pub fn of(result: &WellResult) -> Self {
        let n = result.timeline.months;
        Self {
            well_id: result.well_id.clone(),
            unecon: result.unecon,
            cutoff_date: result.dates.cutoff_date,
            capex: result.capex.total.iter().sum(),
            expenses: result.expenses.total(n).iter().sum(),
            taxes: result.taxes.total().iter().sum(),
            net_cash_flow: result.net_cash_flow().iter().sum(),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run `f`, turning errors and panics into a reported failure.
fn guarded<T>(id: &str, f: impl FnOnce() -> Result<T, EvalError>) -> Outcome<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(v)) => Outcome::Ok(v),
        Ok(Err(e)) => {
            warn!(id = %id, error = %e, "evaluation failed");
            Outcome::Failed(Failure {
                message: e.to_string(),
                expected: true,
            })
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(id = %id, %message, "unexpected failure");
            Outcome::Failed(Failure {
                message,
                expected: false,
            })
        }
    }
}

fn fan_out<I, O, F>(parallel: bool, items: &[I], f: F) -> Vec<O>
where
    I: Sync,
    O: Send,
    F: Fn(&I) -> O + Sync + Send,
{
    if parallel {
        items.par_iter().map(f).collect()
    } else {
        items.iter().map(f).collect()
    }
}

/// Evaluate every well, then every group on top of the well results.
pub fn run_batch(scenario: &Scenario) -> BatchReport {
    let config = &scenario.settings;
    let revenue = &scenario.prices;
    info!(
        wells = scenario.wells.len(),
        groups = scenario.groups.len(),
        parallel = config.parallel,
        "batch started"
    );

    let wells = fan_out(config.parallel, &scenario.wells, |w| {
        let span = info_span!("well", id = %w.id);
        let _enter = span.enter();
        WellReport {
            well_id: w.id.clone(),
            outcome: guarded(&w.id, || evaluate_well(w, config, revenue)),
        }
    });

    let inputs: HashMap<&str, &WellInput> =
        scenario.wells.iter().map(|w| (w.id.as_str(), w)).collect();
    let results: HashMap<&str, Option<&WellResult>> = wells
        .iter()
        .map(|r| (r.well_id.as_str(), r.outcome.ok()))
        .collect();

    let groups = fan_out(config.parallel, &scenario.groups, |g| {
        let span = info_span!("group", id = %g.id);
        let _enter = span.enter();
        let outcome = guarded(&g.id, || {
            let members = g
                .wells
                .iter()
                .map(|id| {
                    let unknown = || EvalError::UnknownWell {
                        group: g.id.clone(),
                        well: id.clone(),
                    };
                    let input = *inputs.get(id.as_str()).ok_or_else(unknown)?;
                    let result = (*results.get(id.as_str()).ok_or_else(unknown)?)
                        .ok_or_else(|| EvalError::MemberFailed(id.clone()))?;
                    Ok(Member { input, result })
                })
                .collect::<Result<Vec<_>, EvalError>>()?;
            evaluate_group(g, &members, config, revenue)
        });
        GroupReport {
            group_id: g.id.clone(),
            outcome,
        }
    });

    let report = BatchReport { wells, groups };
    info!(
        wells = report.wells.len(),
        groups = report.groups.len(),
        failed = report.failed(),
        "batch finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{parse_scenario, ScenarioFormat};

    const SCENARIO: &str = r#"
settings:
  parallel: true
prices:
  oil: 60.0
wells:
  - id: A
    dates: {as_of_date: 2023-01-01, max_econ_life_years: 3}
    production: {start: 2023-01-01, oil: [500, 450, 400, 350, 300, 250]}
  - id: B
    dates: {as_of_date: 2023-01-01, max_econ_life_years: 3}
    production: {start: 2023-01-01, oil: [100, 100, 100]}
  - id: BAD
    dates: {as_of_date: 2023-01-01}
    capex:
      rows:
        - {category: teleporter, tangible: 5, date: 2023-01-01}
groups:
  - id: G1
    wells: [A, B]
    allocation: {method: well_count, basis: net}
    dates: {as_of_date: 2023-01-01, max_econ_life_years: 3}
    capex:
      rows:
        - {category: facilities, tangible: 1000, date: 2023-02-01}
  - id: G2
    wells: [A, GHOST]
    dates: {as_of_date: 2023-01-01}
  - id: G3
    wells: [A, BAD]
    dates: {as_of_date: 2023-01-01}
"#;

    fn report(parallel: bool) -> BatchReport {
        let mut s = parse_scenario(SCENARIO, ScenarioFormat::Yaml).unwrap();
        s.settings.parallel = parallel;
        run_batch(&s)
    }

    #[test]
    fn failures_are_isolated_per_well_and_group() {
        let r = report(true);
        assert_eq!(r.wells.len(), 3);
        assert!(r.wells[0].outcome.ok().is_some());
        assert!(r.wells[1].outcome.ok().is_some());
        let bad = r.wells[2].outcome.failure().unwrap();
        assert!(bad.expected);
        assert!(bad.message.contains("column 1"));

        let g1 = r.groups[0].outcome.ok().unwrap();
        assert_eq!(g1.allocations.len(), 2);
        let capex: f64 = g1.allocations.iter().map(|a| a.capex.iter().sum::<f64>()).sum();
        assert!((capex - 1000.0).abs() < 1e-9);

        assert!(r.groups[1]
            .outcome
            .failure()
            .unwrap()
            .message
            .contains("GHOST"));
        assert!(r.groups[2].outcome.failure().unwrap().message.contains("BAD"));
        assert_eq!(r.failed(), 3);
    }

    #[test]
    fn sequential_and_parallel_agree() {
        let a = serde_json::to_value(report(true)).unwrap();
        let b = serde_json::to_value(report(false)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn bad_expense_category_fails_only_its_well() {
        let yaml = r#"
prices:
  oil: 60.0
wells:
  - id: GOOD
    dates: {as_of_date: 2023-01-01, max_econ_life_years: 2}
    production: {start: 2023-01-01, oil: [100, 100, 100]}
    expenses:
      fixed:
        - {category: other_monthly_cost_1, unit: per_month, schedule: {kind: flat, value: 10}}
  - id: BAD
    dates: {as_of_date: 2023-01-01, max_econ_life_years: 2}
    production: {start: 2023-01-01, oil: [100, 100, 100]}
    expenses:
      fixed:
        - {category: monthly_well_cost, unit: per_month, schedule: {kind: flat, value: 10}}
        - {category: bogus_cost, unit: per_month, schedule: {kind: flat, value: 10}}
"#;
        let s = parse_scenario(yaml, ScenarioFormat::Yaml).unwrap();
        let r = run_batch(&s);
        let good = r.wells[0].outcome.ok().unwrap();
        assert_eq!(good.expenses.fixed[0].category, "other_monthly_cost_1");
        let bad = r.wells[1].outcome.failure().unwrap();
        assert!(bad.expected);
        assert!(bad.message.contains("bogus_cost"));
        assert!(bad.message.contains("column 2"));
        assert_eq!(r.failed(), 1);
    }

    #[test]
    fn panics_are_reported_as_unexpected() {
        let out: Outcome<()> = guarded("x", || panic!("boom"));
        let f = out.failure().unwrap();
        assert!(!f.expected);
        assert_eq!(f.message, "boom");
    }
}
