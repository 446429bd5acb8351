//! Per-well inputs consumed by the engine.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::calendar::{add_months, days_in_month, first_of_month, Timeline};
use crate::criteria::RatePhase;
use crate::models::{
    CapexModel, DatesModel, ExpenseModel, OwnershipModel, ProductionTaxModel, RiskingModel,
    ShutInWindow, StreamProperties,
};

/// Scalar header fields. Only dates are referenced by criteria offsets.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WellHeader {
    #[serde(default)]
    pub well_name: String,
    #[serde(default)]
    pub state: Option<String>,
    /// e.g. `spud_date`, `first_prod_date`, `completion_start_date`.
    #[serde(default)]
    pub dates: BTreeMap<String, NaiveDate>,
}

impl WellHeader {
    pub fn date(&self, field: &str) -> Option<NaiveDate> {
        self.dates.get(field).copied()
    }
}

/// Named scheduling milestones (pad preparation, spud, completion, ...).
pub type ScheduleMilestones = BTreeMap<String, NaiveDate>;

/// Gross wellhead monthly volumes laid out from `start` (bbl, mcf, bbl).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductionSeries {
    pub start: NaiveDate,
    #[serde(default)]
    pub oil: Vec<f64>,
    #[serde(default)]
    pub gas: Vec<f64>,
    #[serde(default)]
    pub water: Vec<f64>,
}

impl ProductionSeries {
    pub fn months(&self) -> usize {
        self.oil.len().max(self.gas.len()).max(self.water.len())
    }

    pub fn timeline(&self) -> Timeline {
        Timeline {
            start: first_of_month(self.start),
            months: self.months(),
        }
    }

    /// Monthly volume of a rate phase; missing trailing months are zero.
    pub fn volume(&self, phase: RatePhase) -> Vec<f64> {
        let n = self.months();
        let get = |v: &Vec<f64>, i: usize| v.get(i).copied().unwrap_or(0.0);
        (0..n)
            .map(|i| match phase {
                RatePhase::Oil => get(&self.oil, i),
                RatePhase::Gas => get(&self.gas, i),
                RatePhase::Water => get(&self.water, i),
                RatePhase::TotalFluid => get(&self.oil, i) + get(&self.water, i),
            })
            .collect()
    }

    /// Trailing daily-average rate per month (volume / days in month).
    pub fn daily_rate(&self, phase: RatePhase) -> Vec<f64> {
        let start = first_of_month(self.start);
        self.volume(phase)
            .into_iter()
            .enumerate()
            .map(|(i, v)| v / f64::from(days_in_month(add_months(start, i as i32))))
            .collect()
    }

    /// First month with any non-zero oil or gas.
    pub fn first_production_month(&self) -> Option<NaiveDate> {
        let start = first_of_month(self.start);
        (0..self.months())
            .find(|&i| {
                self.oil.get(i).copied().unwrap_or(0.0) > 0.0
                    || self.gas.get(i).copied().unwrap_or(0.0) > 0.0
            })
            .map(|i| add_months(start, i as i32))
    }
}

fn default_well_count() -> f64 {
    1.0
}

/// Everything the engine needs to evaluate one well.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WellInput {
    pub id: String,
    #[serde(default)]
    pub header: WellHeader,
    #[serde(default)]
    pub schedule: ScheduleMilestones,
    #[serde(default)]
    pub production: ProductionSeries,
    /// Start of the forecast segment (the well's first-segment date).
    #[serde(default)]
    pub forecast_start: Option<NaiveDate>,
    pub dates: DatesModel,
    #[serde(default)]
    pub capex: CapexModel,
    #[serde(default)]
    pub expenses: ExpenseModel,
    #[serde(default)]
    pub taxes: ProductionTaxModel,
    #[serde(default)]
    pub ownership: OwnershipModel,
    #[serde(default)]
    pub stream: StreamProperties,
    #[serde(default)]
    pub risking: RiskingModel,
    #[serde(default)]
    pub shut_ins: Vec<ShutInWindow>,
    /// Gross well count; used by per-well fixed expenses and well-count allocation.
    #[serde(default = "default_well_count")]
    pub well_count: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series() -> ProductionSeries {
        ProductionSeries {
            start: NaiveDate::from_ymd_opt(2021, 1, 15).unwrap(),
            oil: vec![0.0, 310.0, 280.0],
            gas: vec![0.0, 0.0],
            water: vec![31.0, 31.0, 31.0, 30.0],
        }
    }

    #[test]
    fn daily_rate_divides_by_month_length() {
        let s = series();
        assert_eq!(s.months(), 4);
        let oil = s.daily_rate(RatePhase::Oil);
        assert_eq!(oil[1], 310.0 / 28.0);
        assert_eq!(oil[3], 0.0);
        let fluid = s.volume(RatePhase::TotalFluid);
        assert_eq!(fluid[1], 341.0);
    }

    #[test]
    fn first_production_month_skips_leading_zeros() {
        assert_eq!(
            series().first_production_month(),
            NaiveDate::from_ymd_opt(2021, 2, 1)
        );
    }
}
