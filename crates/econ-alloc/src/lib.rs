//! Group allocation: share group-level costs and taxes back to member wells.
//!
//! Each member contributes a reference quantity (volume, revenue, income or
//! well count) to a [`ReferenceTable`]. [`AllocationEngine::allocate`] turns
//! the member's share of that table into ratios and applies them to the
//! group's cost series over the window the two have in common.

pub mod ratio;

use chrono::NaiveDate;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use econ_core::{
    AllocationBasis, AllocationContext, AllocationMethod, AllocationTiming, CapexEvent,
    GroupEconLimit, Product, Timeline, WellResult, safe_div,
};

pub use ratio::{annual_ratio, monthly_ratio, remaining_ratio};

/// Reference quantity of one well under `method` and `basis`, clamped at zero.
pub fn reference_series(
    result: &WellResult,
    method: AllocationMethod,
    basis: AllocationBasis,
) -> Vec<f64> {
    let n = result.timeline.months;
    let v = &result.volumes;
    let nri_volumes = v.ownership.get("nri");
    let fit = |mut s: Vec<f64>| {
        s.resize(n, 0.0);
        s
    };
    let values = match (method, basis) {
        (AllocationMethod::OilVolume, AllocationBasis::Gross) => fit(v.sales.oil.clone()),
        (AllocationMethod::OilVolume, AllocationBasis::Net) => {
            fit(nri_volumes.map(|p| p.oil.clone()).unwrap_or_default())
        }
        (AllocationMethod::GasVolume, AllocationBasis::Gross) => fit(v.sales.gas.clone()),
        (AllocationMethod::GasVolume, AllocationBasis::Net) => {
            fit(nri_volumes.map(|p| p.gas.clone()).unwrap_or_default())
        }
        (AllocationMethod::BoeVolume, AllocationBasis::Gross) => fit(v.boe.clone()),
        (AllocationMethod::BoeVolume, AllocationBasis::Net) => fit(v.net_boe.clone()),
        (AllocationMethod::WellCount, _) => vec![result.well_count; n],
        (AllocationMethod::Revenue, AllocationBasis::Net) => fit(result.revenue.total()),
        (AllocationMethod::Revenue, AllocationBasis::Gross) => {
            let nri = result
                .ownership
                .phase(Product::Oil)
                .map(|p| p.nri.clone())
                .unwrap_or_default();
            gross_of(&fit(result.revenue.total()), &nri)
        }
        (AllocationMethod::Income, AllocationBasis::Net) => fit(result.net_income()),
        (AllocationMethod::Income, AllocationBasis::Gross) => {
            gross_of(&fit(result.net_income()), result.ownership.wi())
        }
    };
    values.into_iter().map(|x| x.max(0.0)).collect()
}

fn gross_of(net: &[f64], fraction: &[f64]) -> Vec<f64> {
    net.iter()
        .enumerate()
        .map(|(i, v)| match fraction.get(i) {
            Some(f) if *f != 0.0 => v / f,
            _ => *v,
        })
        .collect()
}

/// One member's allocation inputs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemberReference {
    pub well_id: String,
    pub timeline: Timeline,
    pub cutoff_date: NaiveDate,
    pub unecon: bool,
    /// Reference quantity per month on `timeline`, never negative.
    pub values: Vec<f64>,
    pub wi: Vec<f64>,
    pub nri: Vec<f64>,
    pub well_count: f64,
}

impl MemberReference {
    pub fn from_result(result: &WellResult, ctx: &AllocationContext) -> Self {
        let fraction = |p: Option<&Vec<f64>>| {
            let mut v = p.cloned().unwrap_or_default();
            v.resize(result.timeline.months, 0.0);
            v
        };
        let oil = result.ownership.phase(Product::Oil);
        Self {
            well_id: result.well_id.clone(),
            timeline: result.timeline,
            cutoff_date: result.dates.cutoff_date,
            unecon: result.unecon,
            values: reference_series(result, ctx.method, ctx.basis),
            wi: fraction(oil.map(|p| &p.wi)),
            nri: fraction(oil.map(|p| &p.nri)),
            well_count: result.well_count,
        }
    }
}

/// Sum of every member's reference quantity on the union of their timelines.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReferenceTable {
    pub timeline: Timeline,
    pub total: Vec<f64>,
    pub well_count: f64,
}

impl ReferenceTable {
    /// Build from members; when every member is unecon the table collapses to
    /// the earliest start month with a zero total.
    pub fn build(members: &[MemberReference]) -> Self {
        let well_count = members.iter().map(|m| m.well_count).sum();
        let start = members.iter().map(|m| m.timeline.start).min();
        let end = members
            .iter()
            .filter(|m| !m.timeline.is_empty())
            .map(|m| m.timeline.end())
            .max();
        let Some(start) = start else {
            return Self {
                timeline: Timeline {
                    start: NaiveDate::default(),
                    months: 0,
                },
                total: vec![],
                well_count,
            };
        };
        if members.iter().all(|m| m.unecon) {
            return Self {
                timeline: Timeline::single(start),
                total: vec![0.0],
                well_count,
            };
        }
        let timeline = Timeline::between(start, end.unwrap_or(start));
        let mut total = timeline.zeros();
        for m in members {
            for (t, v) in total.iter_mut().zip(timeline.align(&m.values, &m.timeline)) {
                *t += v;
            }
        }
        Self {
            timeline,
            total,
            well_count,
        }
    }
}

/// Group-level series to redistribute, taken from the group's own result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupSeries {
    pub timeline: Timeline,
    pub cutoff_date: NaiveDate,
    pub fixed_expense: Vec<f64>,
    pub variable_expense: Vec<f64>,
    pub water_disposal: Vec<f64>,
    pub production_tax: Vec<f64>,
    pub capex: Vec<f64>,
    pub capex_events: Vec<CapexEvent>,
}

impl GroupSeries {
    /// Gross basis shares gross group dollars; net basis shares the net ones.
    /// Carbon charges travel with the variable expense.
    pub fn from_result(result: &WellResult, basis: AllocationBasis) -> Self {
        let n = result.timeline.months;
        let e = &result.expenses;
        let sum = |rows: &[econ_core::ExpenseSeries]| -> Vec<f64> {
            let mut out = vec![0.0; n];
            for r in rows {
                let src = match basis {
                    AllocationBasis::Gross => &r.gross,
                    AllocationBasis::Net => &r.net,
                };
                for (o, v) in out.iter_mut().zip(src) {
                    *o += v;
                }
            }
            out
        };
        let mut variable = sum(&e.variable);
        for (v, c) in variable.iter_mut().zip(sum(&e.carbon)) {
            *v += c;
        }
        let capex = match basis {
            AllocationBasis::Gross => result.capex.gross_total.clone(),
            AllocationBasis::Net => result.capex.total.clone(),
        };
        Self {
            timeline: result.timeline,
            cutoff_date: result.dates.cutoff_date,
            fixed_expense: sum(&e.fixed),
            variable_expense: variable,
            water_disposal: sum(&e.water_disposal),
            production_tax: result.taxes.total(),
            capex,
            capex_events: result.capex.events.clone(),
        }
    }

    /// Group series with nothing to share.
    pub fn empty(timeline: Timeline, cutoff_date: NaiveDate) -> Self {
        Self {
            timeline,
            cutoff_date,
            fixed_expense: timeline.zeros(),
            variable_expense: timeline.zeros(),
            water_disposal: timeline.zeros(),
            production_tax: timeline.zeros(),
            capex: timeline.zeros(),
            capex_events: vec![],
        }
    }
}

/// A well's allocated share of the group's series.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AllocatedShare {
    pub well_id: String,
    /// Months the well's window and the group result have in common.
    pub timeline: Timeline,
    /// Base ratio on `timeline`.
    pub ratio: Vec<f64>,
    pub cost_ratio: Vec<f64>,
    pub tax_ratio: Vec<f64>,
    /// Scalar capex ratio before any WI scaling.
    pub capex_ratio: f64,
    pub fixed_expense: Vec<f64>,
    pub variable_expense: Vec<f64>,
    pub water_disposal: Vec<f64>,
    pub production_tax: Vec<f64>,
    pub capex: Vec<f64>,
    /// Scaled copies of group events that fall in the window.
    pub capex_events: Vec<CapexEvent>,
}

impl AllocatedShare {
    pub fn total_cost(&self) -> f64 {
        [
            &self.fixed_expense,
            &self.variable_expense,
            &self.water_disposal,
            &self.production_tax,
            &self.capex,
        ]
        .iter()
        .map(|s| s.iter().sum::<f64>())
        .sum()
    }
}

/// Applies one allocation context to every member of a group.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllocationEngine {
    ctx: AllocationContext,
}

impl AllocationEngine {
    pub fn new(ctx: AllocationContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &AllocationContext {
        &self.ctx
    }

    /// Last month of the member's allocation window.
    pub fn window_end(&self, member: &MemberReference, group_cutoff: NaiveDate) -> NaiveDate {
        match self.ctx.group_econ_limit {
            GroupEconLimit::Independent => member.cutoff_date,
            GroupEconLimit::CannotExceedGroup => member.cutoff_date.min(group_cutoff),
            GroupEconLimit::MustBeGroup => group_cutoff,
        }
    }

    /// Member window on the calendar; a single month when it would be empty.
    pub fn window(&self, member: &MemberReference, group_cutoff: NaiveDate) -> Timeline {
        let w = Timeline::between(member.timeline.start, self.window_end(member, group_cutoff));
        if w.is_empty() {
            Timeline::single(member.timeline.start)
        } else {
            w
        }
    }

    /// Base ratio per month of the member window.
    pub fn ratio(
        &self,
        table: &ReferenceTable,
        member: &MemberReference,
        window: &Timeline,
    ) -> Vec<f64> {
        if !self.ctx.enabled || member.unecon {
            debug!(well = %member.well_id, "allocation ratio is zero");
            return window.zeros();
        }
        if self.ctx.method == AllocationMethod::WellCount {
            let r = safe_div(member.well_count, table.well_count).clamp(0.0, 1.0);
            return vec![r; window.months];
        }
        let well_full = table.timeline.align(&member.values, &member.timeline);
        let ratios = match self.ctx.timing {
            AllocationTiming::Monthly => monthly_ratio(
                &window.align(&well_full, &table.timeline),
                &window.align(&table.total, &table.timeline),
            ),
            AllocationTiming::Annual => annual_ratio(
                &window.align(&well_full, &table.timeline),
                &window.align(&table.total, &table.timeline),
            ),
            AllocationTiming::Remaining => {
                let full = remaining_ratio(&well_full, &table.total);
                window.align(&full, &table.timeline)
            }
        };
        ratios.into_iter().map(|r| r.clamp(0.0, 1.0)).collect()
    }

    /// Scalar capex ratio over the full life of the reference table.
    pub fn capex_ratio(&self, table: &ReferenceTable, member: &MemberReference) -> f64 {
        if !self.ctx.enabled || member.unecon {
            return 0.0;
        }
        let r = match self.ctx.method {
            AllocationMethod::WellCount => safe_div(member.well_count, table.well_count),
            _ => safe_div(member.values.iter().sum(), table.total.iter().sum()),
        };
        r.clamp(0.0, 1.0)
    }

    /// The member's share of every group series.
    pub fn allocate(
        &self,
        table: &ReferenceTable,
        group: &GroupSeries,
        member: &MemberReference,
    ) -> AllocatedShare {
        let window = self.window(member, group.cutoff_date);
        let base = self.ratio(table, member, &window);
        let wi = window.align(&member.wi, &member.timeline);
        let nri = window.align(&member.nri, &member.timeline);
        let capex_ratio = self.capex_ratio(table, member);
        let (cost, tax, capex_cost) = match self.ctx.basis {
            AllocationBasis::Gross => (
                mul(&base, &wi),
                mul(&base, &nri),
                capex_ratio * wi.first().copied().unwrap_or(0.0),
            ),
            AllocationBasis::Net => (base.clone(), base.clone(), capex_ratio),
        };

        let shared = shared_window(&window, &group.timeline);
        let on_shared = |ratio: &[f64]| shared.align(ratio, &window);
        let cost = on_shared(&cost);
        let tax = on_shared(&tax);
        let share =
            |series: &[f64], ratio: &[f64]| mul(&shared.align(series, &group.timeline), ratio);
        let capex: Vec<f64> = shared
            .align(&group.capex, &group.timeline)
            .into_iter()
            .map(|v| v * capex_cost)
            .collect();
        let scale = Decimal::from_f64(capex_cost).unwrap_or(Decimal::ZERO);
        let capex_events = group
            .capex_events
            .iter()
            .filter(|e| capex_cost > 0.0 && shared.index_of(e.date).is_some())
            .map(|e| e.scaled(scale))
            .collect();

        AllocatedShare {
            well_id: member.well_id.clone(),
            timeline: shared,
            ratio: on_shared(&base),
            fixed_expense: share(&group.fixed_expense, &cost),
            variable_expense: share(&group.variable_expense, &cost),
            water_disposal: share(&group.water_disposal, &cost),
            production_tax: share(&group.production_tax, &tax),
            capex,
            capex_events,
            cost_ratio: cost,
            tax_ratio: tax,
            capex_ratio,
        }
    }
}

fn mul(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x * y).collect()
}

/// Calendar months present in both timelines; empty when they do not overlap.
pub fn shared_window(a: &Timeline, b: &Timeline) -> Timeline {
    let start = a.start.max(b.start);
    let end = a.end().min(b.end());
    if a.is_empty() || b.is_empty() {
        return Timeline { start, months: 0 };
    }
    Timeline::between(start, end)
}
