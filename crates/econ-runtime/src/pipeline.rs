//! Single-well evaluation: dates, capex pre-pass, streams, cutoff, final pass.

use tracing::{debug, warn};

use econ_calc::dates::initial_context;
use econ_calc::ownership::ownership_split;
use econ_calc::schedule::RateLookup;
use econ_calc::{
    determine_cutoff, CapexScheduler, DateResolver, ExpenseCalculator, ReferenceData,
    SchedulePass, StreamContext, TaxCalculator, VolumeCalculator,
};
use econ_core::{
    validate_well, CapexResult, CriteriaRow, DateContext, EngineConfig, ExpenseModel,
    ExpenseResult, OwnershipSplit, PhaseRevenue, ProductionTaxModel, TaxResult, Timeline,
    VolumeResult, WellInput, WellResult,
};

use crate::error::EvalError;
use crate::revenue::RevenueSource;

/// Stream outputs of one pass over a timeline.
struct Streams {
    ownership: OwnershipSplit,
    volumes: VolumeResult,
    revenue: PhaseRevenue,
    expenses: ExpenseResult,
    taxes: TaxResult,
}

impl Streams {
    /// Net revenue less econ-limit expenses less taxes.
    fn econ_cash_flow(&self, len: usize) -> Vec<f64> {
        let rev = self.revenue.total();
        let exp = self.expenses.econ_limit_total(len);
        let tax = self.taxes.total();
        (0..len)
            .map(|i| {
                rev.get(i).copied().unwrap_or(0.0)
                    - exp.get(i).copied().unwrap_or(0.0)
                    - tax.get(i).copied().unwrap_or(0.0)
            })
            .collect()
    }
}

/// Borrowed inputs shared by both passes of one well.
struct WellPass<'a> {
    input: &'a WellInput,
    expenses: &'a ExpenseModel,
    taxes: &'a ProductionTaxModel,
    config: &'a EngineConfig,
    revenue: &'a dyn RevenueSource,
}

impl<'a> WellPass<'a> {
    fn refs(&self) -> ReferenceData<'a> {
        ReferenceData {
            header: &self.input.header,
            schedule: &self.input.schedule,
            production: &self.input.production,
        }
    }

    fn streams(&self, ctx: &DateContext, timeline: &Timeline) -> Streams {
        let input = self.input;
        let resolver = DateResolver::new(ctx, self.refs());
        let ownership = ownership_split(&input.ownership, timeline);
        let volumes = VolumeCalculator {
            stream: &input.stream,
            risking: &input.risking,
            config: self.config,
            shut_ins: &input.shut_ins,
        }
        .compute(&input.production, timeline, &ownership, ctx.cutoff_date);
        let revenue = self
            .revenue
            .revenue(&input.id, timeline, &volumes, &ownership);
        let rates = RateLookup::from_production(&input.production, timeline);
        let sctx = StreamContext {
            timeline,
            resolver: &resolver,
            volumes: &volumes,
            revenue: &revenue,
            ownership: &ownership,
            rates: &rates,
            well_count: input.well_count,
            shut_ins: &input.shut_ins,
        };
        let expenses = ExpenseCalculator::new(self.expenses).compute(&sctx);
        let taxes = TaxCalculator::new(self.taxes).compute(&sctx, &expenses);
        Streams {
            ownership,
            volumes,
            revenue,
            expenses,
            taxes,
        }
    }

    fn result(
        &self,
        dates: DateContext,
        timeline: Timeline,
        unecon: bool,
        capex: CapexResult,
        streams: Streams,
    ) -> WellResult {
        WellResult {
            well_id: self.input.id.clone(),
            dates,
            timeline,
            unecon,
            capex,
            expenses: streams.expenses,
            taxes: streams.taxes,
            volumes: streams.volumes,
            ownership: streams.ownership,
            revenue: streams.revenue,
            well_count: self.input.well_count,
        }
    }
}

/// Parse the raw capex table into typed rows; the first bad row fails the well.
pub fn capex_rows(input: &WellInput) -> Result<Vec<CriteriaRow>, EvalError> {
    input
        .capex
        .rows
        .iter()
        .enumerate()
        .map(|(i, raw)| CriteriaRow::from_raw(raw, i + 1).map_err(EvalError::from))
        .collect()
}

/// Evaluate one well end to end.
pub fn evaluate_well(
    input: &WellInput,
    config: &EngineConfig,
    revenue: &dyn RevenueSource,
) -> Result<WellResult, EvalError> {
    validate_well(input)?;
    let rows = capex_rows(input)?;
    let pass = WellPass {
        input,
        expenses: &input.expenses,
        taxes: &input.taxes,
        config,
        revenue,
    };
    let scheduler = CapexScheduler {
        rows: &rows,
        unit: input.capex.unit,
        shut_ins: &input.shut_ins,
        ownership: &input.ownership,
        cash_flow_prior_to_as_of: input
            .dates
            .cash_flow_prior_to_as_of_date
            .unwrap_or(config.cash_flow_prior_to_as_of_date),
    };

    let mut ctx = initial_context(
        &input.dates,
        &input.header,
        &input.production,
        input.forecast_start,
    );
    let max_life = ctx.max_life_date();
    scheduler
        .schedule(&DateResolver::new(&ctx, pass.refs()), SchedulePass::CutoffSearch)?
        .apply_to(&mut ctx);

    let horizon = Timeline::between(ctx.cash_flow_start_date, max_life);
    let search = DateContext {
        cutoff_date: max_life,
        ..ctx
    };
    let econ_cf = pass.streams(&search, &horizon).econ_cash_flow(horizon.months);
    ctx.cutoff_date = determine_cutoff(&input.dates.cutoff, &horizon, &econ_cf, max_life);
    debug!(well = %input.id, cutoff = %ctx.cutoff_date, "econ limit determined");

    if ctx.is_unecon() {
        warn!(well = %input.id, cutoff = %ctx.cutoff_date, "well is uneconomic");
        return Ok(unecon_result(input, config, revenue, ctx));
    }

    let schedule =
        scheduler.schedule(&DateResolver::new(&ctx, pass.refs()), SchedulePass::Final)?;
    schedule.apply_to(&mut ctx);
    let timeline = ctx.timeline();
    let streams = pass.streams(&ctx, &timeline);
    let capex = schedule.result(&timeline);
    Ok(pass.result(ctx, timeline, false, capex, streams))
}

/// Zeroed single-month result on the cash flow start month.
fn unecon_result(
    input: &WellInput,
    config: &EngineConfig,
    revenue: &dyn RevenueSource,
    ctx: DateContext,
) -> WellResult {
    let expenses = ExpenseModel::default();
    let taxes = ProductionTaxModel::default();
    let pass = WellPass {
        input,
        expenses: &expenses,
        taxes: &taxes,
        config,
        revenue,
    };
    let timeline = Timeline::single(ctx.cash_flow_start_date);
    let streams = pass.streams(&ctx, &timeline);
    let capex = CapexResult::from_events(vec![], &timeline);
    pass.result(ctx, timeline, true, capex, streams)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revenue::FlatPriceRevenue;
    use chrono::NaiveDate;
    use econ_core::ProductionSeries;
    use serde_json::json;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn well(extra: serde_json::Value) -> WellInput {
        let mut base = json!({
            "id": "W1",
            "dates": {
                "as_of_date": "2023-01-01",
                "max_econ_life_years": 5,
                "cutoff": {"kind": "last_positive_cash_flow"}
            },
            "ownership": {"wi": 1.0, "nri": 0.8},
        });
        if let (Some(b), Some(e)) = (base.as_object_mut(), extra.as_object()) {
            for (k, v) in e {
                b.insert(k.clone(), v.clone());
            }
        }
        let mut input: WellInput = serde_json::from_value(base).unwrap();
        input.production = ProductionSeries {
            start: d(2023, 1, 1),
            oil: (0..24).map(|i| 1000.0 - 40.0 * i as f64).collect(),
            gas: vec![],
            water: vec![],
        };
        input
    }

    fn prices() -> FlatPriceRevenue {
        FlatPriceRevenue {
            oil: 50.0,
            ..Default::default()
        }
    }

    #[test]
    fn cutoff_lands_when_revenue_falls_below_fixed_cost() {
        let input = well(json!({
            "expenses": {"fixed": [{
                "category": "monthly_well_cost",
                "unit": "per_month",
                "schedule": {"kind": "flat", "value": 20000.0}
            }]}
        }));
        let r = evaluate_well(&input, &EngineConfig::default(), &prices()).unwrap();
        // revenue = (1000 - 40 i) * 0.8 * 50 > 20000 while i < 12.5
        assert_eq!(r.dates.cutoff_date, d(2024, 1, 31));
        assert!(!r.unecon);
        assert_eq!(r.timeline.months, 13);
        assert_eq!(r.expenses.fixed_total(13)[12], 20000.0);
    }

    #[test]
    fn uneconomic_well_collapses_to_zeroed_month() {
        let input = well(json!({
            "expenses": {"fixed": [{
                "category": "monthly_well_cost",
                "unit": "per_month",
                "schedule": {"kind": "flat", "value": 1.0e9}
            }]},
            "capex": {"rows": [{
                "category": "drilling",
                "tangible": "100",
                "offset_to_as_of_date": {"days": 0}
            }]}
        }));
        let r = evaluate_well(&input, &EngineConfig::default(), &prices()).unwrap();
        assert!(r.unecon);
        assert_eq!(r.timeline.months, 1);
        assert!(r.net_cash_flow().iter().all(|v| *v == 0.0));
        assert!(r.capex.events.is_empty());
    }

    #[test]
    fn bad_capex_category_fails_with_column() {
        let input = well(json!({
            "capex": {"rows": [
                {"category": "drilling", "tangible": "1", "date": "2023-02-01"},
                {"category": "spaceship", "tangible": "1", "date": "2023-02-01"}
            ]}
        }));
        let err = evaluate_well(&input, &EngineConfig::default(), &prices()).unwrap_err();
        match err {
            EvalError::Configuration(c) => assert_eq!(c.column(), Some(2)),
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn thousand_dollar_capex_is_converted_once() {
        let input = well(json!({
            "capex": {"unit": "thousand_dollars", "rows": [{
                "category": "completion",
                "tangible": "2",
                "intangible": "3",
                "date": "2023-03-15"
            }]}
        }));
        let config = EngineConfig::default();
        let a = evaluate_well(&input, &config, &prices()).unwrap();
        let b = evaluate_well(&input, &config, &prices()).unwrap();
        assert_eq!(a.capex.total[2], 5000.0);
        assert_eq!(a.capex, b.capex);
    }
}
