//! Criteria date resolution.
//!
//! Every dated row resolves through [`DateResolver::resolve`]. A criteria whose
//! reference is missing (no such milestone, header field, first segment, or no
//! rate crossing) resolves to `None` and the caller drops the row.

use chrono::NaiveDate;
use tracing::debug;

use econ_core::calendar::{add_years, first_of_month, shift_days};
use econ_core::{
    Criteria, DateContext, DatesModel, OffsetBase, ProductionSeries, RatePhase,
    ScheduleMilestones, WellHeader,
};

/// A resolved date with its month offset `t` from first production.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedDate {
    pub date: NaiveDate,
    pub offset: i32,
}

/// Per-well reference data criteria can point at.
#[derive(Clone, Copy, Debug)]
pub struct ReferenceData<'a> {
    pub header: &'a WellHeader,
    pub schedule: &'a ScheduleMilestones,
    pub production: &'a ProductionSeries,
}

/// Resolves criteria against a well's date context and reference data.
#[derive(Clone, Copy, Debug)]
pub struct DateResolver<'a> {
    ctx: &'a DateContext,
    refs: ReferenceData<'a>,
}

impl<'a> DateResolver<'a> {
    pub fn new(ctx: &'a DateContext, refs: ReferenceData<'a>) -> Self {
        Self { ctx, refs }
    }

    pub fn context(&self) -> &DateContext {
        self.ctx
    }

    pub fn refs(&self) -> ReferenceData<'a> {
        self.refs
    }

    pub fn base_date(&self, base: OffsetBase) -> Option<NaiveDate> {
        base_date(self.ctx, base)
    }

    pub fn resolve(&self, criteria: &Criteria) -> Option<ResolvedDate> {
        let date = match criteria {
            Criteria::Date { date } => Some(*date),
            Criteria::NamedOffset { base, days } => {
                self.base_date(*base).and_then(|d| shift_days(d, *days))
            }
            Criteria::ScheduleOffset { milestone, days } => self
                .refs
                .schedule
                .get(milestone)
                .and_then(|d| shift_days(*d, *days)),
            Criteria::HeaderOffset { field, days } => self
                .refs
                .header
                .date(field)
                .and_then(|d| shift_days(d, *days)),
            Criteria::RateThreshold { phase, threshold } => {
                rate_crossing(self.refs.production, *phase, *threshold)
            }
        };
        if date.is_none() {
            debug!(?criteria, "criteria reference missing; row dropped");
        }
        date.map(|date| ResolvedDate {
            date,
            offset: self.ctx.offset(date),
        })
    }

    /// Escalation start of a row: its own criteria when given, else the row date.
    pub fn escalation_start(&self, start: Option<&Criteria>, own: ResolvedDate) -> ResolvedDate {
        start.and_then(|c| self.resolve(c)).unwrap_or(own)
    }
}

/// Date a named offset is measured from; `None` when the well has no first segment.
pub fn base_date(ctx: &DateContext, base: OffsetBase) -> Option<NaiveDate> {
    match base {
        OffsetBase::Fpd => Some(ctx.first_production_date),
        OffsetBase::AsOfDate => Some(ctx.as_of_date),
        OffsetBase::DiscountDate => Some(ctx.discount_date),
        OffsetBase::FirstSegment => ctx.first_segment_date,
        OffsetBase::EconLimit => Some(ctx.cutoff_date),
    }
}

/// First month the daily-average rate falls from above `threshold` to at or below it.
///
/// Leading zero-rate months are skipped so a well that has not started yet is
/// not reported as having crossed.
pub fn rate_crossing(
    production: &ProductionSeries,
    phase: RatePhase,
    threshold: f64,
) -> Option<NaiveDate> {
    let rates = production.daily_rate(phase);
    let first = rates.iter().position(|r| *r > 0.0)?;
    let idx = (first + 1..rates.len()).find(|&i| rates[i - 1] > threshold && rates[i] <= threshold)?;
    Some(production.timeline().date_at(idx))
}

/// First production date: explicit, then header `first_prod_date`, then the
/// first month with production, then the as-of date.
pub fn first_production_date(
    model: &DatesModel,
    header: &WellHeader,
    production: &ProductionSeries,
) -> NaiveDate {
    model
        .first_production_date
        .or_else(|| header.date("first_prod_date"))
        .or_else(|| production.first_production_month())
        .unwrap_or(model.as_of_date)
}

/// Initial date context before capex and cutoff have been resolved.
///
/// The provisional cutoff is the explicit cutoff date when one is configured,
/// otherwise the max-life date.
pub fn initial_context(
    model: &DatesModel,
    header: &WellHeader,
    production: &ProductionSeries,
    forecast_start: Option<NaiveDate>,
) -> DateContext {
    let max_life = add_years(model.as_of_date, model.max_econ_life_years);
    let provisional = match &model.cutoff {
        econ_core::CutoffCriteria::Date { date } => (*date).min(max_life),
        _ => max_life,
    };
    DateContext {
        first_production_date: first_production_date(model, header, production),
        as_of_date: model.as_of_date,
        discount_date: model.discount_date.unwrap_or(model.as_of_date),
        first_segment_date: forecast_start.map(first_of_month),
        cutoff_date: provisional,
        cash_flow_start_date: model.as_of_date,
        cash_flow_end_date: provisional,
        max_econ_life_years: model.max_econ_life_years,
    }
}
