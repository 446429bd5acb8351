//! Value schedules and the shared track pipeline (schedule, escalate, cap).

use chrono::{Datelike, NaiveDate};
use tracing::debug;

use econ_core::calendar::{first_of_month, month_offset};
use econ_core::{
    Criteria, DateContext, DatedValue, OffsetValue, ProductionSeries, RateBand, RatePhase,
    Timeline, Track, ValueSchedule,
};

use crate::dates::{base_date, DateResolver};
use crate::escalation::escalate_series;

/// Gross daily-average rates of each phase, aligned to a timeline.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RateLookup {
    pub oil: Vec<f64>,
    pub gas: Vec<f64>,
    pub water: Vec<f64>,
}

impl RateLookup {
    pub fn from_production(production: &ProductionSeries, timeline: &Timeline) -> Self {
        let src = production.timeline();
        let aligned = |phase| timeline.align(&production.daily_rate(phase), &src);
        Self {
            oil: aligned(RatePhase::Oil),
            gas: aligned(RatePhase::Gas),
            water: aligned(RatePhase::Water),
        }
    }

    pub fn phase(&self, phase: RatePhase) -> Vec<f64> {
        match phase {
            RatePhase::Oil => self.oil.clone(),
            RatePhase::Gas => self.gas.clone(),
            RatePhase::Water => self.water.clone(),
            RatePhase::TotalFluid => self
                .oil
                .iter()
                .zip(&self.water)
                .map(|(o, w)| o + w)
                .collect(),
        }
    }
}

fn dated(segments: &[DatedValue], month: NaiveDate) -> f64 {
    segments
        .iter()
        .filter(|s| first_of_month(s.start) <= month)
        .max_by_key(|s| s.start)
        .map_or(0.0, |s| s.value)
}

fn offset(segments: &[OffsetValue], months_from_base: i32) -> f64 {
    if months_from_base < 0 {
        return 0.0;
    }
    let mut edge = 0i64;
    for s in segments {
        edge += i64::from(s.months);
        if i64::from(months_from_base) < edge {
            return s.value;
        }
    }
    segments.last().map_or(0.0, |s| s.value)
}

fn banded(bands: &[RateBand], rate: f64) -> f64 {
    bands
        .iter()
        .filter(|b| rate >= b.min_rate)
        .max_by(|a, b| a.min_rate.total_cmp(&b.min_rate))
        .map_or(0.0, |b| b.value)
}

/// Raw schedule values per month of `timeline`.
pub fn schedule_values(
    schedule: &ValueSchedule,
    timeline: &Timeline,
    ctx: &DateContext,
    rates: &RateLookup,
) -> Vec<f64> {
    match schedule {
        ValueSchedule::Flat { value } => vec![*value; timeline.months],
        ValueSchedule::Dated { segments } => timeline.dates().map(|m| dated(segments, m)).collect(),
        ValueSchedule::Offset { base, segments } => match base_date(ctx, *base) {
            Some(b) => timeline
                .dates()
                .map(|m| offset(segments, month_offset(b, m)))
                .collect(),
            None => {
                debug!(?base, "offset schedule base missing; zero values");
                timeline.zeros()
            }
        },
        ValueSchedule::RateBased { phase, bands } => {
            let r = rates.phase(*phase);
            (0..timeline.months)
                .map(|i| banded(bands, r.get(i).copied().unwrap_or(0.0)))
                .collect()
        }
        ValueSchedule::Seasonal { values } => timeline
            .dates()
            .map(|m| values[m.month0() as usize])
            .collect(),
    }
}

/// Date a track escalates from when it names no start of its own.
fn default_escalation_start(schedule: &ValueSchedule, ctx: &DateContext) -> NaiveDate {
    match schedule {
        ValueSchedule::Dated { segments } => segments
            .iter()
            .map(|s| s.start)
            .min()
            .unwrap_or(ctx.as_of_date),
        ValueSchedule::Offset { base, .. } => base_date(ctx, *base).unwrap_or(ctx.as_of_date),
        _ => ctx.as_of_date,
    }
}

/// Unit-normalized, escalated and capped per-month values of a track.
///
/// `scale` normalizes the unit (0.01 for percent units). The cap bounds the
/// escalated value from above.
pub fn track_values<U>(
    track: &Track<U>,
    scale: f64,
    timeline: &Timeline,
    resolver: &DateResolver<'_>,
    rates: &RateLookup,
) -> Vec<f64> {
    let ctx = resolver.context();
    let base: Vec<f64> = schedule_values(&track.schedule, timeline, ctx, rates)
        .into_iter()
        .map(|v| v * scale)
        .collect();
    let start = escalation_start(track.escalation_start.as_ref(), &track.schedule, resolver);
    let escalated = escalate_series(
        &base,
        track.escalation.as_ref(),
        month_offset(start, timeline.start),
    );
    match track.cap {
        Some(cap) => {
            let cap = cap * scale;
            escalated.into_iter().map(|v| v.min(cap)).collect()
        }
        None => escalated,
    }
}

fn escalation_start(
    criteria: Option<&Criteria>,
    schedule: &ValueSchedule,
    resolver: &DateResolver<'_>,
) -> NaiveDate {
    criteria
        .and_then(|c| resolver.resolve(c))
        .map(|r| r.date)
        .unwrap_or_else(|| default_escalation_start(schedule, resolver.context()))
}
