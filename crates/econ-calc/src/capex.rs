//! Capex scheduling.
//!
//! Rows are resolved to dated events once per pass. Events live in a single
//! arena sorted by `(date, column)`; the "all" and "after as-of" views are index
//! lists into it, so the result does not depend on input row order and
//! repeated calls on the same input return identical amounts.

use chrono::NaiveDate;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tracing::debug;

use econ_core::calendar::{add_months, first_of_month, month_offset};
use econ_core::{
    CapexCalculation, CapexEvent, CapexResult, CriteriaRow, CurrencyUnit, DateContext,
    OwnershipModel, ShutInWindow, Timeline,
};

use crate::dates::DateResolver;
use crate::escalation::escalate_value;
use crate::ownership::interest_at;
use crate::shut_in::{is_shut_in, ShutInStream};
use crate::CalcError;

/// Which evaluation pass the scheduler runs for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulePass {
    /// Before the econ limit is known. Rows offset from the econ limit are skipped.
    CutoffSearch,
    /// The econ limit in the date context is final.
    Final,
}

/// Capex rows of one well plus the settings that shape their events.
#[derive(Clone, Copy, Debug)]
pub struct CapexScheduler<'a> {
    pub rows: &'a [CriteriaRow],
    pub unit: CurrencyUnit,
    pub shut_ins: &'a [ShutInWindow],
    pub ownership: &'a OwnershipModel,
    pub cash_flow_prior_to_as_of: bool,
}

/// Scheduled events and the cash flow bounds they imply.
#[derive(Clone, Debug, PartialEq)]
pub struct CapexSchedule {
    events: Vec<CapexEvent>,
    all: Vec<usize>,
    after_as_of: Vec<usize>,
    cash_flow_prior_to_as_of: bool,
    pub cash_flow_start_date: NaiveDate,
    pub cash_flow_end_date: NaiveDate,
    pub discount_date: NaiveDate,
}

impl CapexSchedule {
    pub fn all(&self) -> impl Iterator<Item = &CapexEvent> {
        self.all.iter().map(|i| &self.events[*i])
    }

    pub fn after_as_of(&self) -> impl Iterator<Item = &CapexEvent> {
        self.after_as_of.iter().map(|i| &self.events[*i])
    }

    /// Events that enter the cash flow.
    pub fn cash_flow_events(&self) -> Vec<CapexEvent> {
        if self.cash_flow_prior_to_as_of {
            self.all().cloned().collect()
        } else {
            self.after_as_of().cloned().collect()
        }
    }

    /// Copy the derived cash flow bounds into `ctx`.
    pub fn apply_to(&self, ctx: &mut DateContext) {
        ctx.cash_flow_start_date = self.cash_flow_start_date;
        ctx.cash_flow_end_date = self.cash_flow_end_date;
        ctx.discount_date = self.discount_date;
    }

    /// Monthly capex series on `timeline`.
    pub fn result(&self, timeline: &Timeline) -> CapexResult {
        CapexResult::from_events(self.cash_flow_events(), timeline)
    }
}

fn unit_factor(unit: CurrencyUnit) -> Decimal {
    match unit {
        CurrencyUnit::Dollars => Decimal::ONE,
        CurrencyUnit::ThousandDollars => Decimal::ONE_THOUSAND,
    }
}

impl<'a> CapexScheduler<'a> {
    pub fn schedule(
        &self,
        resolver: &DateResolver<'_>,
        pass: SchedulePass,
    ) -> Result<CapexSchedule, CalcError> {
        let ctx = resolver.context();
        let max_life = ctx.max_life_date();
        let mut events = Vec::with_capacity(self.rows.len());
        for row in self.rows {
            let econ_limit_row = row.criteria.is_econ_limit_offset();
            if pass == SchedulePass::CutoffSearch && econ_limit_row {
                continue;
            }
            let Some(resolved) = resolver.resolve(&row.criteria) else {
                continue;
            };
            let date = resolved.date;
            if is_shut_in(self.shut_ins, ShutInStream::Capex, date) {
                debug!(column = row.column, %date, "capex suppressed by shut-in");
                continue;
            }
            let end_of_life = row.category.is_end_of_life() || econ_limit_row;
            if month_offset(ctx.cutoff_date, date) > 0 && !(end_of_life || row.after_econ_limit) {
                continue;
            }
            if month_offset(max_life, date) > 0 && !end_of_life {
                continue;
            }
            let start = resolver.escalation_start(row.escalation_start.as_ref(), resolved);
            let elapsed = resolved.offset - start.offset;
            events.push(self.event(row, date, resolved.offset, elapsed)?);
        }
        events.sort_by(|a, b| (a.date, a.row.column).cmp(&(b.date, b.row.column)));

        let all: Vec<usize> = (0..events.len()).collect();
        let after_as_of: Vec<usize> = all
            .iter()
            .copied()
            .filter(|i| month_offset(ctx.as_of_date, events[*i].date) >= 0)
            .collect();

        let cash_flow_start_date = match events.first() {
            Some(first) if self.cash_flow_prior_to_as_of && first.date < ctx.as_of_date => {
                first_of_month(first.date)
            }
            _ => ctx.as_of_date,
        };
        let shift = month_offset(ctx.as_of_date, cash_flow_start_date);
        let discount_date = if shift == 0 {
            ctx.discount_date
        } else {
            add_months(ctx.discount_date, shift)
        };
        let used = if self.cash_flow_prior_to_as_of {
            &all
        } else {
            &after_as_of
        };
        let latest = used.iter().map(|i| events[*i].date).max();
        let cash_flow_end_date = latest.map_or(ctx.cutoff_date, |d| d.max(ctx.cutoff_date));

        Ok(CapexSchedule {
            events,
            all,
            after_as_of,
            cash_flow_prior_to_as_of: self.cash_flow_prior_to_as_of,
            cash_flow_start_date,
            cash_flow_end_date,
            discount_date,
        })
    }

    fn event(
        &self,
        row: &CriteriaRow,
        date: NaiveDate,
        offset: i32,
        elapsed: i32,
    ) -> Result<CapexEvent, CalcError> {
        let non_finite = || CalcError::NonFinite { column: row.column };
        let factor = unit_factor(self.unit);
        let escalate = |amount: Decimal| -> Result<Decimal, CalcError> {
            let dollars = amount * factor;
            if row.escalation_model.is_none() || elapsed <= 0 || dollars.is_zero() {
                return Ok(dollars);
            }
            let v = escalate_value(
                econ_core::decimal_to_f64(dollars),
                row.escalation_model.as_ref(),
                elapsed,
            );
            Decimal::from_f64(v).ok_or_else(non_finite)
        };
        let tangible = escalate(row.tangible)?;
        let intangible = escalate(row.intangible)?;
        let wi = Decimal::from_f64(interest_at(&self.ownership.wi, date)).ok_or_else(non_finite)?;
        let to_pair = |amount: Decimal| -> (Decimal, Decimal) {
            match row.calculation {
                CapexCalculation::Gross => (amount, amount * wi * row.deal_terms),
                CapexCalculation::Net => {
                    let gross = if wi.is_zero() { amount } else { amount / wi };
                    (gross, amount * row.deal_terms)
                }
            }
        };
        let (tangible_gross, tangible_net) = to_pair(tangible);
        let (intangible_gross, intangible_net) = to_pair(intangible);
        Ok(CapexEvent {
            row: row.clone(),
            date,
            offset,
            tangible_gross,
            intangible_gross,
            tangible_net,
            intangible_net,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::ReferenceData;
    use econ_core::{
        CapexCategory, Criteria, EscalationFrequency, EscalationKind, EscalationModel, Interest,
        OffsetBase, ProductionSeries, ScheduleMilestones, WellHeader,
    };

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn row(column: usize, category: CapexCategory, criteria: Criteria, tangible: i64) -> CriteriaRow {
        CriteriaRow {
            column,
            category,
            description: None,
            tangible: Decimal::new(tangible, 0),
            intangible: Decimal::ZERO,
            criteria,
            escalation_start: None,
            escalation_model: None,
            deal_terms: Decimal::ONE,
            after_econ_limit: false,
            calculation: CapexCalculation::Gross,
        }
    }

    /// FPD Jan 2020, as-of Jan 2020, max life two years (t=24), econ limit t=36.
    fn ctx() -> DateContext {
        DateContext {
            first_production_date: d(2020, 1, 1),
            as_of_date: d(2020, 1, 1),
            discount_date: d(2020, 1, 1),
            first_segment_date: None,
            cutoff_date: d(2023, 1, 1),
            cash_flow_start_date: d(2020, 1, 1),
            cash_flow_end_date: d(2023, 1, 1),
            max_econ_life_years: 2,
        }
    }

    struct Refs {
        header: WellHeader,
        schedule: ScheduleMilestones,
        production: ProductionSeries,
    }

    fn refs() -> Refs {
        Refs {
            header: WellHeader::default(),
            schedule: ScheduleMilestones::new(),
            production: ProductionSeries::default(),
        }
    }

    fn run(
        c: &DateContext,
        rows: &[CriteriaRow],
        unit: CurrencyUnit,
        ownership: &OwnershipModel,
        prior: bool,
        pass: SchedulePass,
    ) -> CapexSchedule {
        let r = refs();
        let resolver = DateResolver::new(
            c,
            ReferenceData {
                header: &r.header,
                schedule: &r.schedule,
                production: &r.production,
            },
        );
        CapexScheduler {
            rows,
            unit,
            shut_ins: &[],
            ownership,
            cash_flow_prior_to_as_of: prior,
        }
        .schedule(&resolver, pass)
        .unwrap()
    }

    fn full_wi() -> OwnershipModel {
        OwnershipModel {
            wi: Interest::Scalar(1.0),
            ..OwnershipModel::default()
        }
    }

    #[test]
    fn abandonment_at_econ_limit_survives_max_life() {
        let rows = [row(
            1,
            CapexCategory::Abandonment,
            Criteria::NamedOffset {
                base: OffsetBase::EconLimit,
                days: 0,
            },
            10,
        )];
        let s = run(
            &ctx(),
            &rows,
            CurrencyUnit::Dollars,
            &full_wi(),
            false,
            SchedulePass::Final,
        );
        let kept: Vec<_> = s.all().collect();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].offset, 36);
        assert_eq!(s.cash_flow_end_date, d(2023, 1, 1));

        let search = run(
            &ctx(),
            &rows,
            CurrencyUnit::Dollars,
            &full_wi(),
            false,
            SchedulePass::CutoffSearch,
        );
        assert_eq!(search.all().count(), 0);
    }

    #[test]
    fn drilling_after_max_life_is_dropped() {
        let rows = [
            row(
                1,
                CapexCategory::Drilling,
                Criteria::Date { date: d(2022, 6, 1) },
                10,
            ),
            row(
                2,
                CapexCategory::Salvage,
                Criteria::Date { date: d(2022, 6, 1) },
                10,
            ),
        ];
        let s = run(
            &ctx(),
            &rows,
            CurrencyUnit::Dollars,
            &full_wi(),
            false,
            SchedulePass::Final,
        );
        let cats: Vec<_> = s.all().map(|e| e.category()).collect();
        assert_eq!(cats, vec![CapexCategory::Salvage]);
    }

    #[test]
    fn after_econ_limit_flag_keeps_row() {
        let mut c = ctx();
        c.max_econ_life_years = 10;
        c.cutoff_date = d(2021, 1, 31);
        let mut late = row(
            1,
            CapexCategory::Facilities,
            Criteria::Date { date: d(2021, 6, 1) },
            10,
        );
        let s = run(
            &c,
            std::slice::from_ref(&late),
            CurrencyUnit::Dollars,
            &full_wi(),
            false,
            SchedulePass::Final,
        );
        assert_eq!(s.all().count(), 0);
        late.after_econ_limit = true;
        let s = run(
            &c,
            std::slice::from_ref(&late),
            CurrencyUnit::Dollars,
            &full_wi(),
            false,
            SchedulePass::Final,
        );
        assert_eq!(s.all().count(), 1);
        assert_eq!(s.cash_flow_end_date, d(2021, 6, 1));
    }

    #[test]
    fn end_of_life_and_econ_limit_rows_survive_past_cutoff() {
        let mut c = ctx();
        c.max_econ_life_years = 10;
        c.cutoff_date = d(2021, 1, 31);
        let rows = [
            row(
                1,
                CapexCategory::Salvage,
                Criteria::Date { date: d(2021, 6, 1) },
                10,
            ),
            row(
                2,
                CapexCategory::Workover,
                Criteria::NamedOffset {
                    base: OffsetBase::EconLimit,
                    days: 60,
                },
                10,
            ),
            row(
                3,
                CapexCategory::Drilling,
                Criteria::Date { date: d(2021, 6, 1) },
                10,
            ),
        ];
        assert!(rows.iter().all(|r| !r.after_econ_limit));
        let s = run(
            &c,
            &rows,
            CurrencyUnit::Dollars,
            &full_wi(),
            false,
            SchedulePass::Final,
        );
        let kept: Vec<_> = s.all().map(|e| (e.category(), e.date)).collect();
        assert_eq!(
            kept,
            vec![
                (CapexCategory::Workover, d(2021, 4, 1)),
                (CapexCategory::Salvage, d(2021, 6, 1)),
            ]
        );
    }

    #[test]
    fn thousand_dollars_convert_once_and_repeat_identically() {
        let rows = [row(
            1,
            CapexCategory::Completion,
            Criteria::Date { date: d(2020, 3, 1) },
            25,
        )];
        let ownership = OwnershipModel {
            wi: Interest::Scalar(0.5),
            ..OwnershipModel::default()
        };
        let first = run(
            &ctx(),
            &rows,
            CurrencyUnit::ThousandDollars,
            &ownership,
            false,
            SchedulePass::Final,
        );
        let second = run(
            &ctx(),
            &rows,
            CurrencyUnit::ThousandDollars,
            &ownership,
            false,
            SchedulePass::Final,
        );
        assert_eq!(first, second);
        let e = first.all().next().unwrap();
        assert_eq!(e.tangible_gross, Decimal::new(25_000, 0));
        assert_eq!(e.tangible_net, Decimal::new(12_500, 0));
    }

    #[test]
    fn row_order_does_not_matter() {
        let a = row(
            1,
            CapexCategory::Drilling,
            Criteria::Date { date: d(2020, 2, 1) },
            5,
        );
        let b = row(
            2,
            CapexCategory::Completion,
            Criteria::Date { date: d(2020, 2, 1) },
            7,
        );
        let fwd = run(
            &ctx(),
            &[a.clone(), b.clone()],
            CurrencyUnit::Dollars,
            &full_wi(),
            false,
            SchedulePass::Final,
        );
        let rev = run(
            &ctx(),
            &[b, a],
            CurrencyUnit::Dollars,
            &full_wi(),
            false,
            SchedulePass::Final,
        );
        assert_eq!(fwd, rev);
    }

    #[test]
    fn prior_capex_moves_cash_flow_start_and_discount_date() {
        let mut c = ctx();
        c.as_of_date = d(2020, 6, 1);
        c.discount_date = d(2020, 6, 1);
        let rows = [row(
            1,
            CapexCategory::Drilling,
            Criteria::Date { date: d(2020, 2, 15) },
            5,
        )];
        let with = run(
            &c,
            &rows,
            CurrencyUnit::Dollars,
            &full_wi(),
            true,
            SchedulePass::Final,
        );
        assert_eq!(with.cash_flow_start_date, d(2020, 2, 1));
        assert_eq!(with.discount_date, d(2020, 2, 1));
        assert_eq!(with.cash_flow_events().len(), 1);

        let without = run(
            &c,
            &rows,
            CurrencyUnit::Dollars,
            &full_wi(),
            false,
            SchedulePass::Final,
        );
        assert_eq!(without.cash_flow_start_date, d(2020, 6, 1));
        assert_eq!(without.all().count(), 1);
        assert!(without.cash_flow_events().is_empty());
    }

    #[test]
    fn escalation_from_own_date_is_flat() {
        let mut r = row(
            1,
            CapexCategory::Drilling,
            Criteria::Date { date: d(2021, 1, 1) },
            100,
        );
        r.escalation_model = Some(EscalationModel {
            kind: EscalationKind::Pct,
            rate: 10.0,
            frequency: EscalationFrequency::Yearly,
        });
        let s = run(
            &ctx(),
            std::slice::from_ref(&r),
            CurrencyUnit::Dollars,
            &full_wi(),
            false,
            SchedulePass::Final,
        );
        assert_eq!(s.all().next().unwrap().tangible_gross, Decimal::new(100, 0));

        r.escalation_start = Some(Criteria::Date { date: d(2020, 1, 1) });
        let s = run(
            &ctx(),
            std::slice::from_ref(&r),
            CurrencyUnit::Dollars,
            &full_wi(),
            false,
            SchedulePass::Final,
        );
        let esc = econ_core::decimal_to_f64(s.all().next().unwrap().tangible_gross);
        assert!((esc - 110.0).abs() < 1e-6);
    }
}
