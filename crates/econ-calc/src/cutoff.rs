//! Econ limit (cutoff) determination.

use chrono::NaiveDate;

use econ_core::calendar::{add_months, last_of_month};
use econ_core::{CutoffCriteria, Timeline};

/// Cutoff date from the econ cash flow laid out on `timeline`.
///
/// The econ cash flow is net revenue less the expenses that affect the econ
/// limit and less taxes; capex never enters it. When no month qualifies the
/// cutoff falls in the month before the timeline start, which marks the well
/// unecon. Selected months report their last day.
pub fn determine_cutoff(
    criteria: &CutoffCriteria,
    timeline: &Timeline,
    econ_cash_flow: &[f64],
    max_life: NaiveDate,
) -> NaiveDate {
    let month = |i: usize| last_of_month(timeline.date_at(i)).min(max_life);
    let before_start = last_of_month(add_months(timeline.start, -1));
    let n = econ_cash_flow.len().min(timeline.months);
    let cf = &econ_cash_flow[..n];
    match criteria {
        CutoffCriteria::Date { date } => (*date).min(max_life),
        CutoffCriteria::MaxLife => max_life,
        CutoffCriteria::LastPositiveCashFlow => cf
            .iter()
            .rposition(|v| *v > 0.0)
            .map_or(before_start, month),
        CutoffCriteria::FirstNegativeCashFlow => match cf.iter().position(|v| *v < 0.0) {
            Some(0) => before_start,
            Some(i) => month(i - 1),
            None if n == 0 => before_start,
            None => month(n - 1),
        },
        CutoffCriteria::MaxCumulativeCashFlow => {
            let mut best = (0.0, None);
            let mut cum = 0.0;
            for (i, v) in cf.iter().enumerate() {
                cum += v;
                if cum > best.0 {
                    best = (cum, Some(i));
                }
            }
            best.1.map_or(before_start, month)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn tl() -> Timeline {
        Timeline::between(d(2022, 1, 1), d(2022, 6, 1))
    }

    #[test]
    fn last_positive_picks_final_positive_month() {
        let cf = [10.0, 5.0, -1.0, 2.0, -3.0, -4.0];
        let c = determine_cutoff(
            &CutoffCriteria::LastPositiveCashFlow,
            &tl(),
            &cf,
            d(2072, 1, 1),
        );
        assert_eq!(c, d(2022, 4, 30));
    }

    #[test]
    fn first_negative_stops_the_month_before() {
        let cf = [10.0, 5.0, -1.0, 2.0, -3.0, -4.0];
        let c = determine_cutoff(
            &CutoffCriteria::FirstNegativeCashFlow,
            &tl(),
            &cf,
            d(2072, 1, 1),
        );
        assert_eq!(c, d(2022, 2, 28));
    }

    #[test]
    fn max_cumulative_peak() {
        let cf = [10.0, 5.0, -1.0, 2.0, -3.0, -4.0];
        let c = determine_cutoff(
            &CutoffCriteria::MaxCumulativeCashFlow,
            &tl(),
            &cf,
            d(2072, 1, 1),
        );
        // cumulative 10, 15, 14, 16, 13, 9
        assert_eq!(c, d(2022, 4, 30));
    }

    #[test]
    fn never_positive_is_before_start() {
        let cf = [-1.0; 6];
        let c = determine_cutoff(
            &CutoffCriteria::LastPositiveCashFlow,
            &tl(),
            &cf,
            d(2072, 1, 1),
        );
        assert_eq!(c, d(2021, 12, 31));
    }

    #[test]
    fn explicit_date_is_bounded_by_max_life() {
        let c = determine_cutoff(
            &CutoffCriteria::Date {
                date: d(2100, 1, 1),
            },
            &tl(),
            &[],
            d(2072, 1, 1),
        );
        assert_eq!(c, d(2072, 1, 1));
    }
}
