//! Shut-in windows to monthly multipliers.

use chrono::NaiveDate;

use econ_core::calendar::{days_in_month, last_of_month, shift_days};
use econ_core::{ShutInWindow, Timeline};

/// Stream a shut-in window may exempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutInStream {
    FixedExpense,
    Capex,
    Production,
}

fn continues(window: &ShutInWindow, stream: ShutInStream) -> bool {
    match stream {
        ShutInStream::FixedExpense => window.fixed_expense,
        ShutInStream::Capex => window.capex,
        ShutInStream::Production => window.production,
    }
}

/// Whether `date` falls in a window that stops `stream`.
pub fn is_shut_in(windows: &[ShutInWindow], stream: ShutInStream, date: NaiveDate) -> bool {
    windows
        .iter()
        .any(|w| !continues(w, stream) && w.contains(date))
}

/// Per-month fraction of days on which `stream` is active.
///
/// Every day of the timeline is flagged 1, then 0 inside each window that stops
/// the stream. A fully flagged range returns all ones without prorating.
pub fn monthly_multiplier(
    timeline: &Timeline,
    windows: &[ShutInWindow],
    stream: ShutInStream,
) -> Vec<f64> {
    let stopping: Vec<&ShutInWindow> = windows.iter().filter(|w| !continues(w, stream)).collect();
    let any_overlap = stopping
        .iter()
        .any(|w| w.start <= last_of_month(timeline.end()) && w.end >= timeline.start);
    if timeline.is_empty() || !any_overlap {
        return vec![1.0; timeline.months];
    }
    timeline
        .dates()
        .map(|month| {
            let days = days_in_month(month);
            let active = (0..days)
                .filter_map(|k| shift_days(month, i64::from(k)))
                .filter(|day| !stopping.iter().any(|w| w.contains(*day)))
                .count();
            active as f64 / f64::from(days)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn window(start: NaiveDate, end: NaiveDate) -> ShutInWindow {
        ShutInWindow {
            start,
            end,
            fixed_expense: false,
            capex: true,
            production: false,
        }
    }

    #[test]
    fn fully_shut_in_month_is_zero() {
        let tl = Timeline::between(d(2022, 4, 1), d(2022, 6, 1));
        let w = [window(d(2022, 4, 1), d(2022, 4, 30))];
        let m = monthly_multiplier(&tl, &w, ShutInStream::Production);
        assert_eq!(m, vec![0.0, 1.0, 1.0]);
    }

    #[test]
    fn partial_month_is_prorated() {
        let tl = Timeline::between(d(2022, 6, 1), d(2022, 6, 1));
        let w = [window(d(2022, 6, 16), d(2022, 7, 10))];
        let m = monthly_multiplier(&tl, &w, ShutInStream::FixedExpense);
        assert_eq!(m, vec![0.5]);
    }

    #[test]
    fn exempt_stream_is_untouched() {
        let tl = Timeline::between(d(2022, 4, 1), d(2022, 5, 1));
        let w = [window(d(2022, 4, 1), d(2022, 4, 30))];
        assert_eq!(
            monthly_multiplier(&tl, &w, ShutInStream::Capex),
            vec![1.0, 1.0]
        );
        assert!(!is_shut_in(&w, ShutInStream::Capex, d(2022, 4, 10)));
        assert!(is_shut_in(&w, ShutInStream::Production, d(2022, 4, 10)));
    }
}
