//! Month arithmetic and the monthly timeline every series is laid out on.

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Integer month offset `t` of `date` relative to `anchor`.
///
/// `t = (year(date) - year(anchor)) * 12 + month(date) - month(anchor)`; the day
/// of month is ignored.
pub fn month_offset(anchor: NaiveDate, date: NaiveDate) -> i32 {
    (date.year() - anchor.year()) * 12 + date.month() as i32 - anchor.month() as i32
}

/// Absolute month number (year * 12 + zero-based month).
pub fn month_index(date: NaiveDate) -> i32 {
    date.year() * 12 + date.month0() as i32
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn last_of_month(date: NaiveDate) -> NaiveDate {
    let first = first_of_month(date);
    shift_days(add_months(first, 1), -1).unwrap_or(first)
}

/// Add a signed number of months, clamping the day to the target month length.
pub fn add_months(start: NaiveDate, months: i32) -> NaiveDate {
    let total = start.year() * 12 + start.month0() as i32 + months;
    let y = total.div_euclid(12);
    let m = u32::try_from(total.rem_euclid(12) + 1).unwrap_or(1);
    let mut day = start.day();
    loop {
        if let Some(d) = NaiveDate::from_ymd_opt(y, m, day) {
            return d;
        }
        if day <= 28 {
            return start;
        }
        day -= 1;
    }
}

pub fn add_years(start: NaiveDate, years: u32) -> NaiveDate {
    add_months(start, i32::try_from(years).unwrap_or(i32::MAX / 12) * 12)
}

/// Shift by a signed day delta. `None` when the result leaves chrono's range.
pub fn shift_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    if days >= 0 {
        date.checked_add_days(Days::new(days.unsigned_abs()))
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
    }
}

pub fn days_in_month(date: NaiveDate) -> u32 {
    let first = first_of_month(date);
    let next = add_months(first, 1);
    u32::try_from(next.signed_duration_since(first).num_days()).unwrap_or(30)
}

/// Contiguous run of calendar months, `start` always the first of a month.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeline {
    pub start: NaiveDate,
    pub months: usize,
}

impl Timeline {
    /// Months from the month of `start` through the month of `end`, inclusive.
    /// Empty when `end` precedes `start`.
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        let n = month_offset(start, end) + 1;
        Self {
            start: first_of_month(start),
            months: usize::try_from(n).unwrap_or(0),
        }
    }

    pub fn single(month: NaiveDate) -> Self {
        Self {
            start: first_of_month(month),
            months: 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.months == 0
    }

    pub fn date_at(&self, idx: usize) -> NaiveDate {
        add_months(self.start, i32::try_from(idx).unwrap_or(i32::MAX))
    }

    /// Last month of the timeline (the start month when empty).
    pub fn end(&self) -> NaiveDate {
        self.date_at(self.months.saturating_sub(1))
    }

    /// Signed position of `date`'s month relative to the start; may fall outside.
    pub fn offset_of(&self, date: NaiveDate) -> i32 {
        month_offset(self.start, date)
    }

    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        usize::try_from(self.offset_of(date))
            .ok()
            .filter(|i| *i < self.months)
    }

    pub fn start_index(&self) -> i32 {
        month_index(self.start)
    }

    pub fn zeros(&self) -> Vec<f64> {
        vec![0.0; self.months]
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (0..self.months).map(|i| self.date_at(i))
    }

    /// Re-lay `values` (laid out on `from`) onto this timeline; months outside
    /// the overlap are zero.
    pub fn align(&self, values: &[f64], from: &Timeline) -> Vec<f64> {
        let shift = from.start_index() - self.start_index();
        let mut out = self.zeros();
        for (i, v) in values.iter().enumerate() {
            let target = i as i64 + shift as i64;
            if target >= 0 && (target as usize) < self.months {
                out[target as usize] = *v;
            }
        }
        out
    }
}
