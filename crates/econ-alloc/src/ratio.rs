//! Ratio math for the three allocation timings.

use econ_core::safe_div;

/// Month-by-month share.
pub fn monthly_ratio(well: &[f64], total: &[f64]) -> Vec<f64> {
    well.iter()
        .zip(total)
        .map(|(w, t)| safe_div(*w, *t))
        .collect()
}

/// Share of each 12-month bucket counted from the first month; a partial
/// tail bucket uses whatever months remain.
pub fn annual_ratio(well: &[f64], total: &[f64]) -> Vec<f64> {
    let n = well.len().min(total.len());
    let mut out = Vec::with_capacity(n);
    for (w, t) in well[..n].chunks(12).zip(total[..n].chunks(12)) {
        let r = safe_div(w.iter().sum(), t.iter().sum());
        out.extend(std::iter::repeat(r).take(w.len()));
    }
    out
}

/// Share of everything still to come: suffix sums from each month on.
pub fn remaining_ratio(well: &[f64], total: &[f64]) -> Vec<f64> {
    let n = well.len().min(total.len());
    let mut out = vec![0.0; n];
    let (mut w_rest, mut t_rest) = (0.0, 0.0);
    for i in (0..n).rev() {
        w_rest += well[i];
        t_rest += total[i];
        out[i] = safe_div(w_rest, t_rest);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_total_gives_zero() {
        assert_eq!(monthly_ratio(&[1.0, 0.0], &[0.0, 0.0]), vec![0.0, 0.0]);
        assert_eq!(safe_div(1.0, f64::MIN_POSITIVE / 1e10), 0.0);
    }

    #[test]
    fn annual_buckets_with_partial_tail() {
        let well: Vec<f64> = (0..14).map(|i| if i < 12 { 1.0 } else { 3.0 }).collect();
        let total = vec![4.0; 14];
        let r = annual_ratio(&well, &total);
        assert_eq!(r.len(), 14);
        assert_eq!(r[0], 0.25);
        assert_eq!(r[11], 0.25);
        assert_eq!(r[12], 0.75);
    }

    #[test]
    fn remaining_uses_suffix_sums() {
        let r = remaining_ratio(&[1.0, 3.0], &[2.0, 4.0]);
        assert_eq!(r, vec![4.0 / 6.0, 0.75]);
    }

    proptest! {
        #[test]
        fn share_of_an_enclosing_total_is_a_fraction(
            rows in proptest::collection::vec((0.0f64..1e4, 0.0f64..1e4), 0..40),
        ) {
            let well: Vec<f64> = rows.iter().map(|(w, _)| *w).collect();
            let total: Vec<f64> = rows.iter().map(|(w, o)| w + o).collect();
            let all = monthly_ratio(&well, &total)
                .into_iter()
                .chain(annual_ratio(&well, &total))
                .chain(remaining_ratio(&well, &total));
            for r in all {
                prop_assert!((0.0..=1.0 + 1e-12).contains(&r), "ratio {}", r);
            }
        }
    }
}
